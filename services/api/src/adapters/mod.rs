pub mod db;
pub mod extract;
pub mod ocr_llm;
pub mod pdf_export;
pub mod quiz_llm;
pub mod storage;

pub use db::DbAdapter;
pub use extract::DocumentExtractor;
pub use ocr_llm::OpenAiOcrAdapter;
pub use quiz_llm::OpenAiQuizAdapter;
pub use storage::LocalFileStore;
