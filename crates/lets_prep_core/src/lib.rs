pub mod domain;
pub mod generator;
pub mod grading;
pub mod ports;

pub use domain::{
    FileFormat, NewQuizSession, NewUploadedFile, QuestionType, QuizItem, QuizSession,
    QuizSessionSummary, UploadedFile, User, UserCredentials,
};
pub use generator::HeuristicQuizGenerator;
pub use grading::{grade_response, QuizScore};
pub use ports::{
    DatabaseService, ExtractionError, FileStorageService, OcrService, PortError, PortResult,
    QuizGenerationService, TextExtractionService,
};
