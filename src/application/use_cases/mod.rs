pub mod ask_question;
pub mod import_corpus;

pub use ask_question::{
    AskQuestionError, AskQuestionRequest, AskQuestionResponse, AskQuestionUseCase,
};
pub use import_corpus::{
    FailurePolicy, FileReport, FileStatus, ImportCorpusRequest, ImportCorpusResponse,
    ImportCorpusUseCase,
};
