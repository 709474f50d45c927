pub mod import_command;
pub mod question_command;

pub use import_command::{ImportCli, run_import};
pub use question_command::{QuestionCli, run_question, usage};
