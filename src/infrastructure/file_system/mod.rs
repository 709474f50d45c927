pub mod markdown_corpus;

pub use markdown_corpus::MarkdownCorpusReader;
