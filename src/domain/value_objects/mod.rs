pub mod content_hash;
pub mod front_matter;

pub use content_hash::ContentHash;
pub use front_matter::{FrontMatter, FrontMatterError, MarkdownDocument};
