pub mod article_model;
pub mod chunk_model;

pub use article_model::*;
pub use chunk_model::*;
