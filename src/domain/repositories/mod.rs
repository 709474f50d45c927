pub mod corpus_store;

pub use corpus_store::{
    CorpusQuery, CorpusStore, CorpusWriter, RankingCapability, StoreError, write_article,
};
