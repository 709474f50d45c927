use std::sync::Arc;

use tracing::info;

use crate::{
    application::{
        ports::{AnswerGenerator, CorpusSource, EmbeddingProvider},
        services::{
            ArticleImporter, PromptTemplate, RecursiveSplitter, Retriever, TextSplitter,
            ensure_embedding_compatibility,
        },
        use_cases::{AskQuestionUseCase, ImportCorpusUseCase},
    },
    config::{AppConfig, ConfigError, CorpusVariant},
    domain::repositories::CorpusStore,
    infrastructure::{
        database::{
            PostgresCorpusStore, create_connection_pool, get_connection_from_pool, run_migrations,
        },
        external_services::{CompletionClient, InferenceEmbeddingProvider},
        file_system::MarkdownCorpusReader,
    },
};

pub struct AppContainer {
    pub config: AppConfig,

    pub corpus_store: Arc<dyn CorpusStore>,
    pub embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    pub answer_generator: Arc<dyn AnswerGenerator>,
    pub corpus_source: Arc<dyn CorpusSource>,

    pub splitter: Arc<dyn TextSplitter>,
    pub retriever: Arc<Retriever>,
    pub article_importer: Arc<ArticleImporter>,

    pub import_corpus_use_case: Arc<ImportCorpusUseCase>,
    pub ask_question_use_case: Arc<AskQuestionUseCase>,
}

impl AppContainer {
    /// Connects to Postgres, applies migrations and wires the HTTP clients.
    pub async fn new(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db_pool = create_connection_pool(&config.database)?;
        {
            let mut conn = get_connection_from_pool(&db_pool)?;
            run_migrations(&mut conn)?;
        }

        let corpus_store: Arc<dyn CorpusStore> =
            Arc::new(PostgresCorpusStore::connect(db_pool, &config.retrieval)?);

        let embedding_provider: Option<Arc<dyn EmbeddingProvider>> = match config.retrieval.variant
        {
            CorpusVariant::Vector => Some(Arc::new(InferenceEmbeddingProvider::from_config(
                config.embeddings.clone(),
            )?)),
            CorpusVariant::FullText => None,
        };

        let answer_generator: Arc<dyn AnswerGenerator> =
            Arc::new(CompletionClient::new(config.completion.clone())?);

        Ok(Self::from_parts(
            config,
            corpus_store,
            embedding_provider,
            answer_generator,
            Arc::new(MarkdownCorpusReader::default()),
        )?)
    }

    /// Wires the pipeline around already-built collaborators. Fails when the
    /// embedder does not fit the store's schema.
    pub fn from_parts(
        config: AppConfig,
        corpus_store: Arc<dyn CorpusStore>,
        embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
        answer_generator: Arc<dyn AnswerGenerator>,
        corpus_source: Arc<dyn CorpusSource>,
    ) -> Result<Self, ConfigError> {
        ensure_embedding_compatibility(corpus_store.as_ref(), embedding_provider.as_deref())?;

        let splitter: Arc<dyn TextSplitter> =
            Arc::new(RecursiveSplitter::new(config.splitter.clone())?);

        let retriever = Arc::new(Retriever::new(
            corpus_store.clone(),
            embedding_provider.clone(),
            &config.retrieval,
        ));

        let article_importer = Arc::new(ArticleImporter::new(
            corpus_store.clone(),
            splitter.clone(),
            embedding_provider.clone(),
        ));

        let import_corpus_use_case = Arc::new(ImportCorpusUseCase::new(
            corpus_source.clone(),
            article_importer.clone(),
        ));

        let ask_question_use_case = Arc::new(AskQuestionUseCase::new(
            retriever.clone(),
            PromptTemplate::default(),
            answer_generator.clone(),
            config.retrieval.overfetch,
            config.retrieval.final_count,
        ));

        info!(
            "Pipeline ready: {:?} corpus, {:?} ranking, model {}",
            config.retrieval.variant,
            corpus_store.capability(),
            answer_generator.model_name()
        );

        Ok(Self {
            config,
            corpus_store,
            embedding_provider,
            answer_generator,
            corpus_source,
            splitter,
            retriever,
            article_importer,
            import_corpus_use_case,
            ask_question_use_case,
        })
    }
}
