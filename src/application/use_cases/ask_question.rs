use std::sync::Arc;

use tracing::info;

use crate::application::ports::AnswerGenerator;
use crate::application::services::{PromptTemplate, Retriever};
use crate::domain::entities::Reference;

#[derive(Debug)]
pub enum AskQuestionError {
    ValidationError(String),
    RetrievalError(String),
    GenerationError(String),
}

impl std::fmt::Display for AskQuestionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AskQuestionError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AskQuestionError::RetrievalError(msg) => write!(f, "Retrieval error: {}", msg),
            AskQuestionError::GenerationError(msg) => write!(f, "Generation error: {}", msg),
        }
    }
}

impl std::error::Error for AskQuestionError {}

#[derive(Debug, Clone, Default)]
pub struct AskQuestionRequest {
    pub question: String,
    pub overfetch: Option<usize>,
    pub final_count: Option<usize>,
    /// Build the prompt but do not call the model.
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct AskQuestionResponse {
    pub references: Vec<Reference>,
    pub prompt: String,
    pub answer: Option<String>,
}

pub struct AskQuestionUseCase {
    retriever: Arc<Retriever>,
    template: PromptTemplate,
    generator: Arc<dyn AnswerGenerator>,
    overfetch: usize,
    final_count: usize,
}

impl AskQuestionUseCase {
    pub fn new(
        retriever: Arc<Retriever>,
        template: PromptTemplate,
        generator: Arc<dyn AnswerGenerator>,
        overfetch: usize,
        final_count: usize,
    ) -> Self {
        Self {
            retriever,
            template,
            generator,
            overfetch,
            final_count,
        }
    }

    /// Retrieves references and renders the prompt without calling the model.
    pub async fn prepare(
        &self,
        request: &AskQuestionRequest,
    ) -> Result<AskQuestionResponse, AskQuestionError> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(AskQuestionError::ValidationError(
                "Question cannot be empty".to_string(),
            ));
        }

        let references = self
            .retriever
            .retrieve_with(
                question,
                request.overfetch.unwrap_or(self.overfetch),
                request.final_count.unwrap_or(self.final_count),
            )
            .await
            .map_err(|e| AskQuestionError::RetrievalError(e.to_string()))?;

        if references.is_empty() {
            info!("No references found, the answer will be ungrounded");
        }

        let prompt = self.template.render(question, &references);

        Ok(AskQuestionResponse {
            references,
            prompt,
            answer: None,
        })
    }

    /// Sends a prepared prompt to the model and stores its answer.
    pub async fn answer(
        &self,
        mut prepared: AskQuestionResponse,
    ) -> Result<AskQuestionResponse, AskQuestionError> {
        info!(
            "Sending prompt with {} references to {}",
            prepared.references.len(),
            self.generator.model_name()
        );

        let answer = self
            .generator
            .generate(&prepared.prompt)
            .await
            .map_err(|e| AskQuestionError::GenerationError(e.to_string()))?;

        prepared.answer = Some(answer);
        Ok(prepared)
    }

    pub async fn execute(
        &self,
        request: AskQuestionRequest,
    ) -> Result<AskQuestionResponse, AskQuestionError> {
        let prepared = self.prepare(&request).await?;

        if request.dry_run {
            return Ok(prepared);
        }

        self.answer(prepared).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use crate::domain::entities::NewChunk;
    use crate::domain::repositories::CorpusStore;
    use crate::infrastructure::memory::MemoryCorpusStore;
    use crate::test_support::{RecordingGenerator, article};

    async fn text_store() -> Arc<MemoryCorpusStore> {
        let store = Arc::new(MemoryCorpusStore::new(None));
        store
            .import_article(
                &article("Vacuum Basics", "v"),
                &[NewChunk::new(0, "Vacuum reclaims dead tuples.".to_string(), None)],
            )
            .await
            .unwrap();
        store
    }

    fn use_case(
        store: Arc<MemoryCorpusStore>,
        generator: Arc<RecordingGenerator>,
    ) -> AskQuestionUseCase {
        let retriever = Retriever::new(store, None, &RetrievalConfig::default());
        AskQuestionUseCase::new(
            Arc::new(retriever),
            PromptTemplate::default(),
            generator,
            10,
            3,
        )
    }

    #[tokio::test]
    async fn test_answer_uses_references() {
        let generator = Arc::new(RecordingGenerator::default());
        let response = use_case(text_store().await, generator.clone())
            .execute(AskQuestionRequest {
                question: "What does vacuum do?".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(response.answer.as_deref(), Some("canned answer"));
        assert_eq!(response.references.len(), 1);

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Reference 1 from Vacuum Basics"));
    }

    #[tokio::test]
    async fn test_dry_run_skips_generation() {
        let generator = Arc::new(RecordingGenerator::default());
        let response = use_case(text_store().await, generator.clone())
            .execute(AskQuestionRequest {
                question: "What does vacuum do?".to_string(),
                dry_run: true,
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(response.answer.is_none());
        assert!(response.prompt.contains("What does vacuum do?"));
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_corpus_still_answers() {
        let generator = Arc::new(RecordingGenerator::default());
        let response = use_case(Arc::new(MemoryCorpusStore::new(None)), generator)
            .execute(AskQuestionRequest {
                question: "Anything?".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(response.references.is_empty());
        assert!(response.answer.is_some());
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected() {
        let generator = Arc::new(RecordingGenerator::default());
        let result = use_case(Arc::new(MemoryCorpusStore::new(None)), generator)
            .execute(AskQuestionRequest {
                question: "   ".to_string(),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(AskQuestionError::ValidationError(_))));
    }
}
