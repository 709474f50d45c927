use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use url::Url;

#[derive(Debug)]
pub enum ConfigError {
    Missing(String),
    Invalid { key: String, message: String },
    Incompatible(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "Configuration error: {} not set", key),
            ConfigError::Invalid { key, message } => {
                write!(f, "Configuration error: invalid {}: {}", key, message)
            }
            ConfigError::Incompatible(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Which storage layout the corpus uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusVariant {
    /// Every chunk carries an embedding; Stage 1 is a vector search.
    Vector,
    /// Chunks are stored as text only; Stage 1 is a full-text search.
    FullText,
}

impl FromStr for CorpusVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vector" => Ok(CorpusVariant::Vector),
            "fulltext" | "full-text" | "text" => Ok(CorpusVariant::FullText),
            other => Err(format!("unknown variant '{}', use vector or fulltext", other)),
        }
    }
}

/// Where the Stage-2 popularity re-rank happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingMode {
    Application,
    Native,
}

impl FromStr for RankingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "application" | "app" => Ok(RankingMode::Application),
            "native" | "database" => Ok(RankingMode::Native),
            other => Err(format!(
                "unknown ranking mode '{}', use application or native",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    L2,
    Cosine,
}

impl DistanceMetric {
    /// pgvector operator for this metric.
    pub fn operator(&self) -> &'static str {
        match self {
            DistanceMetric::L2 => "<->",
            DistanceMetric::Cosine => "<=>",
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l2" | "euclidean" => Ok(DistanceMetric::L2),
            "cosine" => Ok(DistanceMetric::Cosine),
            other => Err(format!("unknown distance metric '{}', use l2 or cosine", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone)]
pub struct SplitterConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub separators: Vec<String>,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 20,
            // Coarsest first; code fences last since code blocks can run long.
            separators: ["\n\n", "\n", " ", ".", "```"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl SplitterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid {
                key: "CHUNK_SIZE".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::Invalid {
                key: "CHUNK_OVERLAP".to_string(),
                message: format!(
                    "overlap {} must be smaller than chunk size {}",
                    self.chunk_overlap, self.chunk_size
                ),
            });
        }

        if self.separators.iter().any(|s| s.is_empty()) {
            return Err(ConfigError::Invalid {
                key: "separators".to_string(),
                message: "separators must not be empty strings".to_string(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingsClientConfig {
    pub service_url: String,
    pub model_name: String,
    pub dimension: usize,
    pub batch_size: usize,
    pub max_retries: u32,
    pub timeout_secs: u64,
    pub backoff_factor: f64,
}

impl Default for EmbeddingsClientConfig {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:8080/embed".to_string(),
            model_name: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            batch_size: 10,
            max_retries: 3,
            timeout_secs: 30,
            backoff_factor: 1.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub variant: CorpusVariant,
    pub ranking: RankingMode,
    pub metric: DistanceMetric,
    pub overfetch: usize,
    pub final_count: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            variant: CorpusVariant::Vector,
            ranking: RankingMode::Application,
            metric: DistanceMetric::L2,
            overfetch: 10,
            final_count: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionClientConfig {
    pub service_url: String,
    pub model: String,
    pub temperature: f32,
    pub context_size: u32,
    pub timeout_secs: u64,
}

impl Default for CompletionClientConfig {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:11434/api/generate".to_string(),
            model: "llama3".to_string(),
            temperature: 0.3,
            context_size: 2048,
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub splitter: SplitterConfig,
    pub embeddings: EmbeddingsClientConfig,
    pub retrieval: RetrievalConfig,
    pub completion: CompletionClientConfig,
    pub corpus_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = DatabaseConfig {
            url: lookup("DATABASE_URL")
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::Missing("DATABASE_URL".to_string()))?,
            pool_size: parse_or(&lookup, "DB_POOL_SIZE", 2)?,
        };

        let splitter_defaults = SplitterConfig::default();
        let splitter = SplitterConfig {
            chunk_size: parse_or(&lookup, "CHUNK_SIZE", splitter_defaults.chunk_size)?,
            chunk_overlap: parse_or(&lookup, "CHUNK_OVERLAP", splitter_defaults.chunk_overlap)?,
            separators: splitter_defaults.separators,
        };
        splitter.validate()?;

        let embedding_defaults = EmbeddingsClientConfig::default();
        let embeddings = EmbeddingsClientConfig {
            service_url: url_or(
                &lookup,
                "EMBEDDINGS_SERVICE_URL",
                embedding_defaults.service_url,
            )?,
            model_name: lookup("EMBEDDING_MODEL").unwrap_or(embedding_defaults.model_name),
            dimension: parse_or(&lookup, "EMBEDDING_DIMENSION", embedding_defaults.dimension)?,
            batch_size: parse_or(&lookup, "EMBEDDING_BATCH_SIZE", embedding_defaults.batch_size)?,
            max_retries: parse_or(
                &lookup,
                "EMBEDDINGS_MAX_RETRIES",
                embedding_defaults.max_retries,
            )?,
            timeout_secs: parse_or(
                &lookup,
                "EMBEDDINGS_TIMEOUT_SECS",
                embedding_defaults.timeout_secs,
            )?,
            backoff_factor: embedding_defaults.backoff_factor,
        };

        if embeddings.dimension == 0 || embeddings.batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "EMBEDDING_DIMENSION/EMBEDDING_BATCH_SIZE".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        let retrieval_defaults = RetrievalConfig::default();
        let retrieval = RetrievalConfig {
            variant: parse_or(&lookup, "RAG_VARIANT", retrieval_defaults.variant)?,
            ranking: parse_or(&lookup, "RAG_RANKING", retrieval_defaults.ranking)?,
            metric: parse_or(&lookup, "RAG_DISTANCE", retrieval_defaults.metric)?,
            overfetch: parse_or(&lookup, "RAG_OVERFETCH", retrieval_defaults.overfetch)?,
            final_count: parse_or(&lookup, "RAG_FINAL_COUNT", retrieval_defaults.final_count)?,
        };

        let completion_defaults = CompletionClientConfig::default();
        let completion = CompletionClientConfig {
            service_url: url_or(&lookup, "LLM_SERVICE_URL", completion_defaults.service_url)?,
            model: lookup("LLM_MODEL").unwrap_or(completion_defaults.model),
            temperature: parse_or(&lookup, "LLM_TEMPERATURE", completion_defaults.temperature)?,
            context_size: parse_or(&lookup, "LLM_CONTEXT_SIZE", completion_defaults.context_size)?,
            timeout_secs: parse_or(&lookup, "LLM_TIMEOUT_SECS", completion_defaults.timeout_secs)?,
        };

        let corpus_dir = PathBuf::from(lookup("CORPUS_DIR").unwrap_or_else(|| "./corpus".to_string()));

        Ok(Self {
            database,
            splitter,
            embeddings,
            retrieval,
            completion,
            corpus_dir,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                key: key.to_string(),
                message: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}

fn url_or<F>(lookup: &F, key: &str, default: String) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or(default);

    Url::parse(&raw).map_err(|e| ConfigError::Invalid {
        key: key.to_string(),
        message: e.to_string(),
    })?;

    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[(
            "DATABASE_URL",
            "postgres://localhost/rag",
        )]))
        .unwrap();

        assert_eq!(config.splitter.chunk_size, 500);
        assert_eq!(config.splitter.chunk_overlap, 20);
        assert_eq!(config.embeddings.dimension, 384);
        assert_eq!(config.retrieval.overfetch, 10);
        assert_eq!(config.retrieval.final_count, 3);
        assert_eq!(config.retrieval.variant, CorpusVariant::Vector);
        assert_eq!(config.retrieval.ranking, RankingMode::Application);
        assert_eq!(config.retrieval.metric, DistanceMetric::L2);
        assert_eq!(config.corpus_dir, PathBuf::from("./corpus"));
    }

    #[test]
    fn test_missing_database_url() {
        let result = AppConfig::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(ConfigError::Missing(key)) if key == "DATABASE_URL"));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/rag"),
            ("RAG_VARIANT", "fulltext"),
            ("RAG_RANKING", "native"),
            ("RAG_DISTANCE", "cosine"),
            ("CHUNK_SIZE", "200"),
            ("RAG_FINAL_COUNT", "5"),
        ]))
        .unwrap();

        assert_eq!(config.retrieval.variant, CorpusVariant::FullText);
        assert_eq!(config.retrieval.ranking, RankingMode::Native);
        assert_eq!(config.retrieval.metric, DistanceMetric::Cosine);
        assert_eq!(config.splitter.chunk_size, 200);
        assert_eq!(config.retrieval.final_count, 5);
    }

    #[test]
    fn test_invalid_values() {
        let bad_number = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/rag"),
            ("CHUNK_SIZE", "lots"),
        ]));
        assert!(matches!(bad_number, Err(ConfigError::Invalid { key, .. }) if key == "CHUNK_SIZE"));

        let bad_overlap = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/rag"),
            ("CHUNK_SIZE", "20"),
            ("CHUNK_OVERLAP", "20"),
        ]));
        assert!(matches!(bad_overlap, Err(ConfigError::Invalid { key, .. }) if key == "CHUNK_OVERLAP"));

        let bad_url = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/rag"),
            ("LLM_SERVICE_URL", "not a url"),
        ]));
        assert!(matches!(bad_url, Err(ConfigError::Invalid { key, .. }) if key == "LLM_SERVICE_URL"));
    }
}
