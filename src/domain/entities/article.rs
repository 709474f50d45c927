use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::domain::value_objects::{ContentHash, FrontMatterError, MarkdownDocument};

/// Store-assigned article identifier.
pub type ArticleId = i64;

pub const REQUIRED_FIELDS: [&str; 3] = ["author", "title", "date"];

/// An article as read from disk, before the store assigns it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    author: String,
    title: String,
    content: String,
    publish_date: DateTime<Utc>,
    content_hash: ContentHash,
    metadata: BTreeMap<String, String>,
}

impl NewArticle {
    pub fn new(
        author: String,
        title: String,
        content: String,
        publish_date: DateTime<Utc>,
        content_hash: ContentHash,
    ) -> Self {
        Self {
            author,
            title,
            content,
            publish_date,
            content_hash,
            metadata: BTreeMap::new(),
        }
    }

    /// Validates the required front matter keys and keeps the rest as metadata.
    pub fn from_markdown(source: &str) -> Result<Self, FrontMatterError> {
        let document = MarkdownDocument::parse(source)?;
        let front_matter = document.front_matter();

        let author = front_matter.require("author")?.trim().to_string();
        let title = front_matter.require("title")?.trim().to_string();
        let publish_date = parse_publish_date(front_matter.require("date")?)?;

        Ok(Self {
            author,
            title,
            content: document.body().to_string(),
            publish_date,
            content_hash: ContentHash::from_bytes(source.as_bytes()),
            metadata: front_matter.extra_fields(&REQUIRED_FIELDS),
        })
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn publish_date(&self) -> DateTime<Utc> {
        self.publish_date
    }

    pub fn content_hash(&self) -> &ContentHash {
        &self.content_hash
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn metadata_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.metadata
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }
}

/// Accepts RFC 3339 timestamps (Hugo's default), naive date-times and plain dates.
pub fn parse_publish_date(raw: &str) -> Result<DateTime<Utc>, FrontMatterError> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| FrontMatterError::InvalidDate(raw.to_string()))
}
