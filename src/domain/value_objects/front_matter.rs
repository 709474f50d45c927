use std::collections::BTreeMap;

use serde_yaml::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum FrontMatterError {
    MissingFrontMatter,
    UnterminatedFrontMatter,
    InvalidYaml(String),
    MissingField(String),
    InvalidDate(String),
}

impl std::fmt::Display for FrontMatterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrontMatterError::MissingFrontMatter => {
                write!(f, "Parse error: document does not start with a '---' front matter block")
            }
            FrontMatterError::UnterminatedFrontMatter => {
                write!(f, "Parse error: front matter block is missing its closing '---'")
            }
            FrontMatterError::InvalidYaml(msg) => write!(f, "Parse error: invalid front matter: {}", msg),
            FrontMatterError::MissingField(key) => {
                write!(f, "Parse error: front matter is missing required key '{}'", key)
            }
            FrontMatterError::InvalidDate(value) => {
                write!(f, "Parse error: unrecognised date '{}'", value)
            }
        }
    }
}

impl std::error::Error for FrontMatterError {}

/// Flat key/value view of a YAML front matter block.
///
/// Nested values are flattened to strings: sequences are joined with `", "`,
/// mappings are re-serialised as YAML. Null values are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    fields: BTreeMap<String, String>,
}

impl FrontMatter {
    pub fn parse(header: &str) -> Result<Self, FrontMatterError> {
        if header.trim().is_empty() {
            return Ok(Self::default());
        }

        let value: Value = serde_yaml::from_str(header)
            .map_err(|e| FrontMatterError::InvalidYaml(e.to_string()))?;

        let mapping = match value {
            Value::Mapping(mapping) => mapping,
            Value::Null => return Ok(Self::default()),
            _ => {
                return Err(FrontMatterError::InvalidYaml(
                    "front matter must be a key/value mapping".to_string(),
                ));
            }
        };

        let mut fields = BTreeMap::new();
        for (key, value) in mapping {
            let (Some(key), Some(value)) = (scalar_to_string(&key), flatten(&value)) else {
                continue;
            };
            fields.insert(key, value);
        }

        Ok(Self { fields })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|v| v.as_str())
    }

    pub fn require(&self, key: &str) -> Result<&str, FrontMatterError> {
        self.get(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| FrontMatterError::MissingField(key.to_string()))
    }

    /// Every field except the named ones.
    pub fn extra_fields(&self, exclude: &[&str]) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .filter(|(k, _)| !exclude.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn flatten(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Sequence(items) => Some(
            items
                .iter()
                .filter_map(flatten)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Mapping(_) => serde_yaml::to_string(value)
            .ok()
            .map(|s| s.trim_end().to_string()),
        Value::Tagged(tagged) => flatten(&tagged.value),
        scalar => scalar_to_string(scalar),
    }
}

/// A Markdown file split into its front matter and body.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownDocument {
    front_matter: FrontMatter,
    body: String,
}

impl MarkdownDocument {
    /// Only the first pair of `---` lines delimits the header; the opening one
    /// must be the first non-blank line. Later `---` lines stay in the body.
    pub fn parse(source: &str) -> Result<Self, FrontMatterError> {
        let mut lines = source.split_inclusive('\n');

        loop {
            match lines.next() {
                Some(line) if line.trim().is_empty() => continue,
                Some(line) if line.trim() == "---" => break,
                _ => return Err(FrontMatterError::MissingFrontMatter),
            }
        }

        let mut header = String::new();
        let mut closed = false;
        for line in lines.by_ref() {
            if line.trim() == "---" {
                closed = true;
                break;
            }
            header.push_str(line);
        }

        if !closed {
            return Err(FrontMatterError::UnterminatedFrontMatter);
        }

        let body: String = lines.collect();

        Ok(Self {
            front_matter: FrontMatter::parse(&header)?,
            body,
        })
    }

    pub fn front_matter(&self) -> &FrontMatter {
        &self.front_matter
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = "---\n\
title: \"Postgres Partitioning\"\n\
author: Jane Doe\n\
date: 2024-03-05\n\
tags:\n  - postgres\n  - partitioning\n\
draft: false\n\
---\n\
First paragraph.\n\
\n\
---\n\
\n\
After a horizontal rule.\n";

    #[test]
    fn test_parse_document() {
        let doc = MarkdownDocument::parse(ARTICLE).unwrap();
        let fm = doc.front_matter();

        assert_eq!(fm.get("title"), Some("Postgres Partitioning"));
        assert_eq!(fm.get("author"), Some("Jane Doe"));
        assert_eq!(fm.get("date"), Some("2024-03-05"));
        assert_eq!(fm.get("tags"), Some("postgres, partitioning"));
        assert_eq!(fm.get("draft"), Some("false"));
        assert_eq!(
            doc.body(),
            "First paragraph.\n\n---\n\nAfter a horizontal rule.\n"
        );
    }

    #[test]
    fn test_extra_fields_pass_through() {
        let doc = MarkdownDocument::parse(ARTICLE).unwrap();
        let extra = doc.front_matter().extra_fields(&["title", "author", "date"]);

        assert_eq!(extra.len(), 2);
        assert_eq!(extra.get("draft").map(String::as_str), Some("false"));
    }

    #[test]
    fn test_missing_front_matter() {
        let result = MarkdownDocument::parse("# Just a heading\n\nBody.");
        assert_eq!(result, Err(FrontMatterError::MissingFrontMatter));
    }

    #[test]
    fn test_unterminated_front_matter() {
        let result = MarkdownDocument::parse("---\ntitle: x\nBody without a close");
        assert_eq!(result, Err(FrontMatterError::UnterminatedFrontMatter));
    }

    #[test]
    fn test_invalid_yaml() {
        let result = MarkdownDocument::parse("---\ntitle: [unclosed\n---\nBody");
        assert!(matches!(result, Err(FrontMatterError::InvalidYaml(_))));
    }

    #[test]
    fn test_require() {
        let fm = FrontMatter::parse("title: x\nauthor: \"  \"\n").unwrap();

        assert_eq!(fm.require("title"), Ok("x"));
        assert_eq!(
            fm.require("author"),
            Err(FrontMatterError::MissingField("author".to_string()))
        );
        assert_eq!(
            fm.require("date"),
            Err(FrontMatterError::MissingField("date".to_string()))
        );
    }
}
