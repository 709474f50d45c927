use crate::config::{ConfigError, SplitterConfig};

/// A chunk together with the byte range of the source it was cut from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

pub trait TextSplitter: Send + Sync {
    fn split_spans(&self, content: &str) -> Vec<TextSpan>;

    fn split(&self, content: &str) -> Vec<String> {
        self.split_spans(content)
            .into_iter()
            .map(|span| span.text)
            .collect()
    }
}

/// Recursive, prioritised-delimiter splitter with a sliding character overlap.
///
/// The content is first cut into atoms no longer than `chunk_size`: a segment
/// that is too long is split on the first separator (in priority order) it
/// contains, each separator staying attached to the start of the piece that
/// follows it, and the pieces are processed recursively with the remaining
/// separators. A segment with no separator left is cut every `chunk_size`
/// characters. Atoms are then merged greedily into chunks of at most
/// `chunk_size` characters, each chunk after the first starting
/// `chunk_overlap` characters before the end of its predecessor. The overlap
/// shrinks only when the next atom would not otherwise fit.
///
/// Lengths are counted in `char`s, never bytes.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Default for RecursiveSplitter {
    fn default() -> Self {
        let config = SplitterConfig::default();
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            separators: config.separators,
        }
    }
}

impl RecursiveSplitter {
    pub fn new(config: SplitterConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            separators: config.separators,
        })
    }

    fn collect_boundaries(
        &self,
        text: &str,
        start: usize,
        end: usize,
        level: usize,
        bounds: &mut Vec<usize>,
    ) {
        let segment = &text[start..end];

        if char_len(segment) <= self.chunk_size {
            bounds.push(end);
            return;
        }

        let found = self.separators[level..]
            .iter()
            .enumerate()
            .find(|(_, separator)| segment.contains(separator.as_str()));

        let Some((offset, separator)) = found else {
            self.hard_split(text, start, end, bounds);
            return;
        };

        let next_level = level + offset + 1;
        let mut piece_start = start;

        for (position, _) in segment.match_indices(separator.as_str()) {
            let cut = start + position;
            if cut > piece_start {
                self.collect_boundaries(text, piece_start, cut, next_level, bounds);
                piece_start = cut;
            }
        }

        self.collect_boundaries(text, piece_start, end, next_level, bounds);
    }

    fn hard_split(&self, text: &str, start: usize, end: usize, bounds: &mut Vec<usize>) {
        let mut count = 0;

        for (offset, _) in text[start..end].char_indices() {
            if count == self.chunk_size {
                bounds.push(start + offset);
                count = 0;
            }
            count += 1;
        }

        bounds.push(end);
    }

    fn merge(&self, text: &str, bounds: &[usize]) -> Vec<TextSpan> {
        let mut spans = Vec::new();
        let mut start = 0;
        let mut next = 0;

        loop {
            let mut end_index = next;
            let mut length = char_len(&text[start..bounds[end_index]]);

            while end_index + 1 < bounds.len() {
                let step = char_len(&text[bounds[end_index]..bounds[end_index + 1]]);
                if length + step > self.chunk_size {
                    break;
                }
                length += step;
                end_index += 1;
            }

            let end = bounds[end_index];
            let chunk = &text[start..end];
            if !chunk.trim().is_empty() {
                spans.push(TextSpan {
                    text: chunk.to_string(),
                    start,
                    end,
                });
            }

            if end_index + 1 == bounds.len() {
                break;
            }

            next = end_index + 1;
            let next_atom = char_len(&text[end..bounds[next]]);
            let overlap = self.chunk_overlap.min(self.chunk_size - next_atom);
            start = step_back(text, end, overlap);
        }

        spans
    }
}

impl TextSplitter for RecursiveSplitter {
    fn split_spans(&self, content: &str) -> Vec<TextSpan> {
        if content.is_empty() {
            return Vec::new();
        }

        let mut bounds = Vec::new();
        self.collect_boundaries(content, 0, content.len(), 0, &mut bounds);

        self.merge(content, &bounds)
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset `chars` characters before `end`.
fn step_back(text: &str, end: usize, chars: usize) -> usize {
    if chars == 0 {
        return end;
    }

    text[..end]
        .char_indices()
        .rev()
        .nth(chars - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(chunk_size: usize, chunk_overlap: usize) -> RecursiveSplitter {
        RecursiveSplitter::new(SplitterConfig {
            chunk_size,
            chunk_overlap,
            ..SplitterConfig::default()
        })
        .unwrap()
    }

    fn sample_text() -> String {
        let words = [
            "postgres", "vacuum", "index", "tuple", "heap", "wal", "replica", "query",
            "planner", "cost",
        ];
        (0..400)
            .map(|i| words[i % words.len()])
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Rebuilds the source from overlapping spans.
    fn reconstruct(spans: &[TextSpan]) -> String {
        let mut out = String::new();
        let mut covered = 0;
        for span in spans {
            assert!(span.start <= covered, "gap before byte {}", span.start);
            let skip = covered - span.start;
            out.push_str(&span.text[skip..]);
            covered = span.end;
        }
        out
    }

    #[test]
    fn test_empty_input() {
        assert!(RecursiveSplitter::default().split("").is_empty());
    }

    #[test]
    fn test_short_text() {
        let chunks = RecursiveSplitter::default().split("Short text");
        assert_eq!(chunks, vec!["Short text".to_string()]);
    }

    #[test]
    fn test_size_bound() {
        let text = sample_text();
        let chunks = splitter(50, 10).split(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 50, "chunk too long: {:?}", chunk);
            assert!(!chunk.trim().is_empty());
        }
    }

    #[test]
    fn test_coverage() {
        let text = sample_text();
        let spans = splitter(60, 15).split_spans(&text);

        assert_eq!(spans.first().map(|s| s.start), Some(0));
        assert_eq!(spans.last().map(|s| s.end), Some(text.len()));
        assert_eq!(reconstruct(&spans), text);
    }

    #[test]
    fn test_overlap() {
        let text = sample_text();
        let spans = splitter(50, 10).split_spans(&text);

        for pair in spans.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            assert_eq!(char_len(&text[next.start..prev.end]), 10);

            let prev_tail: String = prev.text.chars().rev().take(10).collect::<Vec<_>>().into_iter().rev().collect();
            let next_head: String = next.text.chars().take(10).collect();
            assert_eq!(prev_tail, next_head);
        }
    }

    #[test]
    fn test_default_overlap_is_twenty_chars() {
        let text = sample_text();
        let spans = RecursiveSplitter::default().split_spans(&text);

        assert!(spans.len() > 1);
        for pair in spans.windows(2) {
            assert_eq!(char_len(&text[pair[1].start..pair[0].end]), 20);
        }
    }

    #[test]
    fn test_hard_split_long_token() {
        let text = "a".repeat(1200);
        let chunks = RecursiveSplitter::default().split(&text);
        let lengths: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();

        // The middle atom fills a whole chunk, leaving no room for overlap.
        assert_eq!(lengths, vec![500, 500, 220]);
    }

    #[test]
    fn test_multibyte_characters() {
        let text = "日本語のテキスト ".repeat(40) + &"é".repeat(120);
        let spans = splitter(30, 5).split_spans(&text);

        for span in &spans {
            assert!(span.text.chars().count() <= 30);
        }
        assert_eq!(reconstruct(&spans), text);
    }

    #[test]
    fn test_paragraph_breaks_take_priority() {
        let text = "First paragraph here.\n\nSecond paragraph is here.";
        let chunks = splitter(40, 5).split(text);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "First paragraph here.");
        assert_eq!(chunks[1], "here.\n\nSecond paragraph is here.");
    }

    #[test]
    fn test_code_fence_is_last_resort() {
        let text = "abcdefghij```klmnopqrst";
        let chunks = splitter(15, 0).split(text);

        assert_eq!(chunks, vec!["abcdefghij".to_string(), "```klmnopqrst".to_string()]);
    }

    #[test]
    fn test_whitespace_only_input() {
        assert!(splitter(10, 2).split("   \n\n   ").is_empty());
    }

    #[test]
    fn test_invalid_config() {
        let result = RecursiveSplitter::new(SplitterConfig {
            chunk_size: 10,
            chunk_overlap: 10,
            ..SplitterConfig::default()
        });
        assert!(result.is_err());
    }
}
