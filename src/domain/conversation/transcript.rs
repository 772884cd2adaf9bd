//! Append-only record of what has been said.

use serde::{Deserialize, Serialize};

/// Minimum number of lines (exclusive) before a transcript is worth
/// summarizing.
pub const SUFFICIENT_TRANSCRIPT_LINES: usize = 4;

/// Ordered, append-only log of rendered utterances.
///
/// Lines are either `"Speaker: text"` turns or bare narration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    lines: Vec<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a transcript from persisted lines.
    pub fn from_lines(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Appends a `"Speaker: text"` line.
    pub fn append_turn(&mut self, speaker: &str, text: &str) {
        self.lines.push(format!("{}: {}", speaker, text));
    }

    /// Appends bare narration.
    pub fn append_line(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    /// Whether enough has been said to be worth summarizing.
    pub fn is_sufficient(&self) -> bool {
        self.lines.len() > SUFFICIENT_TRANSCRIPT_LINES
    }

    /// Full text, one line per utterance, followed by a blank line.
    pub fn render(&self) -> String {
        if self.lines.is_empty() {
            return String::new();
        }
        let mut text = self.lines.join("\n");
        text.push_str("\n\n");
        text
    }

    /// The most recent lines that fit within `max_chars` characters.
    ///
    /// Whole lines are kept where possible; when even the last line is too
    /// long, its tail is returned.
    pub fn excerpt(&self, max_chars: usize) -> String {
        if max_chars == 0 {
            return String::new();
        }

        let mut kept: Vec<&str> = Vec::new();
        let mut used = 0;
        for line in self.lines.iter().rev() {
            let cost = line.chars().count() + usize::from(!kept.is_empty());
            if used + cost > max_chars {
                break;
            }
            used += cost;
            kept.push(line);
        }

        if kept.is_empty() {
            return match self.lines.last() {
                Some(last) => {
                    let skip = last.chars().count().saturating_sub(max_chars);
                    last.chars().skip(skip).collect()
                }
                None => String::new(),
            };
        }

        kept.reverse();
        kept.join("\n")
    }

    /// The longest suffix of whole lines within `max_chars`, never less
    /// than the last line.
    pub fn recent_lines(&self, max_chars: usize) -> &[String] {
        let mut used = 0;
        let mut start = self.lines.len();
        for (index, line) in self.lines.iter().enumerate().rev() {
            used += line.chars().count();
            if used > max_chars && start < self.lines.len() {
                break;
            }
            start = index;
        }
        &self.lines[start..]
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
