//! Tunables shared by the dialogue handlers.

/// Sampling and bounding parameters for one conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueSettings {
    /// Model used for speech, summaries and narration.
    pub model: String,
    /// Model used to choose the next speaker.
    pub speaker_choice_model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub summary_temperature: f32,
    /// Human input that ends the conversation, compared case-insensitively.
    pub termination_keyword: String,
    /// Structural retry bound for every typed completion.
    pub max_structured_attempts: u32,
    /// Character budget of transcript excerpts in prompts.
    pub transcript_excerpt_chars: usize,
}

impl Default for DialogueSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            speaker_choice_model: "gpt-4o-mini".to_string(),
            temperature: 1.0,
            top_p: 1.0,
            summary_temperature: 0.2,
            termination_keyword: "goodbye".to_string(),
            max_structured_attempts: 3,
            transcript_excerpt_chars: 6000,
        }
    }
}

impl DialogueSettings {
    /// Whether `input` asks to end the conversation.
    pub fn is_termination(&self, input: &str) -> bool {
        input.trim().eq_ignore_ascii_case(self.termination_keyword.trim())
    }
}
