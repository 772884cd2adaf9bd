//! Prompt context assembly.
//!
//! [`PromptContextBuilder`] keeps the ordered message list sent to the
//! completion backend. The system message always sits at index 0, and
//! guiding (exemplar) messages are flagged so they can be dropped once real
//! dialogue exists.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::errors::ConversationError;

/// Role of a message in the prompt context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Persona and output instructions.
    System,
    /// Dialogue or directives addressed to the model.
    User,
    /// Model output.
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    fn is_dialogue(&self) -> bool {
        matches!(self, MessageRole::User | MessageRole::Assistant)
    }
}

/// A role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Ordered message list with guiding-message bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptContextBuilder {
    messages: Vec<Message>,
    guiding: BTreeSet<usize>,
}

impl PromptContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a message.
    ///
    /// A system message never appends: it replaces the existing system
    /// message at index 0, or is inserted there if there is none.
    pub fn add_message(
        &mut self,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Result<(), ConversationError> {
        self.push(Message::new(role, content), false)
    }

    /// Adds an exemplar message that steers style but is not real dialogue.
    pub fn add_guiding_message(
        &mut self,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Result<(), ConversationError> {
        self.push(Message::new(role, content), true)
    }

    /// Splices another builder's messages onto the end of this one.
    ///
    /// Guiding messages from `other` are skipped when this builder already
    /// holds any user or assistant message. Only roles are compared.
    pub fn extend_from(&mut self, other: &PromptContextBuilder) -> Result<(), ConversationError> {
        let skip_guiding = self.has_dialogue();
        for (index, message) in other.messages.iter().enumerate() {
            let guiding = other.is_guiding(index);
            if guiding && skip_guiding {
                continue;
            }
            self.push(message.clone(), guiding)?;
        }
        Ok(())
    }

    fn push(&mut self, message: Message, guiding: bool) -> Result<(), ConversationError> {
        if message.content.trim().is_empty() {
            return Err(ConversationError::EmptyMessage);
        }

        if message.role == MessageRole::System {
            match self.messages.first() {
                Some(first) if first.role == MessageRole::System => {
                    self.messages[0] = message;
                    if guiding {
                        self.guiding.insert(0);
                    } else {
                        self.guiding.remove(&0);
                    }
                }
                _ => {
                    self.messages.insert(0, message);
                    self.guiding = self.guiding.iter().map(|i| i + 1).collect();
                    if guiding {
                        self.guiding.insert(0);
                    }
                }
            }
            return Ok(());
        }

        self.messages.push(message);
        if guiding {
            self.guiding.insert(self.messages.len() - 1);
        }
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Whether the message at `index` is a guiding exemplar.
    pub fn is_guiding(&self, index: usize) -> bool {
        self.guiding.contains(&index)
    }

    /// Whether any user or assistant message is present.
    pub fn has_dialogue(&self) -> bool {
        self.messages.iter().any(|m| m.role.is_dialogue())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_system_message_replaces_index_zero() {
        let mut builder = PromptContextBuilder::new();
        builder.add_message(MessageRole::System, "persona A").unwrap();
        builder.add_message(MessageRole::User, "hello").unwrap();
        builder.add_message(MessageRole::System, "persona B").unwrap();

        assert_eq!(builder.len(), 2);
        assert_eq!(builder.messages()[0], Message::system("persona B"));
        assert_eq!(builder.messages()[1], Message::user("hello"));
    }

    #[test]
    fn repeated_system_updates_keep_count_stable() {
        let mut builder = PromptContextBuilder::new();
        builder.add_message(MessageRole::System, "v0").unwrap();
        builder.add_message(MessageRole::User, "u").unwrap();
        let before = builder.len();
        for i in 1..5 {
            builder
                .add_message(MessageRole::System, format!("v{}", i))
                .unwrap();
            assert_eq!(builder.len(), before);
        }
        assert_eq!(builder.messages()[0].content, "v4");
    }

    #[test]
    fn system_message_added_late_goes_first() {
        let mut builder = PromptContextBuilder::new();
        builder
            .add_guiding_message(MessageRole::User, "example")
            .unwrap();
        builder.add_message(MessageRole::System, "persona").unwrap();

        assert_eq!(builder.messages()[0].role, MessageRole::System);
        assert!(!builder.is_guiding(0));
        assert!(builder.is_guiding(1));
    }

    #[test]
    fn empty_content_is_rejected() {
        let mut builder = PromptContextBuilder::new();
        assert_eq!(
            builder.add_message(MessageRole::User, "   "),
            Err(ConversationError::EmptyMessage)
        );
    }

    #[test]
    fn guiding_messages_are_copied_into_fresh_context() {
        let mut destination = PromptContextBuilder::new();
        destination.add_message(MessageRole::System, "persona").unwrap();

        let mut examples = PromptContextBuilder::new();
        examples
            .add_guiding_message(MessageRole::User, "Start.")
            .unwrap();
        examples
            .add_guiding_message(MessageRole::Assistant, "<function=x>{}</function>")
            .unwrap();

        destination.extend_from(&examples).unwrap();
        assert_eq!(destination.len(), 3);
        assert!(destination.is_guiding(1));
        assert!(destination.is_guiding(2));
    }

    #[test]
    fn guiding_messages_are_dropped_once_dialogue_exists() {
        let mut session_a = PromptContextBuilder::new();
        session_a.add_message(MessageRole::User, "User message 1").unwrap();

        let mut session_b = PromptContextBuilder::new();
        session_b
            .add_guiding_message(MessageRole::User, "Guiding user")
            .unwrap();
        session_b
            .add_guiding_message(MessageRole::Assistant, "Guiding assistant")
            .unwrap();
        session_b.add_message(MessageRole::User, "User message 2").unwrap();

        session_a.extend_from(&session_b).unwrap();

        let contents: Vec<_> = session_a
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["User message 1", "User message 2"]);
        assert!(!session_a.is_guiding(1));
    }

    #[test]
    fn guiding_dedup_only_looks_at_roles() {
        // A guiding user message in the destination already counts as dialogue.
        let mut destination = PromptContextBuilder::new();
        destination
            .add_guiding_message(MessageRole::User, "Example A")
            .unwrap();

        let mut other = PromptContextBuilder::new();
        other
            .add_guiding_message(MessageRole::Assistant, "Example B")
            .unwrap();

        destination.extend_from(&other).unwrap();
        assert_eq!(destination.len(), 1);
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}
