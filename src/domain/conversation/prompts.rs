//! Per-turn prompt assembly.
//!
//! Every builder here starts with a system preamble at index 0 and ends with
//! an actionable user directive, so the backend is never left without a
//! final turn to answer.

use super::context::{MessageRole, PromptContextBuilder};
use super::errors::ConversationError;
use super::participant::{Participant, ParticipantRegistry};
use super::tools::{
    ambient_narration_definition, narrative_beat_definition, speaker_choice_definition,
    speech_definition, summary_definition, tool_instructions, ParsedCall, ToolDefinition,
};
use super::transcript::Transcript;
use crate::domain::foundation::ParticipantId;

/// Name used in examples when the speaker has nobody to address.
const PLACEHOLDER_NAME: &str = "[CHARACTER]";

/// Final instruction of a speech-turn prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechDirective {
    /// The human stayed silent this turn.
    HumanSilent,
    /// The human's line is already the latest transcript line.
    HumanSpoke,
}

impl SpeechDirective {
    pub fn for_input(human_spoke: bool) -> Self {
        if human_spoke {
            Self::HumanSpoke
        } else {
            Self::HumanSilent
        }
    }

    pub fn render(self, speaker_name: &str) -> String {
        match self {
            Self::HumanSilent => format!("Produce {}'s speech.", speaker_name),
            Self::HumanSpoke => format!("Next, write {}'s speech.", speaker_name),
        }
    }
}

/// Everything a speech-turn prompt is built from.
#[derive(Debug, Clone, Copy)]
pub struct SpeechPrompt<'a> {
    pub speaker: &'a Participant,
    pub registry: &'a ParticipantRegistry,
    pub transcript: &'a Transcript,
    pub memories: &'a str,
    pub place: Option<&'a str>,
    pub purpose: Option<&'a str>,
    pub directive: SpeechDirective,
    pub excerpt_chars: usize,
}

/// Builds the messages for one character's speech.
///
/// Order: persona preamble, guiding examples, live transcript lines (one
/// user message each), directive.
pub fn speech_turn_context(
    prompt: &SpeechPrompt<'_>,
) -> Result<PromptContextBuilder, ConversationError> {
    let mut context = PromptContextBuilder::new();
    context.add_message(MessageRole::System, persona_preamble(prompt))?;
    context.extend_from(&speech_examples(prompt.speaker, prompt.registry)?)?;

    for line in prompt.transcript.recent_lines(prompt.excerpt_chars) {
        if !line.trim().is_empty() {
            context.add_message(MessageRole::User, line.as_str())?;
        }
    }

    context.add_message(
        MessageRole::User,
        prompt.directive.render(prompt.speaker.name()),
    )?;
    Ok(context)
}

fn persona_preamble(prompt: &SpeechPrompt<'_>) -> String {
    let speaker = prompt.speaker;
    let mut text = format!(
        "You are playing {name} in an ongoing dialogue. Stay in character and write only {name}'s words and gestures.\n\n\
         Description: {description}\n\
         Personality: {personality}\n\
         Equipment: {equipment}\n\n\
         Participants in this dialogue:\n{roster}",
        name = speaker.name(),
        description = speaker.description(),
        personality = speaker.personality(),
        equipment = speaker.equipment(),
        roster = roster_listing(prompt.registry.iter(), false),
    );

    if let Some(place) = prompt.place.filter(|p| !p.trim().is_empty()) {
        text.push_str(&format!("\n\nThe dialogue takes place here: {}", place.trim()));
    }
    if let Some(purpose) = prompt.purpose.filter(|p| !p.trim().is_empty()) {
        text.push_str(&format!("\n\nPurpose of the dialogue: {}", purpose.trim()));
    }
    if !prompt.memories.trim().is_empty() {
        text.push_str(&format!(
            "\n\n{}'s memories:\n{}",
            speaker.name(),
            prompt.memories.trim()
        ));
    }

    text.push_str("\n\n");
    text.push_str(&tool_instructions(&speech_definition()));
    text
}

fn speech_examples(
    speaker: &Participant,
    registry: &ParticipantRegistry,
) -> Result<PromptContextBuilder, ConversationError> {
    let other = registry
        .iter()
        .find(|p| p.id() != speaker.id())
        .map(Participant::name)
        .unwrap_or(PLACEHOLDER_NAME);
    let name = speaker.name();
    let narration = format!("{} stares at {}.", name, other);

    let mut examples = PromptContextBuilder::new();
    examples.add_guiding_message(
        MessageRole::User,
        format!("Here's an example: {}: What's up?", other),
    )?;
    examples.add_guiding_message(
        MessageRole::Assistant,
        example_call(
            &speech_definition(),
            &[
                ("name", name),
                ("speech", "What's up with you?"),
                ("narration_text", &narration),
            ],
        ),
    )?;
    examples.add_guiding_message(
        MessageRole::User,
        format!("Here's a second example: {}: Hello.", other),
    )?;
    examples.add_guiding_message(
        MessageRole::Assistant,
        example_call(
            &speech_definition(),
            &[("name", name), ("speech", "Hey."), ("narration_text", &narration)],
        ),
    )?;
    Ok(examples)
}

fn example_call(definition: &ToolDefinition, fields: &[(&str, &str)]) -> String {
    let arguments = fields
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect();
    ParsedCall::new(definition.name(), arguments).to_wire()
}

fn roster_listing<'a>(
    participants: impl Iterator<Item = &'a Participant>,
    with_personality: bool,
) -> String {
    participants
        .map(|p| {
            if with_personality {
                format!(
                    "Identifier: {} / Name: {} / Personality: {}",
                    p.id(),
                    p.name(),
                    p.personality()
                )
            } else {
                format!("Identifier: {} / Name: {}", p.id(), p.name())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the messages asking the backend who speaks next.
///
/// The human is listed among the participants but excluded from the
/// allowed choices.
pub fn speaker_choice_context(
    registry: &ParticipantRegistry,
    human: &ParticipantId,
    transcript: &Transcript,
    excerpt_chars: usize,
) -> Result<PromptContextBuilder, ConversationError> {
    let allowed: Vec<&Participant> = registry.others(human).collect();
    let (first, last) = match (allowed.first(), allowed.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => {
            return Err(ConversationError::NotEnoughParticipants {
                count: registry.len(),
            })
        }
    };

    let dialogue = transcript.excerpt(excerpt_chars);
    let system = format!(
        "You decide who speaks next in an ongoing dialogue, so that the conversation flows naturally.\n\n\
         Everyone present:\n{all}\n\n\
         Allowed choices:\n{allowed}\n\n\
         Dialogue so far:\n{dialogue}\n\n{tool}",
        all = roster_listing(registry.iter(), false),
        allowed = roster_listing(allowed.iter().copied(), true),
        dialogue = if dialogue.is_empty() { "(nothing has been said yet)" } else { dialogue.as_str() },
        tool = tool_instructions(&speaker_choice_definition()),
    );

    let mut context = PromptContextBuilder::new();
    context.add_message(MessageRole::System, system)?;
    for (lead, example) in [("Here's an example", last), ("Here's another example", first)] {
        context.add_guiding_message(
            MessageRole::User,
            format!("{}: Choose who will speak next in this dialogue.", lead),
        )?;
        context.add_guiding_message(
            MessageRole::Assistant,
            example_call(
                &speaker_choice_definition(),
                &[
                    ("identifier", example.id().as_str()),
                    ("name", example.name()),
                    ("reason", "They have the most to say right now."),
                ],
            ),
        )?;
    }

    let human_label = registry
        .get(human)
        .map(|p| format!("{} (identifier {})", p.name(), p.id()))
        .unwrap_or_else(|| format!("identifier {}", human));
    context.add_message(
        MessageRole::User,
        format!(
            "Choose who will speak next in this dialogue. Choose only among the allowed participants. Never choose {}.",
            human_label
        ),
    )?;
    Ok(context)
}

/// Builds the messages asking for a neutral summary of the whole dialogue.
pub fn summary_context(
    registry: &ParticipantRegistry,
    transcript: &Transcript,
) -> Result<PromptContextBuilder, ConversationError> {
    let mut context = PromptContextBuilder::new();
    context.add_message(
        MessageRole::System,
        format!(
            "You summarize dialogues for the memory of the people who took part.\n\n\
             Participants:\n{}\n\n{}",
            roster_listing(registry.iter(), false),
            tool_instructions(&summary_definition())
        ),
    )?;
    context.add_message(MessageRole::User, transcript.render().trim_end())?;
    context.add_message(
        MessageRole::User,
        "Summarize the dialogue above, mentioning who said what and what was decided.",
    )?;
    Ok(context)
}

/// Kind of narration that is not spoken by any participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationKind {
    Ambient,
    NarrativeBeat,
}

impl NarrationKind {
    pub fn definition(self) -> ToolDefinition {
        match self {
            Self::Ambient => ambient_narration_definition(),
            Self::NarrativeBeat => narrative_beat_definition(),
        }
    }

    fn directive(self) -> &'static str {
        match self {
            Self::Ambient => {
                "Describe the surroundings of the dialogue as they are right now. Do not write anyone's speech."
            }
            Self::NarrativeBeat => {
                "Write what happens next in the scene, moving the story forward. Do not write anyone's speech."
            }
        }
    }
}

/// Builds the messages for an ambient narration or a narrative beat.
pub fn narration_context(
    kind: NarrationKind,
    registry: &ParticipantRegistry,
    transcript: &Transcript,
    place: Option<&str>,
    purpose: Option<&str>,
    excerpt_chars: usize,
) -> Result<PromptContextBuilder, ConversationError> {
    let mut system = format!(
        "You are the narrator of an interactive story.\n\nParticipants:\n{}",
        roster_listing(registry.iter(), false)
    );
    if let Some(place) = place.filter(|p| !p.trim().is_empty()) {
        system.push_str(&format!("\n\nLocation: {}", place.trim()));
    }
    if let Some(purpose) = purpose.filter(|p| !p.trim().is_empty()) {
        system.push_str(&format!("\n\nPurpose of the dialogue: {}", purpose.trim()));
    }
    system.push_str("\n\n");
    system.push_str(&tool_instructions(&kind.definition()));

    let mut context = PromptContextBuilder::new();
    context.add_message(MessageRole::System, system)?;
    let dialogue = transcript.excerpt(excerpt_chars);
    if !dialogue.is_empty() {
        context.add_message(MessageRole::User, dialogue)?;
    }
    context.add_message(MessageRole::User, kind.directive())?;
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ParticipantRegistry {
        let mut registry = ParticipantRegistry::new();
        registry
            .add_participant("1", "P1", "The traveller", "Curious", "A map", None)
            .unwrap();
        registry
            .add_participant("2", "P2", "A tall guard", "Stern", "A spear", Some("deep"))
            .unwrap();
        registry
            .add_participant("3", "P3", "A merchant", "Greedy", "Scales", Some("nasal"))
            .unwrap();
        registry
    }

    fn id(raw: &str) -> ParticipantId {
        ParticipantId::new(raw).unwrap()
    }

    fn speech_prompt<'a>(
        registry: &'a ParticipantRegistry,
        transcript: &'a Transcript,
        directive: SpeechDirective,
    ) -> SpeechPrompt<'a> {
        SpeechPrompt {
            speaker: registry.get(&id("2")).unwrap(),
            registry,
            transcript,
            memories: "Met P1 at the gate.",
            place: Some("A dusty crossroads"),
            purpose: None,
            directive,
            excerpt_chars: 6000,
        }
    }

    #[test]
    fn directive_depends_on_human_input() {
        assert_eq!(SpeechDirective::for_input(false).render("P2"), "Produce P2's speech.");
        assert_eq!(SpeechDirective::for_input(true).render("P2"), "Next, write P2's speech.");
    }

    #[test]
    fn empty_transcript_keeps_guiding_examples() {
        let registry = registry();
        let transcript = Transcript::new();
        let context =
            speech_turn_context(&speech_prompt(&registry, &transcript, SpeechDirective::HumanSilent))
                .unwrap();

        let messages = context.messages();
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(context.is_guiding(1) && context.is_guiding(4));
        assert!(messages[2].content.contains("<function=generate_speech>"));
        assert_eq!(messages[5].content, "Produce P2's speech.");
    }

    #[test]
    fn guiding_examples_precede_live_transcript() {
        let registry = registry();
        let mut transcript = Transcript::new();
        transcript.append_turn("P1", "Hi");
        let context =
            speech_turn_context(&speech_prompt(&registry, &transcript, SpeechDirective::HumanSpoke))
                .unwrap();

        let contents: Vec<&str> = context.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents.len(), 7);
        assert!((1..=4).all(|i| context.is_guiding(i)));
        assert!(contents[2].contains("<function=generate_speech>"));
        assert!(!context.is_guiding(5));
        assert_eq!(contents[5], "P1: Hi");
        assert_eq!(contents[6], "Next, write P2's speech.");
    }

    #[test]
    fn examples_spliced_after_dialogue_are_dropped() {
        let registry = registry();
        let mut context = PromptContextBuilder::new();
        context.add_message(MessageRole::System, "preamble").unwrap();
        context.add_message(MessageRole::User, "P1: Hi").unwrap();

        context
            .extend_from(&speech_examples(registry.get(&id("2")).unwrap(), &registry).unwrap())
            .unwrap();

        assert_eq!(context.len(), 2);
    }

    #[test]
    fn preamble_carries_persona_memories_and_place() {
        let registry = registry();
        let transcript = Transcript::new();
        let context =
            speech_turn_context(&speech_prompt(&registry, &transcript, SpeechDirective::HumanSilent))
                .unwrap();
        let system = &context.messages()[0].content;
        assert!(system.contains("You are playing P2"));
        assert!(system.contains("Met P1 at the gate."));
        assert!(system.contains("A dusty crossroads"));
        assert!(system.contains("Identifier: 3 / Name: P3"));
    }

    #[test]
    fn speaker_choice_excludes_human_from_allowed_choices() {
        let registry = registry();
        let context = speaker_choice_context(&registry, &id("1"), &Transcript::new(), 6000).unwrap();
        let system = &context.messages()[0].content;
        let allowed = system
            .split("Allowed choices:")
            .nth(1)
            .and_then(|rest| rest.split("Dialogue so far:").next())
            .unwrap();
        assert!(!allowed.contains("Name: P1"));
        assert!(allowed.contains("Name: P2") && allowed.contains("Name: P3"));

        let last = context.messages().last().unwrap();
        assert!(last.content.contains("Never choose P1 (identifier 1)"));
    }

    #[test]
    fn speaker_choice_needs_someone_to_choose() {
        let mut registry = ParticipantRegistry::new();
        registry
            .add_participant("1", "P1", "The traveller", "Curious", "A map", None)
            .unwrap();
        let err = speaker_choice_context(&registry, &id("1"), &Transcript::new(), 100).unwrap_err();
        assert!(matches!(err, ConversationError::NotEnoughParticipants { count: 1 }));
    }

    #[test]
    fn summary_context_ends_with_instruction() {
        let mut transcript = Transcript::new();
        transcript.append_turn("P1", "Hi");
        let context = summary_context(&registry(), &transcript).unwrap();
        let messages = context.messages();
        assert!(messages[0].content.contains("summarize_dialogue"));
        assert_eq!(messages[1].content, "P1: Hi");
        assert!(messages[2].content.starts_with("Summarize the dialogue"));
    }

    #[test]
    fn summary_context_keeps_the_opening_of_long_dialogues() {
        let mut transcript = Transcript::new();
        transcript.append_turn("P1", "We meet at the old mill.");
        for _ in 0..200 {
            transcript.append_turn("P2", &"blah ".repeat(20));
        }
        assert!(transcript.render().len() > 6000);

        let context = summary_context(&registry(), &transcript).unwrap();

        let dialogue = &context.messages()[1].content;
        assert!(dialogue.starts_with("P1: We meet at the old mill."));
        assert_eq!(dialogue.lines().count(), 201);
    }

    #[test]
    fn narration_context_uses_requested_call() {
        let context = narration_context(
            NarrationKind::NarrativeBeat,
            &registry(),
            &Transcript::new(),
            Some("A tavern"),
            Some("Plan the heist"),
            6000,
        )
        .unwrap();
        let system = &context.messages()[0].content;
        assert!(system.contains("generate_narrative_beat"));
        assert!(system.contains("Plan the heist"));
        assert_eq!(context.len(), 2);
    }
}
