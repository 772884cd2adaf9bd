//! Conversation roster.
//!
//! A [`ParticipantRegistry`] holds every member of the conversation, the
//! human included, in the order they joined.

use serde::{Deserialize, Serialize};

use super::errors::ConversationError;
use crate::domain::foundation::{ParticipantId, ValidationError};

/// A conversation member and their persona attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    id: ParticipantId,
    name: String,
    description: String,
    personality: String,
    equipment: String,
    voice_profile: Option<String>,
}

impl Participant {
    /// Creates a participant, rejecting blank attributes and a name that
    /// merely repeats the description.
    pub fn new(
        id: ParticipantId,
        name: impl Into<String>,
        description: impl Into<String>,
        personality: impl Into<String>,
        equipment: impl Into<String>,
        voice_profile: Option<String>,
    ) -> Result<Self, ConversationError> {
        let name = required("name", name.into())?;
        let description = required("description", description.into())?;
        let personality = required("personality", personality.into())?;
        let equipment = required("equipment", equipment.into())?;

        if name == description {
            return Err(ConversationError::invalid_participant(format!(
                "name and description of participant {} are identical",
                id
            )));
        }

        let voice_profile = voice_profile
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Ok(Self {
            id,
            name,
            description,
            personality,
            equipment,
            voice_profile,
        })
    }

    pub fn id(&self) -> &ParticipantId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn personality(&self) -> &str {
        &self.personality
    }

    pub fn equipment(&self) -> &str {
        &self.equipment
    }

    /// Voice used by external synthesis; absent for unvoiced members.
    pub fn voice_profile(&self) -> Option<&str> {
        self.voice_profile.as_deref()
    }
}

fn required(field: &str, value: String) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::empty_field(field));
    }
    Ok(trimmed.to_string())
}

/// Ordered roster of conversation members keyed by [`ParticipantId`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantRegistry {
    members: Vec<Participant>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and adds a participant from raw attributes.
    ///
    /// # Errors
    ///
    /// `InvalidParticipant` when the id is not integer-parseable, a required
    /// attribute is blank, or the name equals the description.
    pub fn add_participant(
        &mut self,
        id: &str,
        name: &str,
        description: &str,
        personality: &str,
        equipment: &str,
        voice_profile: Option<&str>,
    ) -> Result<(), ConversationError> {
        let id = ParticipantId::new(id)?;
        let participant = Participant::new(
            id,
            name,
            description,
            personality,
            equipment,
            voice_profile.map(str::to_string),
        )?;
        self.insert(participant);
        Ok(())
    }

    /// Adds an already validated participant. Re-adding an existing id
    /// replaces the entry in place and keeps its position.
    pub fn insert(&mut self, participant: Participant) {
        match self.members.iter_mut().find(|p| p.id == participant.id) {
            Some(existing) => *existing = participant,
            None => self.members.push(participant),
        }
    }

    /// Removes a participant, returning it.
    pub fn remove(&mut self, id: &ParticipantId) -> Result<Participant, ConversationError> {
        let position = self
            .members
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| ConversationError::UnknownParticipant(id.clone()))?;
        Ok(self.members.remove(position))
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.members.iter().find(|p| &p.id == id)
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// A conversation may only proceed with two or more members.
    pub fn enough_participants(&self) -> bool {
        self.members.len() >= 2
    }

    /// The only other member of a two-person conversation that includes
    /// the human. `None` for any other roster shape.
    pub fn other_participant(&self, human: &ParticipantId) -> Option<&Participant> {
        if self.members.len() != 2 || !self.contains(human) {
            return None;
        }
        self.members.iter().find(|p| &p.id != human)
    }

    /// Members other than the human, in roster order.
    pub fn others<'a>(
        &'a self,
        human: &'a ParticipantId,
    ) -> impl Iterator<Item = &'a Participant> + 'a {
        self.members.iter().filter(move |p| &p.id != human)
    }

    pub fn ids(&self) -> Vec<ParticipantId> {
        self.members.iter().map(|p| p.id.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.members.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> ParticipantId {
        ParticipantId::new(value).unwrap()
    }

    fn roster(ids: &[&str]) -> ParticipantRegistry {
        let mut registry = ParticipantRegistry::new();
        for value in ids {
            registry
                .add_participant(
                    value,
                    &format!("P{}", value),
                    &format!("Description of P{}", value),
                    "curious",
                    "a lantern",
                    Some("narrator"),
                )
                .unwrap();
        }
        registry
    }

    #[test]
    fn add_participant_rejects_non_numeric_id() {
        let mut registry = ParticipantRegistry::new();
        let result = registry.add_participant("abc", "Ann", "A bard", "warm", "lute", None);
        assert!(matches!(
            result,
            Err(ConversationError::InvalidParticipant { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn add_participant_rejects_name_equal_to_description() {
        let mut registry = ParticipantRegistry::new();
        let result = registry.add_participant("1", "Ann", "Ann", "warm", "lute", None);
        assert!(matches!(
            result,
            Err(ConversationError::InvalidParticipant { .. })
        ));
    }

    #[test]
    fn add_participant_rejects_blank_attributes() {
        let mut registry = ParticipantRegistry::new();
        assert!(registry
            .add_participant("1", "Ann", "A bard", "  ", "lute", None)
            .is_err());
        assert!(registry
            .add_participant("1", "Ann", "A bard", "warm", "", None)
            .is_err());
    }

    #[test]
    fn readding_an_id_replaces_in_place() {
        let mut registry = roster(&["1", "2", "3"]);
        registry
            .add_participant("2", "Bea", "A smith", "blunt", "hammer", None)
            .unwrap();

        assert_eq!(registry.len(), 3);
        let names: Vec<_> = registry.iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, vec!["P1", "Bea", "P3"]);
    }

    #[test]
    fn enough_participants_requires_two() {
        assert!(!roster(&[]).enough_participants());
        assert!(!roster(&["1"]).enough_participants());
        assert!(roster(&["1", "2"]).enough_participants());
    }

    #[test]
    fn other_participant_returns_counterpart_in_pair() {
        let registry = roster(&["1", "2"]);
        let other = registry.other_participant(&id("1")).unwrap();
        assert_eq!(other.id(), &id("2"));
    }

    #[test]
    fn other_participant_is_none_for_larger_rosters() {
        let registry = roster(&["1", "2", "3"]);
        assert!(registry.other_participant(&id("1")).is_none());
    }

    #[test]
    fn other_participant_is_none_when_human_absent() {
        let registry = roster(&["2", "3"]);
        assert!(registry.other_participant(&id("1")).is_none());
    }

    #[test]
    fn remove_unknown_participant_fails() {
        let mut registry = roster(&["1", "2"]);
        assert!(matches!(
            registry.remove(&id("9")),
            Err(ConversationError::UnknownParticipant(_))
        ));
        let removed = registry.remove(&id("2")).unwrap();
        assert_eq!(removed.name(), "P2");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn blank_voice_profile_becomes_none() {
        let participant =
            Participant::new(id("1"), "Ann", "A bard", "warm", "lute", Some(" ".into())).unwrap();
        assert!(participant.voice_profile().is_none());
    }

    #[test]
    fn others_excludes_the_human() {
        let registry = roster(&["1", "2", "3"]);
        let human = id("2");
        let ids: Vec<_> = registry.others(&human).map(|p| p.id().to_string()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }
}
