//! Scripted chat companion.
//!
//! A user message gets one canned reply picked at random. Quick actions are
//! shortcuts that post a fixed prompt on the user's behalf.

use rand::seq::SliceRandom;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::{CareError, CareResult};
use crate::records::SqliteCareStore;
use crate::types::{ChatMessage, ChatMessageDraft};

/// Replies the companion chooses from.
pub const REPLIES: [&str; 6] = [
    "That's wonderful to hear! How are you feeling today?",
    "Thank you for sharing that with me. Is there anything I can help you with?",
    "I appreciate you telling me that. Would you like to hear a motivational quote?",
    "That sounds lovely! Remember to take care of yourself today.",
    "I'm here to listen. Tell me more about what's on your mind.",
    "Your well-being is important to me. How can I assist you today?",
];

/// One-tap conversation starters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum QuickAction {
    Nature,
    Quote,
    Memory,
    Feeling,
}

impl QuickAction {
    /// The message posted for this action.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Nature => "Could you play some nature sounds for me?",
            Self::Quote => "Could you share a motivational quote?",
            Self::Memory => "I'd like to share a memory with you.",
            Self::Feeling => "I want to talk about how I'm feeling today.",
        }
    }

    pub fn parse(value: &str) -> CareResult<Self> {
        value.parse().map_err(|_| {
            let known: Vec<String> = Self::iter().map(|a| a.to_string()).collect();
            CareError::invalid_format(
                "action",
                value,
                format!("Use one of: {}", known.join(", ")),
            )
        })
    }
}

/// Chat companion writing to the care store.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatCompanion;

impl ChatCompanion {
    pub fn new() -> Self {
        Self
    }

    /// Pick a reply.
    pub fn reply(&self) -> &'static str {
        REPLIES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(REPLIES[0])
    }

    /// Store a message and, if it came from the user, a reply.
    ///
    /// Returns the stored messages in order.
    pub fn post(
        &self,
        store: &SqliteCareStore,
        draft: ChatMessageDraft,
    ) -> CareResult<Vec<ChatMessage>> {
        let message = store.add_chat_message(draft)?;
        if !message.is_from_user {
            return Ok(vec![message]);
        }

        let reply = store.add_chat_message(ChatMessageDraft::from_assistant(self.reply()))?;
        tracing::debug!(message_id = message.id, reply_id = reply.id, "Companion replied");
        Ok(vec![message, reply])
    }

    /// Post the prompt for a quick action as a user message.
    pub fn quick_action(
        &self,
        store: &SqliteCareStore,
        action: QuickAction,
    ) -> CareResult<Vec<ChatMessage>> {
        self.post(store, ChatMessageDraft::from_user(action.prompt()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_is_canned() {
        let companion = ChatCompanion::new();
        for _ in 0..20 {
            assert!(REPLIES.contains(&companion.reply()));
        }
    }

    #[test]
    fn test_user_message_gets_reply() {
        let store = SqliteCareStore::in_memory().unwrap();
        let posted = ChatCompanion::new()
            .post(&store, ChatMessageDraft::from_user("I went for a walk"))
            .unwrap();

        assert_eq!(posted.len(), 2);
        assert!(posted[0].is_from_user);
        assert!(!posted[1].is_from_user);
        assert!(REPLIES.contains(&posted[1].content.as_str()));
        assert_eq!(store.list_chat().unwrap().len(), 2);
    }

    #[test]
    fn test_assistant_message_stored_alone() {
        let store = SqliteCareStore::in_memory().unwrap();
        let posted = ChatCompanion::new()
            .post(&store, ChatMessageDraft::from_assistant("Good morning"))
            .unwrap();
        assert_eq!(posted.len(), 1);
    }

    #[test]
    fn test_empty_message_rejected() {
        let store = SqliteCareStore::in_memory().unwrap();
        assert!(ChatCompanion::new()
            .post(&store, ChatMessageDraft::from_user("   "))
            .is_err());
        assert!(store.list_chat().unwrap().is_empty());
    }

    #[test]
    fn test_quick_actions() {
        assert_eq!(QuickAction::parse("Quote").unwrap(), QuickAction::Quote);
        assert!(QuickAction::parse("dance").is_err());

        let store = SqliteCareStore::in_memory().unwrap();
        let posted = ChatCompanion::new()
            .quick_action(&store, QuickAction::Nature)
            .unwrap();
        assert_eq!(posted[0].content, "Could you play some nature sounds for me?");
    }
}
