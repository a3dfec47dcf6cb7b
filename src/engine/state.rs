use std::collections::BTreeMap;

use crate::dialogue::ENTRY_NODE;

/// Where a conversation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Created but the entry node has not been entered yet.
    AwaitingStart,
    /// Bot messages for the current node are scheduled or playing.
    Talking,
    /// Answers are on screen; waiting for the visitor.
    AwaitingAnswer,
    /// A node without answers finished playing. Nothing more will happen.
    Finished,
    /// Stopped by a dialogue error.
    Halted,
}

/// The mutable part of a session. Owned by exactly one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationState {
    pub current_position: String,
    /// Last value entered per field; kept for the whole session.
    pub collected_form_data: BTreeMap<String, String>,
    pub resolved_language: String,
    pub container_height: u32,
    pub answer_area_height: u32,
}

impl ConversationState {
    pub fn new(resolved_language: impl Into<String>) -> Self {
        Self {
            current_position: ENTRY_NODE.to_string(),
            collected_form_data: BTreeMap::new(),
            resolved_language: resolved_language.into(),
            container_height: 0,
            answer_area_height: 0,
        }
    }
}
