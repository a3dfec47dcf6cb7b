use serde::Deserialize;

use crate::error::DialogueError;

/// Wire shape of a node inside the `talk` section: `answers[i]` pairs with `next[i]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTalkNode {
    #[serde(default)]
    pub talks: Option<Vec<String>>,
    #[serde(default)]
    pub answers: Option<Vec<String>>,
    #[serde(default)]
    pub next: Option<Vec<String>>,
}

/// A single node of the talk graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TalkNode {
    /// Identifier other nodes use to transition here (e.g. "init").
    pub id: String,
    /// What the bot says on entering this node, in order.
    pub messages: Vec<String>,
    /// Visible label of each answer choice.
    pub answer_labels: Vec<String>,
    /// `transitions[i]` is entered after choosing `answer_labels[i]`.
    pub transitions: Vec<String>,
}

impl TalkNode {
    /// Build and validate a node. Labels and transitions must line up, and a
    /// node offering answers must say something first.
    pub fn new(
        id: impl Into<String>,
        messages: Vec<String>,
        answer_labels: Vec<String>,
        transitions: Vec<String>,
    ) -> Result<Self, DialogueError> {
        let id = id.into();
        if answer_labels.len() != transitions.len() {
            return Err(DialogueError::TransitionMismatch {
                node: id,
                answers: answer_labels.len(),
                transitions: transitions.len(),
            });
        }
        if messages.is_empty() && !answer_labels.is_empty() {
            return Err(DialogueError::NoMessages(id));
        }
        Ok(Self {
            id,
            messages,
            answer_labels,
            transitions,
        })
    }

    pub fn from_raw(id: &str, raw: RawTalkNode) -> Result<Self, DialogueError> {
        Self::new(
            id,
            raw.talks.unwrap_or_default(),
            raw.answers.unwrap_or_default(),
            raw.next.unwrap_or_default(),
        )
    }

    /// No answers: the conversation idles once the messages have played.
    pub fn is_terminal(&self) -> bool {
        self.answer_labels.is_empty()
    }
}
