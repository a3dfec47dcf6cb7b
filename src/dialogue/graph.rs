use std::collections::{HashMap, HashSet, VecDeque};

use serde_json::Value;

use crate::dialogue::node::{RawTalkNode, TalkNode};
use crate::error::DialogueError;

/// Identifier of the mandatory entry node.
pub const ENTRY_NODE: &str = "init";

/// The talk graph of one conversation: a map of node-id -> TalkNode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TalkGraph {
    nodes: HashMap<String, TalkNode>,
}

impl TalkGraph {
    /// Build a graph from already-validated nodes. Fails without an entry node.
    pub fn new(nodes: impl IntoIterator<Item = TalkNode>) -> Result<Self, DialogueError> {
        let nodes: HashMap<String, TalkNode> =
            nodes.into_iter().map(|n| (n.id.clone(), n)).collect();
        if !nodes.contains_key(ENTRY_NODE) {
            return Err(DialogueError::MissingEntryNode);
        }
        Ok(Self { nodes })
    }

    /// Parse one (possibly per-language) talk section.
    pub fn from_value(section: &Value) -> Result<Self, DialogueError> {
        let map = section.as_object().ok_or_else(|| {
            DialogueError::MalformedTalk(format!("expected an object of nodes, got {section}"))
        })?;
        if !map.contains_key(ENTRY_NODE) {
            return Err(DialogueError::MissingEntryNode);
        }

        let mut nodes = Vec::with_capacity(map.len());
        for (id, value) in map {
            let raw: RawTalkNode =
                serde_json::from_value(value.clone()).map_err(|e| DialogueError::MalformedNode {
                    node: id.clone(),
                    reason: e.to_string(),
                })?;
            nodes.push(TalkNode::from_raw(id, raw)?);
        }
        Self::new(nodes)
    }

    pub fn get(&self, id: &str) -> Option<&TalkNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `(from, to)` pairs whose target node does not exist, sorted.
    pub fn dangling_transitions(&self) -> Vec<(String, String)> {
        let mut dangling: Vec<(String, String)> = self
            .nodes
            .values()
            .flat_map(|n| n.transitions.iter().map(move |t| (n, t)))
            .filter(|(_, target)| !self.nodes.contains_key(target.as_str()))
            .map(|(n, target)| (n.id.clone(), target.clone()))
            .collect();
        dangling.sort();
        dangling
    }

    /// Nodes no path from the entry node can reach, sorted.
    pub fn unreachable_nodes(&self) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([ENTRY_NODE]);

        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(node) = self.nodes.get(id) {
                queue.extend(node.transitions.iter().map(String::as_str));
            }
        }

        let mut unreachable: Vec<String> = self
            .nodes
            .keys()
            .filter(|id| !seen.contains(id.as_str()))
            .cloned()
            .collect();
        unreachable.sort();
        unreachable
    }
}
