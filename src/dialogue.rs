pub mod graph;
pub mod node;

use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ConfigError, DialogueError};
use crate::settings::Settings;

pub use graph::{TalkGraph, ENTRY_NODE};
pub use node::{RawTalkNode, TalkNode};

/// An already-parsed dialogue definition: optional `config` plus the `talk`
/// section, either flat or keyed by language code.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Definition {
    #[serde(default)]
    pub config: Option<Value>,
    #[serde(default)]
    pub talk: Option<Value>,
}

impl Definition {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Resolve the `config` section against the built-in defaults.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        Settings::from_config(self.config.as_ref())
    }
}

/// The talk graph selected for a session and the language it was chosen for
/// (empty when localization is off).
#[derive(Debug, Clone)]
pub struct LoadedDialogue {
    pub graph: TalkGraph,
    pub language: String,
}

/// Pick the session language. Empty when localization is disabled.
pub fn resolve_language(settings: &Settings, browser_language: &str) -> String {
    let behaviour = &settings.behaviour;
    if !behaviour.use_languages {
        return String::new();
    }

    if behaviour.auto_detect_language {
        let prefix = browser_language
            .split(|c: char| c == '-' || c == '_')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if !prefix.is_empty() {
            return prefix;
        }
        warn!(
            "Could not detect a language from '{browser_language}', using '{}'",
            behaviour.default_lang
        );
    }

    behaviour.default_lang.clone()
}

/// Select and validate the talk graph for this session.
///
/// The definition is only read; the returned graph is an owned, validated copy
/// of the selected section.
pub fn load(
    definition: &Definition,
    settings: &Settings,
    browser_language: &str,
) -> Result<LoadedDialogue, DialogueError> {
    let talk = definition.talk.as_ref().ok_or(DialogueError::MissingTalk)?;
    let language = resolve_language(settings, browser_language);

    let section = if settings.behaviour.use_languages {
        info!("Language usage activated, using '{language}'");
        talk.get(language.as_str())
            .ok_or_else(|| DialogueError::LanguageNotFound(language.clone()))?
    } else {
        talk
    };

    let graph = TalkGraph::from_value(section)?;
    debug!("Loaded talk graph with {} nodes", graph.len());

    for (from, to) in graph.dangling_transitions() {
        warn!("Node '{from}' transitions to unknown node '{to}'");
    }
    for id in graph.unreachable_nodes() {
        warn!("Node '{id}' is unreachable from '{ENTRY_NODE}'");
    }

    Ok(LoadedDialogue { graph, language })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn localized() -> Definition {
        Definition {
            config: Some(json!({"behaviour": {"useLanguages": true, "defaultLang": "de"}})),
            talk: Some(json!({
                "de": {"init": {"talks": ["Hallo"]}},
                "en": {"init": {"talks": ["Hello"]}},
                "fr": {"debut": {"talks": ["Bonjour"]}}
            })),
        }
    }

    #[test]
    fn test_flat_definition() {
        let def = Definition::from_json(r#"{"talk": {"init": {"talks": ["Hello"]}}}"#).unwrap();
        let settings = def.settings().unwrap();
        let loaded = load(&def, &settings, "en-US").unwrap();
        assert_eq!(loaded.language, "");
        assert_eq!(loaded.graph.get(ENTRY_NODE).unwrap().messages, vec!["Hello".to_string()]);
    }

    #[test]
    fn test_missing_talk_section() {
        let def = Definition::default();
        let err = load(&def, &Settings::default(), "en").unwrap_err();
        assert_eq!(err, DialogueError::MissingTalk);
    }

    #[test]
    fn test_default_language_used_without_detection() {
        let def = localized();
        let settings = def.settings().unwrap();
        let loaded = load(&def, &settings, "en-GB").unwrap();
        assert_eq!(loaded.language, "de");
        assert_eq!(loaded.graph.get("init").unwrap().messages, vec!["Hallo".to_string()]);
    }

    #[test]
    fn test_browser_language_prefix_detected() {
        let def = localized();
        let mut settings = def.settings().unwrap();
        settings.behaviour.auto_detect_language = true;

        let loaded = load(&def, &settings, "en-GB").unwrap();
        assert_eq!(loaded.language, "en");

        assert_eq!(resolve_language(&settings, "en_US.UTF-8"), "en");
        assert_eq!(resolve_language(&settings, ""), "de");
    }

    #[test]
    fn test_missing_language() {
        let def = localized();
        let mut settings = def.settings().unwrap();
        settings.behaviour.auto_detect_language = true;

        let err = load(&def, &settings, "it-IT").unwrap_err();
        assert_eq!(err, DialogueError::LanguageNotFound("it".into()));
    }

    #[test]
    fn test_language_without_entry_node() {
        let def = localized();
        let mut settings = def.settings().unwrap();
        settings.behaviour.default_lang = "fr".into();

        let err = load(&def, &settings, "").unwrap_err();
        assert_eq!(err, DialogueError::MissingEntryNode);
    }
}
