use thiserror::Error;

/// Malformed or out-of-range settings. Raised before anything is rendered.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("times.{section}.{key} must not be negative (got {value})")]
    NegativeTiming {
        section: String,
        key: String,
        value: i64,
    },

    #[error("useLanguages is enabled but no defaultLang is configured")]
    MissingDefaultLanguage,

    #[error("unsupported form submission method '{0}'")]
    UnsupportedMethod(String),

    #[error("malformed configuration: {0}")]
    Malformed(String),
}

/// Problems with the talk graph or with a transition requested against it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DialogueError {
    #[error("definition has no talk section")]
    MissingTalk,

    #[error("malformed talk section: {0}")]
    MalformedTalk(String),

    #[error("language '{0}' not found")]
    LanguageNotFound(String),

    #[error("missing entry node 'init'")]
    MissingEntryNode,

    #[error("malformed talk node '{node}': {reason}")]
    MalformedNode { node: String, reason: String },

    #[error("node '{node}' has {answers} answers but {transitions} transitions")]
    TransitionMismatch {
        node: String,
        answers: usize,
        transitions: usize,
    },

    #[error("unknown node '{0}'")]
    UnknownNode(String),

    #[error("node '{0}' has no messages")]
    NoMessages(String),

    #[error("stale position '{0}'")]
    StalePosition(String),

    #[error("answer index {index} out of range for node '{node}'")]
    AnswerOutOfRange { node: String, index: usize },

    #[error("conversation has not started")]
    NotStarted,

    #[error("conversation halted after an earlier error")]
    Halted,
}

/// The rendering collaborator could not do its job.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PresentationError {
    #[error("container #{0} not found")]
    ContainerNotFound(String),

    #[error("form submission failed: {0}")]
    Submission(String),
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dialogue(#[from] DialogueError),

    #[error(transparent)]
    Presentation(#[from] PresentationError),
}
