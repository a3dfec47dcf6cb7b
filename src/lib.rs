//! Scripted conversation engine.
//!
//! A [`dialogue::Definition`] holds an optional `config` section and a talk
//! graph of nodes (bot messages, answer labels, transitions). A
//! [`engine::Conversation`] plays that graph through a [`presenter::Presenter`]:
//! bot messages arrive with simulated typing delays, answers are revealed, and
//! the visitor's choice (or typed input) decides the next node.
//!
//! ```
//! use talkflow::dialogue::Definition;
//!
//! let def = Definition::from_json(r#"{
//!     "config": {"times": {"delay": {"botsTalk": 500}}},
//!     "talk": {
//!         "init": {"talks": ["Hello!"], "answers": ["Hi"], "next": ["end"]},
//!         "end": {"talks": ["Bye :emoji:wave:"]}
//!     }
//! }"#).unwrap();
//! let settings = def.settings().unwrap();
//! assert_eq!(settings.times.delay.bots_talk, 500);
//! ```

pub mod dialogue;
pub mod engine;
pub mod error;
pub mod format;
pub mod presenter;
pub mod settings;

pub use dialogue::{Definition, TalkGraph, TalkNode};
pub use engine::{Activation, Conversation, HostEvent, Phase};
pub use error::{ChatError, ConfigError, DialogueError, PresentationError};
pub use presenter::{Presenter, Speaker};
pub use settings::Settings;
