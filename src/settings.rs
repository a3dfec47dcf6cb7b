use log::debug;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Resolved settings
// ---------------------------------------------------------------------------

/// Fully resolved configuration for one conversation session.
///
/// Built once by [`Settings::resolve`] and read-only afterwards. The derived
/// rules (zero dots delay without typing dots, zero scrolling speed without
/// auto-scroll) always hold on a resolved value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub debug: bool,
    pub behaviour: Behaviour,
    pub form_post: FormPost,
    pub ids: Ids,
    pub classes: Classes,
    pub times: Times,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Behaviour {
    pub auto_scroll: bool,
    /// Only meaningful with `use_languages`: take the language from the host.
    pub auto_detect_language: bool,
    /// Skip the forced scroll when the entry node reveals its answers.
    pub auto_scroll_after_first_answer: bool,
    pub auto_resize: bool,
    pub default_lang: String,
    pub show_typing_dots: bool,
    pub use_emoji: bool,
    pub use_inputs: bool,
    pub use_languages: bool,
}

/// Target of the `:submit:` marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPost {
    pub ajax_url: String,
    pub ajax_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ids {
    pub main_chat: String,
    pub answer_prefix: String,
}

/// Class names handed through to the presenter untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classes {
    pub answer: String,
    pub answer_wrap: String,
    pub bubble_wrap: String,
    pub bubble: String,
    pub bubble_bot: String,
    pub bubble_visitor: String,
    pub chat_wrap: String,
    pub emoji_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Times {
    pub delay: Delays,
    pub speed: Speeds,
}

/// Delays in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delays {
    pub overall: u64,
    pub dots: u64,
    pub bots_talk: u64,
    pub show_answer: u64,
}

/// Animation speeds in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Speeds {
    pub dots_fade_in_out: u64,
    pub chat_block_fade_in: u64,
    pub scrolling_speed: u64,
}

const SUPPORTED_METHODS: [&str; 5] = ["GET", "POST", "PUT", "PATCH", "DELETE"];

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            behaviour: Behaviour {
                auto_scroll: true,
                auto_detect_language: false,
                auto_scroll_after_first_answer: true,
                auto_resize: true,
                default_lang: "en".into(),
                show_typing_dots: true,
                use_emoji: true,
                use_inputs: true,
                use_languages: false,
            },
            form_post: FormPost {
                ajax_url: String::new(),
                ajax_type: "POST".into(),
            },
            ids: Ids {
                main_chat: "chat".into(),
                answer_prefix: "answer-".into(),
            },
            classes: Classes {
                answer: "chat-answer".into(),
                answer_wrap: "chat-answer-select".into(),
                bubble_wrap: "chat-bubble".into(),
                bubble: "chat-bubble-msg".into(),
                bubble_bot: "chat-bubble-msg-me".into(),
                bubble_visitor: "chat-bubble-msg-visitor".into(),
                chat_wrap: "chat-wrap".into(),
                emoji_prefix: "em em-".into(),
            },
            times: Times {
                delay: Delays {
                    overall: 0,
                    dots: 700,
                    bots_talk: 1200,
                    show_answer: 200,
                },
                speed: Speeds {
                    dots_fade_in_out: 400,
                    chat_block_fade_in: 400,
                    scrolling_speed: 700,
                },
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Partial overrides (the `config` section of a definition)
// ---------------------------------------------------------------------------

/// Every key optional; unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOverrides {
    pub debug: Option<bool>,
    pub behaviour: Option<BehaviourOverrides>,
    pub form_post: Option<FormPostOverrides>,
    pub ids: Option<IdsOverrides>,
    pub classes: Option<ClassesOverrides>,
    pub times: Option<TimesOverrides>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviourOverrides {
    pub auto_scroll: Option<bool>,
    pub auto_detect_language: Option<bool>,
    pub auto_scroll_after_first_answer: Option<bool>,
    pub auto_resize: Option<bool>,
    pub default_lang: Option<String>,
    pub show_typing_dots: Option<bool>,
    pub use_emoji: Option<bool>,
    pub use_inputs: Option<bool>,
    pub use_languages: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormPostOverrides {
    pub ajax_url: Option<String>,
    pub ajax_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdsOverrides {
    pub main_chat: Option<String>,
    pub answer_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassesOverrides {
    pub answer: Option<String>,
    pub answer_wrap: Option<String>,
    pub bubble_wrap: Option<String>,
    pub bubble: Option<String>,
    pub bubble_bot: Option<String>,
    pub bubble_visitor: Option<String>,
    pub chat_wrap: Option<String>,
    pub emoji_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimesOverrides {
    pub delay: Option<DelayOverrides>,
    pub speed: Option<SpeedOverrides>,
}

/// Signed so that negative values reach validation instead of failing to parse.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayOverrides {
    pub overall: Option<i64>,
    pub dots: Option<i64>,
    pub bots_talk: Option<i64>,
    pub show_answer: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedOverrides {
    pub dots_fade_in_out: Option<i64>,
    pub chat_block_fade_in: Option<i64>,
    pub scrolling_speed: Option<i64>,
}

impl ConfigOverrides {
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value.clone()).map_err(|e| ConfigError::Malformed(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

impl Settings {
    /// Merge `overrides` onto `defaults`, validate, and apply the derived rules.
    ///
    /// Each section is merged key by key: a key the override leaves out keeps
    /// its value from `defaults`.
    pub fn resolve(defaults: &Settings, overrides: &ConfigOverrides) -> Result<Settings, ConfigError> {
        let mut s = defaults.clone();

        set(&mut s.debug, overrides.debug);

        if let Some(b) = &overrides.behaviour {
            let t = &mut s.behaviour;
            set(&mut t.auto_scroll, b.auto_scroll);
            set(&mut t.auto_detect_language, b.auto_detect_language);
            set(&mut t.auto_scroll_after_first_answer, b.auto_scroll_after_first_answer);
            set(&mut t.auto_resize, b.auto_resize);
            set(&mut t.default_lang, b.default_lang.clone());
            set(&mut t.show_typing_dots, b.show_typing_dots);
            set(&mut t.use_emoji, b.use_emoji);
            set(&mut t.use_inputs, b.use_inputs);
            set(&mut t.use_languages, b.use_languages);
        }

        if let Some(f) = &overrides.form_post {
            set(&mut s.form_post.ajax_url, f.ajax_url.clone());
            set(&mut s.form_post.ajax_type, f.ajax_type.clone());
        }

        if let Some(i) = &overrides.ids {
            set(&mut s.ids.main_chat, i.main_chat.clone());
            set(&mut s.ids.answer_prefix, i.answer_prefix.clone());
        }

        if let Some(c) = &overrides.classes {
            let t = &mut s.classes;
            set(&mut t.answer, c.answer.clone());
            set(&mut t.answer_wrap, c.answer_wrap.clone());
            set(&mut t.bubble_wrap, c.bubble_wrap.clone());
            set(&mut t.bubble, c.bubble.clone());
            set(&mut t.bubble_bot, c.bubble_bot.clone());
            set(&mut t.bubble_visitor, c.bubble_visitor.clone());
            set(&mut t.chat_wrap, c.chat_wrap.clone());
            set(&mut t.emoji_prefix, c.emoji_prefix.clone());
        }

        if let Some(times) = &overrides.times {
            if let Some(d) = &times.delay {
                let t = &mut s.times.delay;
                set_timing(&mut t.overall, "delay", "overall", d.overall)?;
                set_timing(&mut t.dots, "delay", "dots", d.dots)?;
                set_timing(&mut t.bots_talk, "delay", "botsTalk", d.bots_talk)?;
                set_timing(&mut t.show_answer, "delay", "showAnswer", d.show_answer)?;
            }
            if let Some(sp) = &times.speed {
                let t = &mut s.times.speed;
                set_timing(&mut t.dots_fade_in_out, "speed", "dotsFadeInOut", sp.dots_fade_in_out)?;
                set_timing(&mut t.chat_block_fade_in, "speed", "chatBlockFadeIn", sp.chat_block_fade_in)?;
                set_timing(&mut t.scrolling_speed, "speed", "scrollingSpeed", sp.scrolling_speed)?;
            }
        }

        s.validate()?;
        s.apply_derived();
        Ok(s)
    }

    /// Resolve the raw `config` section of a definition against the built-in defaults.
    pub fn from_config(config: Option<&Value>) -> Result<Settings, ConfigError> {
        let overrides = match config {
            Some(value) if !value.is_null() => ConfigOverrides::from_value(value)?,
            _ => {
                debug!("No config section, using defaults");
                ConfigOverrides::default()
            }
        };
        Settings::resolve(&Settings::default(), &overrides)
    }

    fn validate(&mut self) -> Result<(), ConfigError> {
        let b = &self.behaviour;
        if b.use_languages && !b.auto_detect_language && b.default_lang.trim().is_empty() {
            return Err(ConfigError::MissingDefaultLanguage);
        }

        let method = self.form_post.ajax_type.trim().to_ascii_uppercase();
        if !SUPPORTED_METHODS.contains(&method.as_str()) {
            return Err(ConfigError::UnsupportedMethod(self.form_post.ajax_type.clone()));
        }
        self.form_post.ajax_type = method;
        Ok(())
    }

    fn apply_derived(&mut self) {
        if !self.behaviour.show_typing_dots {
            self.times.delay.dots = 0;
        }
        if !self.behaviour.auto_scroll {
            self.times.speed.scrolling_speed = 0;
        }
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

fn set_timing(slot: &mut u64, section: &str, key: &str, value: Option<i64>) -> Result<(), ConfigError> {
    match value {
        Some(v) if v < 0 => Err(ConfigError::NegativeTiming {
            section: section.into(),
            key: key.into(),
            value: v,
        }),
        // v >= 0 checked above
        Some(v) => {
            *slot = v as u64;
            Ok(())
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn overrides(value: Value) -> ConfigOverrides {
        ConfigOverrides::from_value(&value).unwrap()
    }

    #[test]
    fn test_empty_overrides_yield_defaults() {
        let defaults = Settings::default();
        let resolved = Settings::resolve(&defaults, &ConfigOverrides::default()).unwrap();
        assert_eq!(resolved, defaults);
    }

    #[test]
    fn test_negative_dots_rejected() {
        let o = overrides(json!({"times": {"delay": {"dots": -1}}}));
        let err = Settings::resolve(&Settings::default(), &o).unwrap_err();
        assert_eq!(
            err,
            ConfigError::NegativeTiming {
                section: "delay".into(),
                key: "dots".into(),
                value: -1
            }
        );
    }

    #[test]
    fn test_negative_speed_rejected() {
        let o = overrides(json!({"times": {"speed": {"scrollingSpeed": -20}}}));
        assert!(matches!(
            Settings::resolve(&Settings::default(), &o),
            Err(ConfigError::NegativeTiming { .. })
        ));
    }

    #[test]
    fn test_section_merge_keeps_unspecified_keys() {
        let o = overrides(json!({
            "behaviour": {"useEmoji": false},
            "times": {"delay": {"botsTalk": 50}},
            "ids": {"mainChat": "bot"}
        }));
        let s = Settings::resolve(&Settings::default(), &o).unwrap();
        assert!(!s.behaviour.use_emoji);
        assert!(s.behaviour.use_inputs);
        assert_eq!(s.times.delay.bots_talk, 50);
        assert_eq!(s.times.delay.dots, 700);
        assert_eq!(s.ids.main_chat, "bot");
        assert_eq!(s.ids.answer_prefix, "answer-");
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let o = overrides(json!({
            "behaviour": {"teleport": true},
            "sparkles": {"amount": 3},
            "times": {"delay": {"warp": -5}}
        }));
        let s = Settings::resolve(&Settings::default(), &o).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn test_wrong_type_is_malformed() {
        let err = ConfigOverrides::from_value(&json!({"times": {"delay": {"dots": "slow"}}})).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));
    }

    #[test]
    fn test_derived_rules_applied() {
        let o = overrides(json!({
            "behaviour": {"showTypingDots": false, "autoScroll": false},
            "times": {"delay": {"dots": 900}, "speed": {"scrollingSpeed": 300}}
        }));
        let s = Settings::resolve(&Settings::default(), &o).unwrap();
        assert_eq!(s.times.delay.dots, 0);
        assert_eq!(s.times.speed.scrolling_speed, 0);
    }

    #[test]
    fn test_derived_rules_hold_on_re_resolution() {
        let first = overrides(json!({"behaviour": {"showTypingDots": false}}));
        let base = Settings::resolve(&Settings::default(), &first).unwrap();

        let second = overrides(json!({"times": {"delay": {"dots": 400}}}));
        let s = Settings::resolve(&base, &second).unwrap();
        assert_eq!(s.times.delay.dots, 0);
    }

    #[test]
    fn test_languages_need_default_lang() {
        let o = overrides(json!({"behaviour": {"useLanguages": true, "defaultLang": ""}}));
        assert_eq!(
            Settings::resolve(&Settings::default(), &o),
            Err(ConfigError::MissingDefaultLanguage)
        );

        let o = overrides(json!({
            "behaviour": {"useLanguages": true, "defaultLang": "", "autoDetectLanguage": true}
        }));
        assert!(Settings::resolve(&Settings::default(), &o).is_ok());
    }

    #[test]
    fn test_method_normalised_and_checked() {
        let o = overrides(json!({"formPost": {"ajaxType": "get", "ajaxUrl": "/form"}}));
        let s = Settings::resolve(&Settings::default(), &o).unwrap();
        assert_eq!(s.form_post.ajax_type, "GET");
        assert_eq!(s.form_post.ajax_url, "/form");

        let o = overrides(json!({"formPost": {"ajaxType": "TELEPORT"}}));
        assert_eq!(
            Settings::resolve(&Settings::default(), &o),
            Err(ConfigError::UnsupportedMethod("TELEPORT".into()))
        );
    }

    #[test]
    fn test_from_config_handles_missing_section() {
        assert_eq!(Settings::from_config(None).unwrap(), Settings::default());
        assert_eq!(Settings::from_config(Some(&Value::Null)).unwrap(), Settings::default());

        let s = Settings::from_config(Some(&json!({"debug": true}))).unwrap();
        assert!(s.debug);
    }
}
