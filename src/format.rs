use once_cell::sync::Lazy;
use regex::Regex;

use crate::settings::Settings;

/// Caption shown inside an empty input field.
pub const INPUT_PLACEHOLDER: &str = "Start typing...";

/// Marker that strips itself and triggers a form submission.
pub const SUBMIT_MARKER: &str = ":submit:";

// Token grammars. Each is anchored with `\A` and only ever tried at the
// current scan position, so a token is consumed exactly once.
static INPUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\A:input:([A-Za-z]+):").unwrap());
static EMOJI: Lazy<Regex> = Lazy::new(|| Regex::new(r"\A:emoji:([A-Za-z_]+):").unwrap());
static TITLED_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\A\[([A-Za-z0-9_\s\-'=#+]+)\]\(([A-Za-z0-9_/.:\-?#=%]+) "([A-Za-z0-9_\s\-'=#+]+)"\)"#)
        .unwrap()
});
static PLAIN_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\A\[([A-Za-z0-9_\s\-'=#+]+)\]\(([A-Za-z0-9_/.:\-?#=%]+)\)").unwrap()
});
static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<.*?>").unwrap());

// ---------------------------------------------------------------------------
// Renderable fragments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    /// A free-text field whose value is stored under `name`.
    Input {
        name: String,
        placeholder: &'static str,
    },
    /// Opens in a new browsing context.
    Link {
        label: String,
        url: String,
        title: Option<String>,
    },
    Emoji { name: String },
}

/// Output of [`format`]: the fragments in source order plus whether a
/// `:submit:` marker was stripped from the text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormattedText {
    pub fragments: Vec<Fragment>,
    pub submit: bool,
}

impl FormattedText {
    /// Literal text with no markup, e.g. a visitor's typed reply.
    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        let fragments = if text.is_empty() {
            Vec::new()
        } else {
            vec![Fragment::Text(text)]
        };
        Self {
            fragments,
            submit: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn has_inputs(&self) -> bool {
        self.fragments
            .iter()
            .any(|f| matches!(f, Fragment::Input { .. }))
    }

    pub fn input_names(&self) -> Vec<&str> {
        self.fragments
            .iter()
            .filter_map(|f| match f {
                Fragment::Input { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Text-only rendering for hosts without markup support.
    pub fn to_plain(&self) -> String {
        let mut out = String::new();
        for fragment in &self.fragments {
            match fragment {
                Fragment::Text(t) => out.push_str(t),
                Fragment::Input { name, placeholder } => {
                    out.push_str(&format!("[{name}: {placeholder}]"));
                }
                Fragment::Link { label, url, .. } => out.push_str(&format!("{label} <{url}>")),
                Fragment::Emoji { name } => out.push_str(&format!(":{name}:")),
            }
        }
        out
    }
}

impl std::fmt::Display for FormattedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_plain())
    }
}

// ---------------------------------------------------------------------------
// Formatting pass
// ---------------------------------------------------------------------------

/// Convert inline markup in `raw` into fragments.
///
/// Single left-to-right scan. At every `:` or `[` the token kinds are tried in
/// priority order (input, titled link, plain link, emoji, submit); a match is
/// consumed whole and scanning resumes right after it. Anything else is
/// copied through verbatim. Input and emoji tokens stay literal when
/// `use_inputs` / `use_emoji` are off.
pub fn format(raw: &str, settings: &Settings) -> FormattedText {
    let mut out = FormattedText::default();
    let mut literal = String::new();
    let mut pos = 0;

    while pos < raw.len() {
        let rest = &raw[pos..];

        if rest.starts_with(':') || rest.starts_with('[') {
            if let Some((token, len)) = match_token(rest, settings) {
                flush(&mut literal, &mut out.fragments);
                match token {
                    Token::Fragment(f) => out.fragments.push(f),
                    Token::Submit => out.submit = true,
                }
                pos += len;
                continue;
            }
        }

        // rest is non-empty here
        let ch = rest.chars().next().unwrap_or_default();
        literal.push(ch);
        pos += ch.len_utf8();
    }

    flush(&mut literal, &mut out.fragments);
    out
}

/// Remove markup tags from a visitor-typed value.
pub fn strip_tags(value: &str) -> String {
    TAGS.replace_all(value, "").into_owned()
}

enum Token {
    Fragment(Fragment),
    Submit,
}

fn match_token(rest: &str, settings: &Settings) -> Option<(Token, usize)> {
    if settings.behaviour.use_inputs {
        if let Some(c) = INPUT.captures(rest) {
            let f = Fragment::Input {
                name: c[1].to_string(),
                placeholder: INPUT_PLACEHOLDER,
            };
            return Some((Token::Fragment(f), c[0].len()));
        }
    }

    if let Some(c) = TITLED_LINK.captures(rest) {
        let f = Fragment::Link {
            label: c[1].to_string(),
            url: c[2].to_string(),
            title: Some(c[3].to_string()),
        };
        return Some((Token::Fragment(f), c[0].len()));
    }

    if let Some(c) = PLAIN_LINK.captures(rest) {
        let f = Fragment::Link {
            label: c[1].to_string(),
            url: c[2].to_string(),
            title: None,
        };
        return Some((Token::Fragment(f), c[0].len()));
    }

    if settings.behaviour.use_emoji {
        if let Some(c) = EMOJI.captures(rest) {
            let f = Fragment::Emoji {
                name: c[1].to_string(),
            };
            return Some((Token::Fragment(f), c[0].len()));
        }
    }

    if rest.starts_with(SUBMIT_MARKER) {
        return Some((Token::Submit, SUBMIT_MARKER.len()));
    }

    None
}

fn flush(literal: &mut String, fragments: &mut Vec<Fragment>) {
    if !literal.is_empty() {
        fragments.push(Fragment::Text(std::mem::take(literal)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Fragment {
        Fragment::Text(s.into())
    }

    fn input(name: &str) -> Fragment {
        Fragment::Input {
            name: name.into(),
            placeholder: INPUT_PLACEHOLDER,
        }
    }

    #[test]
    fn test_emoji_and_input_keep_surrounding_text() {
        let out = format("hi :emoji:smile: :input:name: bye", &Settings::default());
        assert_eq!(
            out.fragments,
            vec![
                text("hi "),
                Fragment::Emoji {
                    name: "smile".into()
                },
                text(" "),
                input("name"),
                text(" bye"),
            ]
        );
        assert!(!out.submit);
    }

    #[test]
    fn test_repeated_tokens_all_replaced() {
        let out = format(":input:first: and :input:last:", &Settings::default());
        assert_eq!(out.input_names(), vec!["first", "last"]);
        assert_eq!(out.fragments.len(), 3);
    }

    #[test]
    fn test_titled_link() {
        let out = format(
            r#"see [our docs](https://example.com/docs?x=1 "The Docs") now"#,
            &Settings::default(),
        );
        assert_eq!(
            out.fragments,
            vec![
                text("see "),
                Fragment::Link {
                    label: "our docs".into(),
                    url: "https://example.com/docs?x=1".into(),
                    title: Some("The Docs".into()),
                },
                text(" now"),
            ]
        );
    }

    #[test]
    fn test_plain_link() {
        let out = format("[home](/index.html)", &Settings::default());
        assert_eq!(
            out.fragments,
            vec![Fragment::Link {
                label: "home".into(),
                url: "/index.html".into(),
                title: None,
            }]
        );
    }

    #[test]
    fn test_link_with_disallowed_characters_stays_literal() {
        let raw = "[click!](http://x.y) [ok](http://a b)";
        let out = format(raw, &Settings::default());
        assert_eq!(out.fragments, vec![text(raw)]);
    }

    #[test]
    fn test_emoji_disabled_leaves_literal() {
        let mut settings = Settings::default();
        settings.behaviour.use_emoji = false;
        let out = format("wave :emoji:wave:", &settings);
        assert_eq!(out.fragments, vec![text("wave :emoji:wave:")]);
    }

    #[test]
    fn test_emoji_name_with_underscore() {
        let out = format("love :emoji:heart_eyes:", &Settings::default());
        assert_eq!(
            out.fragments,
            vec![
                text("love "),
                Fragment::Emoji {
                    name: "heart_eyes".into()
                },
            ]
        );
    }

    #[test]
    fn test_inputs_disabled_leaves_literal() {
        let mut settings = Settings::default();
        settings.behaviour.use_inputs = false;
        let out = format("name? :input:name:", &settings);
        assert!(!out.has_inputs());
        assert_eq!(out.to_plain(), "name? :input:name:");
    }

    #[test]
    fn test_submit_stripped_and_flagged() {
        let out = format("go :submit:", &Settings::default());
        assert!(out.submit);
        assert_eq!(out.fragments, vec![text("go ")]);

        let out = format(":submit:thanks:submit:", &Settings::default());
        assert!(out.submit);
        assert_eq!(out.to_plain(), "thanks");
    }

    #[test]
    fn test_token_free_text_unchanged() {
        let raw = "Grüße: plain [text] with (parens) and :colons:";
        let out = format(raw, &Settings::default());
        assert_eq!(out.fragments, vec![text(raw)]);
        assert_eq!(format(&out.to_plain(), &Settings::default()), out);
    }

    #[test]
    fn test_input_name_must_be_letters() {
        let out = format(":input:a1: :input:: :input:ok:", &Settings::default());
        assert_eq!(out.input_names(), vec!["ok"]);
        assert_eq!(out.fragments[0], text(":input:a1: :input:: "));
    }

    #[test]
    fn test_plain_rendering() {
        let out = format(
            "Mail :input:email: or [call](tel:123) :emoji:phone:",
            &Settings::default(),
        );
        assert_eq!(
            out.to_plain(),
            "Mail [email: Start typing...] or call <tel:123> :phone:"
        );
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<b>Bob</b>"), "Bob");
        assert_eq!(strip_tags("a <script\n>x</script> b"), "a x b");
        assert_eq!(strip_tags("1 < 2"), "1 < 2");
    }
}
