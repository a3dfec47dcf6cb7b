use std::collections::BTreeMap;

use crate::error::PresentationError;
use crate::format::FormattedText;
use crate::settings::Settings;

/// Who a bubble is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Bot,
    Visitor,
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Speaker::Bot => f.write_str("bot"),
            Speaker::Visitor => f.write_str("visitor"),
        }
    }
}

/// Initial sizes reported by the presenter when it mounts, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Measurements {
    pub container_height: u32,
    pub answer_area_height: u32,
}

/// A snapshot of the collected form data and where to send it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmission {
    pub url: String,
    pub method: String,
    pub data: BTreeMap<String, String>,
}

/// The rendering collaborator a conversation drives.
///
/// The engine never touches presentation state itself; everything visible
/// goes through these calls. Heights returned by the render calls feed the
/// auto-resize bookkeeping.
pub trait Presenter {
    /// Prepare the container. The only place a presentation failure is fatal.
    fn mount(&mut self, settings: &Settings) -> Result<Measurements, PresentationError>;

    /// Show one bubble and return its rendered height.
    fn render_bubble(&mut self, speaker: Speaker, content: &FormattedText, show_typing_first: bool)
        -> u32;

    /// Replace the answer area with `choices` (index-aligned with the node's
    /// answers) and return the area's height.
    fn render_answer_choices(&mut self, choices: &[FormattedText]) -> u32;

    fn request_resize(&mut self, delta: u32);

    fn request_scroll(&mut self, speed_ms: u64);

    /// Dispatch a submission. Must not block on delivery.
    fn submit_form(&mut self, submission: FormSubmission) -> Result<(), PresentationError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Rendered {
        Bubble {
            speaker: Speaker,
            text: String,
            typing: bool,
        },
        Answers(Vec<String>),
        Resize(u32),
        Scroll(u64),
        Submit(FormSubmission),
    }

    /// Presenter double that records every call in order.
    #[derive(Debug, Default)]
    pub struct RecordingPresenter {
        pub rendered: Vec<Rendered>,
        pub bubble_height: u32,
        pub answers_height: u32,
        pub missing_container: bool,
        pub reject_submissions: bool,
    }

    impl RecordingPresenter {
        pub fn new() -> Self {
            Self {
                bubble_height: 40,
                answers_height: 30,
                ..Self::default()
            }
        }

        pub fn bubbles(&self, who: Speaker) -> Vec<String> {
            self.rendered
                .iter()
                .filter_map(|r| match r {
                    Rendered::Bubble { speaker, text, .. } if *speaker == who => Some(text.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn answer_sets(&self) -> Vec<Vec<String>> {
            self.rendered
                .iter()
                .filter_map(|r| match r {
                    Rendered::Answers(a) => Some(a.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn submissions(&self) -> Vec<FormSubmission> {
            self.rendered
                .iter()
                .filter_map(|r| match r {
                    Rendered::Submit(s) => Some(s.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn scrolls(&self) -> usize {
            self.rendered
                .iter()
                .filter(|r| matches!(r, Rendered::Scroll(_)))
                .count()
        }

        pub fn resizes(&self) -> Vec<u32> {
            self.rendered
                .iter()
                .filter_map(|r| match r {
                    Rendered::Resize(d) => Some(*d),
                    _ => None,
                })
                .collect()
        }
    }

    impl Presenter for RecordingPresenter {
        fn mount(&mut self, settings: &Settings) -> Result<Measurements, PresentationError> {
            if self.missing_container {
                return Err(PresentationError::ContainerNotFound(settings.ids.main_chat.clone()));
            }
            Ok(Measurements {
                container_height: 100,
                answer_area_height: 0,
            })
        }

        fn render_bubble(&mut self, speaker: Speaker, content: &FormattedText, show_typing_first: bool) -> u32 {
            self.rendered.push(Rendered::Bubble {
                speaker,
                text: content.to_plain(),
                typing: show_typing_first,
            });
            self.bubble_height
        }

        fn render_answer_choices(&mut self, choices: &[FormattedText]) -> u32 {
            self.rendered
                .push(Rendered::Answers(choices.iter().map(FormattedText::to_plain).collect()));
            self.answers_height
        }

        fn request_resize(&mut self, delta: u32) {
            self.rendered.push(Rendered::Resize(delta));
        }

        fn request_scroll(&mut self, speed_ms: u64) {
            self.rendered.push(Rendered::Scroll(speed_ms));
        }

        fn submit_form(&mut self, submission: FormSubmission) -> Result<(), PresentationError> {
            self.rendered.push(Rendered::Submit(submission));
            if self.reject_submissions {
                return Err(PresentationError::Submission("connection refused".into()));
            }
            Ok(())
        }
    }
}
