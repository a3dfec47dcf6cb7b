pub mod schedule;
pub mod state;

use log::{debug, info, warn};

use crate::dialogue::{self, Definition, LoadedDialogue, TalkGraph, TalkNode, ENTRY_NODE};
use crate::error::{ChatError, DialogueError};
use crate::format::{self, FormattedText};
use crate::presenter::{FormSubmission, Presenter, Speaker};
use crate::settings::Settings;

pub use schedule::{Scheduled, Timeline};
pub use state::{ConversationState, Phase};

/// Something the visitor did in the host page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A click on an answer choice.
    AnswerSelected { index: usize },
    /// A click that landed on an input field inside an answer choice.
    InputClicked { index: usize },
    /// The commit gesture (e.g. Enter) inside an input field.
    InputCommitted {
        field: String,
        value: String,
        answer_index: usize,
    },
}

/// Whether a host event moved the conversation on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Resolved,
    Ignored,
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// One conversation session: resolved settings, its talk graph, the live
/// state and the presenter it drives.
///
/// Time is a virtual millisecond clock. The host moves it forward with
/// [`Conversation::advance_to`] (sleeping until [`Conversation::next_deadline`]
/// in real time, or jumping straight there in tests) and feeds visitor
/// actions through [`Conversation::handle`].
pub struct Conversation<P> {
    settings: Settings,
    graph: TalkGraph,
    state: ConversationState,
    timeline: Timeline,
    presenter: P,
    phase: Phase,
    started: bool,
    now: u64,
}

impl<P: Presenter> Conversation<P> {
    pub fn new(settings: Settings, dialogue: LoadedDialogue, presenter: P) -> Self {
        Self {
            state: ConversationState::new(dialogue.language),
            graph: dialogue.graph,
            settings,
            timeline: Timeline::new(),
            presenter,
            phase: Phase::AwaitingStart,
            started: false,
            now: 0,
        }
    }

    /// Resolve settings and load the talk graph in one go. Nothing is built
    /// unless both succeed.
    pub fn from_definition(
        definition: &Definition,
        browser_language: &str,
        presenter: P,
    ) -> Result<Self, ChatError> {
        let settings = definition.settings()?;
        let dialogue = dialogue::load(definition, &settings, browser_language)?;
        Ok(Self::new(settings, dialogue, presenter))
    }

    /// Mount the presenter and schedule the entry node after the overall delay.
    pub fn start(&mut self) -> Result<(), ChatError> {
        if self.started {
            warn!("Conversation already started");
            return Ok(());
        }

        let measurements = self.presenter.mount(&self.settings)?;
        self.state.container_height = measurements.container_height;
        self.state.answer_area_height = measurements.answer_area_height;
        self.started = true;

        let overall = self.settings.times.delay.overall;
        self.timeline
            .schedule(self.now.saturating_add(overall), Scheduled::Start);
        info!("Conversation starts in {overall}ms");
        Ok(())
    }

    // -- accessors ----------------------------------------------------------

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn graph(&self) -> &TalkGraph {
        &self.graph
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn current_node(&self) -> Option<&TalkNode> {
        self.graph.get(&self.state.current_position)
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.timeline.next_deadline()
    }

    pub fn pending(&self) -> Vec<(u64, Scheduled)> {
        self.timeline.pending()
    }

    // -- clock --------------------------------------------------------------

    /// Fire every event due at or before `now`, in order.
    pub fn advance_to(&mut self, now: u64) -> Result<(), DialogueError> {
        self.ensure_running()?;
        while let Some((due, event)) = self.timeline.pop_due(now) {
            self.now = self.now.max(due);
            self.fire(event)?;
        }
        self.now = self.now.max(now);
        Ok(())
    }

    pub fn advance_by(&mut self, ms: u64) -> Result<(), DialogueError> {
        self.advance_to(self.now.saturating_add(ms))
    }

    /// Fire everything pending, jumping the clock from deadline to deadline.
    pub fn run_until_idle(&mut self) -> Result<(), DialogueError> {
        while let Some(deadline) = self.timeline.next_deadline() {
            self.advance_to(deadline)?;
        }
        Ok(())
    }

    fn fire(&mut self, event: Scheduled) -> Result<(), DialogueError> {
        match event {
            Scheduled::Start => self.advance_from(ENTRY_NODE),
            Scheduled::DeliverMessage { node, index } => self.deliver_message(&node, index),
            Scheduled::RevealAnswers { .. } => self.reveal_answers(),
        }
    }

    // -- traversal ----------------------------------------------------------

    /// Enter `node_id`: schedule each message, then the answer reveal.
    ///
    /// Message `i` is due `dots + botsTalk * (i + 1)` after now; the reveal is
    /// due `messages * (botsTalk + dots) + showAnswer` after now. Anything still
    /// pending from the previous node is dropped first.
    fn advance_from(&mut self, node_id: &str) -> Result<(), DialogueError> {
        let (count, has_answers) = match self.graph.get(node_id) {
            Some(node) => (node.messages.len(), !node.answer_labels.is_empty()),
            None => return Err(self.halt(DialogueError::UnknownNode(node_id.to_string()))),
        };
        if count == 0 && has_answers {
            return Err(self.halt(DialogueError::NoMessages(node_id.to_string())));
        }

        let dropped = self.timeline.cancel_all();
        if dropped > 0 {
            debug!("Cancelled {dropped} pending events of the previous node");
        }

        let delay = &self.settings.times.delay;
        let (dots, talk, show) = (delay.dots, delay.bots_talk, delay.show_answer);
        let start = self.now;

        for index in 0..count {
            let offset = talk.saturating_mul(index as u64 + 1).saturating_add(dots);
            self.timeline.schedule(
                start.saturating_add(offset),
                Scheduled::DeliverMessage {
                    node: node_id.to_string(),
                    index,
                },
            );
        }

        let reveal = (count as u64)
            .saturating_mul(talk.saturating_add(dots))
            .saturating_add(show);
        self.timeline.schedule(
            start.saturating_add(reveal),
            Scheduled::RevealAnswers {
                node: node_id.to_string(),
            },
        );

        self.phase = Phase::Talking;
        info!("Bot starts talking on '{node_id}' ({count} messages, answers after {reveal}ms)");
        Ok(())
    }

    fn deliver_message(&mut self, node_id: &str, index: usize) -> Result<(), DialogueError> {
        let raw = self
            .graph
            .get(node_id)
            .and_then(|n| n.messages.get(index))
            .cloned();
        let Some(raw) = raw else {
            return Err(self.halt(DialogueError::StalePosition(node_id.to_string())));
        };

        let content = self.format_content(&raw);
        debug!("Bot says: {content}");
        let height = self.presenter.render_bubble(
            Speaker::Bot,
            &content,
            self.settings.behaviour.show_typing_dots,
        );
        self.expand(height);
        Ok(())
    }

    fn reveal_answers(&mut self) -> Result<(), DialogueError> {
        let node_id = self.state.current_position.clone();
        let labels = match self.graph.get(&node_id) {
            Some(node) => node.answer_labels.clone(),
            None => return Err(self.halt(DialogueError::StalePosition(node_id))),
        };

        if labels.is_empty() {
            self.phase = Phase::Finished;
            info!("No more answers after '{node_id}', conversation finished");
            return Ok(());
        }

        debug!("Show answers for '{node_id}': {labels:?}");
        let choices: Vec<FormattedText> = labels.iter().map(|l| self.format_content(l)).collect();
        let height = self.presenter.render_answer_choices(&choices);
        if self.settings.behaviour.auto_resize {
            self.state.answer_area_height = height;
        }
        self.expand(height);
        self.phase = Phase::AwaitingAnswer;

        let behaviour = &self.settings.behaviour;
        if behaviour.auto_scroll {
            if behaviour.auto_scroll_after_first_answer && node_id == ENTRY_NODE {
                debug!("Skip scrolling on first reply");
            } else {
                self.presenter
                    .request_scroll(self.settings.times.speed.scrolling_speed);
            }
        }
        Ok(())
    }

    /// Take answer `index` of the current node.
    ///
    /// Renders `captured` as the visitor's bubble, moves to the answer's target
    /// and starts talking there. On failure the position is left untouched
    /// and the conversation halts.
    pub fn resolve_answer(&mut self, index: usize, captured: FormattedText) -> Result<(), DialogueError> {
        let next = self.answer_target(index)?;

        info!(
            "Answer {index} of '{}' selected, next: '{next}'",
            self.state.current_position
        );
        let height = self.presenter.render_bubble(Speaker::Visitor, &captured, false);
        self.expand(height);

        self.state.current_position = next.clone();
        self.advance_from(&next)
    }

    /// Where answer `index` of the current node leads. Nothing is mutated
    /// unless the answer is unusable, in which case the conversation halts.
    fn answer_target(&mut self, index: usize) -> Result<String, DialogueError> {
        self.ensure_running()?;
        if !self.started || self.phase == Phase::AwaitingStart {
            return Err(DialogueError::NotStarted);
        }

        let current = self.state.current_position.clone();
        let next = match self.graph.get(&current) {
            Some(node) => node.transitions.get(index).cloned(),
            None => return Err(self.halt(DialogueError::StalePosition(current))),
        };
        let Some(next) = next else {
            return Err(self.halt(DialogueError::AnswerOutOfRange {
                node: current,
                index,
            }));
        };
        if !self.graph.contains(&next) {
            return Err(self.halt(DialogueError::UnknownNode(next)));
        }
        Ok(next)
    }

    /// Store a free-text value. Last write wins.
    pub fn record_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        debug!("Add form field: {name} = {value}");
        self.state.collected_form_data.insert(name, value);
    }

    // -- host events --------------------------------------------------------

    pub fn handle(&mut self, event: HostEvent) -> Result<Activation, DialogueError> {
        match event {
            HostEvent::AnswerSelected { index } => self.answer_selected(index),
            HostEvent::InputClicked { index } => Ok(self.input_clicked(index)),
            HostEvent::InputCommitted {
                field,
                value,
                answer_index,
            } => self.input_committed(&field, &value, answer_index),
        }
    }

    /// A click on answer `index`. Answers holding an input only resolve
    /// through [`Conversation::input_committed`].
    pub fn answer_selected(&mut self, index: usize) -> Result<Activation, DialogueError> {
        self.ensure_running()?;

        let label = self
            .current_node()
            .and_then(|n| n.answer_labels.get(index))
            .cloned();
        let captured = match label {
            Some(label) => format::format(&label, &self.settings),
            // resolve_answer reports why there is no such answer
            None => FormattedText::default(),
        };

        if captured.has_inputs() {
            debug!("Answer {index} holds an input, only a commit resolves it");
            return Ok(Activation::Ignored);
        }

        self.resolve_answer(index, captured)?;
        Ok(Activation::Resolved)
    }

    /// A click inside an input field never answers.
    pub fn input_clicked(&mut self, index: usize) -> Activation {
        debug!("Click into the input of answer {index}, ignoring");
        Activation::Ignored
    }

    /// The visitor committed `value` into `field` inside answer `answer_index`.
    /// Ignored unless that answer actually holds an input named `field`.
    pub fn input_committed(
        &mut self,
        field: &str,
        value: &str,
        answer_index: usize,
    ) -> Result<Activation, DialogueError> {
        self.answer_target(answer_index)?;

        let label = self
            .current_node()
            .and_then(|n| n.answer_labels.get(answer_index))
            .cloned()
            .unwrap_or_default();
        if !format::format(&label, &self.settings)
            .input_names()
            .contains(&field)
        {
            debug!("Answer {answer_index} has no input '{field}', ignoring commit");
            return Ok(Activation::Ignored);
        }

        let value = format::strip_tags(value);
        self.record_field(field, value.clone());
        self.resolve_answer(answer_index, FormattedText::plain(value))?;
        Ok(Activation::Resolved)
    }

    // -- helpers ------------------------------------------------------------

    /// Format `raw`; a `:submit:` marker posts the collected form data.
    fn format_content(&mut self, raw: &str) -> FormattedText {
        let content = format::format(raw, &self.settings);
        if content.submit {
            self.submit_form();
        }
        content
    }

    fn submit_form(&mut self) {
        let form_post = &self.settings.form_post;
        let submission = FormSubmission {
            url: form_post.ajax_url.clone(),
            method: form_post.ajax_type.clone(),
            data: self.state.collected_form_data.clone(),
        };
        info!(
            "Submitting {} form fields via {} to '{}'",
            submission.data.len(),
            submission.method,
            submission.url
        );

        if let Err(e) = self.presenter.submit_form(submission) {
            if self.settings.debug {
                warn!("Form submission failed: {e}");
            }
        }
    }

    fn expand(&mut self, by: u32) {
        if !self.settings.behaviour.auto_resize {
            return;
        }
        self.state.container_height = self.state.container_height.saturating_add(by);
        debug!("Resize chat by {by}px to {}px", self.state.container_height);
        self.presenter.request_resize(by);
    }

    fn ensure_running(&self) -> Result<(), DialogueError> {
        match self.phase {
            Phase::Halted => Err(DialogueError::Halted),
            _ => Ok(()),
        }
    }

    fn halt(&mut self, err: DialogueError) -> DialogueError {
        warn!("Conversation halted: {err}");
        self.timeline.cancel_all();
        self.phase = Phase::Halted;
        err
    }
}
