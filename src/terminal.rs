use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use log::{debug, info, warn};
use serde_json::json;

use talkflow::dialogue::Definition;
use talkflow::engine::{Activation, Conversation, Phase};
use talkflow::error::PresentationError;
use talkflow::format::{self, FormattedText};
use talkflow::presenter::{FormSubmission, Measurements, Presenter, Speaker};
use talkflow::settings::Settings;

// ---------------------------------------------------------------------------
// Terminal presenter
// ---------------------------------------------------------------------------

/// Prints bubbles to stdout. Heights are counted in printed lines.
#[derive(Debug, Default)]
pub struct TerminalPresenter {
    debug: bool,
    rows: u32,
}

impl Presenter for TerminalPresenter {
    fn mount(&mut self, settings: &Settings) -> Result<Measurements, PresentationError> {
        self.debug = settings.debug;
        self.rows = 0;
        Ok(Measurements::default())
    }

    fn render_bubble(&mut self, speaker: Speaker, content: &FormattedText, _show_typing_first: bool) -> u32 {
        match speaker {
            Speaker::Bot => println!("\n[Bot]: {content}"),
            Speaker::Visitor => println!("\n[You]: {content}"),
        }
        2
    }

    fn render_answer_choices(&mut self, choices: &[FormattedText]) -> u32 {
        println!();
        for (i, choice) in choices.iter().enumerate() {
            println!("  [{}] {choice}", i + 1);
        }
        choices.len() as u32 + 1
    }

    fn request_resize(&mut self, delta: u32) {
        self.rows += delta;
        debug!("Transcript is {} rows tall", self.rows);
    }

    fn request_scroll(&mut self, _speed_ms: u64) {
        // stdout scrolls by itself
    }

    fn submit_form(&mut self, submission: FormSubmission) -> Result<(), PresentationError> {
        if submission.url.is_empty() {
            return Err(PresentationError::Submission(
                "no formPost.ajaxUrl configured".into(),
            ));
        }
        let method = reqwest::Method::from_bytes(submission.method.as_bytes())
            .map_err(|e| PresentationError::Submission(e.to_string()))?;
        let debug = self.debug;

        // Detached: the conversation never waits for the response.
        thread::spawn(move || {
            let client = reqwest::blocking::Client::new();
            let request = if method == reqwest::Method::GET {
                client.get(&submission.url).query(&submission.data)
            } else {
                client.request(method, &submission.url).form(&submission.data)
            };
            match request.send().and_then(|r| r.error_for_status()) {
                Ok(response) => info!("Form submitted: {}", response.status()),
                Err(e) if debug => warn!("Form submission to '{}' failed: {e}", submission.url),
                Err(_) => {}
            }
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

enum Choice {
    Answer(usize),
    Quit,
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn is_quit(input: &str) -> bool {
    input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit")
}

fn prompt_choice(count: usize) -> Result<Choice> {
    loop {
        let input = read_line("\n> ")?;
        if is_quit(&input) {
            return Ok(Choice::Quit);
        }
        match input.parse::<usize>() {
            Ok(n) if (1..=count).contains(&n) => return Ok(Choice::Answer(n - 1)),
            _ => println!("  Pick a number between 1 and {count}."),
        }
    }
}

/// Read the visitor's post-conversation choice. Returns `true` to restart.
fn prompt_restart() -> Result<bool> {
    loop {
        match read_line("> ")?.to_lowercase().as_str() {
            "r" => return Ok(true),
            "q" => return Ok(false),
            _ => println!("  Press [r] to restart or [q] to quit."),
        }
    }
}

// ---------------------------------------------------------------------------
// Single conversation
// ---------------------------------------------------------------------------

enum Outcome {
    Finished { last_node: String, fields: usize },
    Quit,
}

fn play_round(definition: &Definition, browser_language: &str) -> Result<Outcome> {
    let mut chat = Conversation::from_definition(definition, browser_language, TerminalPresenter::default())?;
    chat.start()?;
    info!("Conversation started, language '{}'", chat.state().resolved_language);

    loop {
        match chat.phase() {
            Phase::AwaitingStart | Phase::Talking => {
                let Some(deadline) = chat.next_deadline() else {
                    anyhow::bail!("conversation stalled at '{}'", chat.state().current_position);
                };
                thread::sleep(Duration::from_millis(deadline.saturating_sub(chat.now())));
                chat.advance_to(deadline)?;
            }
            Phase::AwaitingAnswer => {
                let labels = chat
                    .current_node()
                    .map(|n| n.answer_labels.clone())
                    .unwrap_or_default();
                let index = match prompt_choice(labels.len())? {
                    Choice::Answer(i) => i,
                    Choice::Quit => return Ok(Outcome::Quit),
                };

                let answer = format::format(&labels[index], chat.settings());
                let inputs: Vec<String> = answer.input_names().into_iter().map(String::from).collect();

                let activation = match inputs.split_last() {
                    None => chat.answer_selected(index)?,
                    Some((last, rest)) => {
                        for field in rest {
                            let value = read_line(&format!("  {field}: "))?;
                            chat.record_field(field.as_str(), format::strip_tags(&value));
                        }
                        let value = read_line(&format!("  {last}: "))?;
                        chat.input_committed(last, &value, index)?
                    }
                };
                debug!("Answer {index}: {activation:?}");
                if activation == Activation::Ignored {
                    println!("  (nothing happened)");
                }
            }
            Phase::Finished => {
                return Ok(Outcome::Finished {
                    last_node: chat.state().current_position.clone(),
                    fields: chat.state().collected_form_data.len(),
                });
            }
            Phase::Halted => anyhow::bail!("conversation halted"),
        }
    }
}

fn show_end(outcome: &Outcome) {
    println!("\n========================================");
    match outcome {
        Outcome::Finished { last_node, fields } => {
            println!("  Conversation finished at '{last_node}'.");
            println!("  Fields collected: {fields}");
        }
        Outcome::Quit => println!("  You left the conversation."),
    }
    println!("========================================\n");
    println!("  [r] Restart    [q] Quit\n");
}

// ---------------------------------------------------------------------------
// Public entry point: plays conversations until the visitor quits
// ---------------------------------------------------------------------------

pub fn run(definition: &Definition, browser_language: &str) -> Result<()> {
    loop {
        println!("\n========================================");
        println!("                TALKFLOW");
        println!("========================================");
        println!("Pick answers by number. Type 'quit' to leave.");

        let outcome = play_round(definition, browser_language)?;
        show_end(&outcome);

        if !prompt_restart()? {
            println!("Bye!");
            break;
        }

        info!("Visitor chose to restart");
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Built-in demo conversation
// ---------------------------------------------------------------------------

/// Played when no definition file is given.
pub fn demo_definition() -> Definition {
    Definition {
        config: Some(json!({
            "behaviour": {"showTypingDots": true},
            "times": {"delay": {"dots": 300, "botsTalk": 600, "showAnswer": 100}}
        })),
        talk: Some(json!({
            "init": {
                "talks": ["Hi there :emoji:wave:", "I can tell you about this project."],
                "answers": ["What is it?", "Keep me posted", "No thanks"],
                "next": ["about", "signup", "bye"]
            },
            "about": {
                "talks": [
                    "A small engine that plays scripted conversations.",
                    "The source lives on [GitHub](https://github.com \"Source code\")."
                ],
                "answers": ["Keep me posted", "Got it"],
                "next": ["signup", "bye"]
            },
            "signup": {
                "talks": ["Sure! Where can I reach you?"],
                "answers": ["My email is :input:email:"],
                "next": ["thanks"]
            },
            "thanks": {
                "talks": ["Thanks, I saved your address. :submit:"],
                "answers": ["Back to start"],
                "next": ["init"]
            },
            "bye": {"talks": ["Have a nice day!"]}
        })),
    }
}
