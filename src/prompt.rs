//! Interactive secret prompt.
//!
//! [`SecretPrompter`] is the capability the credential resolver uses to ask
//! the user for input. [`TerminalPrompter`] is the real implementation: on a
//! TTY it draws a single masked input field on stderr using crossterm raw
//! mode. Without a TTY it either reads one line from stdin, so scripted use
//! (`echo id@secret | qernal auth login`) keeps working, or refuses when
//! stdin carries a secret payload for the command itself.
//! [`ScriptedPrompter`] replays canned answers for tests.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, IsTerminal, Write};

use crossterm::cursor::MoveToColumn;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::queue;
use crossterm::style::{Print, Stylize, style};
use crossterm::terminal::{self, Clear, ClearType};
use thiserror::Error;

/// Character used to mask typed input.
pub const MASK_CHAR: char = '•';

/// Errors from an interactive prompt.
#[derive(Debug, Error)]
pub enum PromptError {
    /// The user interrupted the prompt (Ctrl-C or end of input)
    #[error("input cancelled")]
    Cancelled,

    /// The user submitted an empty value with no default
    #[error("input is required")]
    EmptyInput,

    /// The terminal could not be read or drawn
    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

/// What to ask the user for.
#[derive(Debug, Clone, Default)]
pub struct PromptRequest {
    /// Text shown before the input field
    pub label: String,
    /// Hint shown while the field is empty
    pub placeholder: String,
    /// Value pre-filled into the field
    pub default: Option<String>,
}

impl PromptRequest {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// The request used for the platform credential.
    pub fn credential() -> Self {
        Self::new("Enter your Qernal token").placeholder("clientid@clientsecret")
    }
}

/// Capability to ask the user for a secret or a yes/no answer.
pub trait SecretPrompter {
    /// Ask for a secret value. Never returns an empty string.
    fn prompt_secret(&mut self, request: &PromptRequest) -> Result<String, PromptError>;

    /// Ask a yes/no question. Defaults to "no".
    fn confirm(&mut self, question: &str) -> Result<bool, PromptError>;
}

/// Path of the controlling terminal.
#[cfg(unix)]
const TTY_PATH: &str = "/dev/tty";

/// What stdin may be used for while prompting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdinUse {
    /// Stdin may carry answers when it is not a terminal
    Answers,
    /// Stdin carries the command's payload and is never read for answers
    Payload,
}

/// How a prompt is answered, given the terminal situation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnswerMode {
    /// Masked field on the controlling terminal
    Masked,
    /// One line from stdin
    Line,
    /// No way to ask
    Refuse,
}

fn answer_mode(
    stdin_use: StdinUse,
    stdin_tty: bool,
    stderr_tty: bool,
    controlling_tty: bool,
) -> AnswerMode {
    match stdin_use {
        StdinUse::Answers if stdin_tty && stderr_tty => AnswerMode::Masked,
        StdinUse::Answers => AnswerMode::Line,
        // crossterm reads keys from the controlling terminal when stdin is piped
        StdinUse::Payload if stderr_tty && (stdin_tty || controlling_tty) => AnswerMode::Masked,
        StdinUse::Payload => AnswerMode::Refuse,
    }
}

/// Prompter bound to the controlling terminal.
#[derive(Debug)]
pub struct TerminalPrompter {
    stdin_use: StdinUse,
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalPrompter {
    /// Prompter that falls back to reading answers from stdin.
    pub fn new() -> Self {
        Self {
            stdin_use: StdinUse::Answers,
        }
    }

    /// Prompter for commands whose stdin is a secret payload.
    ///
    /// Answers only come from the controlling terminal; without one every
    /// prompt is [`PromptError::Cancelled`].
    pub fn terminal_only() -> Self {
        Self {
            stdin_use: StdinUse::Payload,
        }
    }

    fn mode(&self) -> AnswerMode {
        answer_mode(
            self.stdin_use,
            std::io::stdin().is_terminal(),
            std::io::stderr().is_terminal(),
            open_controlling_terminal().is_ok(),
        )
    }
}

impl SecretPrompter for TerminalPrompter {
    fn prompt_secret(&mut self, request: &PromptRequest) -> Result<String, PromptError> {
        match self.mode() {
            AnswerMode::Masked => masked_input(request),
            AnswerMode::Line => {
                let stdin = std::io::stdin();
                read_line_secret(&mut stdin.lock(), request)
            }
            AnswerMode::Refuse => {
                tracing::debug!("no terminal to prompt on, stdin is reserved for the payload");
                Err(PromptError::Cancelled)
            }
        }
    }

    fn confirm(&mut self, question: &str) -> Result<bool, PromptError> {
        let mode = self.mode();
        if mode == AnswerMode::Refuse {
            return Err(PromptError::Cancelled);
        }

        let mut stderr = std::io::stderr();
        write!(stderr, "{} [y/N]: ", question)?;
        stderr.flush()?;
        if self.stdin_use == StdinUse::Payload && !std::io::stdin().is_terminal() {
            let tty = open_controlling_terminal()?;
            return read_confirm(&mut BufReader::new(tty));
        }
        let stdin = std::io::stdin();
        read_confirm(&mut stdin.lock())
    }
}

#[cfg(unix)]
fn open_controlling_terminal() -> std::io::Result<std::fs::File> {
    std::fs::OpenOptions::new().read(true).write(true).open(TTY_PATH)
}

#[cfg(not(unix))]
fn open_controlling_terminal() -> std::io::Result<std::fs::File> {
    Err(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "no controlling terminal",
    ))
}

/// Read a secret from a non-interactive line source.
///
/// End of input is a cancellation; an empty line takes the default if there
/// is one and is otherwise [`PromptError::EmptyInput`].
pub fn read_line_secret<R: BufRead>(
    reader: &mut R,
    request: &PromptRequest,
) -> Result<String, PromptError> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(PromptError::Cancelled);
    }
    let value = line.trim_end_matches(['\r', '\n']);
    if !value.is_empty() {
        return Ok(value.to_string());
    }
    match &request.default {
        Some(default) if !default.is_empty() => Ok(default.clone()),
        _ => Err(PromptError::EmptyInput),
    }
}

/// Read a yes/no answer. Anything other than `y`/`yes` is "no".
pub fn read_confirm<R: BufRead>(reader: &mut R) -> Result<bool, PromptError> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(PromptError::Cancelled);
    }
    Ok(matches!(
        line.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

/// Restores cooked mode when dropped, including on early return.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> std::io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Result of feeding one key to the input field.
#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Submit,
    Cancel,
}

/// State of the single-line masked input field.
#[derive(Debug, Default)]
struct InputField {
    value: String,
    error: Option<String>,
}

impl InputField {
    fn new(default: Option<&str>) -> Self {
        Self {
            value: default.unwrap_or_default().to_string(),
            error: None,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                KeyOutcome::Cancel
            }
            KeyCode::Esc => KeyOutcome::Cancel,
            KeyCode::Enter => {
                if self.value.is_empty() {
                    self.error = Some(PromptError::EmptyInput.to_string());
                }
                KeyOutcome::Submit
            }
            KeyCode::Backspace => {
                self.value.pop();
                self.error = None;
                KeyOutcome::Continue
            }
            KeyCode::Char(c) => {
                self.value.push(c);
                self.error = None;
                KeyOutcome::Continue
            }
            _ => KeyOutcome::Continue,
        }
    }

    fn masked(&self) -> String {
        std::iter::repeat_n(MASK_CHAR, self.value.chars().count()).collect()
    }
}

fn render(
    out: &mut impl Write,
    request: &PromptRequest,
    field: &InputField,
) -> std::io::Result<()> {
    queue!(
        out,
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(format!("{}: ", request.label))
    )?;
    if field.value.is_empty() {
        queue!(out, Print(style(request.placeholder.as_str()).dark_grey()))?;
        queue!(out, MoveToColumn((request.label.chars().count() + 2) as u16))?;
    } else {
        queue!(out, Print(field.masked()))?;
    }
    out.flush()
}

fn masked_input(request: &PromptRequest) -> Result<String, PromptError> {
    let mut stderr = std::io::stderr();
    let mut field = InputField::new(request.default.as_deref());

    let outcome = {
        let _guard = RawModeGuard::enable()?;
        render(&mut stderr, request, &field)?;
        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let outcome = field.handle_key(key);
            if outcome != KeyOutcome::Continue {
                break outcome;
            }
            render(&mut stderr, request, &field)?;
        }
    };

    writeln!(stderr)?;
    match outcome {
        KeyOutcome::Cancel => Err(PromptError::Cancelled),
        _ => match field.error {
            Some(message) => {
                writeln!(stderr, "{}", style(message).red())?;
                Err(PromptError::EmptyInput)
            }
            None => Ok(field.value),
        },
    }
}

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum ScriptedAnswer {
    Secret(String),
    Confirm(bool),
    Cancel,
}

/// Prompter that replays a fixed script, for tests.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<ScriptedAnswer>,
    /// Number of `prompt_secret` calls made
    pub secret_prompts: usize,
    /// Number of `confirm` calls made
    pub confirmations: usize,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = ScriptedAnswer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            ..Default::default()
        }
    }

    /// A prompter that must never be asked anything.
    pub fn silent() -> Self {
        Self::default()
    }

    /// Answers left unconsumed.
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl SecretPrompter for ScriptedPrompter {
    fn prompt_secret(&mut self, request: &PromptRequest) -> Result<String, PromptError> {
        self.secret_prompts += 1;
        match self.answers.pop_front() {
            Some(ScriptedAnswer::Secret(value)) if value.is_empty() => match &request.default {
                Some(default) if !default.is_empty() => Ok(default.clone()),
                _ => Err(PromptError::EmptyInput),
            },
            Some(ScriptedAnswer::Secret(value)) => Ok(value),
            Some(ScriptedAnswer::Cancel) | None => Err(PromptError::Cancelled),
            Some(other) => Err(PromptError::Terminal(std::io::Error::other(format!(
                "unexpected scripted answer {:?} for secret prompt",
                other
            )))),
        }
    }

    fn confirm(&mut self, question: &str) -> Result<bool, PromptError> {
        self.confirmations += 1;
        match self.answers.pop_front() {
            Some(ScriptedAnswer::Confirm(answer)) => Ok(answer),
            Some(ScriptedAnswer::Cancel) | None => Err(PromptError::Cancelled),
            Some(other) => Err(PromptError::Terminal(std::io::Error::other(format!(
                "unexpected scripted answer {:?} for {:?}",
                other, question
            )))),
        }
    }
}
