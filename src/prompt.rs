//! Line-oriented user prompts
//!
//! The session asks for input through [`InputProvider`] so it can be driven
//! from a terminal or from canned answers.

use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::io::{BufRead, IsTerminal, Write};

/// Source of answers to text prompts
pub trait InputProvider {
    /// Show `prompt` and return the line the user entered
    fn read_line(&mut self, prompt: &str) -> Result<String>;
}

/// Reads answers from the terminal, or line by line from piped stdin
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalInput;

impl InputProvider for TerminalInput {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        let stdin = std::io::stdin();
        if stdin.is_terminal() {
            return dialoguer::Input::<String>::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
                .map_err(|e| Error::Io(std::io::Error::other(e.to_string())));
        }

        let mut stdout = std::io::stdout();
        write!(stdout, "{}: ", prompt)?;
        stdout.flush()?;
        read_answer(&mut stdin.lock(), prompt)
    }
}

/// Read one answer line; end of input before any byte is an error
fn read_answer(reader: &mut dyn BufRead, prompt: &str) -> Result<String> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("input closed before an answer to '{}'", prompt),
        )));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Answers prompts from a fixed list, in order
#[derive(Clone, Debug, Default)]
pub struct ScriptedInput {
    answers: VecDeque<String>,
    prompts: Vec<String>,
}

impl ScriptedInput {
    /// Create a provider that returns `answers` one per prompt
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }

    /// Prompts shown so far
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

impl InputProvider for ScriptedInput {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        self.prompts.push(prompt.to_string());
        self.answers.pop_front().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("no answer left for prompt '{}'", prompt),
            ))
        })
    }
}

/// Ask for the publisher identifier; empty input is rejected
pub fn ask_publisher(input: &mut dyn InputProvider) -> Result<String> {
    let answer = input.read_line("Please enter the GBIF publisher UUID")?;
    let publisher = answer.trim();
    if publisher.is_empty() {
        return Err(Error::InvalidInput(
            "publisher UUID cannot be empty".to_string(),
        ));
    }
    Ok(publisher.to_string())
}

/// Ask a yes/no question; only "y" and "yes" (any case) count as yes
pub fn ask_yes_no(input: &mut dyn InputProvider, prompt: &str) -> Result<bool> {
    let answer = input.read_line(prompt)?;
    Ok(matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes"
    ))
}
