use anyhow::{anyhow, Result};
use inquire::InquireError;
use std::collections::VecDeque;
use std::fmt;
use std::io::{BufRead, IsTerminal};

/// Raised when the user asks to leave the program from any prompt.
/// `main` turns it into a normal exit; everything in between just propagates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuitRequested;

impl fmt::Display for QuitRequested {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quit requested")
    }
}

impl std::error::Error for QuitRequested {}

pub fn is_quit(err: &anyhow::Error) -> bool {
    err.downcast_ref::<QuitRequested>().is_some()
}

/// Line-based user interface. Reads one raw line per prompt and writes whole lines.
pub trait Console: Send {
    fn read_line(&mut self, prompt: &str) -> Result<String>;
    fn write_line(&mut self, text: &str);
}

// --- Terminal Implementation ---

pub struct TerminalConsole {
    interactive: bool,
}

impl TerminalConsole {
    pub fn new() -> Self {
        Self {
            interactive: std::io::stdin().is_terminal(),
        }
    }

    fn read_piped(&self, prompt: &str) -> Result<String> {
        println!("{}", prompt);
        let mut line = String::new();
        let read = std::io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            // EOF on piped input behaves like the user walking away.
            return Err(QuitRequested.into());
        }
        Ok(line)
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for TerminalConsole {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        if !self.interactive {
            return self.read_piped(prompt);
        }

        match inquire::Text::new(prompt).prompt() {
            Ok(line) => Ok(line),
            Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => {
                Err(QuitRequested.into())
            }
            Err(InquireError::NotTTY) => self.read_piped(prompt),
            Err(e) => Err(anyhow!("Failed to read input: {}", e)),
        }
    }

    fn write_line(&mut self, text: &str) {
        println!("{}", text);
    }
}

// --- Scripted Implementation ---

/// Replays canned answers and records everything shown to the user.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    answers: VecDeque<String>,
    pub prompts: Vec<String>,
    pub output: Vec<String>,
}

impl ScriptedConsole {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
            output: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    pub fn printed(&self, needle: &str) -> usize {
        self.output.iter().filter(|line| line.contains(needle)).count()
    }
}

impl Console for ScriptedConsole {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        self.prompts.push(prompt.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| anyhow!("Scripted console ran out of input at prompt: {}", prompt))
    }

    fn write_line(&mut self, text: &str) {
        self.output.push(text.to_string());
    }
}
