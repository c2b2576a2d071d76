use anyhow::Result;
use std::fmt;

use crate::core::io::{Console, QuitRequested};

/// Typing this at any prompt (any letter-case) leaves the program.
pub const QUIT_TOKEN: &str = "exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Integer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Text(String),
    Integer(i64),
}

impl From<&str> for Answer {
    fn from(value: &str) -> Self {
        Answer::Text(value.to_string())
    }
}

impl From<i64> for Answer {
    fn from(value: i64) -> Self {
        Answer::Integer(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    NotANumber,
    NotAllowed(InputKind),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Empty => write!(f, "Input cannot be empty. Please try again."),
            Rejection::NotANumber => write!(f, "Please enter a valid number."),
            Rejection::NotAllowed(InputKind::Text) => write!(f, "Invalid input. Please try again."),
            Rejection::NotAllowed(InputKind::Integer) => {
                write!(f, "Invalid input. Please choose from the valid options.")
            }
        }
    }
}

pub fn is_quit_token(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case(QUIT_TOKEN)
}

/// Checks one raw line against the requested kind and allow-list.
/// Allow-list entries of the other kind never match.
pub fn validate(raw: &str, kind: InputKind, valid: Option<&[Answer]>) -> Result<Answer, Rejection> {
    let input = raw.trim();

    let answer = match kind {
        InputKind::Text => {
            if input.is_empty() {
                return Err(Rejection::Empty);
            }
            Answer::Text(input.to_string())
        }
        InputKind::Integer => {
            let value = input.parse::<i64>().map_err(|_| Rejection::NotANumber)?;
            Answer::Integer(value)
        }
    };

    let Some(valid) = valid else {
        return Ok(answer);
    };

    let allowed = valid.iter().any(|candidate| match (candidate, &answer) {
        (Answer::Text(expected), Answer::Text(given)) => expected.eq_ignore_ascii_case(given),
        (Answer::Integer(expected), Answer::Integer(given)) => expected == given,
        _ => false,
    });

    if allowed {
        Ok(answer)
    } else {
        Err(Rejection::NotAllowed(kind))
    }
}

/// Prompts until the user gives an acceptable value or the quit token.
/// Invalid values are answered with a corrective line and never reach the caller.
pub fn ask_user_input(
    console: &mut dyn Console,
    prompt: &str,
    kind: InputKind,
    valid: Option<&[Answer]>,
) -> Result<Answer> {
    loop {
        let raw = console.read_line(prompt)?;

        if is_quit_token(&raw) {
            log::info!("Quit requested at prompt: {}", prompt);
            return Err(QuitRequested.into());
        }

        match validate(&raw, kind, valid) {
            Ok(answer) => return Ok(answer),
            Err(rejection) => {
                log::debug!("Rejected input {:?}: {:?}", raw, rejection);
                console.write_line(&rejection.to_string());
            }
        }
    }
}

pub fn ask_text(console: &mut dyn Console, prompt: &str, valid: Option<&[&str]>) -> Result<String> {
    let valid: Option<Vec<Answer>> = valid.map(|v| v.iter().map(|s| Answer::from(*s)).collect());
    match ask_user_input(console, prompt, InputKind::Text, valid.as_deref())? {
        Answer::Text(text) => Ok(text),
        Answer::Integer(value) => Ok(value.to_string()),
    }
}

pub fn ask_integer(console: &mut dyn Console, prompt: &str, valid: Option<&[i64]>) -> Result<i64> {
    let valid: Option<Vec<Answer>> = valid.map(|v| v.iter().map(|n| Answer::from(*n)).collect());
    match ask_user_input(console, prompt, InputKind::Integer, valid.as_deref())? {
        Answer::Integer(value) => Ok(value),
        Answer::Text(text) => Err(anyhow::anyhow!("Expected a number, got {:?}", text)),
    }
}
