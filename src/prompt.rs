// src/prompt.rs
use std::io;

/// Source of a password when none was given on the command line.
pub trait PasswordPrompt {
    fn prompt(&self, label: &str) -> io::Result<String>;
}

/// Reads from the controlling terminal without echo.
pub struct TerminalPrompt;

impl PasswordPrompt for TerminalPrompt {
    fn prompt(&self, label: &str) -> io::Result<String> {
        rpassword::prompt_password(label)
    }
}

/// Returns `given`, or asks for a password if there is none.
pub fn resolve_password(given: Option<String>, prompt: &impl PasswordPrompt) -> io::Result<String> {
    match given {
        Some(password) => Ok(password),
        None => prompt.prompt("Password: "),
    }
}
