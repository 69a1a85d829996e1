//! Interactive input

use dialoguer::{theme::ColorfulTheme, Input};
use std::io::{self, BufRead, IsTerminal, Write};

/// Source of free-text lines, one per prompt
pub trait LineSource {
    /// Shows `prompt` and returns the line entered, without the trailing newline
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;
}

impl<L: LineSource + ?Sized> LineSource for &mut L {
    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        (**self).read_line(prompt)
    }
}

/// Reads lines from the controlling terminal, or plain lines when stdin is piped
pub struct Terminal {
    theme: ColorfulTheme,
}

impl Terminal {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl LineSource for Terminal {
    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        // dialoguer returns an empty answer instead of reading a redirected stdin
        if io::stdin().is_terminal() && console::user_attended() {
            return Input::<String>::with_theme(&self.theme)
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text();
        }

        eprint!("{}: ", prompt);
        io::stderr().flush()?;
        read_plain_line(io::stdin().lock())
    }
}

/// Reads one line from `reader`, dropping the trailing `\n` or `\r\n`
///
/// # Errors
/// * `io::ErrorKind::UnexpectedEof` - If the input is already exhausted
pub fn read_plain_line<B: BufRead>(mut reader: B) -> io::Result<String> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "input closed before a line was entered",
        ));
    }

    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(line)
}

/// Configuration path selected from the menu
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Dhcp,
    Manual,
}

impl Mode {
    /// Maps a menu answer to a mode
    ///
    /// Only `1` selects DHCP; every other answer, including an empty one, selects manual.
    pub fn from_choice(choice: &str) -> Self {
        match choice.trim() {
            "1" => Mode::Dhcp,
            _ => Mode::Manual,
        }
    }
}
