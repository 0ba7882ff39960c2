//! Interactive confirmation prompts.

use dialoguer::{theme::ColorfulTheme, Confirm as DialoguerConfirm};
use std::io::{self, IsTerminal};

/// `true` iff stdin and stdout are both attached to a terminal. Non-interactive
/// runs (pipes, CI) fall back to each prompt's default answer.
pub fn is_interactive() -> bool {
    io::stdin().is_terminal() && io::stdout().is_terminal()
}

fn get_theme() -> ColorfulTheme {
    ColorfulTheme::default()
}

/// A yes/no confirmation, used before any plan with conflicts or an
/// expanded dependency closure, unless `-y` was passed.
pub struct Confirm {
    message: String,
    default: Option<bool>,
}

impl Confirm {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            default: None,
        }
    }

    pub const fn default(mut self, value: bool) -> Self {
        self.default = Some(value);
        self
    }

    pub fn prompt(self) -> io::Result<bool> {
        if !is_interactive() {
            return Ok(self.default.unwrap_or(false));
        }

        let theme = get_theme();
        let mut prompt = DialoguerConfirm::with_theme(&theme).with_prompt(&self.message);
        if let Some(default) = self.default {
            prompt = prompt.default(default);
        }
        prompt.interact().map_err(io::Error::other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_interactive_confirm_uses_default() {
        // In CI/test harnesses stdin/stdout are not a tty.
        let confirm = Confirm::new("proceed?").default(true);
        if !is_interactive() {
            assert!(confirm.prompt().unwrap());
        }
    }
}
