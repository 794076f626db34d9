//! Colored terminal output for command progress.

use std::fmt::Display;

use console::{Style, Term};

/// Writes styled lines to stderr.
pub(crate) struct Output {
    term: Term,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    pub(crate) fn info(&self, msg: impl Display) {
        self.line(&Style::new(), msg);
    }

    /// Green line.
    pub(crate) fn success(&self, msg: impl Display) {
        self.line(&Style::new().green(), msg);
    }

    /// Yellow line.
    pub(crate) fn warning(&self, msg: impl Display) {
        self.line(&Style::new().yellow(), msg);
    }

    /// Red line.
    pub(crate) fn error(&self, msg: impl Display) {
        self.line(&Style::new().red(), msg);
    }

    /// Cyan bold line.
    pub(crate) fn highlight(&self, msg: impl Display) {
        self.line(&Style::new().cyan().bold(), msg);
    }

    /// Ask a yes/no question, defaulting to no.
    ///
    /// Always answers no when the terminal is not attended.
    pub(crate) fn confirm(&self, question: &str) -> std::io::Result<bool> {
        self.term.write_str(&format!("{question} [y/N] "))?;
        let answer = self.term.read_line()?;
        Ok(is_yes(&answer))
    }

    fn line(&self, style: &Style, msg: impl Display) {
        // Progress output is best effort; a closed stderr must not abort a command
        let _ = self.term.write_line(&style.apply_to(msg).to_string());
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
