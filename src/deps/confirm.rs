//! Yes/no confirmation for overwriting dependencies and published versions.

use std::io::{BufRead, Write};

/// Answers yes/no questions. Anything but an explicit yes means "no".
pub trait Confirm: Send + Sync {
    fn confirm(&self, question: &str) -> bool;
}

impl<T: Confirm + ?Sized> Confirm for Box<T> {
    fn confirm(&self, question: &str) -> bool {
        (**self).confirm(question)
    }
}

/// Always answers yes (`--yes`).
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _question: &str) -> bool {
        true
    }
}

/// Always answers no.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeNo;

impl Confirm for AssumeNo {
    fn confirm(&self, _question: &str) -> bool {
        false
    }
}

/// Asks on stderr and reads the answer from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, question: &str) -> bool {
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "{} (Y/N) ", question);
        let _ = stderr.flush();

        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(_) => is_yes(&line),
            Err(_) => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}
