//! Line-editor helper: slash-command completion, hints and highlighting.

use std::borrow::Cow::{self, Borrowed, Owned};

use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

use crate::commands::COMMAND_NAMES;
use crate::modes::mode_names;

#[derive(Debug, Clone, Default)]
pub struct CommandHelper;

impl CommandHelper {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Candidates for the text before the cursor.
    fn candidates(line: &str) -> (usize, Vec<String>) {
        if let Some(prefix) = line.strip_prefix("/mode ") {
            if !prefix.contains(' ') {
                let names = mode_names()
                    .filter(|name| name.starts_with(prefix))
                    .map(str::to_owned)
                    .collect();
                return ("/mode ".len(), names);
            }
        }

        if line.starts_with('/') && !line.contains(' ') {
            let names = COMMAND_NAMES
                .iter()
                .filter(|name| name.starts_with(line))
                .map(|name| (*name).to_owned())
                .collect();
            return (0, names);
        }

        (0, Vec::new())
    }
}

impl Helper for CommandHelper {}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, names) = Self::candidates(&line[..pos]);
        let pairs = names
            .into_iter()
            .map(|name| Pair {
                display: name.clone(),
                replacement: name,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for CommandHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        let (start, names) = Self::candidates(line);
        let typed = line.len() - start;
        names
            .into_iter()
            .find(|name| name.len() > typed)
            .map(|name| name[typed..].to_owned())
    }
}

impl Highlighter for CommandHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        _default: bool,
    ) -> Cow<'b, str> {
        Owned(prompt.cyan().bold().to_string())
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Owned(hint.bright_black().to_string())
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Validator for CommandHelper {}
