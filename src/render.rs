//! Terminal output: colors via `colored`, panel boxes sized with `unicode-width`.

use std::io::Write;

use colored::Colorize;
use session_store::SessionState;
use unicode_width::UnicodeWidthStr;

use crate::app::{format_temperature, Output};
use crate::runtime::TurnResult;

pub const PROMPT: &str = "> ";

const HELP_LINES: [&str; 10] = [
    "/help                 show this",
    "/exit                 quit",
    "/new                  new chat",
    "/save                 save chat",
    "/load <id>            load saved chat",
    "/list                 list saved chats",
    "/mode <name>          default|coding|tutor|snark",
    "/temp <0.0-2.0>       set temperature",
    "/ctx <N>              set max context chars",
    "/clear                clear history",
];

/// A panel row: display width of the plain text plus its styled rendering.
struct PanelLine {
    width: usize,
    text: String,
}

impl PanelLine {
    fn new(plain: &str, text: String) -> Self {
        Self {
            width: UnicodeWidthStr::width(plain),
            text,
        }
    }

    fn plain(plain: &str) -> Self {
        Self::new(plain, plain.to_owned())
    }
}

fn draw_panel(title: Option<&str>, lines: &[PanelLine]) -> String {
    let title_width = title.map_or(0, |title| UnicodeWidthStr::width(title) + 3);
    let content_width = lines
        .iter()
        .map(|line| line.width)
        .max()
        .unwrap_or(0)
        .max(title_width.saturating_sub(1));
    let inner = content_width + 2;

    let mut out = String::new();
    let top = match title {
        Some(title) => format!(
            "╭─ {} {}╮",
            title.bold(),
            "─".repeat(inner - title_width)
        ),
        None => format!("╭{}╮", "─".repeat(inner)),
    };
    out.push_str(&top);
    out.push('\n');

    for line in lines {
        out.push_str(&format!(
            "│ {}{} │\n",
            line.text,
            " ".repeat(content_width - line.width)
        ));
    }
    out.push_str(&format!("╰{}╯", "─".repeat(inner)));
    out
}

#[must_use]
pub fn header(state: &SessionState) -> String {
    let details = format!(
        "  session={}  mode={}  temp={}  ctx_chars={}",
        state.session_id,
        state.mode,
        format_temperature(state.temperature),
        state.max_ctx_chars
    );
    let plain = format!("LocalGPT{details}");
    draw_panel(
        None,
        &[PanelLine::new(
            &plain,
            format!("{}{}", "LocalGPT".bold(), details.dimmed()),
        )],
    )
}

#[must_use]
pub fn help() -> String {
    let mut lines = vec![PanelLine::new("Commands", "Commands".bold().to_string())];
    lines.extend(HELP_LINES.iter().map(|line| PanelLine::plain(&format!("  {line}"))));
    lines.push(PanelLine::plain(""));
    let tip = "Tip: Ctrl+C during generation cancels the answer (app stays open).";
    lines.push(PanelLine::new(tip, tip.dimmed().to_string()));
    draw_panel(Some("LocalGPT Help"), &lines)
}

#[must_use]
pub fn session_list(ids: &[String]) -> String {
    let lines: Vec<PanelLine> = ids.iter().map(|id| PanelLine::plain(id)).collect();
    draw_panel(Some("Saved sessions"), &lines)
}

#[must_use]
pub fn output(output: &Output, state: &SessionState) -> String {
    match output {
        Output::Header => header(state),
        Output::Help => help(),
        Output::Dim(text) => dim(text),
        Output::Success(text) => text.green().to_string(),
        Output::Failure(text) => failure(text),
        Output::SessionList(ids) => session_list(ids),
    }
}

#[must_use]
pub fn dim(text: &str) -> String {
    text.dimmed().to_string()
}

/// Red text; for `Label: detail` messages only the label is red.
#[must_use]
pub fn failure(text: &str) -> String {
    match text.split_once(' ') {
        Some((label, detail)) if label.ends_with(':') => {
            format!("{} {detail}", label.red())
        }
        _ => text.red().to_string(),
    }
}

#[must_use]
pub fn assistant_banner() -> String {
    format!("{} {}", "──".green(), "assistant".green().bold())
}

#[must_use]
pub fn turn_result(result: &TurnResult) -> Option<String> {
    match result {
        TurnResult::Completed { .. } => None,
        TurnResult::Cancelled => Some(dim("(cancelled)")),
        TurnResult::Failed { message } => Some(format!("{} {message}", "API error:".red())),
    }
}

#[must_use]
pub fn bye() -> String {
    dim("bye")
}

/// Echoes streamed reply text, flushing after every delta.
///
/// The first write failure is logged and later deltas are dropped; the reply
/// itself is still collected by the turn runner.
#[derive(Debug)]
pub struct DeltaWriter<W> {
    out: W,
    failed: bool,
}

impl<W: Write> DeltaWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, failed: false }
    }

    pub fn write(&mut self, delta: &str) {
        if self.failed {
            return;
        }
        let written = self
            .out
            .write_all(delta.as_bytes())
            .and_then(|()| self.out.flush());
        if let Err(error) = written {
            tracing::warn!(%error, "failed to write reply to terminal");
            self.failed = true;
        }
    }

    #[must_use]
    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
