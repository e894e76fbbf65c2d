//! Session context and slash-command handlers.
//!
//! Handlers never print; they return [`Output`] items for the renderer so the
//! whole command surface is testable without a terminal.

use chat_context::{prompt_len, trim_to_budget, TrimmedContext, Turn};
use session_store::{
    clamp_max_ctx_chars, clamp_temperature, new_session_id, SessionState, SessionStore,
    SessionStoreError,
};

use crate::commands::SlashCommand;
use crate::modes::{mode_names, system_instruction, system_instruction_or_default, DEFAULT_MODE};

/// Something the shell should show after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Session summary panel.
    Header,
    Help,
    Dim(String),
    Success(String),
    Failure(String),
    SessionList(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Continue(Vec<Output>),
    Exit,
}

/// Prompt ready to send for the newest user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTurn {
    pub prompt: String,
    /// Oldest turns removed from history to fit the budget.
    pub dropped: usize,
}

#[derive(Debug)]
pub struct ChatSession {
    state: SessionState,
    store: SessionStore,
}

impl ChatSession {
    /// Fresh session with a clock-derived id.
    pub fn start(store: SessionStore) -> Result<Self, SessionStoreError> {
        Ok(Self::with_state(store, SessionState::new(new_session_id()?)))
    }

    #[must_use]
    pub fn with_state(store: SessionStore, state: SessionState) -> Self {
        Self { state, store }
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.state.turns
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    #[must_use]
    pub fn system_instruction(&self) -> &'static str {
        system_instruction_or_default(&self.state.mode)
    }

    pub fn handle_command(&mut self, command: SlashCommand) -> CommandOutcome {
        let outputs = match command {
            SlashCommand::Exit => return CommandOutcome::Exit,
            SlashCommand::Help => vec![Output::Help],
            SlashCommand::New => self.new_session(),
            SlashCommand::Clear => {
                self.state.turns.clear();
                vec![Output::Dim("(cleared)".to_owned())]
            }
            SlashCommand::Mode(name) => self.set_mode(name.as_deref()),
            SlashCommand::Temp(value) => self.set_temperature(value.as_deref()),
            SlashCommand::Ctx(value) => self.set_max_ctx_chars(value.as_deref()),
            SlashCommand::Save => self.save(),
            SlashCommand::List => self.list(),
            SlashCommand::Load(session_id) => self.load(session_id.as_deref()),
            SlashCommand::Unknown(command) => vec![Output::Failure(format!(
                "Unknown command {command} (try /help)"
            ))],
        };
        CommandOutcome::Continue(outputs)
    }

    /// Append the user turn and trim history to the context budget.
    ///
    /// The retained turns replace the history, so dropped turns are gone for
    /// later requests too.
    pub fn prepare_turn(&mut self, user_text: &str) -> PreparedTurn {
        self.state.turns.push(Turn::user(user_text));

        let TrimmedContext {
            prompt, dropped, ..
        } = trim_to_budget(
            self.system_instruction(),
            &self.state.turns,
            self.state.max_ctx_chars,
        );
        if dropped > 0 {
            self.state.turns.drain(..dropped);
            tracing::debug!(
                dropped,
                retained = self.state.turns.len(),
                prompt_chars = prompt_len(&prompt),
                "trimmed history to context budget"
            );
        }

        PreparedTurn { prompt, dropped }
    }

    /// Record a completed assistant reply.
    pub fn commit_reply(&mut self, reply: &str) {
        self.state.turns.push(Turn::assistant(reply.trim()));
    }

    fn new_session(&mut self) -> Vec<Output> {
        match new_session_id() {
            Ok(session_id) => {
                self.state.session_id = session_id;
                self.state.turns.clear();
                vec![Output::Header]
            }
            Err(error) => vec![Output::Failure(format!("(failed to start session) {error}"))],
        }
    }

    fn set_mode(&mut self, name: Option<&str>) -> Vec<Output> {
        match name.filter(|name| system_instruction(name).is_some()) {
            Some(name) => {
                self.state.mode = name.to_owned();
                vec![Output::Success(format!("(mode={name})"))]
            }
            None => vec![Output::Failure(format!(
                "Modes: {}",
                mode_names().collect::<Vec<_>>().join(", ")
            ))],
        }
    }

    fn set_temperature(&mut self, value: Option<&str>) -> Vec<Output> {
        let Some(value) = value else {
            return vec![Output::Dim(format!(
                "temp={}",
                format_temperature(self.state.temperature)
            ))];
        };

        match value.parse::<f64>() {
            Ok(parsed) if parsed.is_finite() => {
                self.state.temperature = clamp_temperature(parsed);
                vec![Output::Success(format!(
                    "(temp={})",
                    format_temperature(self.state.temperature)
                ))]
            }
            _ => vec![Output::Failure("Invalid temperature".to_owned())],
        }
    }

    fn set_max_ctx_chars(&mut self, value: Option<&str>) -> Vec<Output> {
        let Some(value) = value else {
            return vec![Output::Dim(format!(
                "ctx_chars={}",
                self.state.max_ctx_chars
            ))];
        };

        match value.parse::<i64>() {
            Ok(parsed) => {
                let requested = usize::try_from(parsed.max(0)).unwrap_or(usize::MAX);
                self.state.max_ctx_chars = clamp_max_ctx_chars(requested);
                vec![Output::Success(format!(
                    "(ctx_chars={})",
                    self.state.max_ctx_chars
                ))]
            }
            Err(_) => vec![Output::Failure("Invalid ctx".to_owned())],
        }
    }

    fn save(&self) -> Vec<Output> {
        match self.store.save(&self.state) {
            Ok(path) => vec![Output::Success(format!("(saved) {}", path.display()))],
            Err(error) => {
                tracing::warn!(%error, "session save failed");
                vec![Output::Failure(format!("(failed to save) {error}"))]
            }
        }
    }

    fn list(&self) -> Vec<Output> {
        match self.store.list() {
            Ok(ids) if ids.is_empty() => vec![Output::Dim("(no saved sessions)".to_owned())],
            Ok(ids) => vec![Output::SessionList(ids)],
            Err(error) => vec![Output::Failure(format!("(failed to list) {error}"))],
        }
    }

    fn load(&mut self, session_id: Option<&str>) -> Vec<Output> {
        let Some(session_id) = session_id else {
            return vec![Output::Failure("Usage: /load <session_id>".to_owned())];
        };

        match self.store.load(session_id) {
            Ok(loaded) => {
                self.state = loaded.state;
                let mut outputs = Vec::new();
                if system_instruction(&self.state.mode).is_none() {
                    outputs.push(Output::Dim(format!(
                        "unknown mode '{}', using {DEFAULT_MODE}",
                        self.state.mode
                    )));
                    self.state.mode = DEFAULT_MODE.to_owned();
                }
                outputs.push(Output::Header);
                outputs.push(Output::Success("(loaded)".to_owned()));
                outputs
            }
            Err(error) => {
                tracing::warn!(%error, session_id, "session load failed");
                vec![Output::Failure(format!("(failed to load) {error}"))]
            }
        }
    }
}

/// Render a temperature the way it was typed for whole numbers, e.g. `2.0`.
#[must_use]
pub fn format_temperature(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chat_context::{Role, Turn};
    use session_store::{SessionState, SessionStore};
    use tempfile::TempDir;

    use super::{format_temperature, ChatSession, CommandOutcome, Output};
    use crate::commands::{parse_slash_command, SlashCommand};

    fn session() -> (TempDir, ChatSession) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path().join("sessions"));
        let session = ChatSession::with_state(store, SessionState::new("20260214-081530"));
        (dir, session)
    }

    fn run(session: &mut ChatSession, line: &str) -> Vec<Output> {
        let command = parse_slash_command(line).expect("slash command");
        match session.handle_command(command) {
            CommandOutcome::Continue(outputs) => outputs,
            CommandOutcome::Exit => panic!("unexpected exit"),
        }
    }

    #[test]
    fn exit_and_quit_leave_the_loop() {
        let (_dir, mut session) = session();
        assert_eq!(
            session.handle_command(SlashCommand::Exit),
            CommandOutcome::Exit
        );
        assert_eq!(
            session.handle_command(parse_slash_command("/quit").expect("command")),
            CommandOutcome::Exit
        );
    }

    #[test]
    fn mode_command_validates_names() {
        let (_dir, mut session) = session();

        assert_eq!(
            run(&mut session, "/mode coding"),
            vec![Output::Success("(mode=coding)".into())]
        );
        assert_eq!(session.state().mode, "coding");
        assert!(session.system_instruction().starts_with("You are a senior"));

        let outputs = run(&mut session, "/mode pirate");
        assert_eq!(
            outputs,
            vec![Output::Failure("Modes: default, coding, tutor, snark".into())]
        );
        assert_eq!(session.state().mode, "coding");
        assert!(matches!(run(&mut session, "/mode")[0], Output::Failure(_)));
    }

    #[test]
    fn temp_command_shows_clamps_and_rejects() {
        let (_dir, mut session) = session();

        assert_eq!(run(&mut session, "/temp"), vec![Output::Dim("temp=0.7".into())]);
        assert_eq!(
            run(&mut session, "/temp 5"),
            vec![Output::Success("(temp=2.0)".into())]
        );
        assert_eq!(
            run(&mut session, "/temp -1"),
            vec![Output::Success("(temp=0.0)".into())]
        );
        assert_eq!(
            run(&mut session, "/temp hot"),
            vec![Output::Failure("Invalid temperature".into())]
        );
        assert_eq!(
            run(&mut session, "/temp NaN"),
            vec![Output::Failure("Invalid temperature".into())]
        );
        assert_eq!(session.state().temperature, 0.0);
    }

    #[test]
    fn ctx_command_shows_floors_and_rejects() {
        let (_dir, mut session) = session();

        assert_eq!(
            run(&mut session, "/ctx"),
            vec![Output::Dim("ctx_chars=12000".into())]
        );
        assert_eq!(
            run(&mut session, "/ctx 500"),
            vec![Output::Success("(ctx_chars=2000)".into())]
        );
        assert_eq!(
            run(&mut session, "/ctx -5"),
            vec![Output::Success("(ctx_chars=2000)".into())]
        );
        assert_eq!(
            run(&mut session, "/ctx 30000"),
            vec![Output::Success("(ctx_chars=30000)".into())]
        );
        assert_eq!(
            run(&mut session, "/ctx lots"),
            vec![Output::Failure("Invalid ctx".into())]
        );
        assert_eq!(session.state().max_ctx_chars, 30000);
    }

    #[test]
    fn clear_keeps_session_id_and_new_replaces_it() {
        let (_dir, mut session) = session();
        session.prepare_turn("hello");
        session.commit_reply("hi");

        assert_eq!(run(&mut session, "/clear"), vec![Output::Dim("(cleared)".into())]);
        assert!(session.turns().is_empty());
        assert_eq!(session.state().session_id, "20260214-081530");

        session.prepare_turn("again");
        assert_eq!(run(&mut session, "/new"), vec![Output::Header]);
        assert!(session.turns().is_empty());
        assert_ne!(session.state().session_id, "20260214-081530");
    }

    #[test]
    fn save_list_and_load_round_trip() {
        let (_dir, mut session) = session();

        assert_eq!(
            run(&mut session, "/list"),
            vec![Output::Dim("(no saved sessions)".into())]
        );

        run(&mut session, "/mode tutor");
        session.prepare_turn("what is rust?");
        session.commit_reply("  a language  \n");
        let saved = run(&mut session, "/save");
        assert!(matches!(&saved[0], Output::Success(text) if text.starts_with("(saved) ")));

        assert_eq!(
            run(&mut session, "/list"),
            vec![Output::SessionList(vec!["20260214-081530".into()])]
        );

        run(&mut session, "/clear");
        run(&mut session, "/mode default");
        let loaded = run(&mut session, "/load 20260214-081530");
        assert_eq!(
            loaded,
            vec![Output::Header, Output::Success("(loaded)".into())]
        );
        assert_eq!(session.state().mode, "tutor");
        assert_eq!(
            session.turns(),
            &[Turn::user("what is rust?"), Turn::assistant("a language")]
        );
    }

    #[test]
    fn load_failures_leave_state_untouched() {
        let (_dir, mut session) = session();
        session.prepare_turn("keep me");

        assert_eq!(
            run(&mut session, "/load"),
            vec![Output::Failure("Usage: /load <session_id>".into())]
        );
        let outputs = run(&mut session, "/load 19990101-000000");
        assert!(matches!(&outputs[0], Output::Failure(text) if text.starts_with("(failed to load)")));
        let outputs = run(&mut session, "/load ../../etc/passwd");
        assert!(matches!(&outputs[0], Output::Failure(_)));

        assert_eq!(session.turns().len(), 1);
    }

    #[test]
    fn loaded_unknown_mode_falls_back_to_default() {
        let (_dir, mut session) = session();
        let mut state = SessionState::new("odd");
        state.mode = "pirate".into();
        session.store().save(&state).expect("save");

        let outputs = run(&mut session, "/load odd");
        assert!(matches!(&outputs[0], Output::Dim(text) if text.contains("pirate")));
        assert_eq!(session.state().mode, "default");
    }

    #[test]
    fn unknown_command_is_reported() {
        let (_dir, mut session) = session();
        assert_eq!(
            run(&mut session, "/bogus"),
            vec![Output::Failure("Unknown command /bogus (try /help)".into())]
        );
    }

    #[test]
    fn prepare_turn_trims_and_replaces_history() {
        let (_dir, mut session) = session();
        run(&mut session, "/ctx 2000");

        let long = "x".repeat(450);
        for _ in 0..2 {
            session.prepare_turn(&long);
            session.commit_reply(&long);
        }
        assert_eq!(session.turns().len(), 4);

        let prepared = session.prepare_turn("short question");
        assert_eq!(prepared.dropped, 2);
        assert_eq!(session.turns().len(), 3);
        assert_eq!(session.turns()[2].role, Role::User);
        assert_eq!(session.turns()[2].content, "short question");
        assert!(prepared.prompt.chars().count() <= 2000);
        assert!(prepared.prompt.ends_with("<|im_start|>assistant\n"));
    }

    #[test]
    fn temperature_formatting() {
        assert_eq!(format_temperature(2.0), "2.0");
        assert_eq!(format_temperature(0.7), "0.7");
        assert_eq!(format_temperature(1.25), "1.25");
    }
}
