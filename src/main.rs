use std::io;

use anyhow::Context as _;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use localgpt::app::{ChatSession, CommandOutcome};
use localgpt::commands::parse_slash_command;
use localgpt::config::EnvConfig;
use localgpt::input::CommandHelper;
use localgpt::interrupt::InterruptHandler;
use localgpt::logging::init_logging;
use localgpt::render::{self, DeltaWriter};
use localgpt::runtime::{run_turn, HttpBackend};
use session_store::SessionStore;

fn main() -> anyhow::Result<()> {
    let config = EnvConfig::from_env().context("invalid environment configuration")?;
    if let Err(error) = init_logging(&config.log_path(), &config.log_filter) {
        eprintln!("{}", render::dim(&format!("logging disabled: {error}")));
    }

    let backend = HttpBackend::new(config.completion_config(), config.n_predict)
        .context("failed to set up completion backend")?;
    let store = SessionStore::new(config.sessions_dir());
    let mut session = ChatSession::start(store).context("failed to start session")?;
    tracing::info!(
        endpoint = %backend.endpoint(),
        session_id = %session.state().session_id,
        "localgpt started"
    );

    println!("{}", render::header(session.state()));
    println!("{}", render::dim("Type /help for commands."));

    let interrupts = InterruptHandler::install().context("failed to install interrupt handler")?;

    let mut editor: Editor<CommandHelper, DefaultHistory> =
        Editor::new().context("failed to initialize line editor")?;
    editor.set_helper(Some(CommandHelper::new()));

    loop {
        let line = match editor.readline(render::PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                println!("{}", render::bye());
                break;
            }
            Err(error) => return Err(error).context("failed to read input"),
        };

        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(text);

        if let Some(command) = parse_slash_command(text) {
            match session.handle_command(command) {
                CommandOutcome::Exit => {
                    println!("{}", render::bye());
                    break;
                }
                CommandOutcome::Continue(outputs) => {
                    for output in &outputs {
                        println!("{}", render::output(output, session.state()));
                    }
                }
            }
            continue;
        }

        println!("{}", render::assistant_banner());
        let guard = interrupts.arm();
        let mut echo = DeltaWriter::new(io::stdout());
        let result = run_turn(&mut session, &backend, text, guard.signal(), &mut |delta: &str| {
            echo.write(delta);
        });
        drop(guard);

        println!();
        if let Some(message) = render::turn_result(&result) {
            println!("{message}");
        }
    }

    Ok(())
}
