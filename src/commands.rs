#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Exit,
    New,
    Save,
    Load(Option<String>),
    List,
    Mode(Option<String>),
    Temp(Option<String>),
    Ctx(Option<String>),
    Clear,
    Unknown(String),
}

/// Command names offered for completion, in help order.
pub const COMMAND_NAMES: [&str; 11] = [
    "/help", "/exit", "/quit", "/new", "/save", "/load", "/list", "/mode", "/temp", "/ctx",
    "/clear",
];

/// Parse a `/command [arg]` line. Returns `None` for ordinary chat input.
///
/// The command word is matched case-insensitively; only the first argument is kept.
pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut parts = trimmed.split_whitespace();
    let command = parts.next().unwrap_or(trimmed).to_lowercase();
    let argument = parts.next().map(str::to_owned);

    let parsed = match command.as_str() {
        "/help" => SlashCommand::Help,
        "/exit" | "/quit" => SlashCommand::Exit,
        "/new" => SlashCommand::New,
        "/save" => SlashCommand::Save,
        "/load" => SlashCommand::Load(argument),
        "/list" => SlashCommand::List,
        "/mode" => SlashCommand::Mode(argument),
        "/temp" => SlashCommand::Temp(argument),
        "/ctx" => SlashCommand::Ctx(argument),
        "/clear" => SlashCommand::Clear,
        _ => SlashCommand::Unknown(command),
    };

    Some(parsed)
}
