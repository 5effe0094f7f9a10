//! Parsing of lines typed at the prompt.

/// What a typed line asks the client to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    /// Plain chat message for the room
    Chat(String),
    /// `/ai <text>`: request for the room's AI queue
    Ai(String),
    /// `/help`
    Help,
    /// `/quit`
    Quit,
    /// Unknown command or missing argument, with a hint for the user
    Invalid(String),
}

/// Parse one input line (already trimmed by the caller or not)
pub fn parse_input(line: &str) -> InputCommand {
    let line = line.trim();

    let Some(rest) = line.strip_prefix('/') else {
        return InputCommand::Chat(line.to_string());
    };

    let (name, argument) = match rest.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (rest, ""),
    };

    match name {
        "ai" if argument.is_empty() => InputCommand::Invalid("Usage: /ai <message>".to_string()),
        "ai" => InputCommand::Ai(argument.to_string()),
        "help" => InputCommand::Help,
        "quit" | "exit" => InputCommand::Quit,
        other => InputCommand::Invalid(format!("Unknown command '/{}'. Type /help", other)),
    }
}

pub const HELP_TEXT: &str = "\
Commands:
  <text>       send a chat message to the room
  /ai <text>   ask the AI (requests are answered one at a time)
  /help        show this help
  /quit        leave the chat
";
