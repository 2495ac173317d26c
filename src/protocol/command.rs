//! The closed set of command identifiers.

use std::fmt;
use std::str::FromStr;

use crate::error::WireError;

/// Command identifiers understood by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Dir,
    Delete,
    Copy,
    Execute,
    TakeScreenshot,
    SendPhoto,
    Exit,
}

impl Command {
    /// Every command, in protocol order.
    pub const ALL: [Command; 7] = [
        Command::Dir,
        Command::Delete,
        Command::Copy,
        Command::Execute,
        Command::TakeScreenshot,
        Command::SendPhoto,
        Command::Exit,
    ];

    /// Wire identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Dir => "DIR",
            Command::Delete => "DELETE",
            Command::Copy => "COPY",
            Command::Execute => "EXECUTE",
            Command::TakeScreenshot => "TAKE_SCREENSHOT",
            Command::SendPhoto => "SEND_PHOTO",
            Command::Exit => "EXIT",
        }
    }

    /// Membership test against the command set. Case-sensitive.
    pub fn is_valid(command: &str) -> bool {
        command.parse::<Command>().is_ok()
    }

    /// Whether responses to this command may carry a binary trailer.
    pub fn may_carry_binary(&self) -> bool {
        matches!(self, Command::TakeScreenshot | Command::SendPhoto)
    }
}

impl FromStr for Command {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .iter()
            .copied()
            .find(|cmd| cmd.as_str() == s)
            .ok_or_else(|| WireError::UnknownCommand(s.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
