use thiserror::Error;

/// Reasons a request line is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The line held no tokens, or only flags.
    #[error("request does not name a command")]
    MissingCommand,
    /// The command name is not one the server understands.
    #[error("unknown command '{name}'")]
    UnknownCommand {
        /// Lower-cased command name as received.
        name: String,
    },
    /// A value flag was the last token on the line.
    #[error("flag '{flag}' requires a value")]
    MissingValue {
        /// Lower-cased flag name.
        flag: String,
    },
}
