//! Response framing: terminal markers, the identity preamble and request
//! serialization.

/// Marker ending a successful response.
pub const CMD_OK: &str = "CMDOK";

/// Marker ending a failed response.
pub const CMD_FAIL: &str = "CMDFAIL";

/// Prefix of the identity preamble sent once per connection.
pub const PREAMBLE_PREFIX: &str = "DIR";

/// Terminator written after every request line.
pub const REQUEST_TERMINATOR: char = '\r';

/// Outcome carried by a terminal marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    /// The command succeeded.
    Ok,
    /// The command failed or was refused.
    Fail,
}

impl TerminalStatus {
    /// Maps a command result to its marker.
    #[must_use]
    pub const fn from_success(success: bool) -> Self {
        if success { Self::Ok } else { Self::Fail }
    }

    /// Marker text without surrounding newlines.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Ok => CMD_OK,
            Self::Fail => CMD_FAIL,
        }
    }

    /// Marker as written to the wire: preceded and followed by a newline.
    #[must_use]
    pub fn wire_line(self) -> String {
        format!("\n{}\n", self.marker())
    }

    /// Whether the status reports success.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Classifies a response line. A line is terminal when it ends with a
/// marker, ignoring trailing line terminators.
#[must_use]
pub fn terminal_status(line: &str) -> Option<TerminalStatus> {
    let trimmed = line.trim_end_matches(['\r', '\n']);
    if trimmed.ends_with(CMD_OK) {
        Some(TerminalStatus::Ok)
    } else if trimmed.ends_with(CMD_FAIL) {
        Some(TerminalStatus::Fail)
    } else {
        None
    }
}

/// Formats the identity preamble line, without its newline.
#[must_use]
pub fn format_preamble(identity: &str) -> String {
    format!("{PREAMBLE_PREFIX}{identity}")
}

/// Extracts the identity from a preamble line.
#[must_use]
pub fn parse_preamble(line: &str) -> Option<&str> {
    line.trim_end_matches(['\r', '\n'])
        .strip_prefix(PREAMBLE_PREFIX)
}

/// Serializes client arguments into one request line, terminator included.
///
/// Arguments containing whitespace are wrapped in double quotes.
#[must_use]
pub fn encode_command_line<S: AsRef<str>>(args: &[S]) -> String {
    let mut line = args
        .iter()
        .map(|arg| {
            let arg = arg.as_ref();
            if arg.contains(char::is_whitespace) {
                format!("\"{arg}\"")
            } else {
                arg.to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    line.push(REQUEST_TERMINATOR);
    line
}
