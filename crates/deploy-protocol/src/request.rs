//! Interpretation of tokenized request lines.

use std::collections::BTreeSet;
use std::str::FromStr;

use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::errors::ParseError;
use crate::tokenizer::tokenize;

/// Commands understood by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CommandKind {
    /// Shuts the server down.
    Stop,
    /// Copies files from the device into a local backup.
    Backup,
    /// Installs the files listed in a manifest.
    Deploy,
    /// Copies one file onto the device.
    CopyFile,
    /// Installs an application package.
    Install,
    /// Reports connected devices.
    Enumerate,
    /// Lists known devices.
    ListDevices,
    /// Streams device output until the client leaves.
    ListenToDevice,
    /// Tunnels a parameter to a device.
    #[strum(serialize = "command")]
    Tunnel,
}

impl CommandKind {
    /// Whether the client must verify the server identity before sending
    /// this command.
    #[must_use]
    pub const fn needs_identity_check(self) -> bool {
        !matches!(self, Self::Stop | Self::ListDevices | Self::ListenToDevice)
    }

    /// Whether the client waits for a terminal marker rather than for the
    /// connection to close.
    #[must_use]
    pub const fn waits_for_marker(self) -> bool {
        !matches!(self, Self::ListenToDevice)
    }

    /// Wire names of every command, in declaration order.
    pub fn names() -> impl Iterator<Item = &'static str> {
        Self::iter().map(Self::wire_name)
    }

    /// Name of the command as sent on the wire.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Backup => "backup",
            Self::Deploy => "deploy",
            Self::CopyFile => "copyfile",
            Self::Install => "install",
            Self::Enumerate => "enumerate",
            Self::ListDevices => "listdevices",
            Self::ListenToDevice => "listentodevice",
            Self::Tunnel => "command",
        }
    }
}

/// One parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    /// Command to run.
    pub kind: CommandKind,
    /// Lower-cased names of every flag that appeared after the command.
    pub flags: BTreeSet<String>,
    /// Values of `-file`, in order.
    pub files: Vec<String>,
    /// Value of `-bundle`.
    pub bundle: Option<String>,
    /// Value of `-manifest`.
    pub manifest: Option<String>,
    /// Value of `-ipa`.
    pub ipa_path: Option<String>,
    /// Value of `-device`.
    pub device: Option<String>,
    /// Value of `-param`.
    pub param: Option<String>,
    /// Cleared by `-nokeepalive`.
    pub keep_alive: bool,
    /// Positive value of `-timeout`, in milliseconds.
    pub timeout_override: Option<u64>,
}

impl CommandRequest {
    /// Builds an empty request for `kind`.
    #[must_use]
    pub const fn new(kind: CommandKind) -> Self {
        Self {
            kind,
            flags: BTreeSet::new(),
            files: Vec::new(),
            bundle: None,
            manifest: None,
            ipa_path: None,
            device: None,
            param: None,
            keep_alive: true,
            timeout_override: None,
        }
    }

    /// Tokenizes and interprets a raw request line.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when no known command is named or a value
    /// flag has no value.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        Self::from_tokens(&tokenize(line))
    }

    /// Interprets already tokenized arguments.
    ///
    /// Leading tokens that start with `-` are skipped. The first remaining
    /// token names the command. Flags are matched without regard to case;
    /// unknown flags and stray positional tokens are ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when no known command is named or a value
    /// flag has no value.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Self, ParseError> {
        let mut remaining = tokens
            .iter()
            .map(AsRef::as_ref)
            .skip_while(|token| token.starts_with('-'));
        let name = remaining.next().ok_or(ParseError::MissingCommand)?;
        let kind = CommandKind::from_str(name).map_err(|_| ParseError::UnknownCommand {
            name: name.to_ascii_lowercase(),
        })?;

        let mut request = Self::new(kind);
        while let Some(token) = remaining.next() {
            if !token.starts_with('-') {
                continue;
            }
            let flag = token.to_ascii_lowercase();
            if flag == "-nokeepalive" {
                request.keep_alive = false;
            } else if is_value_flag(&flag) {
                let value = remaining
                    .next()
                    .ok_or_else(|| ParseError::MissingValue { flag: flag.clone() })?;
                request.apply_value(&flag, value);
            }
            request.flags.insert(flag);
        }
        Ok(request)
    }

    fn apply_value(&mut self, flag: &str, value: &str) {
        let owned = value.to_owned();
        match flag {
            "-file" => self.files.push(owned),
            "-bundle" => self.bundle = Some(owned),
            "-manifest" => self.manifest = Some(owned),
            "-ipa" => self.ipa_path = Some(owned),
            "-device" => self.device = Some(owned),
            "-param" => self.param = Some(owned),
            "-timeout" => {
                if let Ok(millis) = value.parse::<u64>()
                    && millis > 0
                {
                    self.timeout_override = Some(millis);
                }
            }
            _ => {}
        }
    }

    /// Whether the named flag appeared on the request line.
    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(&flag.to_ascii_lowercase())
    }
}

const VALUE_FLAGS: [&str; 7] = [
    "-file",
    "-bundle",
    "-manifest",
    "-ipa",
    "-device",
    "-param",
    "-timeout",
];

fn is_value_flag(flag: &str) -> bool {
    VALUE_FLAGS.contains(&flag)
}
