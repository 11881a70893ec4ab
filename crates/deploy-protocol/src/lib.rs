//! Wire protocol shared by the deployment server and its client.
//!
//! A request is a single line of space-separated tokens, terminated by a
//! carriage return, in which a double-quoted substring forms one token. A
//! response is a stream of newline-terminated text lines that ends with a
//! terminal marker ([`CMD_OK`] or [`CMD_FAIL`]). Every connection starts with
//! a preamble line announcing the server identity.

mod errors;
mod request;
mod response;
mod tokenizer;

pub use errors::ParseError;
pub use request::{CommandKind, CommandRequest};
pub use response::{
    CMD_FAIL, CMD_OK, PREAMBLE_PREFIX, REQUEST_TERMINATOR, TerminalStatus, encode_command_line,
    format_preamble, parse_preamble, terminal_status,
};
pub use tokenizer::tokenize;
