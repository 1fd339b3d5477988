//! Reply Values and Wire Rendering
//!
//! A command's outcome is a [`Reply`], rendered to the wire as plain text:
//! one line per reply, except sequences, which take one line per element.
//! The connection handler appends the trailing `\n`.
//!
//! Rendering rules:
//! - nil is the literal `Nil`
//! - integers carry a leading `:` marker
//! - sequences are newline-joined
//! - errors are one line prefixed `ERROR: `
//! - everything else goes out verbatim

use crate::protocol::command::ParseError;
use crate::storage::StoreError;
use std::fmt;

/// The result of one dispatched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A bare string sent verbatim: `OK`, `PONG`, a stored value.
    Simple(String),
    /// An integer, rendered `:<n>`.
    Integer(i64),
    /// An ordered sequence, one element per line.
    Multi(Vec<String>),
    /// No value.
    Nil,
    /// An error message, rendered with the `ERROR: ` prefix.
    Error(String),
}

impl Reply {
    /// The canonical success reply.
    pub fn ok() -> Self {
        Reply::Simple("OK".to_string())
    }

    /// The canonical PING reply.
    pub fn pong() -> Self {
        Reply::Simple("PONG".to_string())
    }

    /// Builds an error reply from any message.
    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error(message.into())
    }

    /// Returns true if this reply reports an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Renders the reply into its wire form, without the trailing newline.
    pub fn render(&self) -> String {
        match self {
            Reply::Simple(s) => s.clone(),
            Reply::Integer(n) => format!(":{n}"),
            Reply::Multi(items) => items.join("\n"),
            Reply::Nil => "Nil".to_string(),
            Reply::Error(message) => format!("ERROR: {message}"),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<StoreError> for Reply {
    fn from(e: StoreError) -> Self {
        Reply::Error(e.to_string())
    }
}

impl From<ParseError> for Reply {
    fn from(e: ParseError) -> Self {
        Reply::Error(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_simple() {
        assert_eq!(Reply::ok().render(), "OK");
        assert_eq!(Reply::pong().render(), "PONG");
        assert_eq!(Reply::Simple("hello".to_string()).render(), "hello");
    }

    #[test]
    fn test_render_integer() {
        assert_eq!(Reply::Integer(3).render(), ":3");
        assert_eq!(Reply::Integer(-2).render(), ":-2");
    }

    #[test]
    fn test_render_nil() {
        assert_eq!(Reply::Nil.render(), "Nil");
    }

    #[test]
    fn test_render_multi() {
        let reply = Reply::Multi(vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        assert_eq!(reply.render(), "a\nb\nc");

        // An empty sequence renders as one empty line on the wire.
        assert_eq!(Reply::Multi(Vec::new()).render(), "");
    }

    #[test]
    fn test_render_errors() {
        assert_eq!(
            Reply::from(StoreError::WrongType).render(),
            "ERROR: WRONGTYPE Operation against a key holding the wrong kind of value"
        );
        assert_eq!(
            Reply::from(StoreError::InvalidExpiration).render(),
            "ERROR: Invalid expiration time format."
        );
        assert_eq!(
            Reply::from(ParseError::WrongArity("set")).render(),
            "ERROR: wrong number of arguments for 'set' command"
        );
        assert_eq!(
            Reply::from(ParseError::UnknownCommand("NOPE".to_string())).render(),
            "ERROR: Unknown command 'NOPE'"
        );
    }
}
