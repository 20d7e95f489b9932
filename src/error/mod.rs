//! Error types for tree construction, mutation, and parsing.
//!
//! Failures follow one policy throughout the crate: validate synchronously,
//! reject atomically, let the caller decide. A rejected call leaves the tree
//! exactly as it was; nothing is retried internally.

use std::fmt;

/// Source location within an XML document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in characters, not bytes).
    pub column: u32,
    /// 0-based byte offset from the start of the input.
    pub byte_offset: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The error type returned when parsing serialized XML fails.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// The primary error message.
    pub message: String,
    /// Where in the source the error occurred.
    pub location: SourceLocation,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at {}: {}", self.location, self.message)
    }
}

impl std::error::Error for ParseError {}

/// The error type for all fallible operations in this crate.
#[derive(Debug, Clone)]
pub enum Error {
    /// An argument was invalid at the point of call: a malformed XML name,
    /// content of a type the target container cannot hold, or text that the
    /// requested construct cannot legally contain.
    Argument(String),
    /// The call would violate a structural invariant (duplicate attribute
    /// name, second root element, relative insert on an orphaned node, a
    /// reader/writer call in the wrong state). The tree is left unmodified.
    InvalidOperation(String),
    /// The external tokenizer reported malformed input. Any partially built
    /// tree is not rolled back; the caller should discard it.
    Parse(ParseError),
}

impl Error {
    pub(crate) fn argument(msg: impl Into<String>) -> Self {
        Self::Argument(msg.into())
    }

    pub(crate) fn invalid_op(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Argument(msg) => write!(f, "invalid argument: {msg}"),
            Self::InvalidOperation(msg) => write!(f, "invalid operation: {msg}"),
            Self::Parse(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_location_display() {
        let loc = SourceLocation {
            line: 10,
            column: 5,
            byte_offset: 42,
        };
        assert_eq!(loc.to_string(), "10:5");
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError {
            message: "unexpected end of input".to_string(),
            location: SourceLocation {
                line: 1,
                column: 15,
                byte_offset: 14,
            },
        };
        assert_eq!(
            err.to_string(),
            "parse error at 1:15: unexpected end of input"
        );
    }

    #[test]
    fn test_error_display() {
        let err = Error::invalid_op("document already has a root element");
        assert_eq!(
            err.to_string(),
            "invalid operation: document already has a root element"
        );
        let err = Error::argument("'' is not a valid XML name");
        assert_eq!(
            err.to_string(),
            "invalid argument: '' is not a valid XML name"
        );
    }

    #[test]
    fn test_error_source_chain() {
        let err = Error::Parse(ParseError {
            message: "mismatched closing tag".to_string(),
            location: SourceLocation::default(),
        });
        let _: &dyn std::error::Error = &err;
        assert!(std::error::Error::source(&err).is_some());
    }
}
