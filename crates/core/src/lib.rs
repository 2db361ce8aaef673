//! Core shared types and errors (format-agnostic).

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Truncated TGA header: need 18 bytes, got {available}")]
    TruncatedHeader { available: usize },

    #[error("Truncated data at byte {offset}: need {needed} bytes, {available} available")]
    TruncatedBody {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Unsupported format: {reason}")]
    UnsupportedFormat { reason: String },

    #[error("Pixel ({x}, {y}) out of bounds for {width}x{height} image")]
    IndexOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    #[error("Malformed face on line {line}: {reason}")]
    MalformedFace { line: usize, reason: String },

    #[error("Unknown directive '{directive}' on line {line}")]
    UnknownDirective { line: usize, directive: String },

    #[error("Invalid number '{token}' on line {line}")]
    InvalidNumber { line: usize, token: String },

    #[error("Invalid UTF-8 on line {line} at column {column}")]
    InvalidText { line: usize, column: usize },

    /// `len` counts the bytes read before giving up, not the full line.
    #[error("Line {line} is longer than {max} bytes (read {len})")]
    LineTooLong { line: usize, len: usize, max: usize },

    #[error("Face {face} references {attribute} {index}, but only {len} are defined")]
    DanglingIndex {
        face: usize,
        attribute: &'static str,
        index: u32,
        len: usize,
    },
}

impl FormatError {
    /// Attach a file path to an [`io::Error`].
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// `true` for conditions that only skip input and never abort a parse.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::UnknownDirective { .. })
    }
}

pub type FormatResult<T> = Result<T, FormatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unknown_directive_is_recoverable() {
        let unknown = FormatError::UnknownDirective {
            line: 3,
            directive: "usemtl".into(),
        };
        let face = FormatError::MalformedFace {
            line: 3,
            reason: "two vertices".into(),
        };
        assert!(unknown.is_recoverable());
        assert!(!face.is_recoverable());
    }

    #[test]
    fn io_error_message_names_path() {
        let err = FormatError::io(
            "missing.tga",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        let msg = err.to_string();
        assert!(msg.contains("missing.tga"));
        assert!(msg.contains("no such file"));
    }
}
