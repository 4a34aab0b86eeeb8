//! Error types for each stage of the pipeline.

use std::io;

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// A position in source text. `line` and `column` are 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Location {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Location {
    /// Resolve a byte offset into line/column, counting `\n` as the line break.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let mut line = 1;
        let mut column = 1;
        for (i, c) in source.char_indices() {
            if i >= offset {
                break;
            }
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        Self {
            offset,
            line,
            column,
        }
    }
}

/// Half-open source range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Location,
    pub end: Location,
}

/// Syntax or semantic error in source text. Compilation stops at the first one.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message} at line {}, column {}", span.start.line, span.start.column)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

/// Malformed bytecode.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid bytecode format: missing square definition (found {found:?})")]
    MissingSquareHeader { found: Option<u8> },

    #[error("invalid square dimensions {w}x{h}: both must be > 0")]
    InvalidSquare { w: u8, h: u8 },

    #[error("unexpected end of bytecode at offset {offset:#06x}: expected {expected}")]
    UnexpectedEof {
        offset: usize,
        expected: &'static str,
    },

    #[error("unknown opcode {byte:#04x} at offset {offset:#06x}")]
    UnknownOpcode { offset: usize, byte: u8 },

    #[error("invalid direction code {byte:#04x} at offset {offset:#06x}")]
    InvalidDirection { offset: usize, byte: u8 },

    #[error("heading at offset {offset:#06x} has no commands")]
    EmptyHeading { offset: usize },

    #[error("invalid robot name at offset {offset:#06x}")]
    InvalidName { offset: usize },
}

/// A program the wire format cannot represent.
///
/// The parser never produces one; this guards hand-built programs.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("robot name {name:?} is not a valid identifier")]
    InvalidName { name: String },

    #[error("robot name {name:?} is {len} bytes, the limit is 255")]
    NameTooLong { name: String, len: usize },

    #[error("robot {robot} has a heading with no commands")]
    EmptyHeading { robot: String },
}

/// Failure while simulating a decoded program.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("robot {robot} has no landing instruction")]
    MissingLanding { robot: String },

    #[error("failed to emit event: {0}")]
    Sink(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Run(#[from] RunError),
}
