use std::fmt;
use std::ops::Range;

use crate::script::Value;

/// Errors produced while lexing or parsing a sprite script.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub span: Option<Range<usize>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxErrorKind {
    /// Lexer encountered an unrecognized character/sequence.
    UnrecognizedToken(String),
    /// Parser expected one thing, got another.
    UnexpectedToken { expected: String, got: String },
    /// Parser reached end of input unexpectedly.
    UnexpectedEof { expected: String },
    /// Left side of an assignment is not a name, member or index.
    InvalidAssignmentTarget,
    /// Blocks, brackets or unary operators nest past the parser's limit.
    NestingTooDeep,
    /// General message.
    Message(String),
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SyntaxErrorKind::UnrecognizedToken(tok) => {
                write!(f, "unrecognized token: {tok}")
            }
            SyntaxErrorKind::UnexpectedToken { expected, got } => {
                write!(f, "expected {expected}, got {got}")
            }
            SyntaxErrorKind::UnexpectedEof { expected } => {
                write!(f, "unexpected end of script, expected {expected}")
            }
            SyntaxErrorKind::InvalidAssignmentTarget => {
                write!(f, "invalid assignment target")
            }
            SyntaxErrorKind::NestingTooDeep => write!(f, "nesting too deep"),
            SyntaxErrorKind::Message(msg) => write!(f, "{msg}"),
        }?;

        if let Some(span) = &self.span {
            write!(f, " (at byte {}..{})", span.start, span.end)?;
        }

        Ok(())
    }
}

impl std::error::Error for SyntaxError {}

/// Shorthand constructors.
impl SyntaxError {
    pub fn unexpected_token(expected: &str, got: &str, span: Range<usize>) -> Self {
        Self {
            kind: SyntaxErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                got: got.to_string(),
            },
            span: Some(span),
        }
    }

    pub fn unexpected_eof(expected: &str) -> Self {
        Self {
            kind: SyntaxErrorKind::UnexpectedEof {
                expected: expected.to_string(),
            },
            span: None,
        }
    }

    pub fn invalid_assignment(span: Range<usize>) -> Self {
        Self {
            kind: SyntaxErrorKind::InvalidAssignmentTarget,
            span: Some(span),
        }
    }

    pub fn nesting_too_deep(span: Range<usize>) -> Self {
        Self {
            kind: SyntaxErrorKind::NestingTooDeep,
            span: Some(span),
        }
    }

    pub fn message(msg: &str, span: Option<Range<usize>>) -> Self {
        Self {
            kind: SyntaxErrorKind::Message(msg.to_string()),
            span,
        }
    }
}

/// A failure raised while a script runs. Built-in kinds mirror the browser's
/// error classes so the two runtimes report the same names.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScriptError {
    #[error("ReferenceError: {0}")]
    Reference(String),
    #[error("TypeError: {0}")]
    Type(String),
    #[error("RangeError: {0}")]
    Range(String),
    #[error("SyntaxError: {0}")]
    Syntax(#[from] SyntaxError),
    /// A value thrown by user code with `throw`.
    #[error("Uncaught {0}")]
    Thrown(Value),
}

impl ScriptError {
    pub fn reference(msg: impl Into<String>) -> Self {
        Self::Reference(msg.into())
    }

    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::Type(msg.into())
    }

    pub fn range(msg: impl Into<String>) -> Self {
        Self::Range(msg.into())
    }

    /// Error class name as a script sees it in `catch (e) { e.name }`.
    pub fn name(&self) -> &'static str {
        match self {
            ScriptError::Reference(_) => "ReferenceError",
            ScriptError::Type(_) => "TypeError",
            ScriptError::Range(_) => "RangeError",
            ScriptError::Syntax(_) => "SyntaxError",
            ScriptError::Thrown(_) => "Error",
        }
    }

    /// Message without the class prefix.
    pub fn message(&self) -> String {
        match self {
            ScriptError::Reference(m) | ScriptError::Type(m) | ScriptError::Range(m) => m.clone(),
            ScriptError::Syntax(e) => e.to_string(),
            ScriptError::Thrown(v) => v.to_string(),
        }
    }
}

/// A snapshot that cannot be turned into a game. Raised before anything runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SnapshotError {
    #[error("{field} must be greater than zero")]
    ZeroDimension { field: &'static str },
    #[error("map of {map_size} tiles x {sprite_size} cells x {pixel_pixels} px is wider than {limit} screen pixels")]
    GridTooLarge {
        map_size: u32,
        sprite_size: u32,
        pixel_pixels: u32,
        limit: u32,
    },
    #[error("palette is empty")]
    EmptyPalette,
    #[error("palette entry {index} is not a color: {value:?}")]
    BadColor { index: usize, value: String },
    #[error("{table} has {names} names but {entries} {what}")]
    LengthMismatch {
        table: &'static str,
        names: usize,
        entries: usize,
        what: &'static str,
    },
    #[error("{table} name {index} is empty")]
    EmptyName { table: &'static str, index: usize },
    #[error("{table} name {name:?} is used more than once")]
    DuplicateName { table: &'static str, name: String },
    #[error("{table} sprite {index} has {len} cells, expected {expected}")]
    SpriteSize {
        table: &'static str,
        index: usize,
        len: usize,
        expected: usize,
    },
    #[error("{table} sprite {index} cell {cell} uses color {color}, palette has {palette}")]
    ColorOutOfRange {
        table: &'static str,
        index: usize,
        cell: usize,
        color: i32,
        palette: usize,
    },
    #[error("no tile sprites defined")]
    NoTiles,
    #[error("background has {len} cells, expected {expected}")]
    BackgroundSize { len: usize, expected: usize },
    #[error("background cell {cell} uses tile {tile}, only {tiles} tiles exist")]
    TileOutOfRange { cell: usize, tile: usize, tiles: usize },
    #[error("game object {index} uses object sprite {sprite}, only {objects} exist")]
    ObjectSpriteOutOfRange {
        index: usize,
        sprite: usize,
        objects: usize,
    },
    #[error("game object id {0:?} is used more than once")]
    DuplicateId(String),
    #[error("game object {index} has a non-finite position")]
    BadPosition { index: usize },
}

/// Failure to produce a document.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

pub type Result<T, E = ScriptError> = std::result::Result<T, E>;
