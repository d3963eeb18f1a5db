//! Error types for the compilation pipeline.
//!
//! Every fault in lexing, parsing, I/O or post-processing is reported through
//! [`CompileError`]: a kind, a message, and the chain of source locations
//! from the fault site outward through includes and substitutions.

use std::fmt;
use std::path::{Path, PathBuf};

/// Where a piece of template text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// A template or include file.
    File(PathBuf),
    /// The body of a named block.
    Block(String),
}

/// One location in the include/substitute chain of a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub origin: Origin,
    /// 1-indexed line number.
    pub line: usize,
    /// 1-indexed column number.
    pub column: usize,
}

impl Frame {
    pub fn new(origin: Origin, line: usize, column: usize) -> Self {
        Self {
            origin,
            line,
            column,
        }
    }

    pub fn file(path: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self::new(Origin::File(path.into()), line, column)
    }

    pub fn block(name: impl Into<String>, line: usize, column: usize) -> Self {
        Self::new(Origin::Block(name.into()), line, column)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            // Line 0 marks a whole-file fault (I/O, formatter).
            Origin::File(path) if self.line == 0 => write!(f, "{}", path.display()),
            Origin::File(path) => write!(f, "{}:{}:{}", path.display(), self.line, self.column),
            Origin::Block(name) => write!(f, "Block {}:{}:{}", name, self.line, self.column),
        }
    }
}

/// The fault class of a [`CompileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // Lex faults.
    /// A tag was opened but no close tag terminates it.
    MissingCloseTag,
    /// A `{{begin X}}` block has no matching `{{end X}}`.
    UnterminatedStrictBlock,
    /// A `{{< X}}` definition has no matching `{{end X}}`.
    UnterminatedDefine,
    /// An include file name failed to unquote.
    BadIncludeName,
    /// An include file was not found on any search path.
    IncludeNotFound,
    /// An include file includes itself, possibly indirectly.
    IncludeCycle,
    /// An include file could not be read.
    IncludeRead,
    /// A named block was defined twice.
    BlockRedefined,
    /// A block name shadows a tag literal.
    BlockNameIsTag,
    /// A block name contains whitespace.
    BadBlockName,
    /// The token after a block name is not a parameter count.
    BadParamCount,
    /// A substitution names a block that was never defined.
    UnknownBlock,
    /// A substitution names itself somewhere along its expansion.
    SubstituteCycle,
    /// A parameter list could not be split (unbalanced quote).
    BadParameterList,
    /// A substitution passed more parameters than the block declares.
    TooManyParams,
    /// A substitution passed fewer parameters than the block declares.
    MissingParams,
    /// A backup tag contains something other than digits.
    BadBackupCount,

    // Parse faults.
    /// A typed tag contains no expression.
    MissingValue,
    /// An `if` or `for` has no condition text.
    MissingCondition,
    /// The stream ended inside an open construct.
    UnexpectedEof,
    /// A token arrived where the grammar does not allow it.
    UnexpectedToken,
    /// An end block carries the wrong name.
    WrongEndBlock,
    /// An `else` follows another `else`, or an `elseif` follows an `else`.
    MisplacedElse,
    /// A join does not carry exactly two parameters.
    BadJoinParams,
    /// Tokens remain after the top-level run (an orphan close tag).
    OrphanClose,

    // Driver faults.
    /// Reading the input or writing the output failed.
    Io,
    /// The external formatter failed.
    Format,
}

impl ErrorKind {
    /// A human-readable description of this fault class.
    pub fn description(&self) -> &'static str {
        match self {
            Self::MissingCloseTag => "missing close tag",
            Self::UnterminatedStrictBlock => "no strict end block found",
            Self::UnterminatedDefine => "no end block found",
            Self::BadIncludeName => "include file name error",
            Self::IncludeNotFound => "include file not found",
            Self::IncludeCycle => "include cycle",
            Self::IncludeRead => "include file read error",
            Self::BlockRedefined => "named block already defined",
            Self::BlockNameIsTag => "block name cannot be a tag name",
            Self::BadBlockName => "bad block name",
            Self::BadParamCount => "bad parameter count",
            Self::UnknownBlock => "named block not found",
            Self::SubstituteCycle => "substitution cycle",
            Self::BadParameterList => "bad parameter list",
            Self::TooManyParams => "too many parameters",
            Self::MissingParams => "missing parameters",
            Self::BadBackupCount => "bad backup count",
            Self::MissingValue => "missing value",
            Self::MissingCondition => "missing condition",
            Self::UnexpectedEof => "unexpected end of file",
            Self::UnexpectedToken => "unexpected token",
            Self::WrongEndBlock => "wrong end block",
            Self::MisplacedElse => "misplaced else",
            Self::BadJoinParams => "bad join parameters",
            Self::OrphanClose => "close tag with no matching open tag",
            Self::Io => "i/o error",
            Self::Format => "formatter error",
        }
    }
}

/// A compilation fault with its message and call stack.
///
/// `frames` is ordered innermost first: the fault site, then each include or
/// substitution site it propagated through.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    pub frames: Vec<Frame>,
}

impl CompileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, frame: Frame) -> Self {
        Self {
            kind,
            message: message.into(),
            frames: vec![frame],
        }
    }

    /// An I/O fault attributed to `path`.
    pub fn io(path: &Path, err: &std::io::Error) -> Self {
        Self::new(
            ErrorKind::Io,
            err.to_string(),
            Frame::file(path.to_path_buf(), 0, 0),
        )
    }

    /// Appends an outer frame to the call stack.
    pub fn push_frame(mut self, frame: Frame) -> Self {
        self.frames.push(frame);
        self
    }

    /// Appends outer frames to the call stack.
    pub fn push_frames(mut self, frames: &[Frame]) -> Self {
        self.frames.extend_from_slice(frames);
        self
    }

    /// The innermost location of the fault.
    pub fn site(&self) -> &Frame {
        &self.frames[0]
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = if self.message.is_empty() {
            self.kind.description()
        } else {
            &self.message
        };
        write!(f, "*** Error: {message}")?;
        for frame in &self.frames {
            write!(f, "\n    {frame}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_display() {
        let f = Frame::file("/a/b.tpl", 3, 7);
        assert_eq!(f.to_string(), "/a/b.tpl:3:7");

        let b = Frame::block("greet", 1, 2);
        assert_eq!(b.to_string(), "Block greet:1:2");
    }

    #[test]
    fn test_error_display_with_stack() {
        let err = CompileError::new(
            ErrorKind::UnknownBlock,
            "named block not found: header",
            Frame::block("page", 2, 5),
        )
        .push_frame(Frame::file("/tmp/main.tpl", 10, 1));

        let rendered = err.to_string();
        assert!(rendered.starts_with("*** Error: named block not found: header"));
        assert!(rendered.contains("\n    Block page:2:5"));
        assert!(rendered.contains("\n    /tmp/main.tpl:10:1"));
    }

    #[test]
    fn test_all_kinds_have_descriptions() {
        let kinds = [
            ErrorKind::MissingCloseTag,
            ErrorKind::UnterminatedStrictBlock,
            ErrorKind::UnterminatedDefine,
            ErrorKind::BadIncludeName,
            ErrorKind::IncludeNotFound,
            ErrorKind::IncludeCycle,
            ErrorKind::BlockRedefined,
            ErrorKind::BlockNameIsTag,
            ErrorKind::UnknownBlock,
            ErrorKind::BadParameterList,
            ErrorKind::MissingValue,
            ErrorKind::MissingCondition,
            ErrorKind::UnexpectedEof,
            ErrorKind::WrongEndBlock,
            ErrorKind::MisplacedElse,
            ErrorKind::OrphanClose,
            ErrorKind::Io,
            ErrorKind::Format,
        ];
        for kind in kinds {
            assert!(!kind.description().is_empty(), "{kind:?}");
        }
    }
}
