//! The template AST.
//!
//! Produced by the parser and consumed by the code emitter. Nodes represent
//! the template structurally: code and text contexts with nested children,
//! typed value interpolations, and the three control constructs.

use super::token::{TokenFlags, TokenKind};

/// The host type a value interpolation formats as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Str,
    Bool,
    Int,
    Uint,
    Float,
    Bytes,
    /// Any value with a default string form.
    Interface,
}

impl ValueKind {
    /// Maps a typed-value token kind to its AST counterpart.
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        Some(match kind {
            TokenKind::Str => Self::Str,
            TokenKind::Bool => Self::Bool,
            TokenKind::Int => Self::Int,
            TokenKind::Uint => Self::Uint,
            TokenKind::Float => Self::Float,
            TokenKind::Bytes => Self::Bytes,
            TokenKind::Interface => Self::Interface,
            _ => return None,
        })
    }
}

/// One arm of an `if` chain. `cond` is `None` for the terminal `else`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfBranch {
    pub cond: Option<String>,
    pub body: Vec<Node>,
}

/// A template AST node.
///
/// The root of every template is a [`Node::Code`] whose children make up the
/// top-level sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A contiguous run of captured characters, emitted according to the
    /// surrounding context.
    Run { text: String, newline: bool },

    /// A verbatim region; always emitted as static text.
    StrictBlock { text: String, newline: bool },

    /// A host-code context. `with_error` wraps the code in an
    /// error-propagating scope.
    Code { body: Vec<Node>, with_error: bool },

    /// A static-text context with its escape/translate flags.
    Text { body: Vec<Node>, flags: TokenFlags },

    /// A typed value interpolation; `expr` is the host expression verbatim.
    Value {
        kind: ValueKind,
        expr: String,
        flags: TokenFlags,
    },

    /// An `if`/`elseif`/`else` chain.
    If { branches: Vec<IfBranch> },

    /// A loop with a verbatim header.
    For { header: String, body: Vec<Node> },

    /// A loop over `slice` writing `sep` between adjacent elements.
    Join {
        slice: String,
        sep: String,
        body: Vec<Node>,
    },

    /// Truncate `count` bytes from the output buffer.
    Backup { count: usize },
}

impl Node {
    /// An empty top-level code node.
    pub fn root(body: Vec<Node>) -> Self {
        Self::Code {
            body,
            with_error: false,
        }
    }
}
