//! Token model for the template language.
//!
//! A token is produced by the lexer and consumed by the parser. Most tokens
//! originate from the static tag table, which maps every literal tag spelling
//! (short and long forms) to a descriptor carrying the token kind and its
//! orthogonal flag bits. The table is built once at startup and is read-only.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use super::error::{ErrorKind, Frame};

/// Literal spelling of an opening delimiter.
pub const TOK_BEGIN: &str = "{{";
/// Literal spelling of a closing delimiter.
pub const TOK_END: &str = "}}";
/// A close tag may absorb one preceding space.
pub const TOK_END_WITH_SPACE: &str = " }}";

/// The kind of a token.
///
/// A closed enumeration; each tag literal maps to exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// End of the token stream. Always the last token of a clean lex.
    Eof,
    /// A fatal lexing fault; carries the message and the call stack.
    Error,
    /// Opening delimiter. Reserved; tags are classified before emission, so
    /// the parser never sees a bare open.
    Open,
    /// A plain close tag (`}}` or ` }}`).
    End,
    /// A named closing tag such as `{{if}}`, `{{for}}`, `{{join}}`; `val`
    /// holds the block kind (`"if"`, `"for"`, `"join"`, `"else"`, `"elseif"`).
    EndBlock,
    /// A token with no output or structure (the residue of a comment tag).
    /// The parser skips these.
    Ignore,

    /// Host-code passthrough. The initial context of every template.
    Go,
    /// Host code whose only result is an error to propagate.
    GoErr,
    /// Static literal output.
    Text,
    /// Opaque body copied verbatim between `{{begin X}}` and `{{end X}}`.
    StrictBlock,
    /// A contiguous run of captured characters in the surrounding context.
    Run,

    /// A `string` value expression.
    Str,
    /// A `bool` value expression.
    Bool,
    /// An `int` value expression.
    Int,
    /// A `uint` value expression.
    Uint,
    /// A `float` value expression.
    Float,
    /// A `[]byte` value expression.
    Bytes,
    /// Any value with a default string form.
    Interface,

    /// A comment; discarded during lexing.
    Comment,
    /// A file include.
    Include,
    /// A named-block definition.
    NamedBlock,
    /// A named-block use.
    Substitute,

    /// Opens a conditional.
    If,
    /// Reserved; `{{elseif` arrives as [`TokenKind::EndBlock`] per the
    /// grammar, like the historical parser-side kind it replaces.
    ElseIf,
    /// Reserved; `{{else}}` arrives as [`TokenKind::EndBlock`].
    Else,
    /// Opens a loop with a verbatim header.
    For,
    /// Opens a join over a slice with a separator.
    Join,
    /// A join parameter (slice expression or join string).
    Param,

    /// The `{{-}}` / `{{- N}}` tag: truncate N bytes from the output buffer.
    Backup,
}

impl TokenKind {
    /// Whether this kind is a typed value interpolation.
    pub fn is_value(self) -> bool {
        matches!(
            self,
            Self::Str
                | Self::Bool
                | Self::Int
                | Self::Uint
                | Self::Float
                | Self::Bytes
                | Self::Interface
        )
    }
}

/// Orthogonal flag bits attached to tokens and descriptors.
///
/// These stay out of [`TokenKind`]; folding them into the variants would
/// multiply the case count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenFlags {
    /// HTML-escape the output at emit time.
    pub escaped: bool,
    /// The expression also yields an error to propagate.
    pub with_error: bool,
    /// Route the text through the `Translate` sink.
    pub translate: bool,
    /// Expand line breaks into HTML paragraph/break tags.
    pub html_breaks: bool,
    /// A substitution of an undefined block is silently empty.
    pub optional: bool,
}

impl TokenFlags {
    fn escaped() -> Self {
        Self {
            escaped: true,
            ..Self::default()
        }
    }

    fn with_error(mut self) -> Self {
        self.with_error = true;
        self
    }
}

/// A compile-time entry of the tag table.
#[derive(Debug, Clone, Copy)]
pub struct TokenDesc {
    pub kind: TokenKind,
    pub flags: TokenFlags,
    /// For end-block markers, the block kind the tag closes.
    pub literal_val: &'static str,
}

impl TokenDesc {
    const fn new(kind: TokenKind) -> Self {
        Self {
            kind,
            flags: TokenFlags {
                escaped: false,
                with_error: false,
                translate: false,
                html_breaks: false,
                optional: false,
            },
            literal_val: "",
        }
    }

    const fn flagged(kind: TokenKind, flags: TokenFlags) -> Self {
        Self {
            kind,
            flags,
            literal_val: "",
        }
    }

    const fn end_block(val: &'static str) -> Self {
        Self {
            kind: TokenKind::EndBlock,
            flags: TokenFlags {
                escaped: false,
                with_error: false,
                translate: false,
                html_breaks: false,
                optional: false,
            },
            literal_val: val,
        }
    }
}

/// A token emitted by the lexer.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub flags: TokenFlags,
    /// The captured text: run contents, value expressions, condition text,
    /// parameter values, end-block names, or an error message.
    pub val: String,
    /// The text run following a text-opening tag began at a line break.
    pub newline: bool,
    /// Where the token starts, for diagnostics.
    pub loc: Frame,
    /// Source locations accumulated while propagating through includes and
    /// substitutions, outermost last.
    pub call_stack: Vec<Frame>,
    /// The fault class, set on [`TokenKind::Error`] tokens only.
    pub err: Option<ErrorKind>,
}

/// The static tag table.
///
/// Keys are complete tag literals as they appear in templates, including the
/// opening `{{` and, for end-block markers, the closing `}}`.
pub static TOKENS: Lazy<FxHashMap<String, TokenDesc>> = Lazy::new(build_token_table);

/// Whether `name` collides with a tag literal (named blocks may not shadow
/// the tag lexicon).
pub fn is_tag_name(name: &str) -> bool {
    TOKENS.contains_key(&format!("{{{{{name}"))
}

fn build_token_table() -> FxHashMap<String, TokenDesc> {
    use TokenKind::*;

    let mut t = FxHashMap::default();
    let mut ins = |literal: &str, desc: TokenDesc| {
        t.insert(literal.to_string(), desc);
    };

    // Typed values. Every spelling takes a `!` prefix for HTML escaping and
    // an error suffix: `e` on the short forms, `,err` on the long ones.
    let values: &[(&str, &[&str], TokenKind)] = &[
        ("s", &["string", "="], Str),
        ("i", &["int"], Int),
        ("u", &["uint"], Uint),
        ("f", &["float"], Float),
        ("b", &["bool"], Bool),
        ("w", &["bytes"], Bytes),
        ("v", &["stringer", "interface"], Interface),
    ];
    for &(short, longs, kind) in values {
        for name in std::iter::once(short).chain(longs.iter().copied()) {
            let err_suffix = if name.len() == 1 { "e" } else { ",err" };
            ins(&format!("{{{{{name}"), TokenDesc::new(kind));
            ins(
                &format!("{{{{!{name}"),
                TokenDesc::flagged(kind, TokenFlags::escaped()),
            );
            ins(
                &format!("{{{{{name}{err_suffix}"),
                TokenDesc::flagged(kind, TokenFlags::default().with_error()),
            );
            ins(
                &format!("{{{{!{name}{err_suffix}"),
                TokenDesc::flagged(kind, TokenFlags::escaped().with_error()),
            );
        }
    }
    // Escaped string with break expansion.
    ins(
        "{{!h",
        TokenDesc::flagged(
            Str,
            TokenFlags {
                escaped: true,
                html_breaks: true,
                ..TokenFlags::default()
            },
        ),
    );

    // Static text contexts.
    ins("{{", TokenDesc::new(Text));
    ins("{{!", TokenDesc::flagged(Text, TokenFlags::escaped()));
    ins("{{esc", TokenDesc::flagged(Text, TokenFlags::escaped()));
    let text_breaks = TokenFlags {
        escaped: true,
        html_breaks: true,
        ..TokenFlags::default()
    };
    ins("{{h", TokenDesc::flagged(Text, text_breaks));
    ins("{{html", TokenDesc::flagged(Text, text_breaks));
    let translate = TokenFlags {
        translate: true,
        ..TokenFlags::default()
    };
    ins("{{t", TokenDesc::flagged(Text, translate));
    ins("{{translate", TokenDesc::flagged(Text, translate));
    let esc_translate = TokenFlags {
        escaped: true,
        translate: true,
        ..TokenFlags::default()
    };
    ins("{{!t", TokenDesc::flagged(Text, esc_translate));
    ins("{{!translate", TokenDesc::flagged(Text, esc_translate));

    // Host code passthrough.
    ins("{{g", TokenDesc::new(Go));
    ins("{{go", TokenDesc::new(Go));
    let with_error = TokenFlags::default().with_error();
    ins("{{e", TokenDesc::flagged(GoErr, with_error));
    ins("{{err", TokenDesc::flagged(GoErr, with_error));

    // Comments.
    ins("{{#", TokenDesc::new(Comment));
    ins("{{//", TokenDesc::new(Comment));

    // Strict blocks and named blocks.
    ins("{{begin", TokenDesc::new(StrictBlock));
    ins("{{<", TokenDesc::new(NamedBlock));
    ins("{{define", TokenDesc::new(NamedBlock));
    ins("{{>", TokenDesc::new(Substitute));
    ins("{{put", TokenDesc::new(Substitute));
    let optional = TokenFlags {
        optional: true,
        ..TokenFlags::default()
    };
    ins("{{>?", TokenDesc::flagged(Substitute, optional));
    ins("{{put?", TokenDesc::flagged(Substitute, optional));

    // Includes.
    ins("{{:", TokenDesc::new(Include));
    ins("{{include", TokenDesc::new(Include));
    let include_html = TokenFlags {
        escaped: true,
        html_breaks: true,
        ..TokenFlags::default()
    };
    ins("{{:h", TokenDesc::flagged(Include, include_html));
    ins("{{includeAsHtml", TokenDesc::flagged(Include, include_html));
    ins("{{:!", TokenDesc::flagged(Include, TokenFlags::escaped()));
    ins("{{includeEscaped", TokenDesc::flagged(Include, TokenFlags::escaped()));

    // Control flow. The named closing tags include their braces so they can
    // be matched as complete literals.
    ins("{{if", TokenDesc::new(If));
    ins("{{if}}", TokenDesc::end_block("if"));
    ins("{{elseif", TokenDesc::end_block("elseif"));
    ins("{{else}}", TokenDesc::end_block("else"));
    ins("{{for", TokenDesc::new(For));
    ins("{{for}}", TokenDesc::end_block("for"));
    ins("{{join", TokenDesc::new(Join));
    ins("{{join}}", TokenDesc::end_block("join"));

    // Buffer truncation.
    ins("{{-", TokenDesc::new(Backup));

    // The bare close tag; named blocks may not shadow it either.
    ins("}}", TokenDesc::new(End));

    t
}
