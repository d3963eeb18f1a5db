//! The template compilation pipeline.
//!
//! One compilation is a [`Compilation`] context (options, include paths, the
//! named-block registry) driving lexer → parser → emitter:
//!
//! - [`lexer::Lexer`] streams tokens from template text, splicing in
//!   includes and named-block substitutions;
//! - [`parser::Parser`] assembles the stream into a single AST;
//! - [`codegen`] walks ASTs and writes the Go source text.
//!
//! The driver holds one base context for the prepended include files and
//! clones its registry before each main-file compile, so files do not leak
//! block definitions to each other.

pub mod ast;
pub mod blocks;
pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

use std::path::{Path, PathBuf};

use ast::Node;
use blocks::BlockRegistry;
use error::CompileResult;
use lexer::Lexer;
use parser::Parser;
use token::Token;

/// How substitution parameter counts are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamMode {
    /// A substitution must pass exactly the declared number of parameters.
    #[default]
    Exact,
    /// Missing trailing parameters are filled with empty strings. Excess
    /// parameters are still rejected.
    Lenient,
}

/// Per-compilation state: options set by the driver before lexing starts,
/// plus the registry and the active include/substitution chains.
#[derive(Debug, Default)]
pub struct Compilation {
    /// Include search directories, in resolution order.
    pub include_paths: Vec<PathBuf>,
    pub param_mode: ParamMode,
    pub blocks: BlockRegistry,
    /// Canonical paths of files on the active include chain.
    pub(crate) active_includes: Vec<PathBuf>,
    /// Names of blocks on the active substitution chain.
    pub(crate) active_blocks: Vec<String>,
}

impl Compilation {
    pub fn new(include_paths: Vec<PathBuf>, param_mode: ParamMode) -> Self {
        Self {
            include_paths,
            param_mode,
            ..Self::default()
        }
    }

    /// A fresh compilation sharing this one's options but with the given
    /// registry (cloned from the include-file prep pass).
    pub fn with_blocks(&self, blocks: BlockRegistry) -> Self {
        Self {
            include_paths: self.include_paths.clone(),
            param_mode: self.param_mode,
            blocks,
            ..Self::default()
        }
    }

    /// Lexes and parses one template file into its AST.
    pub fn build_ast(&mut self, path: &Path) -> CompileResult<Node> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.active_includes.push(canonical);
        let mut tokens: Vec<Token> = Vec::new();
        let opened = Lexer::from_file(path, self, &mut tokens);
        let result = match opened {
            Ok(lexer) => {
                lexer.lex();
                Parser::new(&tokens).parse()
            }
            Err(e) => Err(e),
        };
        self.active_includes.pop();
        result
    }

    /// Lexes and parses in-memory template text, attributed to `path`.
    pub fn build_ast_from_source(&mut self, input: &str, path: &Path) -> CompileResult<Node> {
        let mut tokens: Vec<Token> = Vec::new();
        Lexer::from_source(input, path, self, &mut tokens).lex();
        Parser::new(&tokens).parse()
    }
}
