//! File-include state.
//!
//! Resolution order: each include directory joined with the relative-path
//! prefix accumulated along the include chain, first match wins, then a path
//! relative to the including file's directory. Escaped/HTML includes splice
//! the file as a static text block; plain includes lex the file in a child
//! lexer spliced into the stream.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::params::unquote;
use super::Lexer;
use crate::compiler::error::{CompileResult, ErrorKind, Frame, Origin};
use crate::compiler::token::{TokenFlags, TokenKind};

impl<'a> Lexer<'a> {
    pub(super) fn lex_include(&mut self, flags: TokenFlags, site: Frame) -> CompileResult<()> {
        self.accept_run();
        let raw = self.current().trim().to_string();
        if !self.is_at_close_tag() {
            return Err(self.err(ErrorKind::MissingCloseTag, "expected close tag"));
        }
        self.ignore_close_tag();

        if raw.is_empty() {
            return Err(self.err(ErrorKind::BadIncludeName, "missing include file name"));
        }
        let file_name = if raw.starts_with('"') {
            unquote(&raw).map_err(|msg| {
                self.err(ErrorKind::BadIncludeName, format!("include file name error: {msg}"))
            })?
        } else {
            raw
        };

        let path = self.resolve_include(&file_name)?;
        debug!(include = %path.display(), "resolved include");

        // An escaped or HTML include is spliced as a static text block, not
        // lexed.
        if flags.escaped || flags.html_breaks {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                self.err(
                    ErrorKind::IncludeRead,
                    format!("error opening include file {}: {e}", path.display()),
                )
            })?;
            self.emit(TokenKind::Text, flags, String::new(), false);
            self.emit(TokenKind::Run, TokenFlags::default(), content, false);
            self.emit_simple(TokenKind::End);
            return Ok(());
        }

        let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
        if self.comp.active_includes.contains(&canonical) {
            return Err(self.err(
                ErrorKind::IncludeCycle,
                format!("include cycle detected at \"{}\"", path.display()),
            ));
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            self.err(
                ErrorKind::IncludeRead,
                format!("error opening include file {}: {e}", path.display()),
            )
        })?;

        let mut relative_paths = self.relative_paths.clone();
        match Path::new(&file_name).parent() {
            Some(parent) if parent != Path::new("") => relative_paths.push(parent.to_path_buf()),
            _ => {}
        }

        let mut child_stack = vec![site];
        child_stack.extend_from_slice(&self.call_stack);

        self.comp.active_includes.push(canonical);
        let result = Lexer::new(
            content,
            Origin::File(path),
            &mut *self.comp,
            &mut *self.sink,
            relative_paths,
            child_stack,
        )
        .document();
        self.comp.active_includes.pop();
        result
    }

    /// Searches the include paths, then the including file's directory.
    fn resolve_include(&self, file_name: &str) -> CompileResult<PathBuf> {
        let mut rel = PathBuf::new();
        for segment in &self.relative_paths {
            rel.push(segment);
        }

        let mut searched: Vec<String> = Vec::new();
        for dir in &self.comp.include_paths {
            let candidate = dir.join(&rel).join(file_name);
            if candidate.is_file() {
                return Ok(candidate);
            }
            searched.push(dir.join(&rel).display().to_string());
        }

        if let Some(dir) = self.origin_dir() {
            let candidate = dir.join(file_name);
            if candidate.is_file() {
                return Ok(candidate);
            }
            searched.push(dir.display().to_string());
        }

        Err(self.err(
            ErrorKind::IncludeNotFound,
            format!(
                "could not find include file \"{file_name}\" in directories {}",
                searched.join("; ")
            ),
        ))
    }

    /// The directory of the file this lexer reads, if any.
    fn origin_dir(&self) -> Option<PathBuf> {
        match &self.origin {
            Origin::File(path) => path.parent().map(Path::to_path_buf),
            Origin::Block(_) => None,
        }
    }
}
