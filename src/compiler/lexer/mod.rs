//! Lexer for the template language.
//!
//! The lexer walks the input with a pair of byte cursors (`start`..`pos`) and
//! dispatches on tag literals through the static token table. It appends
//! tokens to a shared sink; includes and substitutions run child lexers over
//! the same sink, so the parser sees one flat stream in source order.
//!
//! A template starts in host-code mode. The run state captures characters up
//! to the next `{{` or `}}`; the tag state classifies the tag and hands off
//! to a specialized state (text, strict block, include, definition,
//! substitution, comment, join, backup). On any fault a single error token
//! ends the stream; a clean lex ends with exactly one EOF token.

mod include;
mod params;
mod substitute;

pub use params::split_params;

use std::path::{Path, PathBuf};

use super::error::{CompileError, CompileResult, ErrorKind, Frame, Origin};
use super::token::{
    Token, TokenDesc, TokenFlags, TokenKind, TOKENS, TOK_BEGIN, TOK_END, TOK_END_WITH_SPACE,
};
use super::Compilation;

/// Whether `c` may appear in a tag literal after the opening braces.
fn is_tag_char(c: char) -> bool {
    c != '}' && !c.is_whitespace()
}

/// The lexer over one input unit (a file or a named-block body).
pub struct Lexer<'a> {
    comp: &'a mut Compilation,
    sink: &'a mut Vec<Token>,
    input: String,
    origin: Origin,
    /// Byte offset where the pending token starts.
    start: usize,
    /// Current byte offset.
    pos: usize,
    /// 1-indexed line of `start`.
    line: usize,
    /// 1-indexed column of `start`.
    column: usize,
    /// Relative path segments accumulated along the include chain.
    relative_paths: Vec<PathBuf>,
    /// Locations of the include/substitute sites this lexer was spawned
    /// from, innermost first.
    call_stack: Vec<Frame>,
}

impl<'a> Lexer<'a> {
    /// Opens a lexer over a template file.
    pub fn from_file(
        path: &Path,
        comp: &'a mut Compilation,
        sink: &'a mut Vec<Token>,
    ) -> CompileResult<Self> {
        let input = std::fs::read_to_string(path).map_err(|e| CompileError::io(path, &e))?;
        Ok(Self::new(
            input,
            Origin::File(path.to_path_buf()),
            comp,
            sink,
            Vec::new(),
            Vec::new(),
        ))
    }

    /// Opens a lexer over in-memory template text.
    pub fn from_source(
        input: impl Into<String>,
        path: &Path,
        comp: &'a mut Compilation,
        sink: &'a mut Vec<Token>,
    ) -> Self {
        Self::new(
            input.into(),
            Origin::File(path.to_path_buf()),
            comp,
            sink,
            Vec::new(),
            Vec::new(),
        )
    }

    fn new(
        input: String,
        origin: Origin,
        comp: &'a mut Compilation,
        sink: &'a mut Vec<Token>,
        relative_paths: Vec<PathBuf>,
        call_stack: Vec<Frame>,
    ) -> Self {
        Self {
            comp,
            sink,
            input,
            origin,
            start: 0,
            pos: 0,
            line: 1,
            column: 1,
            relative_paths,
            call_stack,
        }
    }

    /// Lexes the whole unit, terminating the stream with EOF or a single
    /// error token.
    pub fn lex(mut self) {
        match self.document() {
            Ok(()) => self.emit_simple(TokenKind::Eof),
            Err(e) => {
                let loc = e.frames[0].clone();
                let call_stack = e.frames[1..].to_vec();
                self.sink.push(Token {
                    kind: TokenKind::Error,
                    flags: TokenFlags::default(),
                    val: e.message,
                    newline: false,
                    loc,
                    call_stack,
                    err: Some(e.kind),
                });
            }
        }
    }

    // =========================================================================
    // States
    // =========================================================================

    /// The run state: the main loop every other state returns to.
    fn document(&mut self) -> CompileResult<()> {
        loop {
            self.ignore_whitespace();
            self.accept_run();
            self.emit_run(false);
            if self.is_at_close_tag() {
                self.emit_simple(TokenKind::End);
                self.ignore_close_tag();
            } else if self.is_at_open_tag() {
                self.lex_tag()?;
            } else {
                return Ok(());
            }
        }
    }

    /// The tag state: classify the literal at the cursor and dispatch.
    fn lex_tag(&mut self) -> CompileResult<()> {
        let site = self.frame();
        let literal = self.scan_tag();

        if let Some(desc) = TOKENS.get(&literal).copied() {
            return self.dispatch(desc, site);
        }

        // Not a known tag: a defined block used as a custom tag, or the
        // `{{goExpr}}` interface shortcut.
        let name = literal[TOK_BEGIN.len()..].to_string();
        if self.comp.blocks.contains(&name) {
            self.ignore();
            return self.lex_substitute(Some(name), TokenFlags::default(), site);
        }

        // Rewind past the braces and let the run state collect the
        // expression.
        self.pos = self.start + TOK_BEGIN.len();
        self.ignore();
        self.emit(
            TokenKind::Interface,
            TokenFlags::default(),
            String::new(),
            false,
        );
        Ok(())
    }

    fn dispatch(&mut self, desc: TokenDesc, site: Frame) -> CompileResult<()> {
        match desc.kind {
            TokenKind::Include => {
                self.ignore();
                self.lex_include(desc.flags, site)
            }
            TokenKind::NamedBlock => {
                self.ignore();
                self.lex_define_block(site)
            }
            TokenKind::Substitute => {
                self.ignore();
                self.lex_substitute(None, desc.flags, site)
            }
            TokenKind::StrictBlock => {
                self.emit(TokenKind::StrictBlock, desc.flags, String::new(), false);
                self.lex_strict_block()
            }
            TokenKind::Comment => {
                self.ignore();
                self.lex_comment()
            }
            TokenKind::Text => {
                self.emit(TokenKind::Text, desc.flags, String::new(), false);
                let newline = matches!(self.peek(), Some('\n' | '\r'));
                self.ignore_one_space();
                self.lex_text(newline);
                Ok(())
            }
            TokenKind::Join => {
                self.ignore();
                self.lex_join()
            }
            TokenKind::Backup => {
                self.ignore();
                self.lex_backup()
            }
            TokenKind::EndBlock => {
                self.emit(
                    TokenKind::EndBlock,
                    desc.flags,
                    desc.literal_val.to_string(),
                    false,
                );
                self.ignore_whitespace();
                Ok(())
            }
            // Control openers, code contexts and typed values all continue
            // in the run state, which collects the expression and its close.
            _ => {
                self.emit(desc.kind, desc.flags, String::new(), false);
                self.ignore_whitespace();
                Ok(())
            }
        }
    }

    /// The first run of a text body: no whitespace skipping, and the
    /// newline hint rides along.
    fn lex_text(&mut self, newline: bool) {
        if !self.is_at_close_tag() {
            self.accept_run();
            self.emit_run(newline);
        }
    }

    /// A `{{begin X}} … {{end X}}` region captured verbatim.
    fn lex_strict_block(&mut self) -> CompileResult<()> {
        self.ignore_space();
        self.accept_run();
        let name = self.current().trim().to_string();
        if !self.is_at_close_tag() {
            return Err(self.err(ErrorKind::MissingCloseTag, "expected close tag"));
        }
        self.ignore_close_tag();

        let end_marker = format!("{{{{end {name}}}}}");
        let newline = matches!(self.peek(), Some('\n' | '\r'));
        self.ignore_one_space();
        self.accept_until(&end_marker);
        if !self.at(&end_marker) {
            return Err(self.err(
                ErrorKind::UnterminatedStrictBlock,
                format!("no strict end block found for \"{name}\""),
            ));
        }
        let body = self.current().to_string();
        self.emit(TokenKind::Run, TokenFlags::default(), body, newline);
        self.ignore_str(&end_marker);
        self.emit_simple(TokenKind::End);
        Ok(())
    }

    /// Discards a comment body; the residue is an ignorable marker token.
    fn lex_comment(&mut self) -> CompileResult<()> {
        self.accept_run();
        self.ignore();
        if !self.is_at_close_tag() {
            return Err(self.err(ErrorKind::MissingCloseTag, "close tag not found"));
        }
        self.ignore_close_tag();
        self.emit_simple(TokenKind::Ignore);
        Ok(())
    }

    /// `{{join <slice>, <sep>}}`, or the spaced end form `{{join }}`.
    fn lex_join(&mut self) -> CompileResult<()> {
        self.ignore_space();
        if self.is_at_close_tag() {
            self.emit(
                TokenKind::EndBlock,
                TokenFlags::default(),
                "join".to_string(),
                false,
            );
            self.ignore_close_tag();
            return Ok(());
        }
        self.accept_run();
        if !self.is_at_close_tag() {
            return Err(self.err(ErrorKind::MissingCloseTag, "expected close tag"));
        }
        let raw = self.current().to_string();
        let split = split_params(&raw).map_err(|msg| self.err(ErrorKind::BadParameterList, msg))?;
        self.ignore();
        self.emit_simple(TokenKind::Join);
        for param in split {
            self.emit(TokenKind::Param, TokenFlags::default(), param, false);
        }
        self.emit_simple(TokenKind::End);
        self.ignore_close_tag();
        Ok(())
    }

    /// `{{-}}` / `{{- N}}`: truncate the output buffer.
    fn lex_backup(&mut self) -> CompileResult<()> {
        self.ignore_space();
        self.accept_run();
        if !self.is_at_close_tag() {
            return Err(self.err(ErrorKind::MissingCloseTag, "expected close tag"));
        }
        let count = self.current().trim().to_string();
        if !count.is_empty() && !count.bytes().all(|b| b.is_ascii_digit()) {
            return Err(self.err(
                ErrorKind::BadBackupCount,
                "backup tag did not contain numbers only",
            ));
        }
        self.emit(TokenKind::Backup, TokenFlags::default(), count, false);
        self.ignore_close_tag();
        self.ignore_newline();
        Ok(())
    }

    // =========================================================================
    // Emission
    // =========================================================================

    fn emit(&mut self, kind: TokenKind, flags: TokenFlags, val: String, newline: bool) {
        let loc = self.frame();
        self.sink.push(Token {
            kind,
            flags,
            val,
            newline,
            loc,
            call_stack: self.call_stack.clone(),
            err: None,
        });
        self.ignore();
    }

    fn emit_simple(&mut self, kind: TokenKind) {
        self.emit(kind, TokenFlags::default(), String::new(), false);
    }

    /// Emits the pending buffer as a run, if non-empty.
    fn emit_run(&mut self, newline: bool) {
        if self.pos > self.start {
            let val = self.current().to_string();
            self.emit(TokenKind::Run, TokenFlags::default(), val, newline);
        }
    }

    /// Builds an error at the current position, with the full call stack.
    fn err(&self, kind: ErrorKind, message: impl Into<String>) -> CompileError {
        let mut e = CompileError::new(kind, message, self.pos_frame());
        e.frames.extend_from_slice(&self.call_stack);
        e
    }

    // =========================================================================
    // Cursor
    // =========================================================================

    fn rest(&self) -> &str {
        &self.input[self.pos..]
    }

    /// The pending buffer between `start` and `pos`.
    fn current(&self) -> &str {
        &self.input[self.start..self.pos]
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Steps back one character. Must not cross `start`.
    fn backup(&mut self) {
        debug_assert!(self.pos > self.start, "cannot backup here");
        if let Some(c) = self.current().chars().next_back() {
            self.pos -= c.len_utf8();
        }
    }

    fn at(&self, pattern: &str) -> bool {
        self.rest().starts_with(pattern)
    }

    fn is_at_open_tag(&self) -> bool {
        self.at(TOK_BEGIN)
    }

    /// A close tag is `}}`, or a space followed by `}}` (the space belongs
    /// to the tag).
    fn is_at_close_tag(&self) -> bool {
        self.at(TOK_END) || self.at(TOK_END_WITH_SPACE)
    }

    /// Location at the start of the pending buffer.
    fn frame(&self) -> Frame {
        Frame::new(self.origin.clone(), self.line, self.column)
    }

    /// Location at the current position.
    fn pos_frame(&self) -> Frame {
        let (mut line, mut column) = (self.line, self.column);
        for c in self.current().chars() {
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        Frame::new(self.origin.clone(), line, column)
    }

    /// Drops the pending buffer, advancing the recorded location over it.
    fn ignore(&mut self) {
        let f = self.pos_frame();
        self.line = f.line;
        self.column = f.column;
        self.start = self.pos;
    }

    /// Reads the tag literal at the cursor: `{{`, the following tag
    /// characters, and, for complete end-block spellings like `{{if}}`,
    /// the closing braces.
    fn scan_tag(&mut self) -> String {
        self.next_char();
        self.next_char();
        while let Some(c) = self.peek() {
            if is_tag_char(c) {
                self.next_char();
            } else {
                break;
            }
        }
        if self.at(TOK_END) {
            let with_braces = format!("{}{}", self.current(), TOK_END);
            if TOKENS.contains_key(&with_braces) {
                self.next_char();
                self.next_char();
            }
        }
        self.current().to_string()
    }

    /// Accepts characters until an open tag, a close tag, or EOF.
    fn accept_run(&mut self) {
        while !self.at_eof() && !self.is_at_open_tag() && !self.is_at_close_tag() {
            self.next_char();
        }
    }

    /// Accepts characters until `pattern` or EOF.
    fn accept_until(&mut self, pattern: &str) {
        while !self.at_eof() && !self.at(pattern) {
            self.next_char();
        }
    }

    /// Accepts characters while `pred` holds.
    fn accept_while<F: Fn(char) -> bool>(&mut self, pred: F) {
        while let Some(c) = self.peek() {
            if pred(c) {
                self.next_char();
            } else {
                break;
            }
        }
    }

    /// Skips spaces and tabs.
    fn ignore_space(&mut self) {
        self.ignore();
        self.accept_while(|c| c == ' ' || c == '\t');
        self.ignore();
    }

    /// Skips all whitespace, including line breaks.
    fn ignore_whitespace(&mut self) {
        self.ignore();
        self.accept_while(char::is_whitespace);
        self.ignore();
    }

    /// Skips one space, tab, or line break (CRLF counts as one).
    fn ignore_one_space(&mut self) {
        self.ignore();
        match self.peek() {
            Some('\r') => {
                self.next_char();
                if self.peek() == Some('\n') {
                    self.next_char();
                    self.ignore();
                } else {
                    self.backup();
                }
            }
            Some('\n') | Some(' ') | Some('\t') => {
                self.next_char();
                self.ignore();
            }
            _ => {}
        }
    }

    /// Steps over a line break if the cursor is on one.
    fn ignore_newline(&mut self) {
        self.ignore();
        match self.peek() {
            Some('\r') => {
                self.next_char();
                if self.peek() == Some('\n') {
                    self.next_char();
                    self.ignore();
                } else {
                    self.backup();
                }
            }
            Some('\n') => {
                self.next_char();
                self.ignore();
            }
            _ => {}
        }
    }

    /// Steps over a close tag, including its absorbed leading space.
    fn ignore_close_tag(&mut self) {
        self.ignore();
        if self.is_at_close_tag() {
            if self.peek() == Some(' ') {
                self.next_char();
            }
            self.next_char();
            self.next_char();
            self.ignore();
        }
    }

    /// Steps over `s`, which must be at the cursor.
    fn ignore_str(&mut self, s: &str) {
        debug_assert!(self.at(s));
        self.pos += s.len();
        self.ignore();
    }
}
