//! Code emitter: walks template ASTs and writes Go source.
//!
//! The emitter carries the four text-mode flags (text, escape, breaks,
//! translate), updated on entering a text or code node and restored on exit.
//! Runs inside a code context are copied verbatim; runs inside a text
//! context become buffer writes of a quoted literal. Escaping and break
//! expansion happen at emit time, not at runtime.
//!
//! The emitted code assumes the enclosing scope provides a buffer `buf` with
//! `WriteString`, `Len` and `Truncate`, a translator `t` with
//! `Translate(string, buf)` for translated tags, and the standard
//! `html`/`strconv`/`fmt`/`strings` helpers.

mod quote;

use std::fmt::Write;

pub use quote::{go_quote, html_escape, quote_text};

use super::ast::{Node, ValueKind};
use super::token::TokenFlags;

/// Comment line marking every output file as generated.
pub const GENERATED_HEADER: &str = "//** This file was code generated by gotpl. DO NOT EDIT. ***\n\n\n";

/// Emits the header plus each AST in order and returns the file contents.
pub fn emit_file<'a>(asts: impl IntoIterator<Item = &'a Node>) -> String {
    let mut cg = Codegen::new();
    for ast in asts {
        // The newline hint never crosses a file boundary.
        cg.ended_with_newline = true;
        cg.walk(ast);
    }
    cg.finish()
}

/// The AST walker.
pub struct Codegen {
    out: String,
    text_mode: bool,
    escape: bool,
    html_breaks: bool,
    translate: bool,
    /// Whether the last text run ended at a line break; seeds the
    /// newline-hint handling.
    ended_with_newline: bool,
}

type Mode = (bool, bool, bool, bool);

impl Codegen {
    pub fn new() -> Self {
        Self {
            out: String::from(GENERATED_HEADER),
            text_mode: false,
            escape: false,
            html_breaks: false,
            translate: false,
            ended_with_newline: true,
        }
    }

    pub fn finish(self) -> String {
        self.out
    }

    pub fn walk(&mut self, node: &Node) {
        match node {
            Node::Run { text, newline } => {
                if self.text_mode {
                    self.write_text(text, *newline);
                } else {
                    self.out.push_str(text);
                }
            }

            Node::StrictBlock { text, newline } => {
                let saved = self.set_mode(true, false, false, false);
                self.write_text(text, *newline);
                self.restore_mode(saved);
            }

            Node::Code { body, with_error } => {
                let saved = self.set_mode(false, false, false, false);
                if *with_error {
                    let code = self.capture(|cg| cg.walk_all(body));
                    let _ = write!(
                        self.out,
                        "\n{{\nerr := {}\nif err != nil {{ return err }}\n}}\n",
                        code.trim()
                    );
                } else {
                    self.walk_all(body);
                }
                self.restore_mode(saved);
            }

            Node::Text { body, flags } => {
                let saved =
                    self.set_mode(true, flags.escaped, flags.html_breaks, flags.translate);
                self.walk_all(body);
                self.restore_mode(saved);
            }

            Node::Value { kind, expr, flags } => self.write_value(*kind, expr, *flags),

            Node::If { branches } => {
                for (i, branch) in branches.iter().enumerate() {
                    match (&branch.cond, i) {
                        (Some(cond), 0) => {
                            let _ = write!(self.out, "\nif {cond} {{\n");
                        }
                        (Some(cond), _) => {
                            let _ = write!(self.out, "\n}} else if {cond} {{\n");
                        }
                        (None, _) => self.out.push_str("\n} else {\n"),
                    }
                    self.walk_all(&branch.body);
                }
                self.out.push_str("\n}\n");
            }

            Node::For { header, body } => {
                let _ = write!(self.out, "\nfor {header} {{\n");
                self.walk_all(body);
                self.out.push_str("\n}\n");
            }

            Node::Join { slice, sep, body } => {
                let _ = write!(self.out, "\nfor _i, _j := range {slice} {{\n_ = _j\n");
                let saved = self.set_mode(true, false, false, false);
                self.walk_all(body);
                self.restore_mode(saved);
                let _ = write!(
                    self.out,
                    "\nif _i < len({slice}) - 1 {{\nbuf.WriteString({})\n}}\n}}\n",
                    go_quote(sep)
                );
                self.ended_with_newline = false;
            }

            Node::Backup { count } => {
                let _ = write!(self.out, "\nbuf.Truncate(buf.Len() - {count})\n");
                self.ended_with_newline = false;
            }
        }
    }

    fn walk_all(&mut self, nodes: &[Node]) {
        for node in nodes {
            self.walk(node);
        }
    }

    /// A text run as a buffer write (or translator call) of a quoted
    /// literal.
    fn write_text(&mut self, text: &str, newline_hint: bool) {
        if text.is_empty() {
            return;
        }
        let ends_with_newline = text.ends_with('\n');

        // Restore the line break the text-opening tag consumed, unless the
        // previous run already ended on one.
        let mut val = if newline_hint && !self.ended_with_newline {
            format!("\n{text}")
        } else {
            text.to_string()
        };

        if self.escape {
            val = html_escape(&val);
            if self.html_breaks {
                val = val.replace("\r\n", "\n");
                val = val.replace("\n\n", "</p><p>");
                val = val.replace('\n', "<br>\n");
                // Pretty-print so the output is inspectable.
                val = val.replace("</p><p>", "</p>\n<p>");
                val = format!("<p>{val}</p>\n");
            }
        }

        if self.translate {
            let _ = write!(self.out, "\nt.Translate({}, buf)\n", quote_text(&val));
        } else {
            let _ = write!(self.out, "\nbuf.WriteString({})\n", quote_text(&val));
        }
        self.ended_with_newline = ends_with_newline;
    }

    /// A typed value as a formatted, optionally escaped buffer write,
    /// optionally inside an error-propagating scope.
    fn write_value(&mut self, kind: ValueKind, expr: &str, flags: TokenFlags) {
        let arg = if flags.with_error { "v" } else { expr };
        let formatted = match kind {
            ValueKind::Bool => format!("strconv.FormatBool({arg})"),
            ValueKind::Int => format!("strconv.Itoa({arg})"),
            ValueKind::Uint => format!("strconv.FormatUint(uint64({arg}), 10)"),
            ValueKind::Interface => format!("fmt.Sprint({arg})"),
            ValueKind::Float => format!("strconv.FormatFloat(float64({arg}), 'g', -1, 64)"),
            ValueKind::Bytes => format!("string({arg}[:])"),
            ValueKind::Str => arg.to_string(),
        };

        let write_stmt = if flags.html_breaks {
            format!(
                "buf.WriteString(strings.Replace(html.EscapeString({formatted}), \"\\n\", \"<br>\\n\", -1))"
            )
        } else if flags.escaped {
            format!("buf.WriteString(html.EscapeString({formatted}))")
        } else {
            format!("buf.WriteString({formatted})")
        };

        if flags.with_error {
            let _ = write!(
                self.out,
                "\n{{\nv, err := {expr}\n{write_stmt}\nif err != nil {{ return err }}\n}}\n"
            );
        } else {
            let _ = write!(self.out, "\n{write_stmt}\n");
        }
        self.ended_with_newline = false;
    }

    /// Runs `f` with the output redirected into a fresh buffer and returns
    /// what it wrote.
    fn capture<F: FnOnce(&mut Self)>(&mut self, f: F) -> String {
        let saved = std::mem::take(&mut self.out);
        f(self);
        std::mem::replace(&mut self.out, saved)
    }

    fn set_mode(&mut self, text_mode: bool, escape: bool, html_breaks: bool, translate: bool) -> Mode {
        let saved = (
            self.text_mode,
            self.escape,
            self.html_breaks,
            self.translate,
        );
        self.text_mode = text_mode;
        self.escape = escape;
        self.html_breaks = html_breaks;
        self.translate = translate;
        saved
    }

    fn restore_mode(&mut self, saved: Mode) {
        (
            self.text_mode,
            self.escape,
            self.html_breaks,
            self.translate,
        ) = saved;
    }
}

impl Default for Codegen {
    fn default() -> Self {
        Self::new()
    }
}
