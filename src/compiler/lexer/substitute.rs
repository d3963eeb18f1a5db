//! Named-block definition and substitution states.

use super::params::{process_params, split_params};
use super::{is_tag_char, Lexer};
use crate::compiler::error::{CompileResult, ErrorKind, Frame, Origin};
use crate::compiler::token::{self, TokenFlags};

impl<'a> Lexer<'a> {
    /// `{{< name [paramCount]}} … {{end name}}`: registers a fragment.
    ///
    /// No tokens are emitted; the only effect is on the registry.
    pub(super) fn lex_define_block(&mut self, site: Frame) -> CompileResult<()> {
        self.ignore_space();
        self.accept_run();
        if !self.is_at_close_tag() {
            return Err(self.err(ErrorKind::MissingCloseTag, "expected close tag"));
        }
        let header = self.current().to_string();
        self.ignore_close_tag();

        let parts: Vec<&str> = header.split(' ').collect();
        let (name, param_count) = match parts[..] {
            [name] => (name, 0),
            [name, count] => {
                let count: usize = count.parse().map_err(|_| {
                    self.err(
                        ErrorKind::BadParamCount,
                        "item after block name must be the parameter count",
                    )
                })?;
                (name, count)
            }
            _ => {
                return Err(self.err(
                    ErrorKind::BadBlockName,
                    "block name cannot contain spaces",
                ))
            }
        };

        if name.is_empty() {
            return Err(self.err(ErrorKind::BadBlockName, "missing block name"));
        }
        if name.contains(['\t', '\r', '\n']) {
            return Err(self.err(
                ErrorKind::BadBlockName,
                "block name cannot have tabs or newlines after it",
            ));
        }
        if token::is_tag_name(name) {
            return Err(self.err(
                ErrorKind::BlockNameIsTag,
                format!("block name cannot be a tag name. Block name: {name}"),
            ));
        }
        if param_count > 9 {
            return Err(self.err(
                ErrorKind::BadParamCount,
                "a named block takes at most 9 parameters",
            ));
        }

        let end_marker = format!("{{{{end {name}}}}}");
        self.accept_until(&end_marker);
        if !self.at(&end_marker) {
            return Err(self.err(
                ErrorKind::UnterminatedDefine,
                format!("no end block found for \"{name}\""),
            ));
        }
        let body = self.current().to_string();
        self.ignore_str(&end_marker);

        let name = name.to_string();
        self.comp
            .blocks
            .add(&name, body, param_count, site)
            .map_err(|prev| {
                self.err(
                    ErrorKind::BlockRedefined,
                    format!("named block {name} has already been defined at {prev}"),
                )
            })
    }

    /// `{{> name [args]}}` or the `{{name args}}` shortcut: splices a
    /// fragment body with positional parameters replaced.
    pub(super) fn lex_substitute(
        &mut self,
        name: Option<String>,
        flags: TokenFlags,
        site: Frame,
    ) -> CompileResult<()> {
        let name = match name {
            Some(name) => name,
            None => {
                self.ignore_space();
                self.accept_while(is_tag_char);
                let name = self.current().to_string();
                if name.is_empty() {
                    return Err(self.err(ErrorKind::BadBlockName, "missing block name"));
                }
                self.ignore();
                name
            }
        };

        self.ignore_space();
        self.accept_run();
        if !self.is_at_close_tag() {
            return Err(self.err(ErrorKind::MissingCloseTag, "expected close tag"));
        }
        let raw_params = self.current().trim().to_string();
        self.ignore_close_tag();

        let entry = match self.comp.blocks.get(&name) {
            Some(entry) => entry.clone(),
            None if flags.optional => return Ok(()),
            None => {
                return Err(self.err(
                    ErrorKind::UnknownBlock,
                    format!("named block not found: {name}"),
                ))
            }
        };

        let params =
            split_params(&raw_params).map_err(|msg| self.err(ErrorKind::BadParameterList, msg))?;
        let processed = process_params(&name, &entry, &params, self.comp.param_mode)
            .map_err(|(kind, msg)| self.err(kind, msg))?;

        if self.comp.active_blocks.contains(&name) {
            return Err(self.err(
                ErrorKind::SubstituteCycle,
                format!("substitution cycle detected in block {name}"),
            ));
        }

        let mut child_stack = vec![site];
        child_stack.extend_from_slice(&self.call_stack);

        self.comp.active_blocks.push(name.clone());
        let relative_paths = self.relative_paths.clone();
        let result = Lexer::new(
            processed,
            Origin::Block(name),
            &mut *self.comp,
            &mut *self.sink,
            relative_paths,
            child_stack,
        )
        .document();
        self.comp.active_blocks.pop();
        result
    }
}
