//! Parser for the template token stream.
//!
//! Strictly recursive-descent, driven by token kind. The parser consumes the
//! finished token stream through a cursor and produces a single AST root, or
//! the first fault as a [`CompileError`].
//!
//! ```text
//! ast        = run
//! run        = { item }
//! item       = Run | StrictBlock | text-block | go-block | value
//!            | if-stmt | for-stmt | join-stmt
//! text-block = Text run End
//! go-block   = Go  run End
//! value      = TypedTag Run End
//! if-stmt    = If Run End run ( EndBlock"elseif" … | EndBlock"else" run
//!              EndBlock"if" | EndBlock"if" )
//! for-stmt   = For Run End run EndBlock"for"
//! join-stmt  = Join Param Param End run EndBlock"join"
//! ```

#[cfg(test)]
mod tests;

use super::ast::{IfBranch, Node, ValueKind};
use super::error::{CompileError, CompileResult, ErrorKind, Frame, Origin};
use super::token::{Token, TokenKind};

/// The parser over a finished token stream.
pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parses the stream into the root node.
    pub fn parse(mut self) -> CompileResult<Node> {
        let (body, end) = self.parse_run()?;
        match end.kind {
            TokenKind::Eof => Ok(Node::root(body)),
            _ => Err(err_at(
                &end,
                ErrorKind::OrphanClose,
                "close tag with no matching open tag",
            )),
        }
    }

    // =========================================================================
    // Cursor
    // =========================================================================

    fn next_token(&mut self) -> Token {
        match self.tokens.get(self.pos) {
            Some(tok) => {
                self.pos += 1;
                tok.clone()
            }
            // The lexer always terminates the stream; this is a backstop.
            None => Token {
                kind: TokenKind::Eof,
                flags: Default::default(),
                val: String::new(),
                newline: false,
                loc: Frame::new(Origin::File(Default::default()), 0, 0),
                call_stack: Vec::new(),
                err: None,
            },
        }
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind)
    }

    // =========================================================================
    // Grammar
    // =========================================================================

    /// Parses items until a terminator (End, EndBlock or EOF) and returns
    /// both.
    fn parse_run(&mut self) -> CompileResult<(Vec<Node>, Token)> {
        let mut items = Vec::new();
        loop {
            let tok = self.next_token();
            match tok.kind {
                TokenKind::Eof | TokenKind::End | TokenKind::EndBlock => {
                    return Ok((items, tok));
                }
                TokenKind::Error => return Err(self.error_from(tok)),
                TokenKind::Ignore | TokenKind::Open => {}
                TokenKind::Run => items.push(Node::Run {
                    text: tok.val,
                    newline: tok.newline,
                }),
                TokenKind::StrictBlock => items.push(self.parse_strict()?),
                TokenKind::Text => {
                    let (body, end) = self.parse_run()?;
                    self.expect_block_end(end, "text block")?;
                    items.push(Node::Text {
                        body,
                        flags: tok.flags,
                    });
                }
                TokenKind::Go | TokenKind::GoErr => {
                    let (body, end) = self.parse_run()?;
                    self.expect_block_end(end, "code block")?;
                    items.push(Node::Code {
                        body,
                        with_error: tok.kind == TokenKind::GoErr,
                    });
                }
                kind if kind.is_value() => items.push(self.parse_value(tok)?),
                TokenKind::If => items.push(self.parse_if(&tok)?),
                TokenKind::For => items.push(self.parse_for(&tok)?),
                TokenKind::Join => items.push(self.parse_join(&tok)?),
                TokenKind::Backup => items.push(Node::Backup {
                    count: tok.val.parse().unwrap_or(1),
                }),
                TokenKind::Param => {
                    return Err(err_at(
                        &tok,
                        ErrorKind::UnexpectedToken,
                        "join parameter outside a join statement",
                    ))
                }
                _ => unreachable!("lexer never hands {:?} to the parser", tok.kind),
            }
        }
    }

    /// `StrictBlock Run End`.
    fn parse_strict(&mut self) -> CompileResult<Node> {
        let run = self.next_token();
        let node = match run.kind {
            TokenKind::Run => Node::StrictBlock {
                text: run.val,
                newline: run.newline,
            },
            TokenKind::Error => return Err(self.error_from(run)),
            _ => {
                return Err(err_at(
                    &run,
                    ErrorKind::UnexpectedToken,
                    "unexpected token inside a strict block",
                ))
            }
        };
        let end = self.next_token();
        self.expect_block_end(end, "strict block")?;
        Ok(node)
    }

    /// `TypedTag Run End`; the expression is trimmed and must be non-empty.
    fn parse_value(&mut self, open: Token) -> CompileResult<Node> {
        let next = self.next_token();
        let expr = match next.kind {
            TokenKind::Run => next.val.trim().to_string(),
            TokenKind::End => {
                return Err(err_at(&open, ErrorKind::MissingValue, "missing value"))
            }
            TokenKind::Eof => {
                return Err(err_at(
                    &next,
                    ErrorKind::UnexpectedEof,
                    "unexpected end of file",
                ))
            }
            TokenKind::Error => return Err(self.error_from(next)),
            _ => {
                return Err(err_at(
                    &next,
                    ErrorKind::UnexpectedToken,
                    "unexpected token inside a value",
                ))
            }
        };
        if expr.is_empty() {
            return Err(err_at(&open, ErrorKind::MissingValue, "missing value"));
        }

        let end = self.next_token();
        match end.kind {
            TokenKind::End => {}
            TokenKind::Eof => {
                return Err(err_at(
                    &end,
                    ErrorKind::UnexpectedEof,
                    "unexpected end of file",
                ))
            }
            TokenKind::Error => return Err(self.error_from(end)),
            _ => {
                return Err(err_at(
                    &end,
                    ErrorKind::UnexpectedToken,
                    "unexpected token inside a value",
                ))
            }
        }

        let Some(kind) = ValueKind::from_token(open.kind) else {
            unreachable!("checked by TokenKind::is_value");
        };
        Ok(Node::Value {
            kind,
            expr,
            flags: open.flags,
        })
    }

    /// Reads the `Run End` header of an `if`, `elseif` or `for`.
    fn parse_header(&mut self, what: &str, open: &Token) -> CompileResult<String> {
        let next = self.next_token();
        let header = match next.kind {
            TokenKind::Run => next.val.trim().to_string(),
            TokenKind::End => {
                return Err(err_at(
                    open,
                    ErrorKind::MissingCondition,
                    format!("missing condition in {what} statement"),
                ))
            }
            TokenKind::Eof => {
                return Err(err_at(
                    &next,
                    ErrorKind::UnexpectedEof,
                    "unexpected end of file",
                ))
            }
            TokenKind::Error => return Err(self.error_from(next)),
            _ => {
                return Err(err_at(
                    &next,
                    ErrorKind::UnexpectedToken,
                    format!("unexpected token inside a {what} statement"),
                ))
            }
        };
        if header.is_empty() {
            return Err(err_at(
                open,
                ErrorKind::MissingCondition,
                format!("missing condition in {what} statement"),
            ));
        }

        let end = self.next_token();
        match end.kind {
            TokenKind::End => Ok(header),
            TokenKind::Eof => Err(err_at(
                &end,
                ErrorKind::UnexpectedEof,
                "unexpected end of file",
            )),
            TokenKind::Error => Err(self.error_from(end)),
            _ => Err(err_at(
                &end,
                ErrorKind::UnexpectedToken,
                format!("unexpected token inside a {what} statement"),
            )),
        }
    }

    /// The if-chain: branches accumulate until the closing `{{if}}`.
    fn parse_if(&mut self, open: &Token) -> CompileResult<Node> {
        let mut branches = Vec::new();
        let mut cond = Some(self.parse_header("if", open)?);
        loop {
            let (body, end) = self.parse_run()?;
            match end.kind {
                TokenKind::EndBlock => {}
                TokenKind::Eof => {
                    return Err(err_at(
                        &end,
                        ErrorKind::UnexpectedEof,
                        "unexpected end of file",
                    ))
                }
                TokenKind::End => {
                    return Err(err_at(
                        &end,
                        ErrorKind::UnexpectedToken,
                        "unexpected close tag inside an if statement",
                    ))
                }
                _ => unreachable!("parse_run only stops on terminators"),
            }

            let had_else = cond.is_none();
            branches.push(IfBranch {
                cond: cond.take(),
                body,
            });

            match end.val.as_str() {
                "if" => return Ok(Node::If { branches }),
                "elseif" => {
                    if had_else {
                        return Err(err_at(
                            &end,
                            ErrorKind::MisplacedElse,
                            "cannot put an elseif after an else",
                        ));
                    }
                    cond = Some(self.parse_header("if", open)?);
                }
                "else" => {
                    if had_else {
                        return Err(err_at(
                            &end,
                            ErrorKind::MisplacedElse,
                            "cannot put an else after another else",
                        ));
                    }
                    cond = None;
                }
                other => {
                    return Err(err_at(
                        &end,
                        ErrorKind::WrongEndBlock,
                        format!("expected {{{{if}}}} to end the if statement, found {{{{{other}}}}}"),
                    ))
                }
            }
        }
    }

    fn parse_for(&mut self, open: &Token) -> CompileResult<Node> {
        let header = self.parse_header("for", open)?;
        let (body, end) = self.parse_run()?;
        match end.kind {
            TokenKind::EndBlock if end.val == "for" => Ok(Node::For { header, body }),
            TokenKind::EndBlock => Err(err_at(
                &end,
                ErrorKind::WrongEndBlock,
                format!(
                    "expected {{{{for}}}} to end the for statement, found {{{{{}}}}}",
                    end.val
                ),
            )),
            TokenKind::Eof => Err(err_at(
                &end,
                ErrorKind::UnexpectedEof,
                "unexpected end of file",
            )),
            _ => Err(err_at(
                &end,
                ErrorKind::UnexpectedToken,
                "unexpected close tag inside a for statement",
            )),
        }
    }

    /// `Join Param Param End run EndBlock"join"`.
    fn parse_join(&mut self, open: &Token) -> CompileResult<Node> {
        let slice = self.expect_param(open)?;
        let sep = self.expect_param(open)?;

        let end = self.next_token();
        match end.kind {
            TokenKind::End => {}
            TokenKind::Param => {
                return Err(err_at(
                    &end,
                    ErrorKind::BadJoinParams,
                    "a join statement takes exactly two parameters",
                ))
            }
            TokenKind::Eof => {
                return Err(err_at(
                    &end,
                    ErrorKind::UnexpectedEof,
                    "unexpected end of file",
                ))
            }
            TokenKind::Error => return Err(self.error_from(end)),
            _ => {
                return Err(err_at(
                    &end,
                    ErrorKind::UnexpectedToken,
                    "expected end of join statement",
                ))
            }
        }

        let (body, end) = self.parse_run()?;
        match end.kind {
            TokenKind::EndBlock if end.val == "join" => Ok(Node::Join { slice, sep, body }),
            TokenKind::EndBlock => Err(err_at(
                &end,
                ErrorKind::WrongEndBlock,
                format!(
                    "expected {{{{join}}}} to end the join statement, found {{{{{}}}}}",
                    end.val
                ),
            )),
            TokenKind::Eof => Err(err_at(
                &end,
                ErrorKind::UnexpectedEof,
                "unexpected end of file",
            )),
            _ => Err(err_at(
                &end,
                ErrorKind::UnexpectedToken,
                "unexpected close tag inside a join statement",
            )),
        }
    }

    fn expect_param(&mut self, open: &Token) -> CompileResult<String> {
        let tok = self.next_token();
        match tok.kind {
            TokenKind::Param => Ok(tok.val),
            TokenKind::Error => Err(self.error_from(tok)),
            TokenKind::Eof => Err(err_at(
                &tok,
                ErrorKind::UnexpectedEof,
                "unexpected end of file",
            )),
            _ => Err(err_at(
                open,
                ErrorKind::BadJoinParams,
                "expected parameter of join statement",
            )),
        }
    }

    /// `End` terminates a nested text/code/strict block; anything else is a
    /// structural fault.
    fn expect_block_end(&mut self, end: Token, what: &str) -> CompileResult<()> {
        match end.kind {
            TokenKind::End => Ok(()),
            TokenKind::Eof => Err(err_at(
                &end,
                ErrorKind::UnexpectedEof,
                "unexpected end of file",
            )),
            TokenKind::EndBlock => Err(err_at(
                &end,
                ErrorKind::UnexpectedToken,
                format!("unexpected {{{{{}}}}} tag inside a {what}", end.val),
            )),
            _ => unreachable!("parse_run only stops on terminators"),
        }
    }

    /// Converts an error token into the error value, draining any follow-on
    /// error tokens into the call stack.
    fn error_from(&mut self, tok: Token) -> CompileError {
        let mut err = CompileError {
            kind: tok.err.unwrap_or(ErrorKind::UnexpectedToken),
            message: tok.val,
            frames: Vec::with_capacity(1 + tok.call_stack.len()),
        };
        err.frames.push(tok.loc);
        err.frames.extend(tok.call_stack);

        while self.peek_kind() == Some(TokenKind::Error) {
            let extra = self.next_token();
            err.frames.push(extra.loc);
            err.frames.extend(extra.call_stack);
        }
        err
    }
}

fn err_at(tok: &Token, kind: ErrorKind, message: impl Into<String>) -> CompileError {
    let mut err = CompileError::new(kind, message, tok.loc.clone());
    err.frames.extend_from_slice(&tok.call_stack);
    err
}
