use std::path::Path;

use pretty_assertions::assert_eq;

use crate::compiler::ast::{Node, ValueKind};
use crate::compiler::error::{CompileError, ErrorKind};
use crate::compiler::Compilation;

fn parse(input: &str) -> Result<Node, CompileError> {
    let mut comp = Compilation::default();
    comp.build_ast_from_source(input, Path::new("/test/input.tpl"))
}

fn parse_ok(input: &str) -> Vec<Node> {
    match parse(input) {
        Ok(Node::Code { body, .. }) => body,
        Ok(other) => panic!("root was not a code node: {other:?}"),
        Err(e) => panic!("parse failed: {e}"),
    }
}

fn parse_err(input: &str) -> CompileError {
    match parse(input) {
        Ok(node) => panic!("expected an error, got {node:?}"),
        Err(e) => e,
    }
}

#[test]
fn test_empty_input_is_empty_root() {
    assert_eq!(parse_ok(""), []);
}

#[test]
fn test_top_level_run() {
    let body = parse_ok("package main\n");
    assert_eq!(
        body,
        [Node::Run {
            text: "package main\n".to_string(),
            newline: false
        }]
    );
}

#[test]
fn test_text_block() {
    let body = parse_ok("{{ hello }}");
    match &body[..] {
        [Node::Text { body, flags }] => {
            assert!(!flags.escaped);
            assert_eq!(
                body[..],
                [Node::Run {
                    text: "hello".to_string(),
                    newline: false
                }]
            );
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_value_expression_is_trimmed() {
    let body = parse_ok("{{i  n + 1  }}");
    assert_eq!(
        body,
        [Node::Value {
            kind: ValueKind::Int,
            expr: "n + 1".to_string(),
            flags: Default::default(),
        }]
    );
}

#[test]
fn test_missing_value_is_error() {
    let err = parse_err("{{s }}");
    assert_eq!(err.kind, ErrorKind::MissingValue);
}

#[test]
fn test_value_at_eof_is_error() {
    let err = parse_err("{{s n");
    assert_eq!(err.kind, ErrorKind::UnexpectedEof);
}

#[test]
fn test_go_err_block() {
    let body = parse_ok("{{e doIt() }}");
    match &body[..] {
        [Node::Code { with_error, .. }] => assert!(with_error),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_if_chain_shape() {
    let body = parse_ok("{{if a}}1{{elseif b}}2{{else}}3{{if}}");
    match &body[..] {
        [Node::If { branches }] => {
            assert_eq!(branches.len(), 3);
            assert_eq!(branches[0].cond.as_deref(), Some("a"));
            assert_eq!(branches[1].cond.as_deref(), Some("b"));
            assert_eq!(branches[2].cond, None);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_if_missing_condition() {
    let err = parse_err("{{if }}x{{if}}");
    assert_eq!(err.kind, ErrorKind::MissingCondition);
}

#[test]
fn test_else_after_else_is_error() {
    let err = parse_err("{{if a}}1{{else}}2{{else}}3{{if}}");
    assert_eq!(err.kind, ErrorKind::MisplacedElse);
}

#[test]
fn test_elseif_after_else_is_error() {
    let err = parse_err("{{if a}}1{{else}}2{{elseif b}}3{{if}}");
    assert_eq!(err.kind, ErrorKind::MisplacedElse);
}

#[test]
fn test_if_unterminated() {
    let err = parse_err("{{if a}}body");
    assert_eq!(err.kind, ErrorKind::UnexpectedEof);
}

#[test]
fn test_for_statement() {
    let body = parse_ok("{{for _, v := range items}}{{i v}}{{for}}");
    match &body[..] {
        [Node::For { header, body }] => {
            assert_eq!(header, "_, v := range items");
            assert_eq!(body.len(), 1);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_for_missing_condition() {
    let err = parse_err("{{for }}x{{for}}");
    assert_eq!(err.kind, ErrorKind::MissingCondition);
}

#[test]
fn test_for_wrong_end_block() {
    let err = parse_err("{{for x}}body{{join}}");
    assert_eq!(err.kind, ErrorKind::WrongEndBlock);
}

#[test]
fn test_orphan_for_close() {
    // A `{{for}}` with no matching open is an unmatched close.
    let err = parse_err("{{for}}");
    assert_eq!(err.kind, ErrorKind::OrphanClose);
}

#[test]
fn test_orphan_close_tag() {
    let err = parse_err("code }} trailing");
    assert_eq!(err.kind, ErrorKind::OrphanClose);
}

#[test]
fn test_join_shape() {
    let body = parse_ok("{{join items, \", \"}}{{i _j}}{{join}}");
    match &body[..] {
        [Node::Join { slice, sep, body }] => {
            assert_eq!(slice, "items");
            assert_eq!(sep, ", ");
            assert_eq!(body.len(), 1);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_join_requires_two_params() {
    let err = parse_err("{{join items}}x{{join}}");
    assert_eq!(err.kind, ErrorKind::BadJoinParams);

    let err = parse_err("{{join a, b, c}}x{{join}}");
    assert_eq!(err.kind, ErrorKind::BadJoinParams);
}

#[test]
fn test_join_wrong_end_block() {
    let err = parse_err("{{join a, b}}x{{for}}");
    assert_eq!(err.kind, ErrorKind::WrongEndBlock);
}

#[test]
fn test_nested_structures() {
    let body = parse_ok("{{ a {{if c}}b{{if}} d }}");
    match &body[..] {
        [Node::Text { body, .. }] => {
            assert_eq!(body.len(), 3);
            assert!(matches!(body[1], Node::If { .. }));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_strict_block_node() {
    let body = parse_ok("{{begin raw}}{{if}}{{end raw}}");
    assert_eq!(
        body,
        [Node::StrictBlock {
            text: "{{if}}".to_string(),
            newline: false
        }]
    );
}

#[test]
fn test_unterminated_text_is_error() {
    let err = parse_err("{{ dangling");
    assert_eq!(err.kind, ErrorKind::UnexpectedEof);
}

#[test]
fn test_backup_node_default_count() {
    let body = parse_ok("{{-}}");
    assert_eq!(body, [Node::Backup { count: 1 }]);

    let body = parse_ok("{{- 4}}");
    assert_eq!(body, [Node::Backup { count: 4 }]);
}

#[test]
fn test_lex_error_surfaces_with_location() {
    let err = parse_err("\n\n{{> ghost}}");
    assert_eq!(err.kind, ErrorKind::UnknownBlock);
    assert_eq!(err.site().line, 3);
    let rendered = err.to_string();
    assert!(rendered.starts_with("*** Error: named block not found: ghost"));
    assert!(rendered.contains("/test/input.tpl:3:"));
}

#[test]
fn test_error_in_substituted_block_keeps_stack() {
    let err = parse_err("{{< a}}{{s }}{{end a}}\n{{a}}");
    assert_eq!(err.kind, ErrorKind::MissingValue);
    // The innermost frame is the block; the use site follows.
    assert!(matches!(
        err.site().origin,
        crate::compiler::error::Origin::Block(_)
    ));
    assert!(err.frames.len() >= 2);
}
