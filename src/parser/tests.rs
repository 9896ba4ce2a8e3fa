//! Unit tests for the parser module.

use std::rc::Rc;

use crate::{
    ast::{
        ast::{Node, NodeKind},
        expressions::{BinaryOp, UnaryOp},
        statements::Visibility,
        types::Indirection,
    },
    errors::errors::{Error, ErrorImpl},
    lexer::lexer::tokenize,
};

use super::parser::parse;

fn parse_source(source: &str) -> (Vec<Error>, Option<Node>) {
    let tokens = tokenize(source.to_string(), Some("test.flex".to_string()));
    parse(tokens, Rc::new("test.flex".to_string()))
}

fn parse_clean(source: &str) -> Node {
    let (errors, root) = parse_source(source);
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    root.expect("file node")
}

fn module_items(root: &Node) -> &Vec<Node> {
    match &root.kind {
        NodeKind::File { modules, .. } => match &modules[0].kind {
            NodeKind::Module(module) => &module.items,
            other => panic!("expected module, got {:?}", other),
        },
        other => panic!("expected file, got {:?}", other),
    }
}

/// Parses `statements` as the body of a function and returns the body's
/// children.
fn statements(source: &str) -> Vec<Node> {
    let root = parse_clean(&format!("module m {{ func void f() {{ {} }} }}", source));
    let items = module_items(&root);
    match &items[0].kind {
        NodeKind::Function(function) => match &function.body.kind {
            NodeKind::Body(children) => children.clone(),
            other => panic!("expected body, got {:?}", other),
        },
        other => panic!("expected function, got {:?}", other),
    }
}

fn single(source: &str) -> Node {
    let mut stmts = statements(source);
    assert_eq!(stmts.len(), 1, "expected one statement in {:?}", source);
    stmts.remove(0)
}

fn binary(node: &Node) -> (BinaryOp, &Node, &Node) {
    match &node.kind {
        NodeKind::Binary { op, left, right } => (*op, left, right),
        other => panic!("expected binary, got {:?}", other),
    }
}

fn expecting(error: &Error) -> String {
    match error.get_impl() {
        ErrorImpl::UnexpectedToken { expecting, .. } => expecting.clone(),
        other => panic!("expected unexpected-token error, got {:?}", other),
    }
}

#[test]
fn test_parse_empty_module() {
    let root = parse_clean("module m { }");
    let items = module_items(&root);
    assert!(items.is_empty());
}

#[test]
fn test_parse_nested_and_reopened_modules() {
    let root = parse_clean("pub module a { module b { } } module a { };");
    match &root.kind {
        NodeKind::File { modules, .. } => {
            assert_eq!(modules.len(), 2);
            match &modules[0].kind {
                NodeKind::Module(module) => {
                    assert_eq!(module.visibility, Visibility::Public);
                    assert_eq!(module.items.len(), 1);
                }
                other => panic!("expected module, got {:?}", other),
            }
        }
        other => panic!("expected file, got {:?}", other),
    }
}

#[test]
fn test_parse_file_rejects_stray_tokens() {
    let (errors, _) = parse_source("module m { } foo");
    assert_eq!(errors.len(), 1);
    assert_eq!(expecting(&errors[0]), "EOF or 'module'");
}

#[test]
fn test_parse_subtraction_is_left_associative() {
    let stmt = single("a - b - c;");
    let (op, left, right) = binary(&stmt);
    assert_eq!(op, BinaryOp::Subtract);
    assert_eq!(right.as_identifier(), Some("c"));
    let (inner, a, b) = binary(left);
    assert_eq!(inner, BinaryOp::Subtract);
    assert_eq!(a.as_identifier(), Some("a"));
    assert_eq!(b.as_identifier(), Some("b"));
}

#[test]
fn test_parse_assignment_is_right_associative() {
    let stmt = single("a = b += c;");
    let (op, left, right) = binary(&stmt);
    assert_eq!(op, BinaryOp::Assign);
    assert_eq!(left.as_identifier(), Some("a"));
    let (inner, b, c) = binary(right);
    assert_eq!(inner, BinaryOp::AddAssign);
    assert_eq!(b.as_identifier(), Some("b"));
    assert_eq!(c.as_identifier(), Some("c"));
}

#[test]
fn test_parse_multiplication_binds_tighter() {
    let stmt = single("a + b * c;");
    let (op, _, right) = binary(&stmt);
    assert_eq!(op, BinaryOp::Add);
    assert_eq!(binary(right).0, BinaryOp::Multiply);
}

#[test]
fn test_parse_sequence_is_loosest() {
    let stmt = single("a = 1, b = 2;");
    let (op, left, right) = binary(&stmt);
    assert_eq!(op, BinaryOp::Sequence);
    assert_eq!(binary(left).0, BinaryOp::Assign);
    assert_eq!(binary(right).0, BinaryOp::Assign);
}

#[test]
fn test_parse_ternary() {
    let stmt = single("c ? a : b;");
    match &stmt.kind {
        NodeKind::Ternary {
            condition,
            then_branch,
            else_branch,
        } => {
            assert_eq!(condition.as_identifier(), Some("c"));
            assert_eq!(then_branch.as_identifier(), Some("a"));
            assert_eq!(else_branch.as_identifier(), Some("b"));
        }
        other => panic!("expected ternary, got {:?}", other),
    }
}

#[test]
fn test_parse_shift_right_from_adjacent_greaters() {
    assert_eq!(binary(&single("a >> b;")).0, BinaryOp::ShiftRight);
    assert_eq!(binary(&single("a > b;")).0, BinaryOp::Greater);
    assert_eq!(binary(&single("a >>= b;")).0, BinaryOp::ShiftRightAssign);
    assert_eq!(binary(&single("a >= b;")).0, BinaryOp::GreaterEquals);
}

#[test]
fn test_parse_nested_generic_declaration() {
    let stmt = single("List<List<int>> xs;");
    match &stmt.kind {
        NodeKind::VarDecl(var) => {
            assert_eq!(var.name, "xs");
            let ty = var.ty.as_type().expect("type");
            assert_eq!(ty.to_string(), "List<List<int>>");
        }
        other => panic!("expected declaration, got {:?}", other),
    }
}

#[test]
fn test_parse_cast() {
    let stmt = single("(int) x;");
    match &stmt.kind {
        NodeKind::Cast { target, operand } => {
            assert_eq!(target.as_type().map(|t| t.name.as_str()), Some("int"));
            assert_eq!(operand.as_identifier(), Some("x"));
        }
        other => panic!("expected cast, got {:?}", other),
    }
}

#[test]
fn test_parse_parenthesized_identifier_is_not_a_cast() {
    let stmt = single("(x);");
    assert_eq!(stmt.as_identifier(), Some("x"));
}

#[test]
fn test_parse_parenthesized_expression_falls_back() {
    let stmt = single("(a + b) * c;");
    let (op, left, _) = binary(&stmt);
    assert_eq!(op, BinaryOp::Multiply);
    assert_eq!(binary(left).0, BinaryOp::Add);
}

#[test]
fn test_parse_cast_of_pointer_type() {
    let stmt = single("(byte*) p;");
    match &stmt.kind {
        NodeKind::Cast { target, .. } => {
            let ty = target.as_type().expect("type");
            assert_eq!(ty.indirection, vec![Indirection::Pointer]);
        }
        other => panic!("expected cast, got {:?}", other),
    }
}

#[test]
fn test_parse_variable_declaration_vs_identifier() {
    let stmts = statements("int x = 3; x; Box<int> b; a < b; int[] xs;");
    assert_eq!(stmts.len(), 5);
    assert!(matches!(&stmts[0].kind, NodeKind::VarDecl(var) if var.name == "x" && var.init.is_some()));
    assert_eq!(stmts[1].as_identifier(), Some("x"));
    assert!(matches!(&stmts[2].kind, NodeKind::VarDecl(var) if var.name == "b"));
    assert_eq!(binary(&stmts[3]).0, BinaryOp::Less);
    assert!(matches!(&stmts[4].kind, NodeKind::VarDecl(var) if var.name == "xs"));
}

#[test]
fn test_parse_failed_speculation_leaves_no_errors() {
    let stmts = statements("a < b; i < n;");
    assert_eq!(stmts.len(), 2);
}

#[test]
fn test_parse_constructor_declaration() {
    let stmt = single("Point p(1, 2);");
    match &stmt.kind {
        NodeKind::VarDecl(var) => {
            assert_eq!(var.ctor_args.as_ref().map(|args| args.len()), Some(2));
            assert!(var.init.is_none());
        }
        other => panic!("expected declaration, got {:?}", other),
    }
}

#[test]
fn test_parse_label_and_goto() {
    let stmts = statements("start: goto start;");
    assert!(matches!(&stmts[0].kind, NodeKind::Label(name) if name == "start"));
    assert!(matches!(&stmts[1].kind, NodeKind::Goto(name) if name == "start"));
}

#[test]
fn test_parse_prefix_and_postfix() {
    let stmt = single("-x++;");
    match &stmt.kind {
        NodeKind::Unary { op, operand } => {
            assert_eq!(*op, UnaryOp::Minus);
            assert!(matches!(&operand.kind, NodeKind::UnaryPostfix { op: UnaryOp::Increment, .. }));
        }
        other => panic!("expected unary, got {:?}", other),
    }
}

#[test]
fn test_parse_postfix_chain() {
    let stmt = single("a.b[0](1, 2);");
    match &stmt.kind {
        NodeKind::Call { callee, args } => {
            assert_eq!(args.len(), 2);
            assert!(matches!(&callee.kind, NodeKind::ComputedMember { .. }));
        }
        other => panic!("expected call, got {:?}", other),
    }
}

#[test]
fn test_parse_integer_bases() {
    let stmts = statements("0x1F; 0b101; 017; 42;");
    let values: Vec<u64> = stmts
        .iter()
        .map(|s| match s.kind {
            NodeKind::IntegerLit(value) => value,
            _ => panic!("expected integer"),
        })
        .collect();
    assert_eq!(values, vec![31, 5, 15, 42]);
}

#[test]
fn test_parse_control_flow() {
    let stmts = statements(
        "if (a) b; else { c; }
         for (int i = 0; i < 10; i++) { }
         for (;;) { }
         for (int x : xs) { }
         while (a) { }
         switch (a) { case 1: b; default: c; }
         try { } catch (Error e) { } finally { }
         ret;",
    );
    let kinds: Vec<&str> = stmts.iter().map(|s| s.kind_name()).collect();
    assert_eq!(
        kinds,
        vec!["If", "For", "For", "ForEach", "While", "Switch", "Try", "Return"]
    );
    assert!(matches!(
        &stmts[2].kind,
        NodeKind::For { init, condition, step, .. }
            if matches!(init.kind, NodeKind::Empty)
                && matches!(condition.kind, NodeKind::Empty)
                && matches!(step.kind, NodeKind::Empty)
    ));
}

#[test]
fn test_parse_block_ends_statement() {
    let stmts = statements("{ } -x;");
    assert_eq!(stmts.len(), 2);
    assert!(matches!(&stmts[1].kind, NodeKind::Unary { op: UnaryOp::Minus, .. }));
}

#[test]
fn test_parse_try_needs_a_clause() {
    let (errors, root) = parse_source("module m { func void f() { try { } } }");
    assert!(root.is_none());
    assert_eq!(expecting(&errors[0]), "'catch' or 'finally'");
}

#[test]
fn test_parse_switch_rejects_second_default() {
    let (errors, _) = parse_source("module m { func void f() { switch (a) { default: b; default: c; } } }");
    assert_eq!(errors.len(), 1);
    assert_eq!(expecting(&errors[0]), "'case' or '}'");
}

#[test]
fn test_parse_function_and_lambda() {
    let stmts = statements("f = <int a, int b> int => a + b; g = func int (int... rest) { ret 0; };");
    let (_, _, lambda) = binary(&stmts[0]);
    match &lambda.kind {
        NodeKind::Function(function) => {
            assert!(function.lambda);
            assert_eq!(function.name, None);
            assert_eq!(function.params.len(), 2);
            assert_eq!(function.visibility, Visibility::Private);
        }
        other => panic!("expected lambda, got {:?}", other),
    }
    let (_, _, literal) = binary(&stmts[1]);
    match &literal.kind {
        NodeKind::Function(function) => {
            assert!(!function.lambda);
            match &function.params[0].kind {
                NodeKind::VarDecl(var) => assert!(var.ty.as_type().map(|t| t.variadic).unwrap_or(false)),
                other => panic!("expected parameter, got {:?}", other),
            }
        }
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn test_parse_lambda_parameter_defaults() {
    let stmts = statements("g = <int a, int b = 2 + 1> int => a + b; h = <int c = (a > 1)> int => c;");

    let (_, _, lambda) = binary(&stmts[0]);
    let NodeKind::Function(function) = &lambda.kind else {
        panic!("expected lambda, got {:?}", lambda.kind);
    };
    assert_eq!(function.params.len(), 2);
    match &function.params[1].kind {
        NodeKind::VarDecl(var) => {
            let init = var.init.as_ref().expect("default value");
            assert_eq!(binary(init).0, BinaryOp::Add);
        }
        other => panic!("expected parameter, got {:?}", other),
    }
    assert!(function.return_type.as_type().is_some());

    let (_, _, lambda) = binary(&stmts[1]);
    let NodeKind::Function(function) = &lambda.kind else {
        panic!("expected lambda, got {:?}", lambda.kind);
    };
    match &function.params[0].kind {
        NodeKind::VarDecl(var) => {
            let init = var.init.as_ref().expect("default value");
            assert_eq!(binary(init).0, BinaryOp::Greater);
        }
        other => panic!("expected parameter, got {:?}", other),
    }
}

#[test]
fn test_parse_empty_generic_list() {
    let stmts = statements("Box<> a; Box b;");

    let types: Vec<(bool, usize, String)> = stmts
        .iter()
        .map(|stmt| match &stmt.kind {
            NodeKind::VarDecl(var) => {
                let ty = var.ty.as_type().expect("type");
                (ty.generic_list, ty.generics.len(), ty.to_string())
            }
            other => panic!("expected declaration, got {:?}", other),
        })
        .collect();
    assert_eq!(
        types,
        vec![(true, 0, String::from("Box<>")), (false, 0, String::from("Box"))]
    );
}

#[test]
fn test_parse_class_declaration() {
    let root = parse_clean(
        "module m {
            pub class Map<K, V> : Base, Other<K> {
                int size;
                prot static func int count() { ret size; }
            };
        }",
    );
    match &module_items(&root)[0].kind {
        NodeKind::Class(class) => {
            assert_eq!(class.name, "Map");
            assert_eq!(class.generics, vec!["K".to_string(), "V".to_string()]);
            assert_eq!(class.parents.len(), 2);
            assert_eq!(class.members.len(), 2);
            assert_eq!(class.visibility, Visibility::Public);
        }
        other => panic!("expected class, got {:?}", other),
    }
}

#[test]
fn test_parse_imports() {
    let root = parse_clean("module m { import a.b.c; import \"x.y\"; }");
    let items = module_items(&root);
    assert_eq!(items.len(), 2);
    assert!(matches!(&items[0].kind, NodeKind::Import(target) if matches!(target.kind, NodeKind::Member { .. })));
    assert!(matches!(&items[1].kind, NodeKind::Import(target) if matches!(target.kind, NodeKind::StringLit(_))));
}

#[test]
fn test_parse_inadmissible_modifier_recovers() {
    let (errors, root) = parse_source("module m { static static int x; }");
    assert_eq!(errors.len(), 1);
    assert!(expecting(&errors[0]).ends_with("Confirm correct modifiers"));
    let root = root.expect("file node");
    assert_eq!(module_items(&root).len(), 1);
}

#[test]
fn test_parse_typed_variable_is_rejected() {
    let (errors, _) = parse_source("module m { typed int x; }");
    assert!(!errors.is_empty());
    assert!(expecting(&errors[0]).starts_with("'module', 'class'"));
}

#[test]
fn test_parse_dangling_modifiers_in_class() {
    let (errors, _) = parse_source("module m { class C { pub } }");
    assert_eq!(errors.len(), 1);
    assert!(expecting(&errors[0]).starts_with("'func', '<'"));
}

#[test]
fn test_parse_spans_and_ids() {
    let root = parse_clean("module m {\n  int x = 1;\n}");
    let var = &module_items(&root)[0];
    assert_eq!(var.span.start.line, 2);
    assert_eq!(var.span.start.column, 3);
    assert_eq!(var.span.end.line, 2);

    let mut ids = vec![];
    root.walk(&mut |node| ids.push(node.id));
    let total = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(total, 5);
    assert_eq!(ids.len(), total);
}

#[test]
fn test_parse_missing_brace_reports_error() {
    let (errors, root) = parse_source("module m { int x;");
    assert!(root.is_none());
    assert_eq!(expecting(&errors[0]), "'}'");
}
