//! Unit tests for the semantic pipeline.

use std::rc::Rc;

use crate::{
    ast::{
        ast::{Node, NodeKind},
        statements::Visibility,
    },
    lexer::lexer::tokenize,
    parser::parser::parse,
};

use super::{
    build_program,
    program::{FunctionId, ModuleId, ProgramNode, ProgramState, PrimitiveType, SymbolTable, TypeKind},
};

fn build(sources: &[&str]) -> ProgramState {
    let files: Vec<Node> = sources
        .iter()
        .enumerate()
        .map(|(index, source)| {
            let name = format!("file{}.flex", index);
            let tokens = tokenize(source.to_string(), Some(name.clone()));
            let (errors, root) = parse(tokens, Rc::new(name));
            assert!(errors.is_empty(), "parse errors: {:?}", errors);
            root.expect("file node")
        })
        .collect();
    build_program(files)
}

fn error_names(state: &ProgramState) -> Vec<&str> {
    state.errors.iter().map(|e| e.get_error_name()).collect()
}

fn assert_clean(state: &ProgramState) {
    assert!(state.errors.is_empty(), "unexpected errors: {:?}", state.errors);
}

/// Resolutions written back onto every identifier with the given name.
fn resolutions(state: &ProgramState, name: &str) -> Vec<Option<ProgramNode>> {
    let mut out = vec![];
    for file in &state.files {
        file.walk(&mut |node| {
            if let NodeKind::Identifier(ident) = &node.kind {
                if ident == name {
                    out.push(node.resolved);
                }
            }
        });
    }
    out
}

fn module(state: &ProgramState, path: &str) -> ModuleId {
    state.find_module(path).expect("module exists")
}

fn function_named(state: &ProgramState, name: &str) -> FunctionId {
    let index = state
        .functions
        .iter()
        .position(|f| f.name.as_deref() == Some(name))
        .expect("function exists");
    FunctionId(index)
}

#[test]
fn test_symbol_table_keeps_insertion_order() {
    let mut table = SymbolTable::new();
    table.insert("b".to_string(), 1);
    table.insert("a".to_string(), 2);
    assert!(!table.insert_if_absent("b".to_string(), 3));
    assert_eq!(table.insert("a".to_string(), 4), Some(2));

    let entries: Vec<(&str, &i32)> = table.iter().collect();
    assert_eq!(entries, vec![("b", &1), ("a", &4)]);
}

#[test]
fn test_primitive_names() {
    assert_eq!(PrimitiveType::from_name("int"), Some(PrimitiveType::I32));
    assert_eq!(PrimitiveType::from_name("UL"), Some(PrimitiveType::U64));
    assert_eq!(PrimitiveType::from_name("byte"), Some(PrimitiveType::U8));
    assert_eq!(PrimitiveType::from_name("Char"), Some(PrimitiveType::U8));
    assert_eq!(PrimitiveType::from_name("c"), Some(PrimitiveType::U8));
    assert_eq!(PrimitiveType::from_name("i8"), Some(PrimitiveType::I8));
    assert_eq!(PrimitiveType::from_name("Point"), None);
}

#[test]
fn test_valid_program_has_no_errors() {
    let state = build(&["module app {
        class Point { int x; int y; }
        int counter = 0;
        func int add(int a, int b) { ret a + b; }
        func void main() {
            int total = add(1, 2);
            counter = total;
            Point p;
            p.x = total;
        }
    }"]);
    assert_clean(&state);
}

#[test]
fn test_modules_merge_across_files() {
    let state = build(&["module a { int x; }", "module a { int y; module b { } }"]);
    assert_clean(&state);
    assert_eq!(state.roots.len(), 1);

    let a = state.module(module(&state, "a"));
    let names: Vec<&str> = a.variables.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["x", "y"]);
    assert!(state.find_module("a.b").is_some());
}

#[test]
fn test_reopened_module_with_other_visibility() {
    let state = build(&["pub module a { }", "module a { }"]);
    assert_eq!(error_names(&state), vec!["ConflictingModuleDeclaration"]);
}

#[test]
fn test_effective_visibility() {
    let state = build(&["priv module m { pub class C { } } module n { prot class D { } }"]);
    let c = state.classes.iter().find(|c| c.name == "C").expect("class C");
    let d = state.classes.iter().find(|c| c.name == "D").expect("class D");
    assert_eq!(c.visibility, Visibility::Private);
    assert_eq!(d.visibility, Visibility::Protected);
}

#[test]
fn test_named_function_has_implicit_constant() {
    let state = build(&["module m { func int add(int a, int... rest) { ret a; } }"]);
    assert_clean(&state);

    let function = function_named(&state, "add");
    let implicit = state.function(function).implicit.expect("implicit variable");
    let variable = state.variable(implicit);
    assert!(variable.constant);
    assert_eq!(variable.function, Some(function));
    assert_eq!(state.module(module(&state, "m")).variables.get("add"), Some(&implicit));
    assert!(matches!(state.ty(variable.ty).kind, TypeKind::Function { .. }));
    assert_eq!(state.function(function).arity(&state), (1, None));
}

#[test]
fn test_member_redeclarations() {
    let state = build(&["module m {
        int x; int x;
        func void f() { } func void f() { }
        class A { } class A { }
        int f;
    }"]);
    assert_eq!(
        error_names(&state),
        vec![
            "VariableAlreadyDeclared",
            "FunctionAlreadyDeclared",
            "ClassAlreadyDeclared",
            "VariableAlreadyDeclared",
        ]
    );
}

#[test]
fn test_anonymous_function_in_module_is_illegal() {
    let state = build(&["module m { <int a> int => a; }"]);
    assert_eq!(error_names(&state), vec!["IllegalModuleItem"]);
}

#[test]
fn test_imports_deduplicate_and_check_visibility() {
    let state = build(&["
        pub module util { pub class Helper { } module inner { } }
        module lib { class Hidden { } }
        module app {
            import util;
            import \"util\";
            import lib;
            import util.inner;
            import missing;
            func void f() { Helper h; }
        }
    "]);
    assert_eq!(
        error_names(&state),
        vec!["ModuleIsPrivate", "ModuleIsPrivate", "ModuleNotFound"]
    );

    let app = state.module(module(&state, "app"));
    assert_eq!(app.imports, vec![module(&state, "util")]);
    assert!(app.types.contains("Helper"));
}

#[test]
fn test_imports_within_one_tree_ignore_visibility() {
    let state = build(&["module app { module a { } module b { import app.a; } }"]);
    assert_clean(&state);

    let b = state.module(module(&state, "app.b"));
    assert_eq!(b.imports, vec![module(&state, "app.a"), module(&state, "app")]);
}

#[test]
fn test_submodule_inherits_parent_imports() {
    let state = build(&["pub module util { } module app { import util; module child { } }"]);
    assert_clean(&state);

    let child = state.module(module(&state, "app.child"));
    assert_eq!(child.imports, vec![module(&state, "util"), module(&state, "app")]);
}

#[test]
fn test_local_class_wins_over_imported() {
    let state = build(&["pub module util { class Helper { } } module app { import util; class Helper { } }"]);
    assert_clean(&state);

    let app = module(&state, "app");
    let local = state
        .classes
        .iter()
        .position(|c| c.name == "Helper" && c.module == app)
        .expect("local class");
    let ty = *state.module(app).types.get("Helper").expect("type");
    assert_eq!(ty, state.classes[local].master_type);
}

#[test]
fn test_private_classes_are_not_propagated() {
    let state = build(&["pub module util { priv class Secret { } } module app { import util; func void f() { Secret s; } }"]);
    assert_eq!(error_names(&state), vec!["TypeNotFound"]);
}

#[test]
fn test_generic_arity_checks() {
    let state = build(&["module m {
        class Box<T> { T value; }
        class Pair<A, B> { }
        class Point { }
        func void f() {
            Box<int> a;
            Box b;
            Pair<int> c;
            Point<int> d;
            Missing e;
        }
    }"]);
    assert_eq!(
        error_names(&state),
        vec![
            "ExpectedGenerics",
            "GenericArityMismatch",
            "UnexpectedGenerics",
            "TypeNotFound",
        ]
    );

    let boxed = state
        .types
        .iter()
        .find(|t| t.name == "Box" && !t.is_master && t.master.is_some())
        .expect("mastered Box<int>");
    assert_eq!(boxed.generics.len(), 1);
    assert!(matches!(boxed.kind, TypeKind::Class(_)));
}

#[test]
fn test_class_generic_parameter_resolves() {
    let state = build(&["module m { class Box<T> { T value; func T get() { ret value; } } }"]);
    assert_clean(&state);

    let class = &state.classes[0];
    let generic = *class.generics.get("T").expect("generic");
    let variable = state.variable(*class.variables.get("value").expect("member"));
    assert_eq!(state.ty(variable.ty).master, Some(generic));
}

#[test]
fn test_parent_type_skips_class_generics() {
    let state = build(&["module m { class Wrapper<T> : T { } }"]);
    assert_eq!(error_names(&state), vec!["TypeNotFound"]);
}

#[test]
fn test_scope_classification() {
    let state = build(&["module m {
        int global_count;
        class Counter {
            int value;
            func int bump(int step) {
                int local = step;
                value = value + local;
                global_count = local;
                ret this.value;
            }
        }
    }"]);
    assert_clean(&state);

    assert!(resolutions(&state, "step")
        .iter()
        .all(|r| matches!(r, Some(ProgramNode::ParamRef(_)))));
    assert!(resolutions(&state, "local")
        .iter()
        .all(|r| matches!(r, Some(ProgramNode::LocalRef(_)))));
    assert!(resolutions(&state, "value")
        .iter()
        .all(|r| matches!(r, Some(ProgramNode::ClassRef(_)))));
    assert!(matches!(
        resolutions(&state, "global_count")[..],
        [Some(ProgramNode::GlobalRef(_))]
    ));
    assert_eq!(resolutions(&state, "this"), vec![Some(ProgramNode::ThisRef)]);
}

#[test]
fn test_captured_variables() {
    let state = build(&["module m {
        func void outer(int p) {
            int x = 1;
            func int inner(int y) { ret x + y + p; }
            inner(2);
        }
    }"]);
    assert_clean(&state);

    assert!(matches!(resolutions(&state, "x")[..], [Some(ProgramNode::CapturedRef(_))]));
    assert!(matches!(resolutions(&state, "p")[..], [Some(ProgramNode::CapturedRef(_))]));
    assert!(matches!(resolutions(&state, "y")[..], [Some(ProgramNode::ParamRef(_))]));
    assert!(matches!(resolutions(&state, "inner")[..], [Some(ProgramNode::LocalRef(_))]));

    let inner = state.function(function_named(&state, "inner"));
    let captured: Vec<&str> = inner.captures.iter().map(|&v| state.variable(v).name.as_str()).collect();
    assert_eq!(captured, vec!["x", "p"]);

    let outer = state.function(function_named(&state, "outer"));
    assert_eq!(outer.closures, vec![function_named(&state, "inner")]);
    assert!(outer.captures.is_empty());
}

#[test]
fn test_lambda_captures_through_nesting() {
    let state = build(&["module m {
        func void outer() {
            int x = 1;
            func void middle() {
                func int innermost() { ret x; }
            }
        }
    }"]);
    assert_clean(&state);

    for name in ["middle", "innermost"] {
        let function = state.function(function_named(&state, name));
        assert_eq!(function.captures.len(), 1, "{} captures x", name);
    }
}

#[test]
fn test_redeclaration_and_shadowing() {
    let state = build(&["module m {
        func void f() { int a; int a; }
        func void g() { int a; { int a; } }
        func void h(int a) { int a; }
        func void k(int a, int a) { }
        func void t() { int this; }
    }"]);
    assert_eq!(
        error_names(&state),
        vec!["VariableAlreadyDeclared", "VariableAlreadyDeclared", "VariableAlreadyDeclared"]
    );
}

#[test]
fn test_initializer_cannot_see_its_own_name() {
    let state = build(&["module m { func void f() { int a = a; } }"]);
    assert_eq!(error_names(&state), vec!["UnexpectedIdentifier"]);
}

#[test]
fn test_unknown_identifier() {
    let state = build(&["module m { func void f() { missing = 1; } }"]);
    assert_eq!(error_names(&state), vec!["UnexpectedIdentifier"]);
    assert_eq!(resolutions(&state, "missing"), vec![None]);
}

#[test]
fn test_assignment_targets_must_be_mutable() {
    let state = build(&["module m {
        csig int limit = 1;
        func void g() { }
        func void f(int a) {
            1 = 2;
            g = g;
            limit = 2;
            a = 3;
            a++;
            (a + 1)++;
        }
    }"]);
    assert_eq!(
        error_names(&state),
        vec!["NotMutable", "NotMutable", "NotMutable", "NotMutable"]
    );
}

#[test]
fn test_call_arity() {
    let state = build(&["module m {
        func int add(int a, int b = 1) { ret a; }
        func void log(int... values) { }
        func void f() {
            add();
            add(1);
            add(1, 2);
            add(1, 2, 3);
            log();
            log(1, 2, 3);
        }
    }"]);
    assert_eq!(error_names(&state), vec!["MissingArguments", "UnexpectedArguments"]);
}

#[test]
fn test_new_on_primitive_is_illegal() {
    let state = build(&["module m {
        class Point { }
        func void f() {
            Point p = new Point;
            int[] xs = new int[];
            int y = new int;
        }
    }"]);
    assert_eq!(error_names(&state), vec!["IllegalOperation"]);
}

#[test]
fn test_modules_and_classes_resolve_by_name() {
    let state = build(&["
        pub module util { pub func void helper() { } }
        module app { import \"util\"; func void f() { util.helper(); } }
    "]);
    assert_clean(&state);
    assert_eq!(
        resolutions(&state, "util"),
        vec![Some(ProgramNode::Module(module(&state, "util")))]
    );
}

#[test]
fn test_unimported_module_name_is_unknown() {
    let state = build(&["
        module secret { int x; }
        pub module open { int y; }
        module app {
            func int f() { ret secret.x; }
            func int g() { ret open.y; }
        }
    "]);
    assert_eq!(
        error_names(&state),
        vec!["UnexpectedIdentifier", "UnexpectedIdentifier"]
    );
    assert_eq!(resolutions(&state, "secret"), vec![None]);
    assert_eq!(resolutions(&state, "open"), vec![None]);
}

#[test]
fn test_submodule_and_parent_resolve_by_name() {
    let state = build(&["module app {
        module util { }
        func void f() { util; }
        module child { func void g() { app; } }
    }"]);
    assert_clean(&state);
    assert_eq!(
        resolutions(&state, "util"),
        vec![Some(ProgramNode::Module(module(&state, "app.util")))]
    );
    assert_eq!(resolutions(&state, "app"), vec![Some(ProgramNode::Module(module(&state, "app")))]);
}

#[test]
fn test_empty_generic_list_is_an_arity_mismatch() {
    let state = build(&["module m {
        class Box<T> { }
        class Point { }
        func void f() { Box<> a; Point<> b; Point c; }
    }"]);
    assert_eq!(error_names(&state), vec!["GenericArityMismatch", "UnexpectedGenerics"]);
}

#[test]
fn test_module_variable_initializers_are_analyzed() {
    let state = build(&["module m { int a = 1; int b = a; int c = d; }"]);
    assert_eq!(error_names(&state), vec!["UnexpectedIdentifier"]);
    assert!(matches!(resolutions(&state, "a")[..], [Some(ProgramNode::GlobalRef(_))]));
}

#[test]
fn test_resolution_written_back_to_declarations() {
    let state = build(&["module m { class C { } func void f() { int x; } }"]);
    assert_clean(&state);

    let mut kinds = vec![];
    state.files[0].walk(&mut |node| match (&node.kind, node.resolved) {
        (NodeKind::Module(_), Some(ProgramNode::Module(_))) => kinds.push("module"),
        (NodeKind::Class(_), Some(ProgramNode::Class(_))) => kinds.push("class"),
        (NodeKind::Function(_), Some(ProgramNode::Function(_))) => kinds.push("function"),
        (NodeKind::VarDecl(_), Some(ProgramNode::LocalDecl(_))) => kinds.push("local"),
        (NodeKind::Type(_), Some(ProgramNode::Type(_))) => kinds.push("type"),
        _ => {}
    });
    assert_eq!(kinds, vec!["module", "class", "function", "type", "local", "type"]);
}

#[test]
fn test_semantic_errors_point_at_their_node() {
    let state = build(&["module m { func void f() {\n    missing++;\n} }"]);
    let error = &state.errors[0];
    assert_eq!(error.get_error_name(), "UnexpectedIdentifier");
    assert_eq!(error.get_position().line, 2);

    let node = state.files[0]
        .find(error.get_node().expect("node id"))
        .expect("node in file");
    assert_eq!(node.as_identifier(), Some("missing"));
}
