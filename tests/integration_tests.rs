//! Integration tests for the whole front end.
//!
//! These run sources through scanning, parsing and semantic resolution via
//! `compile_sources` and check the diagnostics and the resolved program.

use flexc::{
    ast::ast::NodeKind,
    compile_sources,
    errors::errors::ErrorDomain,
    program::program::{ProgramNode, TypeKind},
    Compilation,
};

fn compile(files: &[(&str, &str)]) -> Compilation {
    let sources: Vec<(String, String)> = files
        .iter()
        .map(|(name, source)| (name.to_string(), source.to_string()))
        .collect();
    compile_sources(&sources)
}

fn error_names(compilation: &Compilation) -> Vec<&str> {
    compilation.errors.iter().map(|e| e.get_error_name()).collect()
}

#[test]
fn test_compile_clean_program() {
    let compilation = compile(&[(
        "main.flex",
        "
        pub module shapes {
            pub class Point { int x; int y; }
            pub class List<T> { T[] items; int size; }
            func int area(int w, int h) { ret w * h; }
        }

        module app {
            import shapes;

            func int main() {
                Point origin;
                List<Point> points;
                int total = 0;
                for (int i = 0; i < 10; i++) {
                    total += i;
                }
                ret total;
            }
        }
        ",
    )]);

    assert!(!compilation.has_errors(), "errors: {:?}", compilation.errors);
    let program = compilation.program.expect("program built");
    assert_eq!(program.roots.len(), 2);

    let list = program
        .types
        .iter()
        .find(|t| t.name == "List" && t.master.is_some())
        .expect("List<Point> mastered");
    let generic = program.ty(list.generics[0]);
    assert!(matches!(generic.kind, TypeKind::Class(_)));
}

#[test]
fn test_modules_spread_over_files() {
    let compilation = compile(&[
        ("a.flex", "pub module util { pub class Helper { } }"),
        ("b.flex", "pub module util { func void help() { } }"),
        ("c.flex", "module app { import util; func void f() { Helper h; help(); } }"),
    ]);

    // `help` is a member of `util`, not of `app`
    assert_eq!(error_names(&compilation), vec!["UnexpectedIdentifier"]);
    let program = compilation.program.expect("program built");
    let util = program.find_module("util").expect("util");
    assert_eq!(program.module(util).functions.len(), 1);
    assert_eq!(program.module(util).classes.len(), 1);
}

#[test]
fn test_lexical_errors_skip_parsing() {
    let compilation = compile(&[("bad.flex", "module m { int x = #; }")]);

    assert_eq!(error_names(&compilation), vec!["UnrecognisedToken"]);
    assert_eq!(compilation.errors_in(ErrorDomain::Lexical).count(), 1);
    assert!(compilation.asts.is_empty());
    assert!(compilation.program.is_none());
}

#[test]
fn test_files_without_a_tree_are_left_out() {
    let compilation = compile(&[
        ("good.flex", "module a { }"),
        ("bad.flex", "module b { int x = ; }"),
    ]);

    assert!(compilation.errors_in(ErrorDomain::Parse).count() >= 1);
    let program = compilation.program.expect("program built from good.flex");
    assert_eq!(program.files.len(), 1);
    assert!(program.find_module("a").is_some());
    assert!(program.find_module("b").is_none());
}

#[test]
fn test_recovered_parse_errors_still_resolve() {
    let compilation = compile(&[(
        "recover.flex",
        "module a { async module; func int f() { ret undefined_name; } }",
    )]);

    assert_eq!(
        error_names(&compilation),
        vec!["UnexpectedToken", "UnexpectedToken", "UnexpectedIdentifier"]
    );
    assert_eq!(compilation.errors_in(ErrorDomain::Parse).count(), 2);
    assert!(compilation.program.is_some());
}

#[test]
fn test_parse_error_position() {
    let compilation = compile(&[("pos.flex", "module m {\n  func void f() {\n    int x = ;\n  }\n}")]);

    let error = compilation.errors.first().expect("parse error");
    assert_eq!(error.get_error_name(), "UnexpectedToken");
    assert_eq!(error.get_position().file.as_str(), "pos.flex");
    assert_eq!(error.get_position().line, 3);
}

#[test]
fn test_semantic_errors_are_all_reported() {
    let compilation = compile(&[(
        "errors.flex",
        "
        module m {
            class Box<T> { }
            func int add(int a, int b) { ret a + b; }

            func void f() {
                Box b;
                Unknown u;
                int x;
                int x;
                add(1);
                add = add;
                y = 2;
            }
        }
        ",
    )]);

    assert_eq!(
        error_names(&compilation),
        vec![
            "ExpectedGenerics",
            "TypeNotFound",
            "VariableAlreadyDeclared",
            "MissingArguments",
            "NotMutable",
            "UnexpectedIdentifier",
        ]
    );
    assert_eq!(compilation.errors_in(ErrorDomain::Semantic).count(), 6);
}

#[test]
fn test_private_module_across_trees() {
    let compilation = compile(&[
        ("lib.flex", "module lib { pub class Thing { } }"),
        ("app.flex", "module app { import lib; }"),
    ]);

    assert_eq!(error_names(&compilation), vec!["ModuleIsPrivate"]);
}

#[test]
fn test_identifiers_resolved_on_the_tree() {
    let compilation = compile(&[(
        "closure.flex",
        "
        module m {
            int counter;
            func void outer(int step) {
                int local = step;
                func void inner() { counter = local; }
                inner();
            }
        }
        ",
    )]);

    assert!(!compilation.has_errors(), "errors: {:?}", compilation.errors);
    let program = compilation.program.expect("program built");

    let mut found = vec![];
    program.files[0].walk(&mut |node| {
        if let NodeKind::Identifier(name) = &node.kind {
            let kind = match node.resolved {
                Some(ProgramNode::GlobalRef(_)) => "global",
                Some(ProgramNode::ParamRef(_)) => "param",
                Some(ProgramNode::LocalRef(_)) => "local",
                Some(ProgramNode::CapturedRef(_)) => "captured",
                _ => "other",
            };
            found.push((name.clone(), kind));
        }
    });

    assert_eq!(
        found,
        vec![
            (String::from("step"), "param"),
            (String::from("counter"), "global"),
            (String::from("local"), "captured"),
            (String::from("inner"), "local"),
        ]
    );
}

#[test]
fn test_program_dump_lists_modules() {
    let compilation = compile(&[("dump.flex", "module outer { module inner { class C { } } }")]);

    let program = compilation.program.expect("program built");
    let dump = program.dump();
    assert!(dump.contains("outer"));
    assert!(dump.contains("inner"));
    assert!(dump.contains("C"));
}
