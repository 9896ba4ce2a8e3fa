#![allow(clippy::module_inception)]

use std::{fmt::Display, rc::Rc};

use crate::{
    ast::ast::Node,
    errors::errors::{Error, ErrorDomain, ErrorTip},
    lexer::{
        lexer::{lexical_errors, tokenize},
        tokens::Token,
    },
    parser::parser::parse,
    program::{build_program, program::ProgramState},
};

pub mod ast;
pub mod errors;
pub mod lexer;
pub mod macros;
pub mod parser;
pub mod program;

extern crate regex;

/// A 1-based line/column location inside a named source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub file: Rc<String>,
}

impl Position {
    pub fn new(line: u32, column: u32, file: Rc<String>) -> Self {
        Position { line, column, file }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Span { start, end }
    }

    /// Span running from the start of `self` to the end of `other`.
    pub fn to(&self, other: &Span) -> Span {
        Span::new(self.start.clone(), other.end.clone())
    }
}

/// Everything the front end produced for a batch of source files.
pub struct Compilation {
    pub tokens: Vec<Vec<Token>>,
    pub errors: Vec<Error>,
    pub asts: Vec<Node>,
    pub program: Option<ProgramState>,
}

impl Compilation {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors_in(&self, domain: ErrorDomain) -> impl Iterator<Item = &Error> {
        self.errors.iter().filter(move |e| e.get_domain() == domain)
    }
}

/// Runs scanning, parsing and the semantic pipeline over `(file name, source)`
/// pairs.
///
/// A file with lexical errors is not parsed. Every file the parser produced a
/// tree for goes on to semantic resolution, recovered parse errors included,
/// so one run reports as many diagnostics as it can.
#[tracing::instrument(skip(sources), fields(files = sources.len()))]
pub fn compile_sources(sources: &[(String, String)]) -> Compilation {
    let mut compilation = Compilation {
        tokens: vec![],
        errors: vec![],
        asts: vec![],
        program: None,
    };

    for (name, source) in sources {
        let tokens = tokenize(source.clone(), Some(name.clone()));
        let lex_errors = lexical_errors(&tokens);

        if !lex_errors.is_empty() {
            tracing::debug!(file = %name, count = lex_errors.len(), "skipping parse after lexical errors");
            compilation.errors.extend(lex_errors);
            compilation.tokens.push(tokens);
            continue;
        }

        let (parse_errors, ast) = parse(tokens.clone(), Rc::new(name.clone()));
        compilation.errors.extend(parse_errors);
        compilation.tokens.push(tokens);

        if let Some(ast) = ast {
            compilation.asts.push(ast);
        }
    }

    if !compilation.asts.is_empty() {
        let program = build_program(std::mem::take(&mut compilation.asts));
        compilation.errors.extend(program.errors.iter().cloned());
        compilation.program = Some(program);
    }

    compilation
}

/// Returns the text of a 1-based line, without its terminator.
pub fn get_line(source: &str, line: u32) -> Option<&str> {
    if line == 0 {
        return None;
    }

    source
        .split('\n')
        .nth((line - 1) as usize)
        .map(|l| l.trim_end_matches('\r'))
}

pub fn display_error(error: &Error, source: &str) {
    /*
        Error: name (tip)
        -> final.flex
           |
        20 | int a = #;
           | --------^
    */

    let position = error.get_position();

    if let ErrorTip::None = error.get_tip() {
        eprintln!("Error: {}", error.get_error_name());
    } else {
        eprintln!("Error: {} ({})", error.get_error_name(), error.get_tip());
    }
    eprintln!("-> {}", position);

    let Some(line_text) = get_line(source, position.line) else {
        return;
    };

    let line_string = position.line.to_string();
    let padding = line_string.len() + 2;
    eprintln!("{:>padding$}", "|");

    let (line_text_removed, removed_whitespace) = remove_starting_whitespace(line_text);
    eprintln!("{} | {}", line_string, line_text_removed.trim_end());

    let column = (position.column as usize).max(1);
    let arrows = column.saturating_sub(removed_whitespace).max(1);

    eprintln!("{:>padding$} {:->arrows$}", "|", "^");
}

fn remove_starting_whitespace(string: &str) -> (String, usize) {
    let start = string.chars().take_while(|c| *c == ' ' || *c == '\t').count();

    (String::from(&string[start..]), start)
}
