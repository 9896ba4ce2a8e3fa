//! Lexical analysis.
//!
//! Converts source text into a stream of tokens for the parser. Patterns are
//! anchored regexes tried in order; identifiers are checked against the
//! reserved-word table. Every token records its 1-based line and its start
//! and end columns. Whitespace and `//` or `/* */` comments are skipped.

pub mod lexer;
pub mod tokens;
