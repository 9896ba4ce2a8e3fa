//! Parser module for building an Abstract Syntax Tree (AST).
//!
//! Turns the token stream of one file into a `File` node by recursive
//! descent. Expressions use one function per precedence level, and two
//! ambiguities are settled by backtracking:
//!
//! - `(` at unary level is tried as a cast before a parenthesized expression
//! - an identifier followed by something type-like is tried as a variable
//!   declaration before a plain identifier
//!
//! Errors are collected rather than returned so that a single pass reports
//! every problem the parser can step past.

pub mod decl;
pub mod expr;
pub mod parser;
pub mod stmt;
pub mod types;

#[cfg(test)]
mod tests;
