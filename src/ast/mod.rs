//! Abstract Syntax Tree definitions.
//!
//! - `ast` - the `Node` sum type, node ids, traversal and dumping
//! - `expressions` - unary and binary operators
//! - `statements` - module, class, function and variable declarations
//! - `types` - written type references

pub mod ast;
pub mod expressions;
pub mod statements;
pub mod types;
