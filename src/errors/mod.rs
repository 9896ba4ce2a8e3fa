//! Error types shared by every stage of the front end.
//!
//! One `Error` type carries a source position, an optional AST node id and
//! an `ErrorImpl` variant. Variants fall into three domains: lexical
//! (unrecognised input), parse (unexpected token) and semantic (everything
//! raised while resolving the program tree).

pub mod errors;
