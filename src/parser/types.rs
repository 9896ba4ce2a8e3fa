//! Type reference parsing.
//!
//! A type is a name, optional generic arguments in angle brackets, any
//! number of `[]` or `*` suffixes and, for parameters only, a trailing `...`.

use crate::{
    ast::{
        ast::{Node, NodeKind},
        types::{Indirection, TypeRef},
    },
    lexer::tokens::TokenKind,
};

use super::parser::Parser;

/// Parses a type reference into a `Type` node.
///
/// # Arguments
///
/// * `parser` - The parser, positioned on the type name
/// * `allow_variadic` - Whether a trailing `...` is accepted
pub fn parse_type(parser: &mut Parser, allow_variadic: bool) -> Option<Node> {
    let start = parser.get_position();
    let name = parser.expect(TokenKind::Identifier, "type")?;

    let mut generics = vec![];
    let generic_list = parser.eat(TokenKind::Less).is_some();
    if generic_list {
        while parser.matches(TokenKind::Identifier) {
            generics.push(parse_type(parser, false)?);
            if parser.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        parser.expect(TokenKind::Greater, "'>'")?;
    }

    let mut indirection = vec![];
    loop {
        match parser.current_token_kind() {
            TokenKind::OpenBracket => {
                parser.advance();
                parser.expect(TokenKind::CloseBracket, "']'")?;
                indirection.push(Indirection::Array);
            }
            TokenKind::Star => {
                parser.advance();
                indirection.push(Indirection::Pointer);
            }
            _ => break,
        }
    }

    let variadic = allow_variadic && parser.eat(TokenKind::Ellipsis).is_some();

    Some(parser.finish(
        start,
        NodeKind::Type(TypeRef {
            name: name.value,
            generics,
            generic_list,
            indirection,
            variadic,
        }),
    ))
}
