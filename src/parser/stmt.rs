//! Statement-level forms: bodies, control flow and the expression statement.
//!
//! Every form here is also an expression; the statement entry point only
//! decides where one statement ends.

use crate::{
    ast::{
        ast::{Node, NodeKind},
        statements::{CatchClause, Modifiers, Visibility},
    },
    lexer::tokens::TokenKind,
    Span,
};

use super::{
    decl::{parse_var_decl, VarDeclOptions},
    expr::{parse_expr, parse_primary},
    parser::Parser,
};

pub use super::decl::parse_file;

/// Forms that close with a nested statement or a `}`. At the start of a
/// statement they end the statement, so `{ ... } -x;` is two statements.
fn starts_block_form(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::OpenCurly
            | TokenKind::If
            | TokenKind::For
            | TokenKind::While
            | TokenKind::Switch
            | TokenKind::Try
            | TokenKind::Func
    )
}

/// A zero-width `Empty` node at the cursor, for blank `for` header slots.
fn empty_here(parser: &mut Parser) -> Node {
    let position = parser.get_position();
    let id = parser.advance_id();
    Node::new(id, Span::new(position.clone(), position), NodeKind::Empty)
}

/// Parses one statement and the semicolons that follow it.
///
/// A lone `;` is an `Empty` statement and `name:` is a label.
pub fn parse_statement(parser: &mut Parser) -> Option<Node> {
    let start = parser.get_position();

    let node = if parser.eat(TokenKind::Semicolon).is_some() {
        parser.finish(start, NodeKind::Empty)
    } else if parser.matches(TokenKind::Identifier) && parser.peek_kind(1) == TokenKind::Colon {
        let name = parser.advance().value;
        parser.advance();
        parser.finish(start, NodeKind::Label(name))
    } else if starts_block_form(parser.current_token_kind()) {
        parse_primary(parser)?
    } else {
        parse_expr(parser)?
    };

    while parser.eat(TokenKind::Semicolon).is_some() {}
    Some(node)
}

/// `{ statement* }`
pub fn parse_body(parser: &mut Parser) -> Option<Node> {
    let start = parser.get_position();
    parser.expect(TokenKind::OpenCurly, "'{'")?;

    let mut children = vec![];
    while !parser.matches(TokenKind::CloseCurly) && parser.has_tokens() {
        children.push(parse_statement(parser)?);
    }

    parser.expect(TokenKind::CloseCurly, "'}'")?;
    Some(parser.finish(start, NodeKind::Body(children)))
}

fn parse_condition(parser: &mut Parser) -> Option<Node> {
    parser.expect(TokenKind::OpenParen, "'('")?;
    let condition = parse_expr(parser)?;
    parser.expect(TokenKind::CloseParen, "')'")?;
    Some(condition)
}

pub fn parse_if(parser: &mut Parser) -> Option<Node> {
    let start = parser.get_position();
    parser.expect(TokenKind::If, "'if'")?;
    let condition = parse_condition(parser)?;
    let then_branch = parse_statement(parser)?;

    let else_branch = if parser.eat(TokenKind::Else).is_some() {
        Some(Box::new(parse_statement(parser)?))
    } else {
        None
    };

    Some(parser.finish(
        start,
        NodeKind::If {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch,
        },
    ))
}

/// `for (init; condition; step) body` or `for (variable : iterable) body`.
/// Any of the three header slots of the counted form may be blank.
pub fn parse_for(parser: &mut Parser) -> Option<Node> {
    let start = parser.get_position();
    parser.expect(TokenKind::For, "'for'")?;
    parser.expect(TokenKind::OpenParen, "'('")?;

    let init = if parser.matches(TokenKind::Semicolon) {
        empty_here(parser)
    } else {
        parse_expr(parser)?
    };

    if parser.eat(TokenKind::Colon).is_some() {
        let iterable = parse_expr(parser)?;
        parser.expect(TokenKind::CloseParen, "')'")?;
        let body = parse_statement(parser)?;

        return Some(parser.finish(
            start,
            NodeKind::ForEach {
                variable: Box::new(init),
                iterable: Box::new(iterable),
                body: Box::new(body),
            },
        ));
    }

    parser.expect(TokenKind::Semicolon, "';' or ':'")?;
    let condition = if parser.matches(TokenKind::Semicolon) {
        empty_here(parser)
    } else {
        parse_expr(parser)?
    };

    parser.expect(TokenKind::Semicolon, "';'")?;
    let step = if parser.matches(TokenKind::CloseParen) {
        empty_here(parser)
    } else {
        parse_expr(parser)?
    };

    parser.expect(TokenKind::CloseParen, "')'")?;
    let body = parse_statement(parser)?;

    Some(parser.finish(
        start,
        NodeKind::For {
            init: Box::new(init),
            condition: Box::new(condition),
            step: Box::new(step),
            body: Box::new(body),
        },
    ))
}

pub fn parse_while(parser: &mut Parser) -> Option<Node> {
    let start = parser.get_position();
    parser.expect(TokenKind::While, "'while'")?;
    let condition = parse_condition(parser)?;
    let body = parse_statement(parser)?;

    Some(parser.finish(
        start,
        NodeKind::While {
            condition: Box::new(condition),
            body: Box::new(body),
        },
    ))
}

/// `switch (subject) { case v: stmt ... default: stmt }`, with at most one
/// `default`.
pub fn parse_switch(parser: &mut Parser) -> Option<Node> {
    let start = parser.get_position();
    parser.expect(TokenKind::Switch, "'switch'")?;
    let subject = parse_condition(parser)?;
    parser.expect(TokenKind::OpenCurly, "'{'")?;

    let mut cases = vec![];
    let mut has_default = false;
    loop {
        let case_start = parser.get_position();
        match parser.current_token_kind() {
            TokenKind::Case => {
                parser.advance();
                let value = parse_expr(parser)?;
                parser.expect(TokenKind::Colon, "':'")?;
                let body = parse_statement(parser)?;
                cases.push(parser.finish(
                    case_start,
                    NodeKind::Case {
                        value: Box::new(value),
                        body: Box::new(body),
                    },
                ));
            }
            TokenKind::Default if !has_default => {
                parser.advance();
                has_default = true;
                parser.expect(TokenKind::Colon, "':'")?;
                let body = parse_statement(parser)?;
                cases.push(parser.finish(case_start, NodeKind::DefaultCase { body: Box::new(body) }));
            }
            _ => break,
        }
    }

    let expecting = if has_default { "'case' or '}'" } else { "'case', 'default' or '}'" };
    parser.expect(TokenKind::CloseCurly, expecting)?;

    Some(parser.finish(
        start,
        NodeKind::Switch {
            subject: Box::new(subject),
            cases,
        },
    ))
}

/// `try stmt [catch (Type name) stmt] [finally stmt]`, needing at least one
/// of the two clauses.
pub fn parse_try(parser: &mut Parser) -> Option<Node> {
    let start = parser.get_position();
    parser.expect(TokenKind::Try, "'try'")?;
    let body = parse_statement(parser)?;

    let catch = if parser.eat(TokenKind::Catch).is_some() {
        parser.expect(TokenKind::OpenParen, "'('")?;
        let variable = parse_var_decl(
            parser,
            Visibility::None,
            Modifiers::default(),
            VarDeclOptions::catch(),
        )?;
        parser.expect(TokenKind::CloseParen, "')'")?;
        let handler = parse_statement(parser)?;
        Some(CatchClause {
            variable: Box::new(variable),
            handler: Box::new(handler),
        })
    } else {
        None
    };

    let finally = if catch.is_none() {
        parser.expect(TokenKind::Finally, "'catch' or 'finally'")?;
        Some(Box::new(parse_statement(parser)?))
    } else if parser.eat(TokenKind::Finally).is_some() {
        Some(Box::new(parse_statement(parser)?))
    } else {
        None
    };

    Some(parser.finish(
        start,
        NodeKind::Try {
            body: Box::new(body),
            catch,
            finally,
        },
    ))
}
