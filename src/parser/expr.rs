//! Expression parsing by precedence climbing.
//!
//! One function per precedence level, loosest first:
//! sequence, assignment, ternary, `||`, `&&`, `|`, `^`, `&`, equality,
//! relational, shift, additive, multiplicative, unary, postfix, primary.

use crate::{
    ast::{
        ast::{Node, NodeKind},
        expressions::{BinaryOp, UnaryOp},
        statements::{Modifiers, Visibility},
    },
    lexer::tokens::TokenKind,
    Span,
};

use super::{
    decl::{parse_function, parse_lambda, parse_var_decl, VarDeclOptions},
    parser::Parser,
    stmt::{parse_body, parse_for, parse_if, parse_switch, parse_try, parse_while},
    types::parse_type,
};

type Operand = fn(&mut Parser) -> Option<Node>;
/// Returns the operator at the cursor and how many tokens spell it.
type Operator = fn(&Parser) -> Option<(BinaryOp, usize)>;

/// Parses a full expression, including the `,` sequence operator.
pub fn parse_expr(parser: &mut Parser) -> Option<Node> {
    parse_binary_level(parser, parse_assignment, |parser| {
        match parser.current_token_kind() {
            TokenKind::Comma => Some((BinaryOp::Sequence, 1)),
            _ => None,
        }
    })
}

fn parse_binary_level(parser: &mut Parser, operand: Operand, operator: Operator) -> Option<Node> {
    let mut left = operand(parser)?;

    while let Some((op, width)) = operator(parser) {
        for _ in 0..width {
            parser.advance();
        }

        let right = operand(parser)?;
        let start = left.span.start.clone();
        left = parser.finish(
            start,
            NodeKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        );
    }

    Some(left)
}

fn assignment_operator(parser: &Parser) -> Option<(BinaryOp, usize)> {
    let op = match parser.current_token_kind() {
        TokenKind::Assignment => BinaryOp::Assign,
        TokenKind::StarEquals => BinaryOp::MultiplyAssign,
        TokenKind::SlashEquals => BinaryOp::DivideAssign,
        TokenKind::PercentEquals => BinaryOp::ModuloAssign,
        TokenKind::PlusEquals => BinaryOp::AddAssign,
        TokenKind::MinusEquals => BinaryOp::SubtractAssign,
        TokenKind::ShiftLeftEquals => BinaryOp::ShiftLeftAssign,
        TokenKind::AmpersandEquals => BinaryOp::BitAndAssign,
        TokenKind::CaretEquals => BinaryOp::BitXorAssign,
        TokenKind::PipeEquals => BinaryOp::BitOrAssign,
        TokenKind::AndEquals => BinaryOp::AndAssign,
        TokenKind::OrEquals => BinaryOp::OrAssign,
        TokenKind::Greater if parser.next_touches(TokenKind::GreaterEquals) => {
            return Some((BinaryOp::ShiftRightAssign, 2))
        }
        _ => return None,
    };

    Some((op, 1))
}

/// Assignment chains are scanned left to right but nest to the right, so
/// `a = b += c` is `a = (b += c)`.
pub fn parse_assignment(parser: &mut Parser) -> Option<Node> {
    let mut operands = vec![parse_ternary(parser)?];
    let mut operators = vec![];

    while let Some((op, width)) = assignment_operator(parser) {
        for _ in 0..width {
            parser.advance();
        }
        operands.push(parse_ternary(parser)?);
        operators.push(op);
    }

    let mut value = operands.pop()?;
    while let Some(op) = operators.pop() {
        let target = operands.pop()?;
        let span = Span::new(target.span.start.clone(), value.span.end.clone());
        let id = parser.advance_id();
        value = Node::new(
            id,
            span,
            NodeKind::Binary {
                op,
                left: Box::new(target),
                right: Box::new(value),
            },
        );
    }

    Some(value)
}

fn parse_ternary(parser: &mut Parser) -> Option<Node> {
    let condition = parse_logical_or(parser)?;
    if parser.eat(TokenKind::Question).is_none() {
        return Some(condition);
    }

    let then_branch = parse_assignment(parser)?;
    parser.expect(TokenKind::Colon, "':'")?;
    let else_branch = parse_ternary(parser)?;

    let start = condition.span.start.clone();
    Some(parser.finish(
        start,
        NodeKind::Ternary {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        },
    ))
}

fn parse_logical_or(parser: &mut Parser) -> Option<Node> {
    parse_binary_level(parser, parse_logical_and, |parser| match parser.current_token_kind() {
        TokenKind::Or => Some((BinaryOp::Or, 1)),
        _ => None,
    })
}

fn parse_logical_and(parser: &mut Parser) -> Option<Node> {
    parse_binary_level(parser, parse_bit_or, |parser| match parser.current_token_kind() {
        TokenKind::And => Some((BinaryOp::And, 1)),
        _ => None,
    })
}

fn parse_bit_or(parser: &mut Parser) -> Option<Node> {
    parse_binary_level(parser, parse_bit_xor, |parser| match parser.current_token_kind() {
        TokenKind::Pipe => Some((BinaryOp::BitOr, 1)),
        _ => None,
    })
}

fn parse_bit_xor(parser: &mut Parser) -> Option<Node> {
    parse_binary_level(parser, parse_bit_and, |parser| match parser.current_token_kind() {
        TokenKind::Caret => Some((BinaryOp::BitXor, 1)),
        _ => None,
    })
}

fn parse_bit_and(parser: &mut Parser) -> Option<Node> {
    parse_binary_level(parser, parse_equality, |parser| match parser.current_token_kind() {
        TokenKind::Ampersand => Some((BinaryOp::BitAnd, 1)),
        _ => None,
    })
}

fn parse_equality(parser: &mut Parser) -> Option<Node> {
    parse_binary_level(parser, parse_relational, |parser| match parser.current_token_kind() {
        TokenKind::Equals => Some((BinaryOp::Equals, 1)),
        TokenKind::NotEquals => Some((BinaryOp::NotEquals, 1)),
        TokenKind::StrictEquals => Some((BinaryOp::StrictEquals, 1)),
        TokenKind::StrictNotEquals => Some((BinaryOp::StrictNotEquals, 1)),
        _ => None,
    })
}

fn parse_relational(parser: &mut Parser) -> Option<Node> {
    parse_binary_level(parser, parse_shift, |parser| match parser.current_token_kind() {
        TokenKind::Less => Some((BinaryOp::Less, 1)),
        TokenKind::LessEquals => Some((BinaryOp::LessEquals, 1)),
        TokenKind::Greater
            if !parser.next_touches(TokenKind::Greater)
                && !parser.next_touches(TokenKind::GreaterEquals) =>
        {
            Some((BinaryOp::Greater, 1))
        }
        TokenKind::GreaterEquals => Some((BinaryOp::GreaterEquals, 1)),
        TokenKind::Inst => Some((BinaryOp::InstanceOf, 1)),
        _ => None,
    })
}

pub fn parse_shift(parser: &mut Parser) -> Option<Node> {
    parse_binary_level(parser, parse_additive, |parser| match parser.current_token_kind() {
        TokenKind::ShiftLeft => Some((BinaryOp::ShiftLeft, 1)),
        TokenKind::Greater if parser.next_touches(TokenKind::Greater) => {
            Some((BinaryOp::ShiftRight, 2))
        }
        _ => None,
    })
}

fn parse_additive(parser: &mut Parser) -> Option<Node> {
    parse_binary_level(parser, parse_multiplicative, |parser| match parser.current_token_kind() {
        TokenKind::Plus => Some((BinaryOp::Add, 1)),
        TokenKind::Dash => Some((BinaryOp::Subtract, 1)),
        _ => None,
    })
}

fn parse_multiplicative(parser: &mut Parser) -> Option<Node> {
    parse_binary_level(parser, parse_unary, |parser| match parser.current_token_kind() {
        TokenKind::Star => Some((BinaryOp::Multiply, 1)),
        TokenKind::Slash => Some((BinaryOp::Divide, 1)),
        TokenKind::Percent => Some((BinaryOp::Modulo, 1)),
        _ => None,
    })
}

fn prefix_operator(kind: TokenKind) -> Option<UnaryOp> {
    match kind {
        TokenKind::PlusPlus => Some(UnaryOp::Increment),
        TokenKind::MinusMinus => Some(UnaryOp::Decrement),
        TokenKind::Plus => Some(UnaryOp::Plus),
        TokenKind::Dash => Some(UnaryOp::Minus),
        TokenKind::Not => Some(UnaryOp::Not),
        TokenKind::Tilde => Some(UnaryOp::BitNot),
        TokenKind::Star => Some(UnaryOp::Deref),
        TokenKind::Ampersand => Some(UnaryOp::Reference),
        _ => None,
    }
}

pub fn parse_unary(parser: &mut Parser) -> Option<Node> {
    let start = parser.get_position();

    if let Some(op) = prefix_operator(parser.current_token_kind()) {
        parser.advance();
        let operand = parse_unary(parser)?;
        return Some(parser.finish(
            start,
            NodeKind::Unary {
                op,
                operand: Box::new(operand),
            },
        ));
    }

    if parser.matches(TokenKind::OpenParen) {
        if let Some(cast) = try_parse_cast(parser) {
            return Some(cast);
        }
    }

    parse_postfix(parser)
}

/// `(Type) operand`. Rewinds to the `(` if the type, the `)` or the operand
/// fails, leaving the caller to read a parenthesized expression instead.
fn try_parse_cast(parser: &mut Parser) -> Option<Node> {
    let state = parser.save();
    let start = parser.get_position();
    parser.advance();

    let Some(target) = parse_type(parser, false) else {
        parser.restore(state);
        return None;
    };

    if parser.eat(TokenKind::CloseParen).is_none() {
        parser.restore(state);
        return None;
    }

    let Some(operand) = parse_unary(parser) else {
        tracing::trace!(line = start.line, column = start.column, "cast backtracked to parenthesized expression");
        parser.restore(state);
        return None;
    };

    Some(parser.finish(
        start,
        NodeKind::Cast {
            target: Box::new(target),
            operand: Box::new(operand),
        },
    ))
}

pub fn parse_postfix(parser: &mut Parser) -> Option<Node> {
    let start = parser.get_position();
    let mut base = parse_primary(parser)?;

    loop {
        let kind = match parser.current_token_kind() {
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = if parser.advance().kind == TokenKind::PlusPlus {
                    UnaryOp::Increment
                } else {
                    UnaryOp::Decrement
                };
                NodeKind::UnaryPostfix {
                    op,
                    operand: Box::new(base),
                }
            }
            TokenKind::OpenParen => {
                parser.advance();
                let args = parse_arguments(parser, TokenKind::CloseParen)?;
                parser.expect(TokenKind::CloseParen, "')'")?;
                NodeKind::Call {
                    callee: Box::new(base),
                    args,
                }
            }
            TokenKind::OpenBracket => {
                parser.advance();
                let index = parse_expr(parser)?;
                parser.expect(TokenKind::CloseBracket, "']'")?;
                NodeKind::ComputedMember {
                    object: Box::new(base),
                    index: Box::new(index),
                }
            }
            TokenKind::Dot => {
                parser.advance();
                let member = parser.expect(TokenKind::Identifier, "identifier")?;
                NodeKind::Member {
                    object: Box::new(base),
                    member: member.value,
                }
            }
            _ => break,
        };

        base = parser.finish(start.clone(), kind);
    }

    Some(base)
}

/// Comma separated assignment expressions up to, not including, `close`.
pub fn parse_arguments(parser: &mut Parser, close: TokenKind) -> Option<Vec<Node>> {
    let mut args = vec![];
    if parser.matches(close) {
        return Some(args);
    }

    loop {
        args.push(parse_assignment(parser)?);
        if parser.eat(TokenKind::Comma).is_none() {
            break;
        }
    }

    Some(args)
}

pub fn parse_primary(parser: &mut Parser) -> Option<Node> {
    let start = parser.get_position();

    match parser.current_token_kind() {
        TokenKind::If => parse_if(parser),
        TokenKind::For => parse_for(parser),
        TokenKind::While => parse_while(parser),
        TokenKind::Switch => parse_switch(parser),
        TokenKind::Try => parse_try(parser),
        TokenKind::OpenCurly => parse_body(parser),
        TokenKind::New => {
            parser.advance();
            let ty = parse_type(parser, false)?;
            Some(parser.finish(start, NodeKind::New(Box::new(ty))))
        }
        TokenKind::Null => {
            parser.advance();
            Some(parser.finish(start, NodeKind::Null))
        }
        TokenKind::OpenBracket => {
            parser.advance();
            let items = parse_arguments(parser, TokenKind::CloseBracket)?;
            parser.expect(TokenKind::CloseBracket, "']'")?;
            Some(parser.finish(start, NodeKind::ArrayLiteral(items)))
        }
        TokenKind::Throw => {
            parser.advance();
            let value = parse_expr(parser)?;
            Some(parser.finish(start, NodeKind::Throw(Box::new(value))))
        }
        TokenKind::Goto => {
            parser.advance();
            let label = parser.expect(TokenKind::Identifier, "label")?;
            Some(parser.finish(start, NodeKind::Goto(label.value)))
        }
        TokenKind::Return => {
            parser.advance();
            let value = if parser.matches(TokenKind::Semicolon) || parser.matches(TokenKind::CloseCurly) {
                None
            } else {
                Some(Box::new(parse_expr(parser)?))
            };
            Some(parser.finish(start, NodeKind::Return(value)))
        }
        TokenKind::Continue => {
            parser.advance();
            Some(parser.finish(start, NodeKind::Continue))
        }
        TokenKind::Break => {
            parser.advance();
            Some(parser.finish(start, NodeKind::Break))
        }
        TokenKind::Async | TokenKind::Synch | TokenKind::Less | TokenKind::Func => {
            let modifiers = Modifiers {
                is_async: parser.eat(TokenKind::Async).is_some(),
                synch: parser.eat(TokenKind::Synch).is_some(),
                ..Modifiers::default()
            };

            if parser.matches(TokenKind::Func) {
                parse_function(parser, start, Visibility::Private, modifiers)
            } else {
                parse_lambda(parser, start, Visibility::Private, modifiers)
            }
        }
        TokenKind::OpenParen => {
            parser.advance();
            let inner = parse_expr(parser)?;
            parser.expect(TokenKind::CloseParen, "')'")?;
            Some(inner)
        }
        TokenKind::Integer => parse_integer(parser),
        TokenKind::Decimal => match parser.current_token().value.parse::<f64>() {
            Ok(value) => {
                parser.advance();
                Some(parser.finish(start, NodeKind::DecimalLit(value)))
            }
            Err(_) => {
                parser.unexpected("valid decimal literal");
                None
            }
        },
        TokenKind::String => {
            let token = parser.advance();
            Some(parser.finish(start, NodeKind::StringLit(token.value)))
        }
        TokenKind::Char => {
            let token = parser.advance();
            Some(parser.finish(start, NodeKind::CharLit(token.value)))
        }
        TokenKind::Identifier => parse_identifier_led(parser),
        _ => {
            parser.unexpected("expression");
            None
        }
    }
}

fn parse_integer(parser: &mut Parser) -> Option<Node> {
    let start = parser.get_position();
    let text = parser.current_token().value.clone();

    let lower = text.to_ascii_lowercase();
    let parsed = if let Some(hex) = lower.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)
    } else if let Some(binary) = lower.strip_prefix("0b") {
        u64::from_str_radix(binary, 2)
    } else if text.len() > 1 && text.starts_with('0') {
        u64::from_str_radix(&text[1..], 8)
    } else {
        text.parse::<u64>()
    };

    match parsed {
        Ok(value) => {
            parser.advance();
            Some(parser.finish(start, NodeKind::IntegerLit(value)))
        }
        Err(_) => {
            parser.unexpected("valid integer literal");
            None
        }
    }
}

/// True when the tokens after a leading identifier can continue a type
/// followed by a declared name: `T x`, `T<...> x` or `T[] x`.
fn continues_declaration(parser: &Parser) -> bool {
    match parser.current_token_kind() {
        TokenKind::Identifier | TokenKind::Less => true,
        TokenKind::OpenBracket => parser.peek_kind(1) == TokenKind::CloseBracket,
        _ => false,
    }
}

/// An identifier either starts a local variable declaration or is a plain
/// reference. Declarations are tried speculatively and abandoned on failure.
fn parse_identifier_led(parser: &mut Parser) -> Option<Node> {
    let start = parser.get_position();
    let state = parser.save();
    let name = parser.advance();

    if continues_declaration(parser) {
        parser.restore(state);
        if let Some(decl) = parse_var_decl(
            parser,
            Visibility::None,
            Modifiers::default(),
            VarDeclOptions::local(),
        ) {
            return Some(decl);
        }

        tracing::trace!(name = %name.value, "declaration backtracked to identifier");
        parser.restore(state);
        parser.advance();
    }

    Some(parser.finish(start, NodeKind::Identifier(name.value)))
}
