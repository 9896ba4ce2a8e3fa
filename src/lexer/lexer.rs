use std::rc::Rc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    errors::errors::{Error, ErrorImpl},
    Position, Span, MK_DEFAULT_HANDLER, MK_TOKEN,
};

use super::tokens::{Token, TokenKind, RESERVED_LOOKUP};

pub type RegexHandler = fn(&mut Lexer, &Regex);

pub struct RegexPattern {
    regex: Regex,
    handler: RegexHandler,
}

fn pattern(source: &str, handler: RegexHandler) -> RegexPattern {
    RegexPattern {
        regex: Regex::new(&format!("^(?:{})", source)).expect("lexer patterns are valid regexes"),
        handler,
    }
}

lazy_static! {
    // Tried in order; multi-character operators come before their prefixes.
    static ref PATTERNS: Vec<RegexPattern> = vec![
        pattern("\\s+", skip_handler),
        pattern("//[^\\n]*", skip_handler),
        pattern("(?s)/\\*.*?\\*/", skip_handler),
        pattern("[a-zA-Z_][a-zA-Z0-9_]*", symbol_handler),
        pattern("0[xX][0-9a-fA-F]+", integer_handler),
        pattern("0[bB][01]+", integer_handler),
        pattern("[0-9]+\\.[0-9]+([eE][+-]?[0-9]+)?", decimal_handler),
        pattern("[0-9]+", integer_handler),
        pattern("\"(\\\\.|[^\"\\\\])*\"", string_handler),
        pattern("'(\\\\.|[^'\\\\])'", char_handler),
        pattern("\\.\\.\\.", MK_DEFAULT_HANDLER!(TokenKind::Ellipsis, "...")),
        pattern("===", MK_DEFAULT_HANDLER!(TokenKind::StrictEquals, "===")),
        pattern("!==", MK_DEFAULT_HANDLER!(TokenKind::StrictNotEquals, "!==")),
        pattern("<<=", MK_DEFAULT_HANDLER!(TokenKind::ShiftLeftEquals, "<<=")),
        pattern("&&=", MK_DEFAULT_HANDLER!(TokenKind::AndEquals, "&&=")),
        pattern("\\|\\|=", MK_DEFAULT_HANDLER!(TokenKind::OrEquals, "||=")),
        pattern("==", MK_DEFAULT_HANDLER!(TokenKind::Equals, "==")),
        pattern("!=", MK_DEFAULT_HANDLER!(TokenKind::NotEquals, "!=")),
        pattern("=>", MK_DEFAULT_HANDLER!(TokenKind::Arrow, "=>")),
        pattern("<=", MK_DEFAULT_HANDLER!(TokenKind::LessEquals, "<=")),
        pattern(">=", MK_DEFAULT_HANDLER!(TokenKind::GreaterEquals, ">=")),
        pattern("<<", MK_DEFAULT_HANDLER!(TokenKind::ShiftLeft, "<<")),
        pattern("&&", MK_DEFAULT_HANDLER!(TokenKind::And, "&&")),
        pattern("\\|\\|", MK_DEFAULT_HANDLER!(TokenKind::Or, "||")),
        pattern("\\+\\+", MK_DEFAULT_HANDLER!(TokenKind::PlusPlus, "++")),
        pattern("--", MK_DEFAULT_HANDLER!(TokenKind::MinusMinus, "--")),
        pattern("\\+=", MK_DEFAULT_HANDLER!(TokenKind::PlusEquals, "+=")),
        pattern("-=", MK_DEFAULT_HANDLER!(TokenKind::MinusEquals, "-=")),
        pattern("\\*=", MK_DEFAULT_HANDLER!(TokenKind::StarEquals, "*=")),
        pattern("/=", MK_DEFAULT_HANDLER!(TokenKind::SlashEquals, "/=")),
        pattern("%=", MK_DEFAULT_HANDLER!(TokenKind::PercentEquals, "%=")),
        pattern("&=", MK_DEFAULT_HANDLER!(TokenKind::AmpersandEquals, "&=")),
        pattern("\\|=", MK_DEFAULT_HANDLER!(TokenKind::PipeEquals, "|=")),
        pattern("\\^=", MK_DEFAULT_HANDLER!(TokenKind::CaretEquals, "^=")),
        pattern("=", MK_DEFAULT_HANDLER!(TokenKind::Assignment, "=")),
        pattern("!", MK_DEFAULT_HANDLER!(TokenKind::Not, "!")),
        pattern("<", MK_DEFAULT_HANDLER!(TokenKind::Less, "<")),
        pattern(">", MK_DEFAULT_HANDLER!(TokenKind::Greater, ">")),
        pattern("&", MK_DEFAULT_HANDLER!(TokenKind::Ampersand, "&")),
        pattern("\\|", MK_DEFAULT_HANDLER!(TokenKind::Pipe, "|")),
        pattern("\\^", MK_DEFAULT_HANDLER!(TokenKind::Caret, "^")),
        pattern("~", MK_DEFAULT_HANDLER!(TokenKind::Tilde, "~")),
        pattern("\\+", MK_DEFAULT_HANDLER!(TokenKind::Plus, "+")),
        pattern("-", MK_DEFAULT_HANDLER!(TokenKind::Dash, "-")),
        pattern("\\*", MK_DEFAULT_HANDLER!(TokenKind::Star, "*")),
        pattern("/", MK_DEFAULT_HANDLER!(TokenKind::Slash, "/")),
        pattern("%", MK_DEFAULT_HANDLER!(TokenKind::Percent, "%")),
        pattern("\\.", MK_DEFAULT_HANDLER!(TokenKind::Dot, ".")),
        pattern(",", MK_DEFAULT_HANDLER!(TokenKind::Comma, ",")),
        pattern(";", MK_DEFAULT_HANDLER!(TokenKind::Semicolon, ";")),
        pattern(":", MK_DEFAULT_HANDLER!(TokenKind::Colon, ":")),
        pattern("\\?", MK_DEFAULT_HANDLER!(TokenKind::Question, "?")),
        pattern("\\(", MK_DEFAULT_HANDLER!(TokenKind::OpenParen, "(")),
        pattern("\\)", MK_DEFAULT_HANDLER!(TokenKind::CloseParen, ")")),
        pattern("\\[", MK_DEFAULT_HANDLER!(TokenKind::OpenBracket, "[")),
        pattern("\\]", MK_DEFAULT_HANDLER!(TokenKind::CloseBracket, "]")),
        pattern("\\{", MK_DEFAULT_HANDLER!(TokenKind::OpenCurly, "{")),
        pattern("\\}", MK_DEFAULT_HANDLER!(TokenKind::CloseCurly, "}")),
    ];
}

pub struct Lexer {
    tokens: Vec<Token>,
    source: String,
    pos: usize,
    line: u32,
    column: u32,
    file: Rc<String>,
}

impl Lexer {
    pub fn new(source: String, file: Option<String>) -> Lexer {
        let file_name = if let Some(file) = file {
            Rc::new(file)
        } else {
            Rc::new(String::from("shell"))
        };

        Lexer {
            tokens: vec![],
            source,
            pos: 0,
            line: 1,
            column: 1,
            file: file_name,
        }
    }

    /// Moves past `n` bytes of source, keeping line and column in step.
    pub fn advance_n(&mut self, n: usize) {
        let end = (self.pos + n).min(self.source.len());
        for ch in self.source[self.pos..end].chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.pos = end;
    }

    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column, Rc::clone(&self.file))
    }

    /// Span covering `text` if it were consumed from the current position.
    pub fn span_for(&self, text: &str) -> Span {
        let (mut line, mut column) = (self.line, self.column);
        for ch in text.chars() {
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }

        Span::new(
            self.position(),
            Position::new(line, column, Rc::clone(&self.file)),
        )
    }

    pub fn remainder(&self) -> &str {
        &self.source[self.pos..]
    }

    pub fn at_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn matched(&self, regex: &Regex) -> String {
        regex
            .find(self.remainder())
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    }

    fn push_matched(&mut self, kind: TokenKind, matched: &str, value: String) {
        let span = self.span_for(matched);
        self.push(MK_TOKEN!(kind, value, span));
        self.advance_n(matched.len());
    }
}

fn skip_handler(lexer: &mut Lexer, regex: &Regex) {
    let matched = lexer.matched(regex);
    lexer.advance_n(matched.len());
}

fn symbol_handler(lexer: &mut Lexer, regex: &Regex) {
    let matched = lexer.matched(regex);
    let kind = RESERVED_LOOKUP
        .get(matched.as_str())
        .copied()
        .unwrap_or(TokenKind::Identifier);

    lexer.push_matched(kind, &matched, matched.clone());
}

fn integer_handler(lexer: &mut Lexer, regex: &Regex) {
    let matched = lexer.matched(regex);
    lexer.push_matched(TokenKind::Integer, &matched, matched.clone());
}

fn decimal_handler(lexer: &mut Lexer, regex: &Regex) {
    let matched = lexer.matched(regex);
    lexer.push_matched(TokenKind::Decimal, &matched, matched.clone());
}

fn string_handler(lexer: &mut Lexer, regex: &Regex) {
    let matched = lexer.matched(regex);
    let value = unescape(&matched[1..matched.len() - 1]);
    lexer.push_matched(TokenKind::String, &matched, value);
}

fn char_handler(lexer: &mut Lexer, regex: &Regex) {
    let matched = lexer.matched(regex);
    let value = unescape(&matched[1..matched.len() - 1]);
    lexer.push_matched(TokenKind::Char, &matched, value);
}

fn unescape(literal: &str) -> String {
    let mut result = String::new();
    let mut chars = literal.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }

        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('0') => result.push('\0'),
            Some('\\') => result.push('\\'),
            Some('"') => result.push('"'),
            Some('\'') => result.push('\''),
            Some('x') => {
                let mut hex = String::new();
                while hex.len() < 2 {
                    match chars.peek() {
                        Some(c) if c.is_ascii_hexdigit() => {
                            hex.push(*c);
                            chars.next();
                        }
                        _ => break,
                    }
                }

                match u8::from_str_radix(&hex, 16) {
                    Ok(byte) => result.push(byte as char),
                    Err(_) => result.push('x'),
                }
            }
            Some(other) => {
                // Unknown escapes keep their backslash
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }

    result
}

/// Splits source text into tokens, ending with an `EOF` token.
///
/// Characters no pattern accepts become `Unknown` tokens; use
/// [`lexical_errors`] to turn them into diagnostics.
pub fn tokenize(source: String, file: Option<String>) -> Vec<Token> {
    let mut lex = Lexer::new(source, file);

    while !lex.at_eof() {
        let pattern = PATTERNS
            .iter()
            .find(|pattern| pattern.regex.is_match(lex.remainder()));

        match pattern {
            Some(pattern) => (pattern.handler)(&mut lex, &pattern.regex),
            None => {
                let unknown = lex.remainder().chars().next().map(String::from).unwrap_or_default();
                tracing::trace!(token = %unknown, line = lex.line, column = lex.column, "unrecognised character");
                lex.push_matched(TokenKind::Unknown, &unknown, unknown.clone());
            }
        }
    }

    let eof = lex.position();
    lex.push(MK_TOKEN!(
        TokenKind::EOF,
        String::from("EOF"),
        Span::new(eof.clone(), eof)
    ));
    lex.tokens
}

/// One `UnrecognisedToken` error per `Unknown` token, in source order.
pub fn lexical_errors(tokens: &[Token]) -> Vec<Error> {
    tokens
        .iter()
        .filter(|token| token.kind == TokenKind::Unknown)
        .map(|token| {
            Error::new(
                ErrorImpl::UnrecognisedToken {
                    token: token.value.clone(),
                },
                token.span.start.clone(),
            )
        })
        .collect()
}
