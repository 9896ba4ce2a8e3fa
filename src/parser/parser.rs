//! Parser state and the entry point that turns a token stream into a file
//! node.
//!
//! Productions return `Option<Node>`: `None` means an error was already
//! recorded in `Parser::errors` and the caller should give up on the
//! construct. Speculative productions snapshot the cursor together with the
//! error count and roll both back when they fail.

use std::rc::Rc;

use crate::{
    ast::ast::{Node, NodeId, NodeKind},
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::{Token, TokenKind},
    Position, Span,
};

use super::stmt::parse_file;

/// A point the parser can rewind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserState {
    pos: usize,
    error_count: usize,
}

/// The main parser structure that maintains parsing state.
pub struct Parser {
    /// The list of tokens to parse, always ending in `EOF`
    tokens: Vec<Token>,
    /// Current position in the token stream
    pos: usize,
    /// The name of the source file being parsed
    file: Rc<String>,
    /// Errors recorded so far, in order
    errors: Vec<Error>,
    /// Counter for generating node ids
    current_id: u32,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>, file: Rc<String>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::EOF) {
            let end = tokens
                .last()
                .map(|t| t.span.end.clone())
                .unwrap_or_else(|| Position::new(1, 1, Rc::clone(&file)));
            tokens.push(Token {
                kind: TokenKind::EOF,
                value: String::from("EOF"),
                span: Span::new(end.clone(), end),
            });
        }

        Parser {
            tokens,
            pos: 0,
            file,
            errors: vec![],
            current_id: 0,
        }
    }

    /// Returns the current token without advancing.
    pub fn current_token(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub fn current_token_kind(&self) -> TokenKind {
        self.current_token().kind
    }

    /// Kind of the token `offset` places ahead of the cursor.
    pub fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::EOF)
    }

    /// True when the token after the cursor is `kind` and directly touches
    /// the current one, as the two halves of `>>` do.
    pub fn next_touches(&self, kind: TokenKind) -> bool {
        match self.tokens.get(self.pos + 1) {
            Some(next) => next.kind == kind && self.current_token().touches(next),
            None => false,
        }
    }

    /// Advances to the next token and returns the one just consumed.
    pub fn advance(&mut self) -> Token {
        let token = self.current_token().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    pub fn matches(&self, kind: TokenKind) -> bool {
        self.current_token_kind() == kind
    }

    /// Consumes the current token if it has the given kind.
    pub fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.matches(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Consumes a token of the given kind, recording an error naming what
    /// was expected otherwise.
    pub fn expect(&mut self, kind: TokenKind, expecting: &str) -> Option<Token> {
        if self.matches(kind) {
            Some(self.advance())
        } else {
            self.unexpected(expecting);
            None
        }
    }

    /// Records an unexpected-token error at the cursor.
    pub fn unexpected(&mut self, expecting: &str) {
        let token = self.current_token();
        let error = Error::new(
            ErrorImpl::UnexpectedToken {
                token: token.value.clone(),
                expecting: expecting.to_string(),
            },
            token.span.start.clone(),
        );
        tracing::trace!(token = %token.value, expecting, "parse error");
        self.errors.push(error);
    }

    /// Checks if there are more tokens to parse.
    pub fn has_tokens(&self) -> bool {
        self.current_token_kind() != TokenKind::EOF
    }

    pub fn save(&self) -> ParserState {
        ParserState {
            pos: self.pos,
            error_count: self.errors.len(),
        }
    }

    /// Rewinds the cursor and forgets errors recorded since `state`.
    pub fn restore(&mut self, state: ParserState) {
        self.pos = state.pos;
        self.errors.truncate(state.error_count);
    }

    pub fn advance_id(&mut self) -> NodeId {
        let id = NodeId(self.current_id);
        self.current_id += 1;
        id
    }

    /// Start of the current token.
    pub fn get_position(&self) -> Position {
        self.current_token().span.start.clone()
    }

    /// End of the most recently consumed token.
    pub fn previous_end(&self) -> Position {
        if self.pos == 0 {
            return self.get_position();
        }
        self.tokens[self.pos - 1].span.end.clone()
    }

    /// Builds a node spanning from `start` to the last consumed token.
    pub fn finish(&mut self, start: Position, kind: NodeKind) -> Node {
        let span = Span::new(start, self.previous_end());
        let id = self.advance_id();
        Node::new(id, span, kind)
    }

    pub fn file(&self) -> Rc<String> {
        Rc::clone(&self.file)
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<Error> {
        self.errors
    }
}

/// Parses a token stream into a `File` node.
///
/// Returns every recorded error alongside the tree. The tree is absent only
/// when a module failed in a way the parser could not step past.
#[tracing::instrument(skip(tokens), fields(file = %file, tokens = tokens.len()))]
pub fn parse(tokens: Vec<Token>, file: Rc<String>) -> (Vec<Error>, Option<Node>) {
    let mut parser = Parser::new(tokens, file);
    let root = parse_file(&mut parser);

    tracing::debug!(errors = parser.errors().len(), parsed = root.is_some(), "parse finished");
    (parser.into_errors(), root)
}
