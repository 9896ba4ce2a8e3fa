use lazy_static::lazy_static;
use std::{collections::HashMap, fmt::Display};

use crate::Span;

lazy_static! {
    pub static ref RESERVED_LOOKUP: HashMap<&'static str, TokenKind> = {
        let mut map = HashMap::new();
        map.insert("async", TokenKind::Async);
        map.insert("break", TokenKind::Break);
        map.insert("case", TokenKind::Case);
        map.insert("catch", TokenKind::Catch);
        map.insert("class", TokenKind::Class);
        map.insert("continue", TokenKind::Continue);
        map.insert("csig", TokenKind::Csig);
        map.insert("default", TokenKind::Default);
        map.insert("else", TokenKind::Else);
        map.insert("finally", TokenKind::Finally);
        map.insert("for", TokenKind::For);
        map.insert("func", TokenKind::Func);
        map.insert("goto", TokenKind::Goto);
        map.insert("if", TokenKind::If);
        map.insert("iface", TokenKind::Iface);
        map.insert("import", TokenKind::Import);
        map.insert("inst", TokenKind::Inst);
        map.insert("module", TokenKind::Module);
        map.insert("new", TokenKind::New);
        map.insert("null", TokenKind::Null);
        map.insert("priv", TokenKind::Priv);
        map.insert("prot", TokenKind::Prot);
        map.insert("pub", TokenKind::Pub);
        map.insert("pure", TokenKind::Pure);
        map.insert("ret", TokenKind::Return);
        map.insert("static", TokenKind::Static);
        map.insert("switch", TokenKind::Switch);
        map.insert("synch", TokenKind::Synch);
        map.insert("throw", TokenKind::Throw);
        map.insert("try", TokenKind::Try);
        map.insert("typed", TokenKind::Typed);
        map.insert("virt", TokenKind::Virt);
        map.insert("while", TokenKind::While);
        map
    };
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TokenKind {
    EOF,
    Unknown,
    Integer,
    Decimal,
    String,
    Char,
    Identifier,

    OpenBracket,
    CloseBracket,
    OpenCurly,
    CloseCurly,
    OpenParen,
    CloseParen,

    Assignment,      // =
    Equals,          // ==
    NotEquals,       // !=
    StrictEquals,    // ===
    StrictNotEquals, // !==
    Not,             // !
    Tilde,           // ~

    Less,
    LessEquals,
    // `>>` is two adjacent `Greater` tokens so nested generics close cleanly
    Greater,
    GreaterEquals,
    ShiftLeft,

    Or,        // ||
    And,       // &&
    Pipe,      // |
    Ampersand, // &
    Caret,     // ^

    Dot,
    Ellipsis,
    Semicolon,
    Colon,
    Question,
    Comma,
    Arrow, // =>

    PlusPlus,
    MinusMinus,
    PlusEquals,
    MinusEquals,
    StarEquals,
    SlashEquals,
    PercentEquals,
    AmpersandEquals,
    PipeEquals,
    CaretEquals,
    ShiftLeftEquals,
    AndEquals, // &&=
    OrEquals,  // ||=

    Plus,
    Dash,
    Slash,
    Star,
    Percent,

    // Reserved
    Async,
    Break,
    Case,
    Catch,
    Class,
    Continue,
    Csig,
    Default,
    Else,
    Finally,
    For,
    Func,
    Goto,
    If,
    Iface,
    Import,
    Inst,
    Module,
    New,
    Null,
    Priv,
    Prot,
    Pub,
    Pure,
    Return,
    Static,
    Switch,
    Synch,
    Throw,
    Try,
    Typed,
    Virt,
    While,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub span: Span,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.has_payload() {
            write!(
                f,
                "{}:{} {} ({})",
                self.span.start.line, self.span.start.column, self.kind, self.value
            )
        } else {
            write!(
                f,
                "{}:{} {}",
                self.span.start.line, self.span.start.column, self.kind
            )
        }
    }
}

impl Token {
    fn has_payload(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::String
                | TokenKind::Char
                | TokenKind::Identifier
                | TokenKind::Integer
                | TokenKind::Decimal
                | TokenKind::Unknown
        )
    }

    /// True when `other` starts exactly where this token ends.
    pub fn touches(&self, other: &Token) -> bool {
        self.span.end.line == other.span.start.line
            && self.span.end.column == other.span.start.column
    }
}
