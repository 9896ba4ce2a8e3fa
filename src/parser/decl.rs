//! Declarations: files, modules, classes, functions, lambdas, variables and
//! imports, together with the modifier prefixes that may precede them.

use crate::{
    ast::{
        ast::{Node, NodeKind},
        statements::{ClassDecl, FunctionDecl, Modifiers, ModuleDecl, VarDecl, Visibility},
    },
    lexer::tokens::TokenKind,
    Position,
};

use super::{
    expr::{parse_arguments, parse_assignment, parse_postfix, parse_shift},
    parser::Parser,
    stmt::parse_statement,
    types::parse_type,
};

const MODULE_ITEM_EXPECTING: &str = "'module', 'class', 'func', '<', type, or '}'. Confirm correct modifiers";
const CLASS_MEMBER_EXPECTING: &str = "'func', '<', type, or '}'. Confirm correct modifiers";

/// Where a variable declaration appears, which decides what may follow the
/// declared name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarDeclOptions {
    pub allow_variadic: bool,
    pub allow_init: bool,
    /// Initializers stop before relational operators, so a `>` can close
    /// the list the declaration sits in.
    pub init_below_relational: bool,
    pub eat_semicolons: bool,
}

impl VarDeclOptions {
    pub fn local() -> Self {
        VarDeclOptions {
            allow_variadic: false,
            allow_init: true,
            init_below_relational: false,
            eat_semicolons: false,
        }
    }

    pub fn member() -> Self {
        VarDeclOptions {
            allow_variadic: false,
            allow_init: true,
            init_below_relational: false,
            eat_semicolons: true,
        }
    }

    pub fn parameter() -> Self {
        VarDeclOptions {
            allow_variadic: true,
            allow_init: true,
            init_below_relational: false,
            eat_semicolons: false,
        }
    }

    pub fn lambda_parameter() -> Self {
        VarDeclOptions {
            init_below_relational: true,
            ..VarDeclOptions::parameter()
        }
    }

    pub fn catch() -> Self {
        VarDeclOptions {
            allow_variadic: false,
            allow_init: false,
            init_below_relational: false,
            eat_semicolons: false,
        }
    }
}

/// Visibility and modifier flags written before a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModifierPrefix {
    pub visibility: Visibility,
    pub modifiers: Modifiers,
}

impl ModifierPrefix {
    pub fn is_written(&self) -> bool {
        self.visibility != Visibility::None || !self.modifiers.is_empty()
    }
}

fn eat_semicolons(parser: &mut Parser) {
    while parser.eat(TokenKind::Semicolon).is_some() {}
}

/// Reads the modifier prefix in its fixed order.
pub fn parse_modifiers(parser: &mut Parser) -> ModifierPrefix {
    let visibility = match parser.current_token_kind() {
        TokenKind::Pub => Visibility::Public,
        TokenKind::Prot => Visibility::Protected,
        TokenKind::Priv => Visibility::Private,
        _ => Visibility::None,
    };
    if visibility != Visibility::None {
        parser.advance();
    }

    let modifiers = Modifiers {
        typed: parser.eat(TokenKind::Typed).is_some(),
        synch: parser.eat(TokenKind::Synch).is_some(),
        virt: parser.eat(TokenKind::Virt).is_some(),
        iface: parser.eat(TokenKind::Iface).is_some(),
        is_static: parser.eat(TokenKind::Static).is_some(),
        pure: parser.eat(TokenKind::Pure).is_some(),
        is_async: parser.eat(TokenKind::Async).is_some(),
        csig: parser.eat(TokenKind::Csig).is_some(),
    };

    ModifierPrefix {
        visibility,
        modifiers,
    }
}

/// Parses a whole source file: a sequence of top-level modules.
pub fn parse_file(parser: &mut Parser) -> Option<Node> {
    let start = parser.get_position();
    let mut modules = vec![];

    while parser.has_tokens() {
        let state = parser.save();
        let module_start = parser.get_position();
        let prefix = parse_modifiers(parser);

        if !parser.matches(TokenKind::Module) || !prefix.modifiers.is_empty() {
            parser.restore(state);
            break;
        }

        modules.push(parse_module(parser, module_start, prefix.visibility)?);
    }

    if parser.has_tokens() {
        parser.unexpected("EOF or 'module'");
    }

    let path = parser.file();
    Some(parser.finish(start, NodeKind::File { path, modules }))
}

pub fn parse_module(parser: &mut Parser, start: Position, visibility: Visibility) -> Option<Node> {
    parser.expect(TokenKind::Module, "'module'")?;
    let name = parser.expect(TokenKind::Identifier, "module name")?.value;
    parser.expect(TokenKind::OpenCurly, "'{'")?;

    let mut items = vec![];
    loop {
        let state = parser.save();
        let item_start = parser.get_position();
        let prefix = parse_modifiers(parser);
        let written = prefix.is_written();
        let ModifierPrefix {
            visibility: item_visibility,
            modifiers,
        } = prefix;

        match parser.current_token_kind() {
            TokenKind::Module if modifiers.is_empty() => {
                items.push(parse_module(parser, item_start, item_visibility)?);
            }
            TokenKind::Import if !written => {
                items.push(parse_import(parser)?);
            }
            TokenKind::Class if !modifiers.is_async && !modifiers.csig && !modifiers.is_static => {
                items.push(parse_class(parser, item_start, item_visibility, modifiers)?);
            }
            TokenKind::Func if !modifiers.typed && !modifiers.iface => {
                items.push(parse_function(parser, item_start, item_visibility, modifiers)?);
            }
            TokenKind::Less if !modifiers.typed && !modifiers.iface => {
                items.push(parse_lambda(parser, item_start, item_visibility, modifiers)?);
                eat_semicolons(parser);
            }
            TokenKind::Identifier
                if !modifiers.typed
                    && !modifiers.virt
                    && !modifiers.iface
                    && !modifiers.is_async
                    && !modifiers.pure =>
            {
                items.push(parse_var_decl(
                    parser,
                    item_visibility,
                    modifiers,
                    VarDeclOptions::member(),
                )?);
            }
            TokenKind::CloseCurly => {
                if written {
                    parser.unexpected(MODULE_ITEM_EXPECTING);
                }
                break;
            }
            TokenKind::EOF => {
                parser.restore(state);
                break;
            }
            _ => {
                parser.unexpected(MODULE_ITEM_EXPECTING);
                parser.advance();
            }
        }
    }

    parser.expect(TokenKind::CloseCurly, "'}'")?;
    eat_semicolons(parser);

    Some(parser.finish(
        start,
        NodeKind::Module(ModuleDecl {
            name,
            visibility,
            items,
        }),
    ))
}

pub fn parse_class(parser: &mut Parser, start: Position, visibility: Visibility, modifiers: Modifiers) -> Option<Node> {
    parser.expect(TokenKind::Class, "'class'")?;
    let name = parser.expect(TokenKind::Identifier, "class name")?.value;

    let mut generics = vec![];
    if parser.eat(TokenKind::Less).is_some() {
        loop {
            generics.push(parser.expect(TokenKind::Identifier, "generic parameter")?.value);
            if parser.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        parser.expect(TokenKind::Greater, "'>'")?;
    }

    let mut parents = vec![];
    if parser.eat(TokenKind::Colon).is_some() {
        loop {
            parents.push(parse_type(parser, false)?);
            if parser.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
    }

    parser.expect(TokenKind::OpenCurly, "'{'")?;

    let mut members = vec![];
    loop {
        let state = parser.save();
        let member_start = parser.get_position();
        let prefix = parse_modifiers(parser);
        let written = prefix.is_written();
        let ModifierPrefix {
            visibility: member_visibility,
            modifiers: member_modifiers,
        } = prefix;

        match parser.current_token_kind() {
            TokenKind::Func if !member_modifiers.typed && !member_modifiers.iface => {
                members.push(parse_function(parser, member_start, member_visibility, member_modifiers)?);
            }
            TokenKind::Less if !member_modifiers.typed && !member_modifiers.iface => {
                members.push(parse_lambda(parser, member_start, member_visibility, member_modifiers)?);
                eat_semicolons(parser);
            }
            TokenKind::Identifier
                if !member_modifiers.virt
                    && !member_modifiers.is_async
                    && !member_modifiers.pure
                    && !member_modifiers.typed
                    && !member_modifiers.iface =>
            {
                members.push(parse_var_decl(
                    parser,
                    member_visibility,
                    member_modifiers,
                    VarDeclOptions::member(),
                )?);
            }
            TokenKind::CloseCurly => {
                if written {
                    parser.unexpected(CLASS_MEMBER_EXPECTING);
                }
                break;
            }
            TokenKind::EOF => {
                parser.restore(state);
                break;
            }
            _ => {
                parser.unexpected(CLASS_MEMBER_EXPECTING);
                parser.advance();
            }
        }
    }

    parser.expect(TokenKind::CloseCurly, "'}'")?;
    eat_semicolons(parser);

    Some(parser.finish(
        start,
        NodeKind::Class(ClassDecl {
            name,
            visibility,
            modifiers,
            generics,
            parents,
            members,
        }),
    ))
}

fn parse_parameters(
    parser: &mut Parser,
    close: TokenKind,
    expecting: &str,
    options: VarDeclOptions,
) -> Option<Vec<Node>> {
    let mut params = vec![];
    if parser.eat(close).is_some() {
        return Some(params);
    }

    loop {
        params.push(parse_var_decl(
            parser,
            Visibility::None,
            Modifiers::default(),
            options,
        )?);
        if parser.eat(TokenKind::Comma).is_none() {
            break;
        }
    }

    parser.expect(close, expecting)?;
    Some(params)
}

/// `func ReturnType [name](params) body`
pub fn parse_function(parser: &mut Parser, start: Position, visibility: Visibility, modifiers: Modifiers) -> Option<Node> {
    parser.expect(TokenKind::Func, "'func'")?;
    let return_type = parse_type(parser, false)?;
    let name = parser.eat(TokenKind::Identifier).map(|token| token.value);

    parser.expect(TokenKind::OpenParen, "'('")?;
    let params = parse_parameters(parser, TokenKind::CloseParen, "')'", VarDeclOptions::parameter())?;
    let body = parse_statement(parser)?;

    Some(parser.finish(
        start,
        NodeKind::Function(FunctionDecl {
            name,
            visibility,
            modifiers,
            lambda: false,
            return_type: Box::new(return_type),
            params,
            body: Box::new(body),
        }),
    ))
}

/// `<params> ReturnType => body`
pub fn parse_lambda(parser: &mut Parser, start: Position, visibility: Visibility, modifiers: Modifiers) -> Option<Node> {
    parser.expect(TokenKind::Less, "'<'")?;
    let params = parse_parameters(parser, TokenKind::Greater, "'>'", VarDeclOptions::lambda_parameter())?;
    let return_type = parse_type(parser, false)?;
    parser.expect(TokenKind::Arrow, "'=>'")?;
    let body = parse_statement(parser)?;

    Some(parser.finish(
        start,
        NodeKind::Function(FunctionDecl {
            name: None,
            visibility,
            modifiers,
            lambda: true,
            return_type: Box::new(return_type),
            params,
            body: Box::new(body),
        }),
    ))
}

/// `Type name [= init | (args)]`
pub fn parse_var_decl(
    parser: &mut Parser,
    visibility: Visibility,
    modifiers: Modifiers,
    options: VarDeclOptions,
) -> Option<Node> {
    let start = parser.get_position();
    let ty = parse_type(parser, options.allow_variadic)?;
    let name = parser.expect(TokenKind::Identifier, "identifier")?.value;

    let variadic = ty.as_type().map(|ty| ty.variadic).unwrap_or(false);
    let mut init = None;
    let mut ctor_args = None;

    if options.allow_init && !variadic {
        if parser.eat(TokenKind::Assignment).is_some() {
            let value = if options.init_below_relational {
                parse_shift(parser)?
            } else {
                parse_assignment(parser)?
            };
            init = Some(Box::new(value));
        } else if parser.eat(TokenKind::OpenParen).is_some() {
            let args = parse_arguments(parser, TokenKind::CloseParen)?;
            parser.expect(TokenKind::CloseParen, "')'")?;
            ctor_args = Some(args);
        }
    }

    let node = parser.finish(
        start,
        NodeKind::VarDecl(VarDecl {
            name,
            visibility,
            modifiers,
            ty: Box::new(ty),
            init,
            ctor_args,
        }),
    );

    if options.eat_semicolons {
        eat_semicolons(parser);
    }

    Some(node)
}

/// `import a.b.c;` or `import "a.b.c";`. The target is kept as written and
/// checked when imports are resolved.
pub fn parse_import(parser: &mut Parser) -> Option<Node> {
    let start = parser.get_position();
    parser.expect(TokenKind::Import, "'import'")?;
    let target = parse_postfix(parser)?;
    let node = parser.finish(start, NodeKind::Import(Box::new(target)));
    eat_semicolons(parser);
    Some(node)
}
