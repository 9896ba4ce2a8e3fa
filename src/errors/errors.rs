use std::fmt::Display;

use thiserror::Error;

use crate::{ast::ast::NodeId, Position};

/// Which stage of the front end raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDomain {
    Lexical,
    Parse,
    Semantic,
}

#[derive(Debug, Clone)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
    node: Option<NodeId>,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
            node: None,
        }
    }

    /// Attaches the id of the AST node the error was found on.
    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn get_impl(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn get_domain(&self) -> ErrorDomain {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => ErrorDomain::Lexical,
            ErrorImpl::UnexpectedToken { .. } => ErrorDomain::Parse,
            _ => ErrorDomain::Semantic,
        }
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => "UnrecognisedToken",
            ErrorImpl::UnexpectedToken { .. } => "UnexpectedToken",
            ErrorImpl::TypeNotFound { .. } => "TypeNotFound",
            ErrorImpl::ExpectedGenerics { .. } => "ExpectedGenerics",
            ErrorImpl::UnexpectedGenerics { .. } => "UnexpectedGenerics",
            ErrorImpl::GenericArityMismatch { .. } => "GenericArityMismatch",
            ErrorImpl::VariableAlreadyDeclared { .. } => "VariableAlreadyDeclared",
            ErrorImpl::FunctionAlreadyDeclared { .. } => "FunctionAlreadyDeclared",
            ErrorImpl::ClassAlreadyDeclared { .. } => "ClassAlreadyDeclared",
            ErrorImpl::UnexpectedIdentifier { .. } => "UnexpectedIdentifier",
            ErrorImpl::ModuleNotFound { .. } => "ModuleNotFound",
            ErrorImpl::ModuleIsPrivate { .. } => "ModuleIsPrivate",
            ErrorImpl::ConflictingModuleDeclaration { .. } => "ConflictingModuleDeclaration",
            ErrorImpl::IllegalModuleItem { .. } => "IllegalModuleItem",
            ErrorImpl::IllegalImport => "IllegalImport",
            ErrorImpl::UnexpectedArguments { .. } => "UnexpectedArguments",
            ErrorImpl::MissingArguments { .. } => "MissingArguments",
            ErrorImpl::IllegalOperation { .. } => "IllegalOperation",
            ErrorImpl::NotMutable { .. } => "NotMutable",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => ErrorTip::None,
            ErrorImpl::UnexpectedToken { token, expecting } => ErrorTip::Suggestion(format!(
                "Unexpected token: `{}`, expecting {}",
                token, expecting
            )),
            ErrorImpl::TypeNotFound { name } => {
                ErrorTip::Suggestion(format!("Type `{}` is not declared or imported", name))
            }
            ErrorImpl::ExpectedGenerics { name } => ErrorTip::Suggestion(format!(
                "Type `{}` is generic, supply its type arguments",
                name
            )),
            ErrorImpl::UnexpectedGenerics { name } => ErrorTip::Suggestion(format!(
                "Type `{}` takes no type arguments",
                name
            )),
            ErrorImpl::GenericArityMismatch {
                name,
                expected,
                found,
            } => ErrorTip::Suggestion(format!(
                "Type `{}` expects {} type arguments, found {}",
                name, expected, found
            )),
            ErrorImpl::VariableAlreadyDeclared { variable } => {
                ErrorTip::Suggestion(format!("Variable `{}` already declared", variable))
            }
            ErrorImpl::FunctionAlreadyDeclared { function } => {
                ErrorTip::Suggestion(format!("Function `{}` already declared", function))
            }
            ErrorImpl::ClassAlreadyDeclared { class } => {
                ErrorTip::Suggestion(format!("Class `{}` already declared", class))
            }
            ErrorImpl::UnexpectedIdentifier { identifier } => {
                ErrorTip::Suggestion(format!("`{}` is not declared in this scope", identifier))
            }
            ErrorImpl::ModuleNotFound { path } => {
                ErrorTip::Suggestion(format!("No module found at `{}`", path))
            }
            ErrorImpl::ModuleIsPrivate { module } => ErrorTip::Suggestion(format!(
                "Module `{}` must be `pub` to be imported from another module tree",
                module
            )),
            ErrorImpl::ConflictingModuleDeclaration { module } => ErrorTip::Suggestion(format!(
                "Module `{}` is reopened with a different visibility",
                module
            )),
            ErrorImpl::IllegalModuleItem { item } => ErrorTip::Suggestion(format!(
                "`{}` cannot be declared directly in a module or class",
                item
            )),
            ErrorImpl::IllegalImport => ErrorTip::Suggestion(String::from(
                "Imports take a dotted module path or a string",
            )),
            ErrorImpl::UnexpectedArguments { expected, received } => ErrorTip::Suggestion(
                format!("Expected at most {} arguments, received {}", expected, received),
            ),
            ErrorImpl::MissingArguments { expected, received } => ErrorTip::Suggestion(format!(
                "Expected at least {} arguments, received {}",
                expected, received
            )),
            ErrorImpl::IllegalOperation { message } => ErrorTip::Suggestion(message.clone()),
            ErrorImpl::NotMutable { target } => {
                ErrorTip::Suggestion(format!("`{}` cannot be assigned to", target))
            }
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.position, self.internal_error)
    }
}

impl std::error::Error for Error {}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorImpl {
    #[error("unrecognised token: {token:?}")]
    UnrecognisedToken { token: String },
    #[error("unexpected token {token:?}, expecting {expecting}")]
    UnexpectedToken { token: String, expecting: String },
    #[error("type {name:?} not found")]
    TypeNotFound { name: String },
    #[error("type {name:?} expects generic arguments")]
    ExpectedGenerics { name: String },
    #[error("type {name:?} does not take generic arguments")]
    UnexpectedGenerics { name: String },
    #[error("type {name:?} expects {expected} generic arguments, found {found}")]
    GenericArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("variable {variable:?} already declared")]
    VariableAlreadyDeclared { variable: String },
    #[error("function {function:?} already declared")]
    FunctionAlreadyDeclared { function: String },
    #[error("class {class:?} already declared")]
    ClassAlreadyDeclared { class: String },
    #[error("unexpected identifier {identifier:?}")]
    UnexpectedIdentifier { identifier: String },
    #[error("module {path:?} not found")]
    ModuleNotFound { path: String },
    #[error("module {module:?} is private")]
    ModuleIsPrivate { module: String },
    #[error("conflicting declaration of module {module:?}")]
    ConflictingModuleDeclaration { module: String },
    #[error("illegal module item: {item}")]
    IllegalModuleItem { item: String },
    #[error("illegal import")]
    IllegalImport,
    #[error("unexpected arguments: expected {expected:?}, received {received:?}")]
    UnexpectedArguments { expected: usize, received: usize },
    #[error("missing arguments: expected {expected:?}, received {received:?}")]
    MissingArguments { expected: usize, received: usize },
    #[error("illegal operation: {message}")]
    IllegalOperation { message: String },
    #[error("{target:?} is not mutable")]
    NotMutable { target: String },
}
