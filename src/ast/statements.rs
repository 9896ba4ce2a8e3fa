use std::fmt::Display;

use super::ast::Node;

/// Declared visibility. Ordered from least to most visible, with `None`
/// meaning no modifier was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Visibility {
    #[default]
    None,
    Private,
    Protected,
    Public,
}

impl Visibility {
    /// Visibility of an item nested in a container. A container without a
    /// modifier imposes nothing; otherwise the narrower of the two wins.
    pub fn within(self, container: Visibility) -> Visibility {
        if container == Visibility::None {
            self
        } else {
            self.min(container)
        }
    }

    /// Visible outside the declaring module.
    pub fn is_external(self) -> bool {
        matches!(self, Visibility::None | Visibility::Public)
    }
}

impl Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Visibility::None => "none",
            Visibility::Private => "priv",
            Visibility::Protected => "prot",
            Visibility::Public => "pub",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub typed: bool,
    pub synch: bool,
    pub virt: bool,
    pub iface: bool,
    pub is_static: bool,
    pub pure: bool,
    pub is_async: bool,
    pub csig: bool,
}

impl Modifiers {
    pub fn is_empty(&self) -> bool {
        *self == Modifiers::default()
    }

    pub fn names(&self) -> Vec<&'static str> {
        let flags = [
            (self.typed, "typed"),
            (self.synch, "synch"),
            (self.virt, "virt"),
            (self.iface, "iface"),
            (self.is_static, "static"),
            (self.pure, "pure"),
            (self.is_async, "async"),
            (self.csig, "csig"),
        ];

        flags
            .iter()
            .filter(|(set, _)| *set)
            .map(|(_, name)| *name)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ModuleDecl {
    pub name: String,
    pub visibility: Visibility,
    pub items: Vec<Node>,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub visibility: Visibility,
    pub modifiers: Modifiers,
    pub generics: Vec<String>,
    /// `Type` nodes named after the `:`.
    pub parents: Vec<Node>,
    pub members: Vec<Node>,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    /// `None` for lambdas and anonymous `func` literals.
    pub name: Option<String>,
    pub visibility: Visibility,
    pub modifiers: Modifiers,
    pub lambda: bool,
    pub return_type: Box<Node>,
    /// `VarDecl` nodes, in declaration order.
    pub params: Vec<Node>,
    pub body: Box<Node>,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: String,
    pub visibility: Visibility,
    pub modifiers: Modifiers,
    pub ty: Box<Node>,
    pub init: Option<Box<Node>>,
    /// Arguments of the `Type name(a, b)` constructor form.
    pub ctor_args: Option<Vec<Node>>,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub variable: Box<Node>,
    pub handler: Box<Node>,
}
