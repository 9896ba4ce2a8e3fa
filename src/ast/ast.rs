use std::{fmt::Display, rc::Rc};

use crate::{program::program::ProgramNode, Span};

use super::{
    expressions::{BinaryOp, UnaryOp},
    statements::{CatchClause, ClassDecl, FunctionDecl, ModuleDecl, VarDecl},
    types::TypeRef,
};

/// Per-file node identifier, assigned by the parser in construction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub span: Span,
    pub kind: NodeKind,
    /// Filled in once the program tree has been resolved.
    pub resolved: Option<ProgramNode>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    File {
        path: Rc<String>,
        modules: Vec<Node>,
    },
    Body(Vec<Node>),
    Module(ModuleDecl),
    Class(ClassDecl),
    Function(FunctionDecl),
    UnaryPostfix {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
    },
    Member {
        object: Box<Node>,
        member: String,
    },
    ComputedMember {
        object: Box<Node>,
        index: Box<Node>,
    },
    Cast {
        target: Box<Node>,
        operand: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    VarDecl(VarDecl),
    Type(TypeRef),
    IntegerLit(u64),
    DecimalLit(f64),
    StringLit(String),
    CharLit(String),
    Identifier(String),
    Ternary {
        condition: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Box<Node>,
    },
    If {
        condition: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Option<Box<Node>>,
    },
    For {
        init: Box<Node>,
        condition: Box<Node>,
        step: Box<Node>,
        body: Box<Node>,
    },
    ForEach {
        variable: Box<Node>,
        iterable: Box<Node>,
        body: Box<Node>,
    },
    While {
        condition: Box<Node>,
        body: Box<Node>,
    },
    Switch {
        subject: Box<Node>,
        cases: Vec<Node>,
    },
    Case {
        value: Box<Node>,
        body: Box<Node>,
    },
    DefaultCase {
        body: Box<Node>,
    },
    Goto(String),
    Return(Option<Box<Node>>),
    Continue,
    Break,
    Try {
        body: Box<Node>,
        catch: Option<CatchClause>,
        finally: Option<Box<Node>>,
    },
    Throw(Box<Node>),
    New(Box<Node>),
    Label(String),
    Empty,
    Import(Box<Node>),
    ArrayLiteral(Vec<Node>),
    Null,
}

impl Node {
    pub fn new(id: NodeId, span: Span, kind: NodeKind) -> Self {
        Node {
            id,
            span,
            kind,
            resolved: None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::File { .. } => "File",
            NodeKind::Body(_) => "Body",
            NodeKind::Module(_) => "Module",
            NodeKind::Class(_) => "Class",
            NodeKind::Function(_) => "Function",
            NodeKind::UnaryPostfix { .. } => "UnaryPostfix",
            NodeKind::Unary { .. } => "Unary",
            NodeKind::Call { .. } => "Call",
            NodeKind::Member { .. } => "Member",
            NodeKind::ComputedMember { .. } => "ComputedMember",
            NodeKind::Cast { .. } => "Cast",
            NodeKind::Binary { .. } => "Binary",
            NodeKind::VarDecl(_) => "VarDecl",
            NodeKind::Type(_) => "Type",
            NodeKind::IntegerLit(_) => "IntegerLit",
            NodeKind::DecimalLit(_) => "DecimalLit",
            NodeKind::StringLit(_) => "StringLit",
            NodeKind::CharLit(_) => "CharLit",
            NodeKind::Identifier(_) => "Identifier",
            NodeKind::Ternary { .. } => "Ternary",
            NodeKind::If { .. } => "If",
            NodeKind::For { .. } => "For",
            NodeKind::ForEach { .. } => "ForEach",
            NodeKind::While { .. } => "While",
            NodeKind::Switch { .. } => "Switch",
            NodeKind::Case { .. } => "Case",
            NodeKind::DefaultCase { .. } => "DefaultCase",
            NodeKind::Goto(_) => "Goto",
            NodeKind::Return(_) => "Return",
            NodeKind::Continue => "Continue",
            NodeKind::Break => "Break",
            NodeKind::Try { .. } => "Try",
            NodeKind::Throw(_) => "Throw",
            NodeKind::New(_) => "New",
            NodeKind::Label(_) => "Label",
            NodeKind::Empty => "Empty",
            NodeKind::Import(_) => "Import",
            NodeKind::ArrayLiteral(_) => "ArrayLiteral",
            NodeKind::Null => "Null",
        }
    }

    /// Kind-specific fields worth printing in a dump, as `key = value` pairs.
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        match &self.kind {
            NodeKind::File { path, modules } => {
                vec![("path", path.to_string()), ("module#", modules.len().to_string())]
            }
            NodeKind::Body(children) => vec![("expr#", children.len().to_string())],
            NodeKind::Module(module) => vec![
                ("name", module.name.clone()),
                ("visibility", module.visibility.to_string()),
                ("item#", module.items.len().to_string()),
            ],
            NodeKind::Class(class) => vec![
                ("name", class.name.clone()),
                ("visibility", class.visibility.to_string()),
                ("modifiers", class.modifiers.names().join(" ")),
                ("generic#", class.generics.len().to_string()),
                ("extends#", class.parents.len().to_string()),
            ],
            NodeKind::Function(function) => vec![
                ("name", function.name.clone().unwrap_or_else(|| String::from("<anonymous>"))),
                ("visibility", function.visibility.to_string()),
                ("modifiers", function.modifiers.names().join(" ")),
                ("arg#", function.params.len().to_string()),
            ],
            NodeKind::UnaryPostfix { op, .. } | NodeKind::Unary { op, .. } => {
                vec![("op", op.to_string())]
            }
            NodeKind::Call { args, .. } => vec![("arg#", args.len().to_string())],
            NodeKind::Member { member, .. } => vec![("member", member.clone())],
            NodeKind::Binary { op, .. } => vec![("op", op.to_string())],
            NodeKind::VarDecl(var) => vec![
                ("name", var.name.clone()),
                ("visibility", var.visibility.to_string()),
                ("modifiers", var.modifiers.names().join(" ")),
            ],
            NodeKind::Type(ty) => vec![
                ("name", ty.name.clone()),
                ("ptr#", ty.indirection.len().to_string()),
                ("generic#", ty.generics.len().to_string()),
                ("variadic", ty.variadic.to_string()),
            ],
            NodeKind::IntegerLit(value) => vec![("int", value.to_string())],
            NodeKind::DecimalLit(value) => vec![("double", value.to_string())],
            NodeKind::StringLit(value) => vec![("string", format!("{:?}", value))],
            NodeKind::CharLit(value) => vec![("char", format!("'{}'", value))],
            NodeKind::Identifier(name) => vec![("ident", name.clone())],
            NodeKind::Switch { cases, .. } => vec![("case#", cases.len().to_string())],
            NodeKind::Goto(label) | NodeKind::Label(label) => vec![("label", label.clone())],
            NodeKind::Return(value) => vec![("has ret", value.is_some().to_string())],
            NodeKind::ArrayLiteral(items) => vec![("item#", items.len().to_string())],
            _ => vec![],
        }
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<&Node> {
        let mut out: Vec<&Node> = vec![];
        match &self.kind {
            NodeKind::File { modules, .. } => out.extend(modules.iter()),
            NodeKind::Body(children) | NodeKind::ArrayLiteral(children) => out.extend(children.iter()),
            NodeKind::Module(module) => out.extend(module.items.iter()),
            NodeKind::Class(class) => {
                out.extend(class.parents.iter());
                out.extend(class.members.iter());
            }
            NodeKind::Function(function) => {
                out.push(&function.return_type);
                out.extend(function.params.iter());
                out.push(&function.body);
            }
            NodeKind::UnaryPostfix { operand, .. } | NodeKind::Unary { operand, .. } => out.push(operand),
            NodeKind::Call { callee, args } => {
                out.push(callee);
                out.extend(args.iter());
            }
            NodeKind::Member { object, .. } => out.push(object),
            NodeKind::ComputedMember { object, index } => {
                out.push(object);
                out.push(index);
            }
            NodeKind::Cast { target, operand } => {
                out.push(target);
                out.push(operand);
            }
            NodeKind::Binary { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            NodeKind::VarDecl(var) => {
                out.push(&var.ty);
                if let Some(init) = &var.init {
                    out.push(init);
                }
                if let Some(args) = &var.ctor_args {
                    out.extend(args.iter());
                }
            }
            NodeKind::Type(ty) => out.extend(ty.generics.iter()),
            NodeKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                out.push(condition);
                out.push(then_branch);
                out.push(else_branch);
            }
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                out.push(condition);
                out.push(then_branch);
                if let Some(else_branch) = else_branch {
                    out.push(else_branch);
                }
            }
            NodeKind::For {
                init,
                condition,
                step,
                body,
            } => {
                out.push(init);
                out.push(condition);
                out.push(step);
                out.push(body);
            }
            NodeKind::ForEach {
                variable,
                iterable,
                body,
            } => {
                out.push(variable);
                out.push(iterable);
                out.push(body);
            }
            NodeKind::While { condition, body } => {
                out.push(condition);
                out.push(body);
            }
            NodeKind::Switch { subject, cases } => {
                out.push(subject);
                out.extend(cases.iter());
            }
            NodeKind::Case { value, body } => {
                out.push(value);
                out.push(body);
            }
            NodeKind::DefaultCase { body } => out.push(body),
            NodeKind::Return(value) => {
                if let Some(value) = value {
                    out.push(value);
                }
            }
            NodeKind::Try {
                body,
                catch,
                finally,
            } => {
                out.push(body);
                if let Some(catch) = catch {
                    out.push(&catch.variable);
                    out.push(&catch.handler);
                }
                if let Some(finally) = finally {
                    out.push(finally);
                }
            }
            NodeKind::Throw(value) | NodeKind::New(value) | NodeKind::Import(value) => out.push(value),
            NodeKind::IntegerLit(_)
            | NodeKind::DecimalLit(_)
            | NodeKind::StringLit(_)
            | NodeKind::CharLit(_)
            | NodeKind::Identifier(_)
            | NodeKind::Goto(_)
            | NodeKind::Continue
            | NodeKind::Break
            | NodeKind::Label(_)
            | NodeKind::Empty
            | NodeKind::Null => {}
        }
        out
    }

    /// Mutable direct children, in the same order as [`Node::children`].
    pub fn children_mut(&mut self) -> Vec<&mut Node> {
        let mut out: Vec<&mut Node> = vec![];
        match &mut self.kind {
            NodeKind::File { modules, .. } => out.extend(modules.iter_mut()),
            NodeKind::Body(children) | NodeKind::ArrayLiteral(children) => out.extend(children.iter_mut()),
            NodeKind::Module(module) => out.extend(module.items.iter_mut()),
            NodeKind::Class(class) => {
                out.extend(class.parents.iter_mut());
                out.extend(class.members.iter_mut());
            }
            NodeKind::Function(function) => {
                out.push(&mut function.return_type);
                out.extend(function.params.iter_mut());
                out.push(&mut function.body);
            }
            NodeKind::UnaryPostfix { operand, .. } | NodeKind::Unary { operand, .. } => out.push(operand),
            NodeKind::Call { callee, args } => {
                out.push(callee);
                out.extend(args.iter_mut());
            }
            NodeKind::Member { object, .. } => out.push(object),
            NodeKind::ComputedMember { object, index } => {
                out.push(object);
                out.push(index);
            }
            NodeKind::Cast { target, operand } => {
                out.push(target);
                out.push(operand);
            }
            NodeKind::Binary { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            NodeKind::VarDecl(var) => {
                out.push(&mut var.ty);
                if let Some(init) = &mut var.init {
                    out.push(init);
                }
                if let Some(args) = &mut var.ctor_args {
                    out.extend(args.iter_mut());
                }
            }
            NodeKind::Type(ty) => out.extend(ty.generics.iter_mut()),
            NodeKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                out.push(condition);
                out.push(then_branch);
                out.push(else_branch);
            }
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                out.push(condition);
                out.push(then_branch);
                if let Some(else_branch) = else_branch {
                    out.push(else_branch);
                }
            }
            NodeKind::For {
                init,
                condition,
                step,
                body,
            } => {
                out.push(init);
                out.push(condition);
                out.push(step);
                out.push(body);
            }
            NodeKind::ForEach {
                variable,
                iterable,
                body,
            } => {
                out.push(variable);
                out.push(iterable);
                out.push(body);
            }
            NodeKind::While { condition, body } => {
                out.push(condition);
                out.push(body);
            }
            NodeKind::Switch { subject, cases } => {
                out.push(subject);
                out.extend(cases.iter_mut());
            }
            NodeKind::Case { value, body } => {
                out.push(value);
                out.push(body);
            }
            NodeKind::DefaultCase { body } => out.push(body),
            NodeKind::Return(value) => {
                if let Some(value) = value {
                    out.push(value);
                }
            }
            NodeKind::Try {
                body,
                catch,
                finally,
            } => {
                out.push(body);
                if let Some(catch) = catch {
                    out.push(&mut catch.variable);
                    out.push(&mut catch.handler);
                }
                if let Some(finally) = finally {
                    out.push(finally);
                }
            }
            NodeKind::Throw(value) | NodeKind::New(value) | NodeKind::Import(value) => out.push(value),
            NodeKind::IntegerLit(_)
            | NodeKind::DecimalLit(_)
            | NodeKind::StringLit(_)
            | NodeKind::CharLit(_)
            | NodeKind::Identifier(_)
            | NodeKind::Goto(_)
            | NodeKind::Continue
            | NodeKind::Break
            | NodeKind::Label(_)
            | NodeKind::Empty
            | NodeKind::Null => {}
        }
        out
    }

    /// Visits this node and every descendant, parents first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Node)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    pub fn walk_mut(&mut self, visit: &mut dyn FnMut(&mut Node)) {
        visit(self);
        for child in self.children_mut() {
            child.walk_mut(visit);
        }
    }

    /// Finds the node with the given id in this subtree.
    pub fn find(&self, id: NodeId) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children().into_iter().find_map(|child| child.find(id))
    }

    pub fn as_type(&self) -> Option<&TypeRef> {
        match &self.kind {
            NodeKind::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// Indented tree dump, one node per header line followed by its fields.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, 0);
        out
    }

    fn dump_into(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        out.push_str(&format!(
            "{}{}<{}>-{}<{}> {} {}:\n",
            indent,
            self.span.start.line,
            self.span.start.column,
            self.span.end.line,
            self.span.end.column,
            self.kind_name(),
            self.id
        ));
        for (key, value) in self.describe() {
            out.push_str(&format!("{}  {} = {}\n", indent, key, value));
        }
        if let Some(resolved) = &self.resolved {
            out.push_str(&format!("{}  resolved = {:?}\n", indent, resolved));
        }
        for child in self.children() {
            child.dump_into(out, depth + 1);
        }
    }
}
