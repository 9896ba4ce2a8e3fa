//! The resolved program: modules, classes, functions, variables and types
//! stored in arenas and addressed by typed ids.

use std::fmt::{Display, Write};

use rustc_hash::FxHashMap;

use crate::{
    ast::{
        ast::{Node, NodeId},
        statements::{Modifiers, Visibility},
        types::Indirection,
    },
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::scope::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub usize);

/// A node in one of the parsed files. Node ids are only unique per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub file: usize,
    pub node: NodeId,
}

impl NodeKey {
    pub fn new(file: usize, node: NodeId) -> Self {
        NodeKey { file, node }
    }
}

/// Name table that iterates in insertion order.
#[derive(Debug, Clone)]
pub struct SymbolTable<T> {
    entries: Vec<(String, T)>,
    index: FxHashMap<String, usize>,
}

impl<T> Default for SymbolTable<T> {
    fn default() -> Self {
        SymbolTable {
            entries: vec![],
            index: FxHashMap::default(),
        }
    }
}

impl<T> SymbolTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Inserts or replaces, keeping the entry's position on replace.
    pub fn insert(&mut self, name: String, value: T) -> Option<T> {
        match self.index.get(&name) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Inserts unless the name is taken. Returns whether it was inserted.
    pub fn insert_if_absent(&mut self, name: String, value: T) -> bool {
        if self.contains(&name) {
            return false;
        }
        self.insert(name, value);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Void,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    Float,
    Double,
}

impl PrimitiveType {
    /// Primitive named by a type reference. Names match case-insensitively,
    /// and each width has a short, a sized and a long spelling.
    pub fn from_name(name: &str) -> Option<PrimitiveType> {
        let lower = name.to_ascii_lowercase();
        let primitive = match lower.as_str() {
            "v" | "void" => PrimitiveType::Void,
            "u8" | "b" | "byte" | "c" | "char" => PrimitiveType::U8,
            "i8" => PrimitiveType::I8,
            "u16" | "ush" | "ushort" => PrimitiveType::U16,
            "i16" | "sh" | "short" => PrimitiveType::I16,
            "u32" | "u" | "uint" => PrimitiveType::U32,
            "i32" | "i" | "int" => PrimitiveType::I32,
            "u64" | "ul" | "ulong" => PrimitiveType::U64,
            "i64" | "l" | "long" => PrimitiveType::I64,
            "f" | "float" => PrimitiveType::Float,
            "d" | "double" => PrimitiveType::Double,
            _ => return None,
        };
        Some(primitive)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Unknown,
    Primitive(PrimitiveType),
    Class(ClassId),
    Function { return_type: TypeId, params: Vec<TypeId> },
}

/// The entity that declares something, and whose generic parameters and
/// type table a type reference is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    Module(ModuleId),
    Class(ClassId),
    Function(FunctionId),
}

#[derive(Debug, Clone)]
pub struct ProgramType {
    pub name: String,
    pub kind: TypeKind,
    pub indirection: Vec<Indirection>,
    pub variadic: bool,
    pub generics: Vec<TypeId>,
    /// Written with angle brackets, possibly empty.
    pub generic_list: bool,
    /// Declaring definition: a class's own type or a generic parameter.
    pub is_master: bool,
    pub master: Option<TypeId>,
    /// Set once mastering has been attempted, whatever the outcome.
    pub checked: bool,
    pub owner: Owner,
    /// Skip the enclosing class's generic parameters when mastering.
    pub skip_class_generics: bool,
    pub node: Option<NodeKey>,
    pub position: Position,
}

/// A resolved module import, or the reason the written path is not one.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    /// `None` when the import target is not a dotted name or string.
    pub path: Option<String>,
    pub node: NodeKey,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub visibility: Visibility,
    pub parent: Option<ModuleId>,
    pub submodules: SymbolTable<ModuleId>,
    pub classes: SymbolTable<ClassId>,
    pub functions: SymbolTable<FunctionId>,
    pub variables: SymbolTable<VariableId>,
    /// Own classes first, then types made visible by imports.
    pub types: SymbolTable<TypeId>,
    pub import_requests: Vec<ImportRequest>,
    /// Every module visible from this one, deduplicated.
    pub imports: Vec<ModuleId>,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct Class {
    pub name: String,
    pub visibility: Visibility,
    pub modifiers: Modifiers,
    pub module: ModuleId,
    pub generics: SymbolTable<TypeId>,
    pub master_type: TypeId,
    pub parents: Vec<TypeId>,
    pub variables: SymbolTable<VariableId>,
    pub functions: SymbolTable<FunctionId>,
    pub node: NodeKey,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: Option<String>,
    pub owner: Owner,
    pub visibility: Visibility,
    pub modifiers: Modifiers,
    pub lambda: bool,
    pub params: Vec<VariableId>,
    pub return_type: TypeId,
    pub signature: TypeId,
    /// Function literals written directly inside this one.
    pub closures: Vec<FunctionId>,
    /// Variables of enclosing functions referenced from in here.
    pub captures: Vec<VariableId>,
    /// The constant variable a named function is reachable through.
    pub implicit: Option<VariableId>,
    pub node: NodeKey,
    pub position: Position,
}

impl Function {
    /// Accepted argument counts as `(minimum, maximum)`, with no maximum
    /// when the last parameter is variadic.
    pub fn arity(&self, state: &ProgramState) -> (usize, Option<usize>) {
        let mut minimum = 0;
        let mut variadic = false;
        for &param in &self.params {
            let variable = state.variable(param);
            if state.ty(variable.ty).variadic {
                variadic = true;
            } else if !variable.has_default {
                minimum += 1;
            }
        }

        let maximum = if variadic { None } else { Some(self.params.len()) };
        (minimum, maximum)
    }
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub owner: Owner,
    pub visibility: Visibility,
    pub modifiers: Modifiers,
    pub ty: TypeId,
    pub constant: bool,
    pub has_default: bool,
    /// The function this is the implicit constant of.
    pub function: Option<FunctionId>,
    pub node: Option<NodeKey>,
    pub position: Position,
}

/// What an AST node resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramNode {
    Module(ModuleId),
    Class(ClassId),
    Function(FunctionId),
    /// A module, class or parameter declaration.
    Variable(VariableId),
    /// A declaration inside a function body.
    LocalDecl(VariableId),
    Type(TypeId),
    GlobalRef(VariableId),
    ClassRef(VariableId),
    ParamRef(VariableId),
    LocalRef(VariableId),
    CapturedRef(VariableId),
    ThisRef,
}

impl ProgramNode {
    /// The variable a reference or declaration names.
    pub fn variable(&self) -> Option<VariableId> {
        match *self {
            ProgramNode::Variable(id)
            | ProgramNode::LocalDecl(id)
            | ProgramNode::GlobalRef(id)
            | ProgramNode::ClassRef(id)
            | ProgramNode::ParamRef(id)
            | ProgramNode::LocalRef(id)
            | ProgramNode::CapturedRef(id) => Some(id),
            _ => None,
        }
    }
}

/// Output of the semantic pipeline.
pub struct ProgramState {
    /// The parsed files, with `resolved` filled in once the pipeline ends.
    pub files: Vec<Node>,
    pub roots: SymbolTable<ModuleId>,
    pub modules: Vec<Module>,
    pub classes: Vec<Class>,
    pub functions: Vec<Function>,
    pub variables: Vec<Variable>,
    pub types: Vec<ProgramType>,
    pub scopes: Vec<Scope>,
    pub node_map: FxHashMap<NodeKey, ProgramNode>,
    pub errors: Vec<Error>,
}

impl ProgramState {
    pub fn new(files: Vec<Node>) -> Self {
        ProgramState {
            files,
            roots: SymbolTable::new(),
            modules: vec![],
            classes: vec![],
            functions: vec![],
            variables: vec![],
            types: vec![],
            scopes: vec![],
            node_map: FxHashMap::default(),
            errors: vec![],
        }
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.0]
    }

    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.0]
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0]
    }

    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn ty(&self, id: TypeId) -> &ProgramType {
        &self.types[id.0]
    }

    pub fn add_module(&mut self, module: Module) -> ModuleId {
        self.modules.push(module);
        ModuleId(self.modules.len() - 1)
    }

    pub fn add_class(&mut self, class: Class) -> ClassId {
        self.classes.push(class);
        ClassId(self.classes.len() - 1)
    }

    pub fn add_function(&mut self, function: Function) -> FunctionId {
        self.functions.push(function);
        FunctionId(self.functions.len() - 1)
    }

    pub fn add_variable(&mut self, variable: Variable) -> VariableId {
        self.variables.push(variable);
        VariableId(self.variables.len() - 1)
    }

    pub fn add_type(&mut self, ty: ProgramType) -> TypeId {
        self.types.push(ty);
        TypeId(self.types.len() - 1)
    }

    pub fn add_scope(&mut self, scope: Scope) -> ScopeId {
        self.scopes.push(scope);
        ScopeId(self.scopes.len() - 1)
    }

    pub fn record(&mut self, key: NodeKey, resolved: ProgramNode) {
        self.node_map.insert(key, resolved);
    }

    pub fn resolution(&self, key: NodeKey) -> Option<ProgramNode> {
        self.node_map.get(&key).copied()
    }

    pub fn error(&mut self, error: ErrorImpl, position: Position, node: Option<NodeKey>) {
        tracing::debug!(error = %error, %position, "semantic error");
        let error = Error::new(error, position);
        self.errors.push(match node {
            Some(key) => error.with_node(key.node),
            None => error,
        });
    }

    /// Looks a module up by dotted path from the top-level modules.
    pub fn find_module(&self, path: &str) -> Option<ModuleId> {
        let mut segments = path.split('.');
        let mut current = *self.roots.get(segments.next()?)?;
        for segment in segments {
            current = *self.module(current).submodules.get(segment)?;
        }
        Some(current)
    }

    /// Dotted path of a module from its top-level ancestor.
    pub fn module_path(&self, id: ModuleId) -> String {
        let mut names = vec![self.module(id).name.as_str()];
        let mut current = self.module(id).parent;
        while let Some(parent) = current {
            names.push(self.module(parent).name.as_str());
            current = self.module(parent).parent;
        }
        names.reverse();
        names.join(".")
    }

    /// Top-level ancestor of a module.
    pub fn root_of(&self, id: ModuleId) -> ModuleId {
        let mut current = id;
        while let Some(parent) = self.module(current).parent {
            current = parent;
        }
        current
    }

    /// The module and innermost class an owner sits in.
    pub fn context_of(&self, owner: Owner) -> (ModuleId, Option<ClassId>) {
        match owner {
            Owner::Module(module) => (module, None),
            Owner::Class(class) => (self.class(class).module, Some(class)),
            Owner::Function(function) => self.context_of(self.function(function).owner),
        }
    }

    /// Finds the class a name resolves to in a module, through its own
    /// classes and the types made visible to it.
    pub fn find_class(&self, module: ModuleId, name: &str) -> Option<ClassId> {
        let ty = self.module(module).types.get(name)?;
        match self.ty(*ty).kind {
            TypeKind::Class(class) => Some(class),
            _ => None,
        }
    }

    /// Readable rendering of a type, using master names where resolved.
    pub fn type_name(&self, id: TypeId) -> String {
        let ty = self.ty(id);
        let mut out = match &ty.kind {
            TypeKind::Function { return_type, params } => {
                let params: Vec<String> = params.iter().map(|&p| self.type_name(p)).collect();
                format!("func {}({})", self.type_name(*return_type), params.join(", "))
            }
            _ => ty.name.clone(),
        };
        if ty.generic_list || !ty.generics.is_empty() {
            let generics: Vec<String> = ty.generics.iter().map(|&g| self.type_name(g)).collect();
            out.push_str(&format!("<{}>", generics.join(", ")));
        }
        for indirection in &ty.indirection {
            out.push_str(match indirection {
                Indirection::Array => "[]",
                Indirection::Pointer => "*",
            });
        }
        if ty.variadic {
            out.push_str("...");
        }
        out
    }

    /// Indented dump of the module forest.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for &root in self.roots.values() {
            self.dump_module(&mut out, root, 0);
        }
        out
    }

    fn dump_module(&self, out: &mut String, id: ModuleId, depth: usize) {
        let indent = "  ".repeat(depth);
        let module = self.module(id);
        let _ = writeln!(out, "{}module {} ({})", indent, module.name, module.visibility);

        if !module.imports.is_empty() {
            let imports: Vec<String> = module.imports.iter().map(|&m| self.module_path(m)).collect();
            let _ = writeln!(out, "{}  imports {}", indent, imports.join(", "));
        }
        for (name, &variable) in module.variables.iter() {
            if self.variable(variable).function.is_none() {
                let _ = writeln!(out, "{}  var {}: {}", indent, name, self.type_name(self.variable(variable).ty));
            }
        }
        for &function in module.functions.values() {
            self.dump_function(out, function, depth + 1);
        }
        for &class in module.classes.values() {
            let class = self.class(class);
            let _ = writeln!(
                out,
                "{}  class {} ({})",
                indent,
                self.type_name(class.master_type),
                class.visibility
            );
            for (name, &variable) in class.variables.iter() {
                if self.variable(variable).function.is_none() {
                    let _ = writeln!(out, "{}    var {}: {}", indent, name, self.type_name(self.variable(variable).ty));
                }
            }
            for &function in class.functions.values() {
                self.dump_function(out, function, depth + 2);
            }
        }
        for &submodule in module.submodules.values() {
            self.dump_module(out, submodule, depth + 1);
        }
    }

    fn dump_function(&self, out: &mut String, id: FunctionId, depth: usize) {
        let indent = "  ".repeat(depth);
        let function = self.function(id);
        let _ = writeln!(
            out,
            "{}func {} {}",
            indent,
            function.name.as_deref().unwrap_or("<anonymous>"),
            self.type_name(function.signature)
        );
        if !function.captures.is_empty() {
            let captures: Vec<&str> = function.captures.iter().map(|&v| self.variable(v).name.as_str()).collect();
            let _ = writeln!(out, "{}  captures {}", indent, captures.join(", "));
        }
        for &closure in &function.closures {
            self.dump_function(out, closure, depth + 1);
        }
    }
}

impl Display for ProgramNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgramNode::Module(id) => write!(f, "module {}", id.0),
            ProgramNode::Class(id) => write!(f, "class {}", id.0),
            ProgramNode::Function(id) => write!(f, "function {}", id.0),
            ProgramNode::Variable(id) => write!(f, "variable {}", id.0),
            ProgramNode::LocalDecl(id) => write!(f, "local declaration {}", id.0),
            ProgramNode::Type(id) => write!(f, "type {}", id.0),
            ProgramNode::GlobalRef(id) => write!(f, "global {}", id.0),
            ProgramNode::ClassRef(id) => write!(f, "class member {}", id.0),
            ProgramNode::ParamRef(id) => write!(f, "parameter {}", id.0),
            ProgramNode::LocalRef(id) => write!(f, "local {}", id.0),
            ProgramNode::CapturedRef(id) => write!(f, "captured {}", id.0),
            ProgramNode::ThisRef => write!(f, "this"),
        }
    }
}
