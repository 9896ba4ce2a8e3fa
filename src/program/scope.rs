//! Lexical scope analysis.
//!
//! Builds the scope tree for every body in the program, declares locals and
//! classifies each identifier by where along the scope chain it was found.

use crate::{
    ast::{
        ast::{Node, NodeKind},
        expressions::UnaryOp,
        statements::{FunctionDecl, VarDecl, Visibility},
    },
    errors::errors::ErrorImpl,
};

use super::program::{
    ClassId, FunctionId, ModuleId, NodeKey, Owner, ProgramNode, ProgramState, ScopeId, SymbolTable, TypeKind,
    Variable, VariableId,
};

/// Where a scope's variables live. Module and class scopes see the
/// container's member table directly.
#[derive(Debug, Clone)]
pub enum ScopeVariables {
    Owned(SymbolTable<VariableId>),
    Module(ModuleId),
    Class(ClassId),
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub variables: ScopeVariables,
    /// Lookups that leave this scope cross into an enclosing function.
    pub function_boundary: bool,
    pub class_level: bool,
    pub parameter_level: bool,
    pub function: Option<FunctionId>,
}

impl Scope {
    pub fn new(parent: Option<ScopeId>, variables: ScopeVariables) -> Self {
        Scope {
            parent,
            children: vec![],
            variables,
            function_boundary: false,
            class_level: false,
            parameter_level: false,
            function: None,
        }
    }
}

/// How a name was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reach {
    Local,
    Param,
    Class,
    Global,
    Captured,
}

struct Found {
    variable: VariableId,
    reach: Reach,
    crossed: Vec<FunctionId>,
}

pub struct ScopeAnalyzer<'a> {
    state: &'a mut ProgramState,
    module_scopes: &'a [ScopeId],
    class_scopes: &'a [ScopeId],
    file: usize,
    current: ScopeId,
    module: ModuleId,
    class: Option<ClassId>,
    /// Owner given to locals declared in the current body.
    owner: Owner,
}

/// Analyzes every file in `state.files`.
#[tracing::instrument(skip_all, fields(files = state.files.len()))]
pub fn analyze_scopes(state: &mut ProgramState) {
    let module_scopes: Vec<ScopeId> = (0..state.modules.len())
        .map(|index| state.add_scope(Scope::new(None, ScopeVariables::Module(ModuleId(index)))))
        .collect();

    let class_scopes: Vec<ScopeId> = (0..state.classes.len())
        .map(|index| {
            let class = ClassId(index);
            let parent = module_scopes[state.class(class).module.0];
            let mut scope = Scope::new(Some(parent), ScopeVariables::Class(class));
            scope.class_level = true;
            let id = state.add_scope(scope);
            state.scopes[parent.0].children.push(id);
            id
        })
        .collect();

    let files = std::mem::take(&mut state.files);
    for (file, root) in files.iter().enumerate() {
        let NodeKind::File { modules, .. } = &root.kind else {
            continue;
        };
        for module in modules {
            let mut analyzer = ScopeAnalyzer {
                state: &mut *state,
                module_scopes: &module_scopes,
                class_scopes: &class_scopes,
                file,
                current: ScopeId(0),
                module: ModuleId(0),
                class: None,
                owner: Owner::Module(ModuleId(0)),
            };
            analyzer.analyze_module(module);
        }
    }
    state.files = files;

    tracing::debug!(scopes = state.scopes.len(), "scopes analyzed");
}

impl<'a> ScopeAnalyzer<'a> {
    fn key(&self, node: &Node) -> NodeKey {
        NodeKey::new(self.file, node.id)
    }

    fn resolution(&self, node: &Node) -> Option<ProgramNode> {
        self.state.resolution(self.key(node))
    }

    fn error(&mut self, error: ErrorImpl, node: &Node) {
        let key = self.key(node);
        self.state.error(error, node.span.start.clone(), Some(key));
    }

    fn push_scope(&mut self, parent: ScopeId, scope: Scope) -> ScopeId {
        let id = self.state.add_scope(scope);
        self.state.scopes[parent.0].children.push(id);
        id
    }

    /// Runs `visit` inside a fresh child of the current scope.
    fn scoped(&mut self, visit: impl FnOnce(&mut Self)) {
        let parent = self.current;
        let scope = self.push_scope(parent, Scope::new(Some(parent), ScopeVariables::Owned(SymbolTable::new())));
        self.current = scope;
        visit(self);
        self.current = parent;
    }

    fn analyze_module(&mut self, node: &Node) {
        let (Some(ProgramNode::Module(module)), NodeKind::Module(decl)) = (self.resolution(node), &node.kind) else {
            return;
        };

        let scope = self.module_scopes[module.0];
        for item in &decl.items {
            self.module = module;
            self.class = None;
            self.owner = Owner::Module(module);
            self.current = scope;

            match &item.kind {
                NodeKind::Module(_) => self.analyze_module(item),
                NodeKind::Class(_) => self.analyze_class(item),
                NodeKind::Function(decl) => {
                    if let Some(ProgramNode::Function(function)) = self.resolution(item) {
                        self.analyze_function(decl, function);
                    }
                }
                NodeKind::VarDecl(decl) => {
                    if self.resolution(item).is_some() {
                        self.scoped(|analyzer| analyzer.walk_initializer(decl));
                    }
                }
                _ => {}
            }
        }
    }

    fn analyze_class(&mut self, node: &Node) {
        let (Some(ProgramNode::Class(class)), NodeKind::Class(decl)) = (self.resolution(node), &node.kind) else {
            return;
        };

        let scope = self.class_scopes[class.0];
        for member in &decl.members {
            self.class = Some(class);
            self.owner = Owner::Class(class);
            self.current = scope;

            match &member.kind {
                NodeKind::Function(decl) => {
                    if let Some(ProgramNode::Function(function)) = self.resolution(member) {
                        self.analyze_function(decl, function);
                    }
                }
                NodeKind::VarDecl(decl) => {
                    if self.resolution(member).is_some() {
                        self.scoped(|analyzer| analyzer.walk_initializer(decl));
                    }
                }
                _ => {}
            }
        }
    }

    /// Parameters live in a scope of their own that marks the function
    /// boundary; the body gets a child of it.
    fn analyze_function(&mut self, decl: &FunctionDecl, function: FunctionId) {
        let parent = self.current;
        let previous_owner = self.owner;

        let mut scope = Scope::new(Some(parent), ScopeVariables::Owned(SymbolTable::new()));
        scope.function_boundary = true;
        scope.parameter_level = true;
        scope.function = Some(function);
        self.current = self.push_scope(parent, scope);
        self.owner = Owner::Function(function);

        let params = self.state.function(function).params.clone();
        for (node, &variable) in decl.params.iter().zip(params.iter()) {
            if let NodeKind::VarDecl(param) = &node.kind {
                self.walk_initializer(param);
                self.declare(&param.name, variable, node);
            }
        }

        match decl.body.kind {
            NodeKind::Body(_) => self.walk(&decl.body),
            _ => self.scoped(|analyzer| analyzer.walk(&decl.body)),
        }

        self.owner = previous_owner;
        self.current = parent;
    }

    fn walk_initializer(&mut self, decl: &VarDecl) {
        if let Some(init) = &decl.init {
            self.walk(init);
        }
        for arg in decl.ctor_args.iter().flatten() {
            self.walk(arg);
        }
    }

    /// Enters `name` into the current scope.
    fn declare(&mut self, name: &str, variable: VariableId, node: &Node) -> bool {
        let taken = name == "this"
            || match &mut self.state.scopes[self.current.0].variables {
                ScopeVariables::Owned(table) => !table.insert_if_absent(name.to_string(), variable),
                ScopeVariables::Module(_) | ScopeVariables::Class(_) => false,
            };

        if taken {
            self.error(
                ErrorImpl::VariableAlreadyDeclared {
                    variable: name.to_string(),
                },
                node,
            );
            return false;
        }

        tracing::trace!(name, variable = variable.0, scope = self.current.0, "declared");
        true
    }

    /// A variable declared inside a body. The initializer is walked first,
    /// so it cannot see the name being declared.
    fn declare_local(&mut self, node: &Node, decl: &VarDecl) {
        self.walk_initializer(decl);

        let Some(ProgramNode::Type(ty)) = self.resolution(&decl.ty) else {
            return;
        };

        let key = self.key(node);
        let variable = self.state.add_variable(Variable {
            name: decl.name.clone(),
            owner: self.owner,
            visibility: Visibility::None,
            modifiers: decl.modifiers,
            ty,
            constant: decl.modifiers.csig,
            has_default: decl.init.is_some() || decl.ctor_args.is_some(),
            function: None,
            node: Some(key),
            position: node.span.start.clone(),
        });

        if self.declare(&decl.name, variable, node) {
            self.state.record(key, ProgramNode::LocalDecl(variable));
        }
    }

    /// A function literal in a body. A named one is declared in the current
    /// scope before its body is analyzed, so it can call itself.
    fn nested_function(&mut self, node: &Node, decl: &FunctionDecl) {
        let Some(ProgramNode::Function(function)) = self.resolution(node) else {
            return;
        };

        if let (Some(name), Some(implicit)) = (&decl.name, self.state.function(function).implicit) {
            self.declare(name, implicit, node);
        }
        self.analyze_function(decl, function);
    }

    fn scope_get(&self, scope: ScopeId, name: &str) -> Option<VariableId> {
        match &self.state.scopes[scope.0].variables {
            ScopeVariables::Owned(table) => table.get(name).copied(),
            ScopeVariables::Module(module) => self.state.module(*module).variables.get(name).copied(),
            ScopeVariables::Class(class) => self.state.class(*class).variables.get(name).copied(),
        }
    }

    fn lookup(&self, name: &str) -> Option<Found> {
        let mut crossed = vec![];
        let mut passed_class = false;
        let mut scope = Some(self.current);

        while let Some(id) = scope {
            let entry = &self.state.scopes[id.0];

            if let Some(variable) = self.scope_get(id, name) {
                let reach = if entry.class_level {
                    Reach::Class
                } else if passed_class || matches!(entry.variables, ScopeVariables::Module(_)) {
                    Reach::Global
                } else if !crossed.is_empty() {
                    Reach::Captured
                } else if entry.parameter_level {
                    Reach::Param
                } else {
                    Reach::Local
                };
                return Some(Found {
                    variable,
                    reach,
                    crossed,
                });
            }

            if entry.class_level {
                passed_class = true;
            }
            if entry.function_boundary {
                if let Some(function) = entry.function {
                    crossed.push(function);
                }
            }
            scope = entry.parent;
        }

        None
    }

    /// Names that are not variables but still resolve: classes visible in
    /// the current module, its submodules and the modules it imports.
    fn lookup_non_variable(&self, name: &str) -> Option<ProgramNode> {
        if let Some(class) = self.state.find_class(self.module, name) {
            return Some(ProgramNode::Class(class));
        }

        let module = self.state.module(self.module);
        module
            .submodules
            .get(name)
            .copied()
            .or_else(|| {
                module
                    .imports
                    .iter()
                    .copied()
                    .find(|&m| self.state.module(m).name == name)
            })
            .map(ProgramNode::Module)
    }

    fn reference(&mut self, node: &Node, name: &str) {
        let key = self.key(node);
        if name == "this" {
            self.state.record(key, ProgramNode::ThisRef);
            return;
        }

        if let Some(found) = self.lookup(name) {
            let resolved = match found.reach {
                Reach::Local => ProgramNode::LocalRef(found.variable),
                Reach::Param => ProgramNode::ParamRef(found.variable),
                Reach::Class => ProgramNode::ClassRef(found.variable),
                Reach::Global => ProgramNode::GlobalRef(found.variable),
                Reach::Captured => {
                    for function in &found.crossed {
                        let captures = &mut self.state.functions[function.0].captures;
                        if !captures.contains(&found.variable) {
                            captures.push(found.variable);
                        }
                    }
                    tracing::trace!(name, functions = found.crossed.len(), "captured");
                    ProgramNode::CapturedRef(found.variable)
                }
            };
            self.state.record(key, resolved);
            return;
        }

        match self.lookup_non_variable(name) {
            Some(resolved) => self.state.record(key, resolved),
            None => self.error(
                ErrorImpl::UnexpectedIdentifier {
                    identifier: name.to_string(),
                },
                node,
            ),
        }
    }

    /// Assignment targets must denote storage that is not constant.
    fn check_mutable(&mut self, target: &Node) {
        let name = match &target.kind {
            NodeKind::Member { .. } | NodeKind::ComputedMember { .. } => return,
            NodeKind::Unary { op: UnaryOp::Deref, .. } => return,
            NodeKind::Identifier(name) => match self.resolution(target) {
                Some(resolved) => match resolved.variable() {
                    Some(variable) if !self.state.variable(variable).constant => return,
                    Some(_) | None => name.clone(),
                },
                // Already reported as an unknown identifier.
                None => return,
            },
            _ => target.kind_name().to_string(),
        };

        self.error(ErrorImpl::NotMutable { target: name }, target);
    }

    /// Argument count against the parameters of a directly named function.
    fn check_arity(&mut self, call: &Node, callee: &Node, received: usize) {
        let Some(variable) = self.resolution(callee).and_then(|resolved| resolved.variable()) else {
            return;
        };
        let Some(function) = self.state.variable(variable).function else {
            return;
        };

        let (minimum, maximum) = self.state.function(function).arity(self.state);
        if let Some(maximum) = maximum {
            if received > maximum {
                self.error(
                    ErrorImpl::UnexpectedArguments {
                        expected: maximum,
                        received,
                    },
                    call,
                );
                return;
            }
        }
        if received < minimum {
            self.error(
                ErrorImpl::MissingArguments {
                    expected: minimum,
                    received,
                },
                call,
            );
        }
    }

    fn check_new(&mut self, node: &Node, ty: &Node) {
        let Some(ProgramNode::Type(id)) = self.resolution(ty) else {
            return;
        };
        let ty = self.state.ty(id);
        if !ty.indirection.is_empty() {
            return;
        }

        let message = match ty.kind {
            TypeKind::Primitive(_) => format!("cannot construct primitive type `{}` with `new`", ty.name),
            TypeKind::Function { .. } => String::from("cannot construct a function type with `new`"),
            _ => return,
        };
        self.error(ErrorImpl::IllegalOperation { message }, node);
    }

    fn walk(&mut self, node: &Node) {
        match &node.kind {
            NodeKind::Identifier(name) => self.reference(node, name),
            NodeKind::Member { object, .. } => self.walk(object),
            NodeKind::VarDecl(decl) => self.declare_local(node, decl),
            NodeKind::Function(decl) => self.nested_function(node, decl),
            NodeKind::Body(children) => self.scoped(|analyzer| {
                for child in children {
                    analyzer.walk(child);
                }
            }),
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => self.scoped(|analyzer| {
                analyzer.walk(condition);
                analyzer.scoped(|analyzer| analyzer.walk(then_branch));
                if let Some(else_branch) = else_branch {
                    analyzer.scoped(|analyzer| analyzer.walk(else_branch));
                }
            }),
            NodeKind::For {
                init,
                condition,
                step,
                body,
            } => self.scoped(|analyzer| {
                analyzer.walk(init);
                analyzer.walk(condition);
                analyzer.walk(step);
                analyzer.scoped(|analyzer| analyzer.walk(body));
            }),
            NodeKind::ForEach {
                variable,
                iterable,
                body,
            } => self.scoped(|analyzer| {
                analyzer.walk(iterable);
                analyzer.walk(variable);
                analyzer.scoped(|analyzer| analyzer.walk(body));
            }),
            NodeKind::While { condition, body } => self.scoped(|analyzer| {
                analyzer.walk(condition);
                analyzer.scoped(|analyzer| analyzer.walk(body));
            }),
            NodeKind::Switch { subject, cases } => self.scoped(|analyzer| {
                analyzer.walk(subject);
                for case in cases {
                    analyzer.scoped(|analyzer| {
                        for child in case.children() {
                            analyzer.walk(child);
                        }
                    });
                }
            }),
            NodeKind::Try { body, catch, finally } => {
                self.scoped(|analyzer| analyzer.walk(body));
                if let Some(catch) = catch {
                    self.scoped(|analyzer| {
                        analyzer.walk(&catch.variable);
                        analyzer.scoped(|analyzer| analyzer.walk(&catch.handler));
                    });
                }
                if let Some(finally) = finally {
                    self.scoped(|analyzer| analyzer.walk(finally));
                }
            }
            NodeKind::Binary { op, left, right } if op.is_assignment() => {
                self.walk(left);
                self.walk(right);
                self.check_mutable(left);
            }
            NodeKind::Unary { op, operand } | NodeKind::UnaryPostfix { op, operand } if op.mutates() => {
                self.walk(operand);
                self.check_mutable(operand);
            }
            NodeKind::Call { callee, args } => {
                self.walk(callee);
                for arg in args {
                    self.walk(arg);
                }
                self.check_arity(node, callee, args.len());
            }
            NodeKind::New(ty) => self.check_new(node, ty),
            NodeKind::Type(_) | NodeKind::Goto(_) | NodeKind::Label(_) => {}
            _ => {
                for child in node.children() {
                    self.walk(child);
                }
            }
        }
    }
}
