//! Builds the module forest from the parsed files.
//!
//! Modules with the same path merge across files. Every class, function and
//! variable gets an entity, and every type reference and function literal in
//! a body is registered up front so the later passes can look them up by
//! node.

use crate::{
    ast::{
        ast::{Node, NodeKind},
        statements::{ModuleDecl, Visibility},
    },
    errors::errors::ErrorImpl,
};

use super::program::{
    Class, ClassId, Function, FunctionId, ImportRequest, Module, ModuleId, NodeKey, Owner, PrimitiveType,
    ProgramNode, ProgramState, ProgramType, SymbolTable, TypeId, TypeKind, Variable, VariableId,
};

pub struct Builder<'a> {
    state: &'a mut ProgramState,
    file: usize,
}

/// Runs the builder over every file in `state.files`.
#[tracing::instrument(skip_all, fields(files = state.files.len()))]
pub fn build_modules(state: &mut ProgramState) {
    let files = std::mem::take(&mut state.files);

    for (file, root) in files.iter().enumerate() {
        let mut builder = Builder { state: &mut *state, file };
        builder.build_file(root);
    }

    state.files = files;
    tracing::debug!(
        modules = state.modules.len(),
        classes = state.classes.len(),
        functions = state.functions.len(),
        variables = state.variables.len(),
        "program tree built"
    );
}

/// Dotted path written as an import target, if it is one.
fn import_path(target: &Node) -> Option<String> {
    match &target.kind {
        NodeKind::StringLit(path) => Some(path.clone()),
        NodeKind::Identifier(name) => Some(name.clone()),
        NodeKind::Member { object, member } => Some(format!("{}.{}", import_path(object)?, member)),
        _ => None,
    }
}

impl<'a> Builder<'a> {
    fn key(&self, node: &Node) -> NodeKey {
        NodeKey::new(self.file, node.id)
    }

    fn build_file(&mut self, root: &Node) {
        if let NodeKind::File { modules, .. } = &root.kind {
            for module in modules {
                self.build_module(module, None);
            }
        }
    }

    fn build_module(&mut self, node: &Node, parent: Option<ModuleId>) {
        let NodeKind::Module(decl) = &node.kind else {
            return;
        };
        let id = self.open_module(node, decl, parent);
        let visibility = self.state.module(id).visibility;

        for item in &decl.items {
            match &item.kind {
                NodeKind::Module(_) => self.build_module(item, Some(id)),
                NodeKind::Class(_) => self.build_class(item, id),
                NodeKind::Function(function) if function.name.is_some() => {
                    self.build_function(item, Owner::Module(id), visibility);
                }
                NodeKind::VarDecl(_) => {
                    if self.build_member_variable(item, Owner::Module(id), visibility).is_some() {
                        self.preprocess_initializer(item, Owner::Module(id));
                    }
                }
                NodeKind::Import(target) => {
                    let request = ImportRequest {
                        path: import_path(target),
                        node: self.key(item),
                        position: item.span.start.clone(),
                    };
                    self.state.modules[id.0].import_requests.push(request);
                }
                _ => self.illegal_item(item),
            }
        }
    }

    /// Finds or creates the module a declaration opens.
    fn open_module(&mut self, node: &Node, decl: &ModuleDecl, parent: Option<ModuleId>) -> ModuleId {
        let existing = match parent {
            None => self.state.roots.get(&decl.name).copied(),
            Some(parent) => self.state.module(parent).submodules.get(&decl.name).copied(),
        };

        let id = match existing {
            Some(id) => {
                tracing::debug!(module = %decl.name, "reopening module");
                if self.state.module(id).visibility != decl.visibility {
                    self.state.error(
                        ErrorImpl::ConflictingModuleDeclaration {
                            module: decl.name.clone(),
                        },
                        node.span.start.clone(),
                        Some(self.key(node)),
                    );
                }
                id
            }
            None => {
                let id = self.state.add_module(Module {
                    name: decl.name.clone(),
                    visibility: decl.visibility,
                    parent,
                    submodules: SymbolTable::new(),
                    classes: SymbolTable::new(),
                    functions: SymbolTable::new(),
                    variables: SymbolTable::new(),
                    types: SymbolTable::new(),
                    import_requests: vec![],
                    imports: vec![],
                    position: node.span.start.clone(),
                });
                match parent {
                    None => self.state.roots.insert(decl.name.clone(), id),
                    Some(parent) => self.state.modules[parent.0].submodules.insert(decl.name.clone(), id),
                };
                id
            }
        };

        self.state.record(self.key(node), ProgramNode::Module(id));
        id
    }

    fn illegal_item(&mut self, item: &Node) {
        let description = match &item.kind {
            NodeKind::Function(_) => String::from("anonymous function"),
            _ => item.kind_name().to_string(),
        };
        self.state.error(
            ErrorImpl::IllegalModuleItem { item: description },
            item.span.start.clone(),
            Some(self.key(item)),
        );
    }

    fn build_class(&mut self, node: &Node, module: ModuleId) {
        let NodeKind::Class(decl) = &node.kind else {
            return;
        };

        if self.state.module(module).classes.contains(&decl.name) {
            self.state.error(
                ErrorImpl::ClassAlreadyDeclared {
                    class: decl.name.clone(),
                },
                node.span.start.clone(),
                Some(self.key(node)),
            );
            return;
        }

        let visibility = decl.visibility.within(self.state.module(module).visibility);
        let id = ClassId(self.state.classes.len());
        let position = node.span.start.clone();

        let mut generics = SymbolTable::new();
        let mut generic_ids = vec![];
        for name in &decl.generics {
            let ty = self.state.add_type(ProgramType {
                name: name.clone(),
                kind: TypeKind::Unknown,
                indirection: vec![],
                variadic: false,
                generics: vec![],
                generic_list: false,
                is_master: true,
                master: None,
                checked: true,
                owner: Owner::Class(id),
                skip_class_generics: false,
                node: None,
                position: position.clone(),
            });
            generics.insert_if_absent(name.clone(), ty);
            generic_ids.push(ty);
        }

        let master_type = self.state.add_type(ProgramType {
            name: decl.name.clone(),
            kind: TypeKind::Class(id),
            indirection: vec![],
            variadic: false,
            generic_list: !generic_ids.is_empty(),
            generics: generic_ids,
            is_master: true,
            master: None,
            checked: true,
            owner: Owner::Class(id),
            skip_class_generics: false,
            node: Some(self.key(node)),
            position: position.clone(),
        });

        let class = self.state.add_class(Class {
            name: decl.name.clone(),
            visibility,
            modifiers: decl.modifiers,
            module,
            generics,
            master_type,
            parents: vec![],
            variables: SymbolTable::new(),
            functions: SymbolTable::new(),
            node: self.key(node),
            position,
        });

        let module_entry = &mut self.state.modules[module.0];
        module_entry.classes.insert(decl.name.clone(), class);
        module_entry.types.insert(decl.name.clone(), master_type);
        self.state.record(self.key(node), ProgramNode::Class(class));
        tracing::debug!(class = %decl.name, generics = decl.generics.len(), "class");

        for parent in &decl.parents {
            let parent = self.register_type(parent, Owner::Class(class), true);
            self.state.classes[class.0].parents.push(parent);
        }

        for member in &decl.members {
            match &member.kind {
                NodeKind::Function(function) if function.name.is_some() => {
                    self.build_function(member, Owner::Class(class), visibility);
                }
                NodeKind::VarDecl(_) => {
                    if self.build_member_variable(member, Owner::Class(class), visibility).is_some() {
                        self.preprocess_initializer(member, Owner::Class(class));
                    }
                }
                _ => self.illegal_item(member),
            }
        }
    }

    /// Registers a type reference and its generic arguments.
    fn register_type(&mut self, node: &Node, owner: Owner, skip_class_generics: bool) -> TypeId {
        let key = self.key(node);
        let position = node.span.start.clone();

        let ty = match node.as_type() {
            Some(written) => {
                let generics = written
                    .generics
                    .iter()
                    .map(|generic| self.register_type(generic, owner, false))
                    .collect();
                ProgramType {
                    name: written.name.clone(),
                    kind: PrimitiveType::from_name(&written.name)
                        .map(TypeKind::Primitive)
                        .unwrap_or(TypeKind::Unknown),
                    indirection: written.indirection.clone(),
                    variadic: written.variadic,
                    generics,
                    generic_list: written.generic_list,
                    is_master: false,
                    master: None,
                    checked: false,
                    owner,
                    skip_class_generics,
                    node: Some(key),
                    position,
                }
            }
            None => ProgramType {
                name: node.kind_name().to_string(),
                kind: TypeKind::Unknown,
                indirection: vec![],
                variadic: false,
                generics: vec![],
                generic_list: false,
                is_master: false,
                master: None,
                checked: true,
                owner,
                skip_class_generics,
                node: Some(key),
                position,
            },
        };

        let id = self.state.add_type(ty);
        self.state.record(key, ProgramNode::Type(id));
        id
    }

    /// Whether `name` is free in a module's or class's member namespace,
    /// reporting the clash otherwise.
    fn member_name_free(&mut self, owner: Owner, name: &str, function: bool, node: &Node) -> bool {
        let (functions, variables) = match owner {
            Owner::Module(module) => {
                let module = self.state.module(module);
                (module.functions.contains(name), module.variables.contains(name))
            }
            Owner::Class(class) => {
                let class = self.state.class(class);
                (class.functions.contains(name), class.variables.contains(name))
            }
            Owner::Function(_) => return true,
        };

        let error = if function && functions {
            ErrorImpl::FunctionAlreadyDeclared {
                function: name.to_string(),
            }
        } else if functions || variables {
            ErrorImpl::VariableAlreadyDeclared {
                variable: name.to_string(),
            }
        } else {
            return true;
        };

        self.state.error(error, node.span.start.clone(), Some(self.key(node)));
        false
    }

    fn insert_member(&mut self, owner: Owner, name: &str, variable: Option<VariableId>, function: Option<FunctionId>) {
        let (variables, functions) = match owner {
            Owner::Module(module) => {
                let module = &mut self.state.modules[module.0];
                (&mut module.variables, &mut module.functions)
            }
            Owner::Class(class) => {
                let class = &mut self.state.classes[class.0];
                (&mut class.variables, &mut class.functions)
            }
            Owner::Function(_) => return,
        };

        if let Some(variable) = variable {
            variables.insert(name.to_string(), variable);
        }
        if let Some(function) = function {
            functions.insert(name.to_string(), function);
        }
    }

    /// Creates the variable for a declaration without looking at its
    /// initializer.
    fn declare_variable(&mut self, node: &Node, owner: Owner, container: Visibility) -> Option<VariableId> {
        let NodeKind::VarDecl(decl) = &node.kind else {
            return None;
        };

        let ty = self.register_type(&decl.ty, owner, false);
        let variable = self.state.add_variable(Variable {
            name: decl.name.clone(),
            owner,
            visibility: decl.visibility.within(container),
            modifiers: decl.modifiers,
            ty,
            constant: decl.modifiers.csig,
            has_default: decl.init.is_some() || decl.ctor_args.is_some(),
            function: None,
            node: Some(self.key(node)),
            position: node.span.start.clone(),
        });

        self.state.record(self.key(node), ProgramNode::Variable(variable));
        Some(variable)
    }

    fn build_member_variable(&mut self, node: &Node, owner: Owner, container: Visibility) -> Option<VariableId> {
        let NodeKind::VarDecl(decl) = &node.kind else {
            return None;
        };
        if !self.member_name_free(owner, &decl.name, false, node) {
            return None;
        }

        let variable = self.declare_variable(node, owner, container)?;
        self.insert_member(owner, &decl.name, Some(variable), None);
        Some(variable)
    }

    fn preprocess_initializer(&mut self, node: &Node, owner: Owner) {
        if let NodeKind::VarDecl(decl) = &node.kind {
            if let Some(init) = &decl.init {
                self.preprocess(init, owner);
            }
            for arg in decl.ctor_args.iter().flatten() {
                self.preprocess(arg, owner);
            }
        }
    }

    /// Builds a function entity. Module and class functions are entered in
    /// their container's tables; function literals become closures of the
    /// function they appear in.
    fn build_function(&mut self, node: &Node, owner: Owner, container: Visibility) -> Option<FunctionId> {
        let NodeKind::Function(decl) = &node.kind else {
            return None;
        };

        if let Some(name) = &decl.name {
            if !self.member_name_free(owner, name, true, node) {
                return None;
            }
        }

        let id = FunctionId(self.state.functions.len());
        let inner = Owner::Function(id);
        let position = node.span.start.clone();

        let return_type = self.register_type(&decl.return_type, inner, false);
        let params: Vec<VariableId> = decl
            .params
            .iter()
            .filter_map(|param| self.declare_variable(param, inner, Visibility::Private))
            .collect();

        let param_types = params.iter().map(|&p| self.state.variable(p).ty).collect();
        let signature = self.state.add_type(ProgramType {
            name: String::from("func"),
            kind: TypeKind::Function {
                return_type,
                params: param_types,
            },
            indirection: vec![],
            variadic: false,
            generics: vec![],
            generic_list: false,
            is_master: false,
            master: None,
            checked: true,
            owner: inner,
            skip_class_generics: false,
            node: None,
            position: position.clone(),
        });

        let visibility = decl.visibility.within(container);
        let implicit = decl.name.as_ref().map(|name| {
            self.state.add_variable(Variable {
                name: name.clone(),
                owner,
                visibility,
                modifiers: decl.modifiers,
                ty: signature,
                constant: true,
                has_default: false,
                function: Some(id),
                node: Some(self.key(node)),
                position: position.clone(),
            })
        });

        let function = self.state.add_function(Function {
            name: decl.name.clone(),
            owner,
            visibility,
            modifiers: decl.modifiers,
            lambda: decl.lambda,
            params,
            return_type,
            signature,
            closures: vec![],
            captures: vec![],
            implicit,
            node: self.key(node),
            position,
        });
        debug_assert_eq!(function, id);

        if let Some(name) = &decl.name {
            self.insert_member(owner, name, implicit, Some(function));
        }
        if let Owner::Function(parent) = owner {
            self.state.functions[parent.0].closures.push(function);
        }
        self.state.record(self.key(node), ProgramNode::Function(function));
        tracing::trace!(
            function = decl.name.as_deref().unwrap_or("<anonymous>"),
            params = decl.params.len(),
            "function"
        );

        for param in &decl.params {
            self.preprocess_initializer(param, inner);
        }
        self.preprocess(&decl.body, inner);

        Some(function)
    }

    /// Registers every type reference and function literal below `node`.
    fn preprocess(&mut self, node: &Node, owner: Owner) {
        match &node.kind {
            NodeKind::Type(_) => {
                self.register_type(node, owner, false);
            }
            NodeKind::Function(_) => {
                self.build_function(node, owner, Visibility::None);
            }
            _ => {
                for child in node.children() {
                    self.preprocess(child, owner);
                }
            }
        }
    }
}

