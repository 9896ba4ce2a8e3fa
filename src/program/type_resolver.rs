//! Type visibility across modules and binding of type references to the
//! definitions they name.

use crate::errors::errors::ErrorImpl;

use super::program::{ModuleId, ProgramState, TypeId, TypeKind};

/// Copies the externally visible classes of every imported module into the
/// importer's type table. Names already present win, so local classes and
/// earlier imports take precedence.
#[tracing::instrument(skip_all)]
pub fn propagate_types(state: &mut ProgramState) {
    for index in 0..state.modules.len() {
        let importer = ModuleId(index);
        let imports = state.module(importer).imports.clone();

        for imported in imports {
            let visible: Vec<(String, TypeId)> = state
                .module(imported)
                .classes
                .values()
                .map(|&class| state.class(class))
                .filter(|class| class.visibility.is_external())
                .map(|class| (class.name.clone(), class.master_type))
                .collect();

            for (name, ty) in visible {
                if state.modules[importer.0].types.insert_if_absent(name.clone(), ty) {
                    tracing::trace!(importer = %state.module_path(importer), ty = %name, "type propagated");
                }
            }
        }
    }
}

/// Binds every registered type reference to its master.
#[tracing::instrument(skip_all, fields(types = state.types.len()))]
pub fn master_types(state: &mut ProgramState) {
    for index in 0..state.types.len() {
        master_type(state, TypeId(index));
    }
}

fn master_type(state: &mut ProgramState, id: TypeId) {
    let ty = state.ty(id);
    if ty.checked || ty.is_master || ty.master.is_some() {
        return;
    }
    if matches!(ty.kind, TypeKind::Primitive(_) | TypeKind::Function { .. }) {
        state.types[id.0].checked = true;
        return;
    }
    state.types[id.0].checked = true;

    let ty = state.ty(id);
    let (module, class) = state.context_of(ty.owner);
    let from_class = if ty.skip_class_generics {
        None
    } else {
        class.and_then(|class| state.class(class).generics.get(&ty.name).copied())
    };
    let found = from_class.or_else(|| state.module(module).types.get(&ty.name).copied());

    let name = ty.name.clone();
    let position = ty.position.clone();
    let node = ty.node;
    let written = ty.generics.clone();
    let generic_list = ty.generic_list;

    let Some(master) = found else {
        state.error(ErrorImpl::TypeNotFound { name }, position, node);
        return;
    };

    let expected = state.ty(master).generics.len();
    // `Box<>` wrote a list, so it is an arity mismatch rather than a missing list
    let error = match (expected, generic_list, written.len()) {
        (0, false, _) => None,
        (_, false, _) => Some(ErrorImpl::ExpectedGenerics { name }),
        (0, true, _) => Some(ErrorImpl::UnexpectedGenerics { name }),
        (expected, true, found) if expected != found => Some(ErrorImpl::GenericArityMismatch {
            name,
            expected,
            found,
        }),
        _ => None,
    };
    if let Some(error) = error {
        state.error(error, position, node);
        return;
    }

    let kind = state.ty(master).kind.clone();
    let entry = &mut state.types[id.0];
    entry.master = Some(master);
    entry.kind = kind;
    tracing::trace!(ty = %entry.name, master = master.0, "type mastered");

    for generic in written {
        master_type(state, generic);
    }
}
