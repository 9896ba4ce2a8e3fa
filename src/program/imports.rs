//! Import resolution.
//!
//! A module sees the modules it imports, everything its parent sees, and
//! its parent. Parents are resolved before their submodules.

use crate::{ast::statements::Visibility, errors::errors::ErrorImpl};

use super::program::{ImportRequest, ModuleId, ProgramState};

#[tracing::instrument(skip_all)]
pub fn resolve_imports(state: &mut ProgramState) {
    let roots: Vec<ModuleId> = state.roots.values().copied().collect();
    for root in roots {
        resolve_module(state, root);
    }
}

fn push_unique(set: &mut Vec<ModuleId>, module: ModuleId, importer: ModuleId) {
    if module != importer && !set.contains(&module) {
        set.push(module);
    }
}

fn resolve_module(state: &mut ProgramState, id: ModuleId) {
    let mut visible = vec![];

    let requests = state.module(id).import_requests.clone();
    for request in &requests {
        if let Some(target) = resolve_request(state, id, request) {
            tracing::debug!(
                importer = %state.module_path(id),
                target = %state.module_path(target),
                "import resolved"
            );
            push_unique(&mut visible, target, id);
        }
    }

    if let Some(parent) = state.module(id).parent {
        for &inherited in &state.module(parent).imports {
            push_unique(&mut visible, inherited, id);
        }
        push_unique(&mut visible, parent, id);
    }

    state.modules[id.0].imports = visible;

    let submodules: Vec<ModuleId> = state.module(id).submodules.values().copied().collect();
    for submodule in submodules {
        resolve_module(state, submodule);
    }
}

/// Walks a dotted path from the top-level modules, checking that every
/// step may be seen from the importer.
fn resolve_request(state: &mut ProgramState, importer: ModuleId, request: &ImportRequest) -> Option<ModuleId> {
    let Some(path) = &request.path else {
        state.error(ErrorImpl::IllegalImport, request.position.clone(), Some(request.node));
        return None;
    };

    let importer_root = state.root_of(importer);
    let mut current: Option<ModuleId> = None;

    for segment in path.split('.') {
        let next = match current {
            None => state.roots.get(segment).copied(),
            Some(module) => state.module(module).submodules.get(segment).copied(),
        };

        let Some(next) = next else {
            state.error(
                ErrorImpl::ModuleNotFound { path: path.clone() },
                request.position.clone(),
                Some(request.node),
            );
            return None;
        };

        let module = state.module(next);
        if module.visibility != Visibility::Public && state.root_of(next) != importer_root {
            let name = state.module_path(next);
            state.error(
                ErrorImpl::ModuleIsPrivate { module: name },
                request.position.clone(),
                Some(request.node),
            );
            return None;
        }

        current = Some(next);
    }

    current
}
