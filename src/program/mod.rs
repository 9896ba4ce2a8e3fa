//! Semantic resolution of parsed files into a program.
//!
//! - `builder` - module forest, classes, functions and variables
//! - `imports` - the modules each module can see
//! - `type_resolver` - type visibility across modules and generic checking
//! - `scope` - lexical scopes and identifier classification
//! - `program` - the entities and the tables they are stored in

pub mod builder;
pub mod imports;
pub mod program;
pub mod scope;
pub mod type_resolver;

#[cfg(test)]
mod tests;

use crate::ast::ast::Node;

use self::program::{NodeKey, ProgramState};

/// Runs the semantic pipeline over parsed files.
///
/// Every stage runs even when an earlier one reported errors; constructs
/// that failed are skipped by the later stages. The resolution of each node
/// is finally copied onto the node itself.
#[tracing::instrument(skip_all, fields(files = files.len()))]
pub fn build_program(files: Vec<Node>) -> ProgramState {
    let mut state = ProgramState::new(files);

    builder::build_modules(&mut state);
    imports::resolve_imports(&mut state);
    type_resolver::propagate_types(&mut state);
    type_resolver::master_types(&mut state);
    scope::analyze_scopes(&mut state);
    write_back(&mut state);

    tracing::debug!(errors = state.errors.len(), "program built");
    state
}

fn write_back(state: &mut ProgramState) {
    let mut files = std::mem::take(&mut state.files);
    for (file, root) in files.iter_mut().enumerate() {
        root.walk_mut(&mut |node| {
            node.resolved = state.resolution(NodeKey::new(file, node.id));
        });
    }
    state.files = files;
}
