use std::fmt::Display;

use super::ast::Node;

/// One `[]` or `*` suffix on a type, outermost last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indirection {
    Array,
    Pointer,
}

/// A written type reference such as `Map<K, V>[]*` or `int...`.
///
/// Generic arguments are themselves `Type` nodes so that each one carries
/// its own id and span.
#[derive(Debug, Clone)]
pub struct TypeRef {
    pub name: String,
    pub generics: Vec<Node>,
    /// Angle brackets were written, even if empty as in `Box<>`.
    pub generic_list: bool,
    pub indirection: Vec<Indirection>,
    pub variadic: bool,
}

impl Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if self.generic_list {
            write!(f, "<")?;
            for (i, generic) in self.generics.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                match generic.as_type() {
                    Some(ty) => write!(f, "{}", ty)?,
                    None => write!(f, "?")?,
                }
            }
            write!(f, ">")?;
        }
        for indirection in &self.indirection {
            match indirection {
                Indirection::Array => write!(f, "[]")?,
                Indirection::Pointer => write!(f, "*")?,
            }
        }
        if self.variadic {
            write!(f, "...")?;
        }
        Ok(())
    }
}
