//! Type references used by field and argument declarations.

use crate::declaration::TypeDeclaration;

/// A reference to a type from a field or argument position.
///
/// Bare types are non-null; wrap in [`TypeRef::Option`] to make a
/// position nullable.
#[derive(Debug, Clone)]
pub enum TypeRef {
    /// Reference by name. Used for back references and cycles; the name
    /// must resolve against the registry once the schema is assembled.
    Named(String),
    /// An inline declaration. Registering the enclosing type also
    /// registers every `Declared` reference reachable from it.
    Declared(TypeDeclaration),
    /// A nullable wrapper around the inner reference.
    Option(Box<TypeRef>),
    /// A list of the inner reference.
    List(Box<TypeRef>),
}

impl TypeRef {
    /// Creates a reference by name.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Creates a reference to an inline declaration.
    pub fn declared(declaration: TypeDeclaration) -> Self {
        Self::Declared(declaration)
    }

    /// Wraps a reference as nullable.
    pub fn option(inner: TypeRef) -> Self {
        Self::Option(Box::new(inner))
    }

    /// Wraps a reference as a list.
    pub fn list(inner: TypeRef) -> Self {
        Self::List(Box::new(inner))
    }

    /// Returns the name of the innermost referenced type.
    pub fn innermost_name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::Declared(declaration) => declaration.name(),
            Self::Option(inner) | Self::List(inner) => inner.innermost_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::ScalarDeclaration;

    #[test]
    fn test_innermost_name() {
        let ty = TypeRef::option(TypeRef::list(TypeRef::named("User")));
        assert_eq!(ty.innermost_name(), "User");

        let ty = TypeRef::declared(ScalarDeclaration::new("DateTime").declare());
        assert_eq!(ty.innermost_name(), "DateTime");
    }
}
