//! Host-side type declarations.
//!
//! A [`TypeDeclaration`] is the tagged union handed over by the type
//! declaration collaborator and stored verbatim in the registry. The
//! builders here produce `Arc`-shared declarations so that re-registering
//! the same declaration (reached through two different fields) is
//! idempotent, while two distinct declarations claiming one name collide.

use crate::type_ref::TypeRef;
use indexmap::IndexMap;
use std::sync::Arc;

/// A type declaration: the definition payload of one registry entry.
#[derive(Debug, Clone)]
pub enum TypeDeclaration {
    Object(Arc<ObjectDeclaration>),
    Scalar(Arc<ScalarDeclaration>),
    Enum(Arc<EnumDeclaration>),
}

impl TypeDeclaration {
    /// Returns the declared type name.
    pub fn name(&self) -> &str {
        match self {
            Self::Object(o) => &o.name,
            Self::Scalar(s) => &s.name,
            Self::Enum(e) => &e.name,
        }
    }

    /// Returns the declared description, if any.
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Object(o) => o.description.as_deref(),
            Self::Scalar(s) => s.description.as_deref(),
            Self::Enum(e) => e.description.as_deref(),
        }
    }

    /// Returns true if both sides are the same declaration instance.
    ///
    /// Identity, not structural equality: a declaration is "the same" only
    /// when it is literally the same shared allocation.
    pub fn same_declaration(&self, other: &TypeDeclaration) -> bool {
        match (self, other) {
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            (Self::Scalar(a), Self::Scalar(b)) => Arc::ptr_eq(a, b),
            (Self::Enum(a), Self::Enum(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Returns the object declaration if this is an object type.
    pub fn as_object(&self) -> Option<&ObjectDeclaration> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }
}

/// An object type declaration.
#[derive(Debug)]
pub struct ObjectDeclaration {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldDeclaration>,
}

impl ObjectDeclaration {
    /// Creates a new object declaration builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: IndexMap::new(),
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a field.
    pub fn field(mut self, field: FieldDeclaration) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Finishes the builder into a shared declaration.
    pub fn declare(self) -> TypeDeclaration {
        TypeDeclaration::Object(Arc::new(self))
    }
}

/// A scalar type declaration.
#[derive(Debug)]
pub struct ScalarDeclaration {
    pub name: String,
    pub description: Option<String>,
}

impl ScalarDeclaration {
    /// Creates a new scalar declaration builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Finishes the builder into a shared declaration.
    pub fn declare(self) -> TypeDeclaration {
        TypeDeclaration::Scalar(Arc::new(self))
    }
}

/// An enum type declaration.
#[derive(Debug)]
pub struct EnumDeclaration {
    pub name: String,
    pub description: Option<String>,
    pub values: Vec<EnumValueDeclaration>,
}

impl EnumDeclaration {
    /// Creates a new enum declaration builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            values: Vec::new(),
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a value.
    pub fn value(mut self, value: EnumValueDeclaration) -> Self {
        self.values.push(value);
        self
    }

    /// Finishes the builder into a shared declaration.
    pub fn declare(self) -> TypeDeclaration {
        TypeDeclaration::Enum(Arc::new(self))
    }
}

/// One value of an enum declaration.
#[derive(Debug, Clone)]
pub struct EnumValueDeclaration {
    pub name: String,
    pub description: Option<String>,
    pub deprecated: bool,
    pub deprecation_reason: Option<String>,
}

impl EnumValueDeclaration {
    /// Creates a new enum value.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            deprecated: false,
            deprecation_reason: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the value deprecated.
    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.deprecated = true;
        self.deprecation_reason = Some(reason.into());
        self
    }
}

/// A field declaration on an object type.
#[derive(Debug, Clone)]
pub struct FieldDeclaration {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub arguments: IndexMap<String, ArgumentDeclaration>,
    pub deprecated: bool,
    pub deprecation_reason: Option<String>,
}

impl FieldDeclaration {
    /// Creates a new field declaration.
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            arguments: IndexMap::new(),
            deprecated: false,
            deprecation_reason: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds an argument.
    pub fn argument(mut self, argument: ArgumentDeclaration) -> Self {
        self.arguments.insert(argument.name.clone(), argument);
        self
    }

    /// Marks the field deprecated.
    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.deprecated = true;
        self.deprecation_reason = Some(reason.into());
        self
    }
}

/// An argument declaration on a field or directive.
#[derive(Debug, Clone)]
pub struct ArgumentDeclaration {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub default_value: Option<serde_json::Value>,
}

impl ArgumentDeclaration {
    /// Creates a new argument declaration.
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            default_value: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_name() {
        let user = ObjectDeclaration::new("User")
            .field(FieldDeclaration::new("id", TypeRef::named("ID")))
            .declare();
        assert_eq!(user.name(), "User");
        assert!(user.as_object().is_some());

        let status = EnumDeclaration::new("Status")
            .value(EnumValueDeclaration::new("ACTIVE"))
            .declare();
        assert_eq!(status.name(), "Status");
        assert!(status.as_object().is_none());
    }

    #[test]
    fn test_same_declaration_is_identity() {
        let a = ObjectDeclaration::new("User").declare();
        let b = a.clone();
        let c = ObjectDeclaration::new("User").declare();

        assert!(a.same_declaration(&b));
        assert!(!a.same_declaration(&c));
    }

    #[test]
    fn test_field_deprecation() {
        let field = FieldDeclaration::new("legacyName", TypeRef::option(TypeRef::named("String")))
            .deprecated("use `name` instead");
        assert!(field.deprecated);
        assert_eq!(field.deprecation_reason.as_deref(), Some("use `name` instead"));
    }
}
