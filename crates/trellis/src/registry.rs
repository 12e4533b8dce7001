//! Type registry: name-to-definition mapping built once per schema.
//!
//! The registry is populated exclusively while the schema is being
//! constructed and is read-only afterwards, so it is shared across
//! concurrent requests without locking.

use crate::error::SchemaError;
use indexmap::IndexMap;
use std::sync::Arc;
use trellis_types::{DirectiveDeclaration, ScalarDeclaration, TypeDeclaration, TypeRef};

/// Scalars every registry starts with.
pub const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// One registry entry: a named, immutable type definition.
#[derive(Debug, Clone)]
pub struct ConcreteType {
    name: String,
    definition: TypeDeclaration,
}

impl ConcreteType {
    /// Returns the type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the definition payload.
    pub fn definition(&self) -> &TypeDeclaration {
        &self.definition
    }
}

/// The schema's mapping from type name to definition.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: IndexMap<String, ConcreteType>,
}

impl TypeRegistry {
    /// Looks up a type by name.
    pub fn get(&self, name: &str) -> Option<&ConcreteType> {
        self.types.get(name)
    }

    /// Returns true if a type with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Iterates entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ConcreteType> {
        self.types.values()
    }

    /// Returns the number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Returns true if the name is one of the pre-seeded scalars.
    pub fn is_builtin_scalar(name: &str) -> bool {
        BUILTIN_SCALARS.contains(&name)
    }
}

/// Construction-time registry builder.
///
/// Registers every declaration reachable from the root types, keeping a
/// list of `Named` back references to verify once registration is done.
#[derive(Debug)]
pub(crate) struct RegistryBuilder {
    types: IndexMap<String, ConcreteType>,
    named_refs: Vec<(String, String)>,
}

impl RegistryBuilder {
    /// Creates a builder pre-seeded with the built-in scalars.
    pub fn new() -> Self {
        let mut types = IndexMap::new();
        for name in BUILTIN_SCALARS {
            let definition = ScalarDeclaration::new(name)
                .with_description(format!("Built-in {name} scalar"))
                .declare();
            types.insert(
                name.to_string(),
                ConcreteType {
                    name: name.to_string(),
                    definition,
                },
            );
        }
        Self {
            types,
            named_refs: Vec::new(),
        }
    }

    /// Registers a declaration and everything reachable from it.
    ///
    /// Re-registering the same declaration instance is idempotent; a
    /// different declaration under an existing name is a configuration
    /// error.
    pub fn register(&mut self, declaration: &TypeDeclaration) -> Result<(), SchemaError> {
        let name = declaration.name();
        if let Some(existing) = self.types.get(name) {
            if existing.definition.same_declaration(declaration) {
                return Ok(());
            }
            return Err(SchemaError::DuplicateTypeName {
                name: name.to_string(),
            });
        }

        tracing::debug!(type_name = name, "registering type");
        self.types.insert(
            name.to_string(),
            ConcreteType {
                name: name.to_string(),
                definition: declaration.clone(),
            },
        );

        if let TypeDeclaration::Object(object) = declaration {
            for field in object.fields.values() {
                let referrer = format!("{}.{}", object.name, field.name);
                self.walk(&field.ty, &referrer)?;
                for argument in field.arguments.values() {
                    self.walk(&argument.ty, &format!("{referrer}({}:)", argument.name))?;
                }
            }
        }
        Ok(())
    }

    /// Registers the argument types of a directive declaration.
    pub fn register_directive_arguments(
        &mut self,
        directive: &DirectiveDeclaration,
    ) -> Result<(), SchemaError> {
        for argument in directive.arguments.values() {
            let referrer = format!("@{}({}:)", directive.name, argument.name);
            self.walk(&argument.ty, &referrer)?;
        }
        Ok(())
    }

    fn walk(&mut self, ty: &TypeRef, referrer: &str) -> Result<(), SchemaError> {
        match ty {
            TypeRef::Named(name) => {
                self.named_refs.push((name.clone(), referrer.to_string()));
                Ok(())
            }
            TypeRef::Declared(declaration) => self.register(declaration),
            TypeRef::Option(inner) | TypeRef::List(inner) => self.walk(inner, referrer),
        }
    }

    /// Verifies all named references and finishes the registry.
    pub fn finish(self) -> Result<Arc<TypeRegistry>, SchemaError> {
        for (name, referrer) in &self.named_refs {
            if !self.types.contains_key(name) {
                return Err(SchemaError::UnknownType {
                    name: name.clone(),
                    referrer: referrer.clone(),
                });
            }
        }
        Ok(Arc::new(TypeRegistry { types: self.types }))
    }
}
