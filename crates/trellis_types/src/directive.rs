//! Directive declarations.

use crate::declaration::ArgumentDeclaration;
use indexmap::IndexMap;

/// A directive declaration supplied at schema construction.
#[derive(Debug, Clone)]
pub struct DirectiveDeclaration {
    pub name: String,
    pub description: Option<String>,
    pub arguments: IndexMap<String, ArgumentDeclaration>,
    pub locations: Vec<DirectiveLocation>,
    pub repeatable: bool,
}

impl DirectiveDeclaration {
    /// Creates a new directive declaration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            arguments: IndexMap::new(),
            locations: Vec::new(),
            repeatable: false,
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

    /// Adds a valid location.
    pub fn location(mut self, location: DirectiveLocation) -> Self {
        self.locations.push(location);
        self
    }

    /// Marks the directive repeatable.
    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }
}

/// Executable locations a directive may be applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveLocation {
    Query,
    Mutation,
    Subscription,
    Field,
    FragmentSpread,
    InlineFragment,
    VariableDefinition,
}

impl DirectiveLocation {
    /// Returns the SDL spelling of the location.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "QUERY",
            Self::Mutation => "MUTATION",
            Self::Subscription => "SUBSCRIPTION",
            Self::Field => "FIELD",
            Self::FragmentSpread => "FRAGMENT_SPREAD",
            Self::InlineFragment => "INLINE_FRAGMENT",
            Self::VariableDefinition => "VARIABLE_DEFINITION",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_ref::TypeRef;

    #[test]
    fn test_directive_builder() {
        let directive = DirectiveDeclaration::new("uppercase")
            .with_description("Upper-cases the resolved string")
            .argument(ArgumentDeclaration::new("enabled", TypeRef::named("Boolean")))
            .location(DirectiveLocation::Field);

        assert_eq!(directive.name, "uppercase");
        assert_eq!(directive.arguments.len(), 1);
        assert_eq!(directive.locations, vec![DirectiveLocation::Field]);
        assert!(!directive.repeatable);
    }

    #[test]
    fn test_location_spelling() {
        assert_eq!(DirectiveLocation::FragmentSpread.as_str(), "FRAGMENT_SPREAD");
    }
}
