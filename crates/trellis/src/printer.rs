//! SDL printing.
//!
//! Walks the registry in registration order and renders the schema as
//! SDL text. Built-in scalars and the baseline directives are elided;
//! bare type references render non-null, `Option` wrappers render
//! nullable.

use crate::engine::{DirectiveDescriptor, QueryEngine};
use crate::registry::TypeRegistry;
use crate::schema::Schema;
use trellis_types::{
    ArgumentDeclaration, EnumDeclaration, FieldDeclaration, ObjectDeclaration, ScalarDeclaration,
    TypeDeclaration, TypeRef,
};

/// Prints a schema as SDL.
pub fn print_schema<E: QueryEngine>(schema: &Schema<E>) -> String {
    let mut out = String::new();

    out.push_str("schema {\n");
    out.push_str(&format!("  query: {}\n", schema.query_type()));
    if let Some(mutation) = schema.mutation_type() {
        out.push_str(&format!("  mutation: {mutation}\n"));
    }
    if let Some(subscription) = schema.subscription_type() {
        out.push_str(&format!("  subscription: {subscription}\n"));
    }
    out.push_str("}\n");

    for directive in schema.directives().iter().filter(|d| !d.built_in) {
        out.push('\n');
        print_directive(&mut out, directive);
    }

    for concrete in schema.registry().iter() {
        if TypeRegistry::is_builtin_scalar(concrete.name()) {
            continue;
        }
        out.push('\n');
        match concrete.definition() {
            TypeDeclaration::Object(object) => print_object(&mut out, object),
            TypeDeclaration::Scalar(scalar) => print_scalar(&mut out, scalar),
            TypeDeclaration::Enum(enumeration) => print_enum(&mut out, enumeration),
        }
    }

    out
}

fn print_directive(out: &mut String, directive: &DirectiveDescriptor) {
    if let Some(description) = &directive.description {
        print_description(out, description, "");
    }
    out.push_str(&format!("directive @{}", directive.name));
    print_arguments(out, directive.arguments.values());
    if directive.repeatable {
        out.push_str(" repeatable");
    }
    if !directive.locations.is_empty() {
        let locations: Vec<&str> = directive.locations.iter().map(|l| l.as_str()).collect();
        out.push_str(&format!(" on {}", locations.join(" | ")));
    }
    out.push('\n');
}

fn print_object(out: &mut String, object: &ObjectDeclaration) {
    if let Some(description) = &object.description {
        print_description(out, description, "");
    }
    if object.fields.is_empty() {
        out.push_str(&format!("type {}\n", object.name));
        return;
    }
    out.push_str(&format!("type {} {{\n", object.name));
    for field in object.fields.values() {
        print_field(out, field);
    }
    out.push_str("}\n");
}

fn print_field(out: &mut String, field: &FieldDeclaration) {
    if let Some(description) = &field.description {
        print_description(out, description, "  ");
    }
    out.push_str(&format!("  {}", field.name));
    print_arguments(out, field.arguments.values());
    out.push_str(&format!(": {}", render_type_ref(&field.ty)));
    if field.deprecated {
        print_deprecation(out, field.deprecation_reason.as_deref());
    }
    out.push('\n');
}

fn print_scalar(out: &mut String, scalar: &ScalarDeclaration) {
    if let Some(description) = &scalar.description {
        print_description(out, description, "");
    }
    out.push_str(&format!("scalar {}\n", scalar.name));
}

fn print_enum(out: &mut String, enumeration: &EnumDeclaration) {
    if let Some(description) = &enumeration.description {
        print_description(out, description, "");
    }
    out.push_str(&format!("enum {} {{\n", enumeration.name));
    for value in &enumeration.values {
        if let Some(description) = &value.description {
            print_description(out, description, "  ");
        }
        out.push_str(&format!("  {}", value.name));
        if value.deprecated {
            print_deprecation(out, value.deprecation_reason.as_deref());
        }
        out.push('\n');
    }
    out.push_str("}\n");
}

fn print_arguments<'a>(out: &mut String, arguments: impl Iterator<Item = &'a ArgumentDeclaration>) {
    let rendered: Vec<String> = arguments
        .map(|argument| {
            let mut text = format!("{}: {}", argument.name, render_type_ref(&argument.ty));
            if let Some(default) = &argument.default_value {
                text.push_str(&format!(" = {default}"));
            }
            text
        })
        .collect();
    if !rendered.is_empty() {
        out.push_str(&format!("({})", rendered.join(", ")));
    }
}

fn print_description(out: &mut String, description: &str, indent: &str) {
    out.push_str(&format!("{indent}\"\"\"{description}\"\"\"\n"));
}

fn print_deprecation(out: &mut String, reason: Option<&str>) {
    match reason {
        Some(reason) => out.push_str(&format!(" @deprecated(reason: \"{reason}\")")),
        None => out.push_str(" @deprecated"),
    }
}

fn render_type_ref(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Option(inner) => render_nullable(inner),
        other => format!("{}!", render_nullable(other)),
    }
}

fn render_nullable(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Named(name) => name.clone(),
        TypeRef::Declared(declaration) => declaration.name().to_string(),
        TypeRef::List(inner) => format!("[{}]", render_type_ref(inner)),
        TypeRef::Option(inner) => render_nullable(inner),
    }
}
