//! Type declaration model for Trellis.
//!
//! This crate is the output format of the (external) type declaration
//! collaborator: host-side descriptors for object, scalar and enum types,
//! plus the directive declarations a schema is built from. It carries no
//! engine or execution knowledge; the orchestration core in `trellis`
//! consumes these declarations to populate its type registry.
//!
//! Declarations are immutable once built and are shared behind `Arc`, so
//! the same declaration can appear at several points of a schema (for
//! example a `User` type referenced by both a root field and a list
//! field) without counting as a name collision.

pub mod declaration;
pub mod directive;
pub mod type_ref;

pub use declaration::{
    ArgumentDeclaration, EnumDeclaration, EnumValueDeclaration, FieldDeclaration,
    ObjectDeclaration, ScalarDeclaration, TypeDeclaration,
};
pub use directive::{DirectiveDeclaration, DirectiveLocation};
pub use type_ref::TypeRef;
