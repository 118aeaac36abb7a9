//! Backend schema resolution.
//!
//! The backend publishes a JSON-Schema-like document describing every agent
//! module. This module turns it into something a form can be built from:
//! - [`SchemaDocument`]: discriminator lookups per category and node type
//! - property resolution of `$ref` and `anyOf` with caller-wins merging
//! - [`classify_field`]: editor kind selection for a single property
//! - [`SchemaFormBuilder`]: field lists and default values per node type
//!
//! Resolution never fails. Missing mappings or definitions degrade to an
//! absent schema or an empty object schema.

mod document;
mod field;
mod form;
mod resolver;

pub use document::SchemaDocument;
pub use field::{FieldConfig, FieldKind, Widget, classify_field, is_field_ignored};
pub use form::{FormBuilder, FormField, NodeForm, SchemaFormBuilder};
pub use resolver::{MAX_RESOLUTION_DEPTH, definition_name, discriminator_options, has_discriminator};

/// Tracing target for schema operations.
pub const TRACING_TARGET: &str = "arag_workflow::schema";

pub(crate) const DEFS: &str = "$defs";
pub(crate) const REF: &str = "$ref";
pub(crate) const ANY_OF: &str = "anyOf";
pub(crate) const ONE_OF: &str = "oneOf";
