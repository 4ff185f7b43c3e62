//! Declarative API design engine.
//!
//! A design is a graph of named types (user types and media types), API and
//! resource roots, declared through builder blocks or a JSON
//! [`DesignDocument`]. The engine runs in two passes: the definition pass
//! executes every declaration block, and the finalize pass resolves names,
//! validates the whole graph, and fills in examples. Generators then read
//! the finalized [`Registry`] and query it with [`Registry::walk`] and
//! [`Registry::project`].
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | Attribute model: [`DataType`], [`AttributeDefinition`], [`ValidationDefinition`] |
//! | [`definitions`] | Root definitions: user types, media types, views, links, API, resources |
//! | [`registry`] | The [`Registry`] arena and its indices |
//! | [`dsl`] | Builders handed to declaration blocks |
//! | [`engine`] | [`Registry::run`]: the definition and finalize passes |
//! | [`graph`] | Walk, deep copy, and structural equality over cyclic graphs |
//! | [`project`] | View projection of media types |
//! | [`validation`] | Constraint checks run during finalize |
//! | [`example`] | Seeded example generation |
//! | [`document`] | JSON design documents |
//! | [`render`] | Human-readable text rendering |
//! | [`config`] | [`EngineConfig`], populated from the environment |
//! | [`error`] | [`DesignError`], [`ErrorList`], and their causes |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use apidesign::{Primitive, Registry};
//!
//! let mut reg = Registry::new();
//! let bottle = reg.define_media_type("application/vnd.bottle+json", |m| {
//!     m.attributes(|a| {
//!         a.attribute("id", Primitive::Integer);
//!         a.attribute("name", Primitive::String);
//!         a.required(&["id"]);
//!     });
//!     m.view("default", |v| {
//!         v.attribute("id").attribute("name");
//!     });
//!     m.view("tiny", |v| {
//!         v.attribute("id");
//!     });
//! });
//!
//! // Run both passes; every problem comes back at once.
//! reg.run()?;
//!
//! // Materialize the "tiny" view.
//! let tiny = reg.project(bottle.named_id().unwrap(), "tiny")?;
//! println!("{}", apidesign::render::render_media_type(&reg, tiny.media_type));
//! ```
//!
//! One registry is one design. It has no internal locking: run and mutate
//! it from one thread at a time, and [`Registry::reset`] it between
//! independent designs.

pub mod config;
pub mod definitions;
pub mod document;
pub mod dsl;
pub mod engine;
pub mod error;
pub mod example;
pub mod graph;
pub mod project;
pub mod registry;
pub mod render;
pub mod types;
pub mod validation;

pub use config::EngineConfig;
pub use definitions::{
    ActionDefinition, ApiDefinition, LinkDefinition, MediaTypeDefinition, NamedType,
    ResourceDefinition, ResponseDefinition, UserTypeDefinition, ViewAttribute, ViewDefinition,
};
pub use document::{DesignDocument, TypeExpr};
pub use dsl::{array_of, hash_of};
pub use error::{DesignError, ErrorList, ProjectionError, ValidationError};
pub use example::ExampleGenerator;
pub use project::Projection;
pub use registry::Registry;
pub use types::{
    Array, AttributeDefinition, DataType, Hash, Kind, Metadata, Object, Primitive, TypeId,
    ValidationDefinition,
};
pub use validation::{is_assignable, validate_attribute, validate_media_type, FORMATS};
