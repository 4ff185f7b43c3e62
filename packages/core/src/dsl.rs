//! Builders handed to declaration blocks.
//!
//! Each root registered on the [`Registry`] gets a builder when its block
//! runs during the definition pass. Nested blocks (attributes, views, actions)
//! run immediately, depth first. Misuse is reported as a
//! [`DesignError::Declaration`] against the enclosing definition and never
//! stops other blocks from running.
//!
//! ```rust,ignore
//! use apidesign::{array_of, Primitive, Registry};
//!
//! let mut reg = Registry::new();
//! reg.define_media_type("application/vnd.bottle+json", |m| {
//!     m.description("A bottle of wine");
//!     m.attributes(|a| {
//!         a.attribute("id", Primitive::Integer);
//!         a.attribute_with("name", Primitive::String, |n| {
//!             n.min_length(2);
//!         });
//!         a.attribute("tags", array_of(Primitive::String));
//!         a.required(&["id", "name"]);
//!     });
//!     m.view("default", |v| {
//!         v.attribute("id").attribute("name");
//!     });
//!     m.view("tiny", |v| {
//!         v.attribute("id");
//!     });
//! });
//! reg.run()?;
//! ```

use serde_json::Value;

use crate::definitions::{
    ActionDefinition, ApiDefinition, LinkDefinition, ResourceDefinition, ResponseDefinition,
    ViewAttribute, ViewDefinition,
};
use crate::error::{DesignError, ValidationError};
use crate::registry::Registry;
use crate::types::{Array, AttributeDefinition, DataType, Hash, Object, Primitive, TypeId};
use crate::validation::FORMATS;

/// An array type whose element has no validation of its own.
pub fn array_of(elem: impl Into<DataType>) -> DataType {
    DataType::from(Array {
        elem: AttributeDefinition::new(elem),
    })
}

/// A hash type whose key and value have no validation of their own.
pub fn hash_of(key: impl Into<DataType>, elem: impl Into<DataType>) -> DataType {
    DataType::from(Hash {
        key: AttributeDefinition::new(key),
        elem: AttributeDefinition::new(elem),
    })
}

// --- attributes --------------------------------------------------------------

/// Builds one attribute: its type, nested attributes, validation, and
/// annotations.
pub struct AttributeBuilder<'r> {
    registry: &'r mut Registry,
    context: String,
    attribute: AttributeDefinition,
}

impl<'r> AttributeBuilder<'r> {
    pub(crate) fn new(
        registry: &'r mut Registry,
        context: String,
        attribute: AttributeDefinition,
    ) -> Self {
        Self {
            registry,
            context,
            attribute,
        }
    }

    pub(crate) fn finish(self) -> AttributeDefinition {
        self.attribute
    }

    /// The registry, for declaring further roots from inside a block.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut *self.registry
    }

    /// The attribute as built so far.
    pub fn current(&self) -> &AttributeDefinition {
        &self.attribute
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.attribute.description = description.into();
        self
    }

    /// Replace the attribute's type. Attributes declared so far are dropped
    /// when the previous type was an object.
    pub fn set_type(&mut self, data_type: impl Into<DataType>) -> &mut Self {
        self.attribute.data_type = data_type.into();
        self
    }

    /// Declare a child attribute with no further settings.
    pub fn attribute(&mut self, name: &str, data_type: impl Into<DataType>) -> &mut Self {
        self.attribute_with(name, data_type, |_| {})
    }

    /// Declare a child attribute and run `block` on it.
    ///
    /// Only legal when this attribute is an object; names must be unique.
    pub fn attribute_with<F>(&mut self, name: &str, data_type: impl Into<DataType>, block: F) -> &mut Self
    where
        F: FnOnce(&mut AttributeBuilder<'_>),
    {
        let problem = match self.attribute.data_type.as_object() {
            None => Some(format!(
                "attribute {:?} declared on a non-object type",
                name
            )),
            Some(o) if o.contains_key(name) => Some(format!("duplicate attribute {:?}", name)),
            Some(_) => None,
        };
        if let Some(message) = problem {
            self.declaration_error(message);
            return self;
        }

        let context = format!("{} attribute {:?}", self.context, name);
        let mut child = AttributeBuilder::new(
            &mut *self.registry,
            context,
            AttributeDefinition::new(data_type),
        );
        block(&mut child);
        let child = child.finish();
        if let Some(o) = self.attribute.data_type.as_object_mut() {
            o.insert(name, child);
        }
        self
    }

    /// Configure the element of an array, or the value of a hash.
    pub fn elem<F>(&mut self, block: F) -> &mut Self
    where
        F: FnOnce(&mut AttributeBuilder<'_>),
    {
        let context = format!("{} element", self.context);
        let slot = match &mut self.attribute.data_type {
            DataType::Array(a) => &mut a.elem,
            DataType::Hash(h) => &mut h.elem,
            _ => {
                self.declaration_error("elem used on a type that is neither array nor hash");
                return self;
            }
        };
        let taken = std::mem::replace(slot, AttributeDefinition::new(Primitive::Any));
        let mut builder = AttributeBuilder::new(&mut *self.registry, context, taken);
        block(&mut builder);
        *slot = builder.finish();
        self
    }

    /// Configure the key of a hash.
    pub fn key<F>(&mut self, block: F) -> &mut Self
    where
        F: FnOnce(&mut AttributeBuilder<'_>),
    {
        let context = format!("{} key", self.context);
        let DataType::Hash(h) = &mut self.attribute.data_type else {
            self.declaration_error("key used on a type that is not a hash");
            return self;
        };
        let taken = std::mem::replace(&mut h.key, AttributeDefinition::new(Primitive::Any));
        let mut builder = AttributeBuilder::new(&mut *self.registry, context, taken);
        block(&mut builder);
        h.key = builder.finish();
        self
    }

    /// Shorthand for [`Registry::collection_of`].
    pub fn collection_of(&mut self, identifier: &str) -> DataType {
        self.registry.collection_of(identifier)
    }

    // --- validation ----------------------------------------------------------

    pub fn required(&mut self, names: &[&str]) -> &mut Self {
        self.attribute.validation_mut().add_required(names);
        self
    }

    pub fn enum_values<I, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.attribute
            .validation_mut()
            .values
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Set the format. Names outside [`FORMATS`] are rejected here.
    pub fn format(&mut self, format: &str) -> &mut Self {
        if !FORMATS.contains(&format) {
            let error = DesignError::validation(
                self.context.clone(),
                ValidationError::UnknownFormat(format.to_string()),
            );
            self.registry.report(error);
            return self;
        }
        self.attribute.validation_mut().format = Some(format.to_string());
        self
    }

    pub fn pattern(&mut self, pattern: &str) -> &mut Self {
        self.attribute.validation_mut().pattern = Some(pattern.to_string());
        self
    }

    pub fn minimum(&mut self, minimum: f64) -> &mut Self {
        self.attribute.validation_mut().minimum = Some(minimum);
        self
    }

    pub fn maximum(&mut self, maximum: f64) -> &mut Self {
        self.attribute.validation_mut().maximum = Some(maximum);
        self
    }

    pub fn min_length(&mut self, min: usize) -> &mut Self {
        self.attribute.validation_mut().min_length = Some(min);
        self
    }

    pub fn max_length(&mut self, max: usize) -> &mut Self {
        self.attribute.validation_mut().max_length = Some(max);
        self
    }

    // --- annotations ---------------------------------------------------------

    pub fn metadata(&mut self, key: &str, values: &[&str]) -> &mut Self {
        self.attribute
            .metadata
            .entry(key.to_string())
            .or_default()
            .extend(values.iter().map(|v| v.to_string()));
        self
    }

    pub fn example(&mut self, example: impl Into<Value>) -> &mut Self {
        self.attribute.example = Some(example.into());
        self
    }

    pub fn default(&mut self, value: impl Into<Value>) -> &mut Self {
        self.attribute.default_value = Some(value.into());
        self
    }

    /// View used when this attribute's media type is rendered in a
    /// projection.
    pub fn view(&mut self, view: &str) -> &mut Self {
        self.attribute.view = Some(view.to_string());
        self
    }

    fn declaration_error(&mut self, message: impl Into<String>) {
        let error = DesignError::declaration(self.context.clone(), message);
        self.registry.report(error);
    }
}

// --- media types -------------------------------------------------------------

/// Builds a media type: attributes, views, and links.
pub struct MediaTypeBuilder<'r> {
    registry: &'r mut Registry,
    id: TypeId,
    context: String,
}

impl<'r> MediaTypeBuilder<'r> {
    pub(crate) fn new(registry: &'r mut Registry, id: TypeId, context: String) -> Self {
        Self {
            registry,
            id,
            context,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.registry.named_mut(self.id).attribute_mut().description = description.into();
        self
    }

    /// Override the type name derived from the identifier.
    pub fn type_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.registry.named_mut(self.id).user_type_mut().type_name = name.into();
        self
    }

    /// Declare the underlying attributes. The block starts from the
    /// attributes declared so far.
    pub fn attributes<F>(&mut self, block: F) -> &mut Self
    where
        F: FnOnce(&mut AttributeBuilder<'_>),
    {
        let att = self.registry.take_attribute(self.id);
        let mut builder = AttributeBuilder::new(&mut *self.registry, self.context.clone(), att);
        block(&mut builder);
        let att = builder.finish();
        *self.registry.named_mut(self.id).attribute_mut() = att;
        self
    }

    pub fn view<F>(&mut self, name: &str, block: F) -> &mut Self
    where
        F: FnOnce(&mut ViewBuilder),
    {
        let mut builder = ViewBuilder::new(name);
        block(&mut builder);
        let context = format!("{} view {:?}", self.context, name);
        for message in builder.problems.drain(..) {
            self.registry.report(DesignError::declaration(context.clone(), message));
        }

        let Some(mt) = self.registry.named_mut(self.id).as_media_mut() else {
            return self;
        };
        if mt.views.contains_key(name) {
            self.registry
                .report(DesignError::declaration(context, "duplicate view"));
            return self;
        }
        mt.views.insert(name.to_string(), builder.view);
        self
    }

    /// Link to attribute `name`, rendered with the target's link view.
    pub fn link(&mut self, name: &str) -> &mut Self {
        self.add_link(name, None)
    }

    pub fn link_with_view(&mut self, name: &str, view: &str) -> &mut Self {
        self.add_link(name, Some(view.to_string()))
    }

    /// Shorthand for [`Registry::collection_of`].
    pub fn collection_of(&mut self, identifier: &str) -> DataType {
        self.registry.collection_of(identifier)
    }

    fn add_link(&mut self, name: &str, view: Option<String>) -> &mut Self {
        let Some(mt) = self.registry.named_mut(self.id).as_media_mut() else {
            return self;
        };
        if mt.links.contains_key(name) {
            let context = format!("{} link {:?}", self.context, name);
            self.registry
                .report(DesignError::declaration(context, "duplicate link"));
            return self;
        }
        mt.links.insert(
            name.to_string(),
            LinkDefinition {
                name: name.to_string(),
                view,
            },
        );
        self
    }
}

/// Lists the attributes of one view.
pub struct ViewBuilder {
    view: ViewDefinition,
    problems: Vec<String>,
}

impl ViewBuilder {
    fn new(name: &str) -> Self {
        Self {
            view: ViewDefinition::new(name),
            problems: Vec::new(),
        }
    }

    pub fn attribute(&mut self, name: &str) -> &mut Self {
        self.attribute_with(name, |_| {})
    }

    /// List `name` and adjust its per-view settings.
    pub fn attribute_with<F>(&mut self, name: &str, block: F) -> &mut Self
    where
        F: FnOnce(&mut ViewAttribute),
    {
        if self.view.attributes.contains_key(name) {
            self.problems
                .push(format!("attribute {:?} listed twice", name));
            return self;
        }
        let mut att = ViewAttribute::default();
        block(&mut att);
        self.view.attributes.insert(name.to_string(), att);
        self
    }
}

// --- api and resources -------------------------------------------------------

pub struct ApiBuilder<'a> {
    api: &'a mut ApiDefinition,
}

impl<'a> ApiBuilder<'a> {
    pub(crate) fn new(api: &'a mut ApiDefinition) -> Self {
        Self { api }
    }

    pub fn title(&mut self, title: impl Into<String>) -> &mut Self {
        self.api.title = title.into();
        self
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.api.description = description.into();
        self
    }

    pub fn version(&mut self, version: impl Into<String>) -> &mut Self {
        self.api.version = version.into();
        self
    }

    pub fn metadata(&mut self, key: &str, values: &[&str]) -> &mut Self {
        self.api
            .metadata
            .entry(key.to_string())
            .or_default()
            .extend(values.iter().map(|v| v.to_string()));
        self
    }
}

pub struct ResourceBuilder<'r> {
    registry: &'r mut Registry,
    context: String,
    resource: ResourceDefinition,
}

impl<'r> ResourceBuilder<'r> {
    pub(crate) fn new(registry: &'r mut Registry, name: String) -> Self {
        Self {
            registry,
            context: format!("resource {:?}", name),
            resource: ResourceDefinition::new(name),
        }
    }

    pub(crate) fn finish(self) -> ResourceDefinition {
        self.resource
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.resource.description = description.into();
        self
    }

    /// Media type used by responses that do not name one.
    pub fn default_media(&mut self, media: impl Into<DataType>) -> &mut Self {
        self.resource.default_media = Some(media.into());
        self
    }

    pub fn action<F>(&mut self, name: &str, block: F) -> &mut Self
    where
        F: FnOnce(&mut ActionBuilder<'_>),
    {
        let context = format!("{} action {:?}", self.context, name);
        if self.resource.action(name).is_some() {
            self.registry
                .report(DesignError::declaration(context, "duplicate action"));
            return self;
        }
        let mut builder = ActionBuilder {
            registry: &mut *self.registry,
            context,
            action: ActionDefinition::new(name),
        };
        block(&mut builder);
        let action = builder.action;
        self.resource.actions.push(action);
        self
    }
}

pub struct ActionBuilder<'r> {
    registry: &'r mut Registry,
    context: String,
    action: ActionDefinition,
}

impl<'r> ActionBuilder<'r> {
    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.action.description = description.into();
        self
    }

    pub fn payload(&mut self, data_type: impl Into<DataType>) -> &mut Self {
        self.payload_with(data_type, |_| {})
    }

    pub fn payload_with<F>(&mut self, data_type: impl Into<DataType>, block: F) -> &mut Self
    where
        F: FnOnce(&mut AttributeBuilder<'_>),
    {
        let context = format!("{} payload", self.context);
        let mut builder = AttributeBuilder::new(
            &mut *self.registry,
            context,
            AttributeDefinition::new(data_type),
        );
        block(&mut builder);
        self.action.payload = Some(builder.finish());
        self
    }

    /// Declare parameters as attributes of an object. Repeated calls add to
    /// the same object.
    pub fn params<F>(&mut self, block: F) -> &mut Self
    where
        F: FnOnce(&mut AttributeBuilder<'_>),
    {
        let context = format!("{} params", self.context);
        let params = self
            .action
            .params
            .take()
            .unwrap_or_else(|| AttributeDefinition::new(Object::new()));
        let mut builder = AttributeBuilder::new(&mut *self.registry, context, params);
        block(&mut builder);
        self.action.params = Some(builder.finish());
        self
    }

    /// A response without a body.
    pub fn response(&mut self, name: &str, status: u16) -> &mut Self {
        self.add_response(name, status, None, None)
    }

    /// A response rendering `media` with `view` (`"default"` when `None`).
    pub fn response_media(
        &mut self,
        name: &str,
        status: u16,
        media: impl Into<DataType>,
        view: Option<&str>,
    ) -> &mut Self {
        self.add_response(name, status, Some(media.into()), view.map(str::to_string))
    }

    fn add_response(
        &mut self,
        name: &str,
        status: u16,
        media_type: Option<DataType>,
        view: Option<String>,
    ) -> &mut Self {
        if self.action.responses.iter().any(|r| r.name == name) {
            let context = format!("{} response {:?}", self.context, name);
            self.registry
                .report(DesignError::declaration(context, "duplicate response"));
            return self;
        }
        self.action.responses.push(ResponseDefinition {
            name: name.to_string(),
            status,
            media_type,
            view,
        });
        self
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DesignError;
    use serde_json::json;

    fn errors(reg: &Registry) -> Vec<String> {
        reg.errors.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn type_block_declares_attributes() {
        let mut reg = Registry::new();
        let dt = reg.define_type("bar", |t| {
            t.description("A bar");
            t.attribute_with("attName", Primitive::String, |a| {
                a.enum_values(["red", "blue"]);
            });
            t.required(&["attName"]);
        });
        reg.run_definitions();
        let named = reg.named(dt.named_id().unwrap());
        let att = named.attribute();
        assert_eq!(att.description, "A bar");
        assert!(att.is_required("attName"));
        let child = att.data_type.as_object().unwrap().get("attName").unwrap();
        assert_eq!(
            child.validation.as_ref().unwrap().values,
            vec![json!("red"), json!("blue")]
        );
        assert!(reg.errors.is_empty());
    }

    #[test]
    fn duplicate_attribute_is_a_declaration_error() {
        let mut reg = Registry::new();
        reg.define_type("bar", |t| {
            t.attribute("a", Primitive::String);
            t.attribute("a", Primitive::Integer);
        });
        reg.run_definitions();
        assert_eq!(
            errors(&reg),
            vec!["type \"bar\": duplicate attribute \"a\"".to_string()]
        );
    }

    #[test]
    fn attribute_on_non_object_is_a_declaration_error() {
        let mut reg = Registry::new();
        reg.define_type("bar", |t| {
            t.attribute_with("a", Primitive::String, |a| {
                a.attribute("nested", Primitive::Integer);
            });
        });
        reg.run_definitions();
        assert!(matches!(
            reg.errors.as_slice(),
            [DesignError::Declaration { context, .. }] if context == "type \"bar\" attribute \"a\""
        ));
    }

    #[test]
    fn unknown_format_is_rejected_at_declaration() {
        let mut reg = Registry::new();
        reg.define_type("bar", |t| {
            t.attribute_with("a", Primitive::String, |a| {
                a.format("shoe-size");
            });
        });
        reg.run_definitions();
        assert_eq!(reg.errors.len(), 1);
        assert_eq!(
            reg.errors[0].as_validation(),
            Some(&ValidationError::UnknownFormat("shoe-size".into()))
        );
    }

    #[test]
    fn elem_and_key_configure_composites() {
        let mut reg = Registry::new();
        let dt = reg.define_type("T", |t| {
            t.attribute_with("tags", array_of(Primitive::String), |a| {
                a.elem(|e| {
                    e.min_length(1);
                });
            });
            t.attribute_with("scores", hash_of(Primitive::String, Primitive::Integer), |h| {
                h.key(|k| {
                    k.pattern("^[a-z]+$");
                })
                .elem(|v| {
                    v.minimum(0.0);
                });
            });
        });
        reg.run_definitions();
        let obj = reg.object_of(&dt).unwrap();
        let tags = obj.get("tags").unwrap().data_type.as_array().unwrap();
        assert_eq!(tags.elem.validation.as_ref().unwrap().min_length, Some(1));
        let scores = obj.get("scores").unwrap().data_type.as_hash().unwrap();
        assert!(scores.key.validation.as_ref().unwrap().pattern.is_some());
        assert_eq!(scores.elem.validation.as_ref().unwrap().minimum, Some(0.0));
    }

    #[test]
    fn media_type_builder_records_views_and_links() {
        let mut reg = Registry::new();
        let dt = reg.define_media_type("application/vnd.bottle", |m| {
            m.type_name("Bottle");
            m.attributes(|a| {
                a.attribute("id", Primitive::Integer);
                a.attribute("account", "application/vnd.account");
            });
            m.link("account");
            m.view("default", |v| {
                v.attribute("id").attribute("links");
            });
            m.view("default", |_| {});
        });
        reg.run_definitions();
        let mt = reg.media(dt.named_id().unwrap()).unwrap();
        assert_eq!(mt.type_name(), "Bottle");
        assert_eq!(mt.views["default"].names().collect::<Vec<_>>(), vec!["id", "links"]);
        assert_eq!(mt.links["account"].view, None);
        assert_eq!(
            errors(&reg),
            vec!["media type \"application/vnd.bottle\" view \"default\": duplicate view".to_string()]
        );
    }

    #[test]
    fn resource_actions_collect_responses() {
        let mut reg = Registry::new();
        reg.define_resource("bottle", |r| {
            r.default_media("application/vnd.bottle");
            r.action("show", |a| {
                a.params(|p| {
                    p.attribute("id", Primitive::Integer);
                    p.required(&["id"]);
                });
                a.response_media("OK", 200, "application/vnd.bottle", Some("tiny"));
                a.response("NotFound", 404);
            });
            r.action("show", |_| {});
        });
        reg.run_definitions();
        let res = reg.resource("bottle").unwrap();
        let show = res.action("show").unwrap();
        assert_eq!(show.responses.len(), 2);
        assert_eq!(show.responses[0].view.as_deref(), Some("tiny"));
        assert!(show.params.as_ref().unwrap().is_required("id"));
        assert_eq!(reg.errors.len(), 1);
    }
}
