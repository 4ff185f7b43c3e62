//! Declarative design documents.
//!
//! A [`DesignDocument`] describes a whole design as JSON and loads into a
//! [`Registry`] as ordinary registrations, so documents and hand-written
//! declaration blocks go through the same two passes.
//!
//! ```json
//! {
//!   "api": { "name": "cellar", "title": "The virtual wine cellar" },
//!   "types": [
//!     { "name": "BottlePayload",
//!       "attributes": { "name": { "type": "String", "min_length": 2 } },
//!       "required": ["name"] }
//!   ],
//!   "media_types": [
//!     { "identifier": "application/vnd.bottle+json",
//!       "attributes": {
//!         "id": { "type": "Integer" },
//!         "account": { "type": "application/vnd.account" },
//!         "tags": { "type": { "array_of": "String" } }
//!       },
//!       "links": ["account"],
//!       "views": { "default": ["id", "tags", "links"], "tiny": ["id"] } }
//!   ],
//!   "resources": [
//!     { "name": "bottle", "default_media": "application/vnd.bottle",
//!       "actions": [
//!         { "name": "show",
//!           "responses": [ { "name": "OK", "status": 200,
//!                            "media_type": "application/vnd.bottle", "view": "tiny" } ] }
//!       ] }
//!   ]
//! }
//! ```
//!
//! Type expressions are primitive names (`"String"`, `"UUID"`, ...),
//! `"Object"`, `{"array_of": T}`, `{"hash_of": [K, V]}`,
//! `{"collection_of": "<identifier>"}`, or any other string, which names a
//! user type or media type resolved during finalize.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dsl::{array_of, hash_of, AttributeBuilder, MediaTypeBuilder};
use crate::registry::Registry;
use crate::types::{DataType, Metadata, Object, Primitive};

/// A complete design.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiDocument>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<TypeDocument>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media_types: Vec<MediaTypeDocument>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceDocument>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
}

/// A user type: a name plus its underlying attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDocument {
    pub name: String,
    #[serde(flatten)]
    pub attribute: AttributeDocument,
}

/// A media type: identifier, underlying attribute, views, and links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaTypeDocument {
    pub identifier: String,

    /// Overrides the name derived from the identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,

    #[serde(flatten)]
    pub attribute: AttributeDocument,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub views: BTreeMap<String, Vec<ViewEntry>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkEntry>,
}

/// One attribute with its type, children, validation, and annotations.
///
/// Without a `type`, an attribute with children is an object and a child
/// attribute without children is a string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeDocument {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_expr: Option<TypeExpr>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeDocument>,

    /// Settings of an array element or hash value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elem: Option<Box<AttributeDocument>>,

    /// Settings of a hash key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Box<AttributeDocument>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
}

/// A type expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeExpr {
    /// A primitive, `Object`, or the name of a user type or media type.
    Name(String),
    ArrayOf { array_of: Box<TypeExpr> },
    HashOf { hash_of: (Box<TypeExpr>, Box<TypeExpr>) },
    CollectionOf { collection_of: String },
}

/// An attribute listed in a view, bare or with its settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ViewEntry {
    Name(String),
    Detailed {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        view: Option<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        metadata: Metadata,
    },
}

/// A link, bare or with an explicit target view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkEntry {
    Name(String),
    Detailed {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        view: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_media: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<AttributeDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<AttributeDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub responses: Vec<ResponseDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseDocument {
    pub name: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
}

impl DesignDocument {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Register every definition of the document on `registry`. Nothing runs
    /// until [`Registry::run`].
    pub fn load(self, registry: &mut Registry) {
        if let Some(api) = self.api {
            let ApiDocument {
                name,
                title,
                description,
                version,
                metadata,
            } = api;
            registry.define_api(name, move |a| {
                a.title(title).description(description).version(version);
                for (key, values) in &metadata {
                    a.metadata(key, &as_strs(values));
                }
            });
        }

        for ty in self.types {
            registry.define_type(ty.name, move |t| {
                apply_attribute(t, ty.attribute, None);
            });
        }

        for mt in self.media_types {
            let MediaTypeDocument {
                identifier,
                type_name,
                attribute,
                views,
                links,
            } = mt;
            registry.define_media_type(identifier, move |m| {
                if let Some(name) = type_name {
                    m.type_name(name);
                }
                m.attributes(|a| apply_attribute(a, attribute, None));
                apply_views(m, views);
                for link in links {
                    match link {
                        LinkEntry::Name(name) | LinkEntry::Detailed { name, view: None } => {
                            m.link(&name);
                        }
                        LinkEntry::Detailed {
                            name,
                            view: Some(view),
                        } => {
                            m.link_with_view(&name, &view);
                        }
                    }
                }
            });
        }

        for resource in self.resources {
            let ResourceDocument {
                name,
                description,
                default_media,
                actions,
            } = resource;
            registry.define_resource(name, move |r| {
                r.description(description);
                if let Some(media) = default_media {
                    r.default_media(media);
                }
                for action in actions {
                    r.action(&action.name, |a| {
                        a.description(action.description);
                        if let Some(payload) = action.payload {
                            a.payload_with(Object::new(), |p| apply_attribute(p, payload, None));
                        }
                        if let Some(params) = action.params {
                            a.params(|p| apply_attribute(p, params, None));
                        }
                        for response in action.responses {
                            match response.media_type {
                                Some(media) => a.response_media(
                                    &response.name,
                                    response.status,
                                    media,
                                    response.view.as_deref(),
                                ),
                                None => a.response(&response.name, response.status),
                            };
                        }
                    });
                }
            });
        }
    }
}

impl TypeExpr {
    /// The data type this expression denotes. Collections are declared on
    /// `registry` as a side effect.
    pub fn into_data_type(self, registry: &mut Registry) -> DataType {
        match self {
            TypeExpr::Name(name) => match name.parse::<Primitive>() {
                Ok(p) => p.into(),
                Err(_) if name == "Object" => Object::new().into(),
                Err(_) => DataType::Reference(name),
            },
            TypeExpr::ArrayOf { array_of: elem } => array_of(elem.into_data_type(registry)),
            TypeExpr::HashOf {
                hash_of: (key, elem),
            } => {
                let key = key.into_data_type(registry);
                hash_of(key, elem.into_data_type(registry))
            }
            TypeExpr::CollectionOf { collection_of } => registry.collection_of(&collection_of),
        }
    }
}

// --- helpers -----------------------------------------------------------------

/// Apply `doc` to the attribute under construction. `fallback` is the type
/// used when the document neither names one nor lists children; `None`
/// keeps the current type.
fn apply_attribute(b: &mut AttributeBuilder<'_>, doc: AttributeDocument, fallback: Option<DataType>) {
    let data_type = match doc.type_expr {
        Some(expr) => Some(expr.into_data_type(b.registry_mut())),
        None if !doc.attributes.is_empty() => Some(Object::new().into()),
        None => fallback,
    };
    if let Some(dt) = data_type {
        b.set_type(dt);
    }
    if let Some(description) = doc.description {
        b.description(description);
    }

    for (name, child) in doc.attributes {
        b.attribute_with(&name, Primitive::String, |c| {
            apply_attribute(c, child, Some(Primitive::String.into()));
        });
    }
    if let Some(elem) = doc.elem {
        b.elem(|e| apply_attribute(e, *elem, None));
    }
    if let Some(key) = doc.key {
        b.key(|k| apply_attribute(k, *key, None));
    }

    if !doc.required.is_empty() {
        b.required(&as_strs(&doc.required));
    }
    if !doc.enum_values.is_empty() {
        b.enum_values(doc.enum_values);
    }
    if let Some(format) = &doc.format {
        b.format(format);
    }
    if let Some(pattern) = &doc.pattern {
        b.pattern(pattern);
    }
    if let Some(minimum) = doc.minimum {
        b.minimum(minimum);
    }
    if let Some(maximum) = doc.maximum {
        b.maximum(maximum);
    }
    if let Some(min) = doc.min_length {
        b.min_length(min);
    }
    if let Some(max) = doc.max_length {
        b.max_length(max);
    }
    if let Some(default) = doc.default {
        b.default(default);
    }
    if let Some(example) = doc.example {
        b.example(example);
    }
    for (key, values) in &doc.metadata {
        b.metadata(key, &as_strs(values));
    }
    if let Some(view) = &doc.view {
        b.view(view);
    }
}

fn apply_views(m: &mut MediaTypeBuilder<'_>, views: BTreeMap<String, Vec<ViewEntry>>) {
    for (name, entries) in views {
        m.view(&name, |v| {
            for entry in entries {
                match entry {
                    ViewEntry::Name(name) => {
                        v.attribute(&name);
                    }
                    ViewEntry::Detailed {
                        name,
                        view,
                        metadata,
                    } => {
                        v.attribute_with(&name, |att| {
                            att.view = view;
                            att.metadata = metadata;
                        });
                    }
                }
            }
        });
    }
}

fn as_strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DesignError;
    use serde_json::json;

    const CELLAR: &str = r#"{
        "api": { "name": "cellar", "title": "The virtual wine cellar", "version": "1.0" },
        "types": [
            { "name": "BottlePayload",
              "description": "Payload of bottle create and update",
              "attributes": {
                  "name": { "type": "String", "min_length": 2 },
                  "vintage": { "type": "Integer", "minimum": 1900, "maximum": 2030 },
                  "color": { "enum": ["red", "white", "rose"] }
              },
              "required": ["name", "vintage"] }
        ],
        "media_types": [
            { "identifier": "application/vnd.account",
              "attributes": { "id": { "type": "Integer" }, "name": {} },
              "views": { "default": ["id", "name"], "link": ["id"] } },
            { "identifier": "application/vnd.bottle+json",
              "description": "A bottle of wine",
              "attributes": {
                  "id": { "type": "Integer" },
                  "account": { "type": "application/vnd.account" },
                  "tags": { "type": { "array_of": "String" }, "elem": { "min_length": 1 } },
                  "ratings": { "type": { "hash_of": ["UUID", "Integer"] } }
              },
              "required": ["id"],
              "links": ["account"],
              "views": {
                  "default": ["id", "tags", { "name": "account", "view": "link" }, "links"],
                  "tiny": ["id"]
              } }
        ],
        "resources": [
            { "name": "bottle",
              "default_media": "application/vnd.bottle",
              "actions": [
                  { "name": "show",
                    "params": { "attributes": { "id": { "type": "Integer" } }, "required": ["id"] },
                    "responses": [
                        { "name": "OK", "status": 200,
                          "media_type": "application/vnd.bottle", "view": "tiny" },
                        { "name": "NotFound", "status": 404 }
                    ] },
                  { "name": "create",
                    "payload": { "type": "BottlePayload" },
                    "responses": [ { "name": "Created", "status": 201 } ] }
              ] }
        ]
    }"#;

    fn loaded(json: &str) -> Registry {
        let mut reg = Registry::new();
        DesignDocument::from_json(json).unwrap().load(&mut reg);
        reg
    }

    #[test]
    fn type_expressions_parse() {
        let parse = |v: Value| serde_json::from_value::<TypeExpr>(v).unwrap();
        assert_eq!(parse(json!("String")), TypeExpr::Name("String".into()));
        assert_eq!(
            parse(json!({"array_of": "Integer"})),
            TypeExpr::ArrayOf {
                array_of: Box::new(TypeExpr::Name("Integer".into()))
            }
        );
        assert_eq!(
            parse(json!({"hash_of": ["String", {"array_of": "UUID"}]})),
            TypeExpr::HashOf {
                hash_of: (
                    Box::new(TypeExpr::Name("String".into())),
                    Box::new(TypeExpr::ArrayOf {
                        array_of: Box::new(TypeExpr::Name("UUID".into()))
                    })
                )
            }
        );
        assert_eq!(
            parse(json!({"collection_of": "application/vnd.bottle"})),
            TypeExpr::CollectionOf {
                collection_of: "application/vnd.bottle".into()
            }
        );
    }

    #[test]
    fn cellar_document_loads_and_runs() {
        let mut reg = loaded(CELLAR);
        reg.run().unwrap();

        let api = reg.api().unwrap();
        assert_eq!(api.title, "The virtual wine cellar");

        let payload = reg.lookup("BottlePayload").unwrap();
        let obj = reg.object_of(&payload).unwrap();
        assert_eq!(obj.get("color").unwrap().data_type, DataType::from(Primitive::String));
        assert!(reg.named(payload.named_id().unwrap()).attribute().is_required("vintage"));

        let bottle = reg.find_media_type("application/vnd.bottle").unwrap();
        let mt = reg.media(bottle).unwrap();
        assert_eq!(mt.type_name(), "Bottle");
        assert_eq!(mt.attribute().description, "A bottle of wine");
        assert_eq!(
            mt.views["default"].attributes["account"].view.as_deref(),
            Some("link")
        );
        let bottle_obj = reg.object_of(&mt.attribute().data_type).unwrap();
        let account = reg.find_media_type("application/vnd.account").unwrap();
        assert_eq!(bottle_obj.get("account").unwrap().data_type, DataType::MediaType(account));
        let tags = bottle_obj.get("tags").unwrap().data_type.as_array().unwrap();
        assert_eq!(tags.elem.validation.as_ref().unwrap().min_length, Some(1));

        let show = reg.resource("bottle").unwrap().action("show").unwrap();
        assert_eq!(show.responses.len(), 2);
        assert!(show.params.as_ref().unwrap().is_required("id"));
        let create = reg.resource("bottle").unwrap().action("create").unwrap();
        assert_eq!(create.payload.as_ref().unwrap().data_type, payload);
    }

    #[test]
    fn unknown_reference_in_document_is_reported() {
        let mut reg = loaded(
            r#"{ "types": [ { "name": "A", "attributes": { "b": { "type": "Ghost" } } } ] }"#,
        );
        let errors = reg.run().unwrap_err();
        assert!(matches!(
            errors.iter().next(),
            Some(DesignError::Reference { name, .. }) if name == "Ghost"
        ));
    }

    #[test]
    fn collection_expression_declares_a_collection() {
        let mut reg = loaded(
            r#"{ "media_types": [
                { "identifier": "application/vnd.menu",
                  "attributes": { "children": { "type": { "collection_of": "application/vnd.menu" } } },
                  "views": { "default": ["children"] } } ] }"#,
        );
        reg.run().unwrap();
        let menu = reg.find_media_type("application/vnd.menu").unwrap();
        let obj = reg.object_of(&reg.named(menu).attribute().data_type).unwrap();
        let children = obj.get("children").unwrap().data_type.named_id().unwrap();
        assert!(reg.is_collection(children));
    }

    #[test]
    fn document_round_trips_through_serde() {
        let doc = DesignDocument::from_json(CELLAR).unwrap();
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(DesignDocument::from_json(&json).unwrap(), doc);
    }
}
