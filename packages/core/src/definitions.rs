//! Root definitions held by the [`Registry`](crate::Registry): the API,
//! resources, user types, and media types (with their views and links).
//!
//! Also home to the media type identifier helpers. Identifiers follow the
//! `type/subtype; param=value` shape; parameters are kept sorted so that two
//! spellings of the same identifier compare equal once canonicalized.

use std::collections::BTreeMap;

use crate::types::{AttributeDefinition, DataType, Metadata, TypeId};

/// Name of the view every media type must define and every projection
/// exposes.
pub const DEFAULT_VIEW: &str = "default";

/// Preferred view for rendering a link target.
pub const LINK_VIEW: &str = "link";

/// Pseudo-attribute materialized from a media type's links during projection.
pub const LINKS_ATTRIBUTE: &str = "links";

/// A named type: a name plus an underlying attribute carrying the type,
/// description, validation, and example.
#[derive(Debug, Clone, PartialEq)]
pub struct UserTypeDefinition {
    pub type_name: String,
    pub attribute: AttributeDefinition,
}

impl UserTypeDefinition {
    pub fn new(type_name: impl Into<String>, attribute: AttributeDefinition) -> Self {
        Self {
            type_name: type_name.into(),
            attribute,
        }
    }

    pub fn description(&self) -> &str {
        &self.attribute.description
    }
}

/// One attribute listed in a view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewAttribute {
    /// View to render this attribute with when its type is a media type.
    pub view: Option<String>,
    pub metadata: Metadata,
}

/// A named, partial projection of a media type's attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewDefinition {
    pub name: String,
    pub attributes: BTreeMap<String, ViewAttribute>,
}

impl ViewDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// A view listing `names` with no per-attribute overrides.
    pub fn with_attributes<S: AsRef<str>>(name: impl Into<String>, names: &[S]) -> Self {
        let mut view = Self::new(name);
        for n in names {
            view.attributes
                .insert(n.as_ref().to_string(), ViewAttribute::default());
        }
        view
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.attributes.contains_key(attribute)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }
}

/// A relationship from a media type attribute to the media type it holds,
/// rendered under the `links` pseudo-attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDefinition {
    /// Attribute of the parent media type the link points at.
    pub name: String,
    /// View of the target. When absent, `"link"` is used if the target
    /// defines it, otherwise `"default"`.
    pub view: Option<String>,
}

/// A user type extended with an identifier, views, and links.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaTypeDefinition {
    pub user_type: UserTypeDefinition,
    pub identifier: String,
    pub views: BTreeMap<String, ViewDefinition>,
    pub links: BTreeMap<String, LinkDefinition>,
}

impl MediaTypeDefinition {
    pub fn new(
        identifier: impl Into<String>,
        type_name: impl Into<String>,
        attribute: AttributeDefinition,
    ) -> Self {
        Self {
            user_type: UserTypeDefinition::new(type_name, attribute),
            identifier: identifier.into(),
            views: BTreeMap::new(),
            links: BTreeMap::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.user_type.type_name
    }

    pub fn attribute(&self) -> &AttributeDefinition {
        &self.user_type.attribute
    }

    pub fn has_view(&self, name: &str) -> bool {
        self.views.contains_key(name)
    }

    /// Visit views in sorted name order, stopping at the first error.
    pub fn iterate_views<E>(
        &self,
        mut visit: impl FnMut(&ViewDefinition) -> Result<(), E>,
    ) -> Result<(), E> {
        for view in self.views.values() {
            visit(view)?;
        }
        Ok(())
    }
}

/// An entry of the registry arena.
#[derive(Debug, Clone, PartialEq)]
pub enum NamedType {
    User(UserTypeDefinition),
    Media(MediaTypeDefinition),
}

impl NamedType {
    pub fn type_name(&self) -> &str {
        &self.user_type().type_name
    }

    pub fn user_type(&self) -> &UserTypeDefinition {
        match self {
            NamedType::User(ut) => ut,
            NamedType::Media(mt) => &mt.user_type,
        }
    }

    pub fn user_type_mut(&mut self) -> &mut UserTypeDefinition {
        match self {
            NamedType::User(ut) => ut,
            NamedType::Media(mt) => &mut mt.user_type,
        }
    }

    pub fn attribute(&self) -> &AttributeDefinition {
        &self.user_type().attribute
    }

    pub fn attribute_mut(&mut self) -> &mut AttributeDefinition {
        &mut self.user_type_mut().attribute
    }

    pub fn as_media(&self) -> Option<&MediaTypeDefinition> {
        match self {
            NamedType::Media(mt) => Some(mt),
            NamedType::User(_) => None,
        }
    }

    pub fn as_media_mut(&mut self) -> Option<&mut MediaTypeDefinition> {
        match self {
            NamedType::Media(mt) => Some(mt),
            NamedType::User(_) => None,
        }
    }

    pub fn is_media(&self) -> bool {
        matches!(self, NamedType::Media(_))
    }

    /// The [`DataType`] node that refers to this definition at `id`.
    pub fn data_type(&self, id: TypeId) -> DataType {
        match self {
            NamedType::User(_) => DataType::UserType(id),
            NamedType::Media(_) => DataType::MediaType(id),
        }
    }

    /// Human-readable provenance used in error contexts.
    pub fn label(&self) -> String {
        match self {
            NamedType::User(ut) => format!("type {:?}", ut.type_name),
            NamedType::Media(mt) => format!("media type {:?}", mt.identifier),
        }
    }
}

/// The API root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiDefinition {
    pub name: String,
    pub title: String,
    pub description: String,
    pub version: String,
    pub metadata: Metadata,
}

/// A resource: a named group of actions sharing a default media type.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDefinition {
    pub name: String,
    pub description: String,
    pub default_media: Option<DataType>,
    pub actions: Vec<ActionDefinition>,
}

impl ResourceDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            default_media: None,
            actions: Vec::new(),
        }
    }

    pub fn action(&self, name: &str) -> Option<&ActionDefinition> {
        self.actions.iter().find(|a| a.name == name)
    }
}

/// An action contract: payload, parameters, and responses.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDefinition {
    pub name: String,
    pub description: String,
    pub payload: Option<AttributeDefinition>,
    /// Object attribute holding the parameters and their required list.
    pub params: Option<AttributeDefinition>,
    pub responses: Vec<ResponseDefinition>,
}

impl ActionDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            payload: None,
            params: None,
            responses: Vec::new(),
        }
    }
}

/// A declared response of an action.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDefinition {
    pub name: String,
    pub status: u16,
    pub media_type: Option<DataType>,
    pub view: Option<String>,
}

// --- identifiers -------------------------------------------------------------

/// Lower-case the base, append `/json` when there is no subtype, and sort
/// parameters.
///
/// `"application/vnd.Bottle+json; b=2; a=1"` → `"application/vnd.bottle+json; a=1; b=2"`
pub fn normalize_identifier(identifier: &str) -> String {
    let (mut base, params) = parse_media_type(identifier);
    if !base.contains('/') {
        base.push_str("/json");
    }
    format_media_type(&base, &params)
}

/// The identifier used for registry lookups: normalized, with any `+suffix`
/// removed from the base.
///
/// `"application/vnd.menu+json"` and `"application/vnd.menu"` share the
/// canonical form `"application/vnd.menu"`.
pub fn canonical_identifier(identifier: &str) -> String {
    let (mut base, params) = parse_media_type(&normalize_identifier(identifier));
    if let Some(i) = base.find('+') {
        base.truncate(i);
    }
    format_media_type(&base, &params)
}

/// Default type name for a media type identifier: the camel-cased last
/// `.`-segment, cut at `/` and `+`.
///
/// `"application/vnd.menu+json"` → `"Menu"`, `"mt/json"` → `"Mt"`.
pub fn type_name_from_identifier(identifier: &str) -> String {
    let (base, _) = parse_media_type(identifier);
    let last = base.rsplit('.').next().unwrap_or(&base);
    let last = last.split('/').next().unwrap_or(last);
    let last = last.split('+').next().unwrap_or(last);
    camel_case(last)
}

/// `identifier` with its `view` parameter set to `view`.
pub fn project_identifier(identifier: &str, view: &str) -> String {
    let (base, mut params) = parse_media_type(identifier);
    params.insert("view".to_string(), view.to_string());
    format_media_type(&base, &params)
}

/// `identifier` with its `type` parameter set to `collection`.
pub fn collection_identifier(identifier: &str) -> String {
    let (base, mut params) = parse_media_type(&normalize_identifier(identifier));
    params.insert("type".to_string(), "collection".to_string());
    format_media_type(&base, &params)
}

/// Type name of a projection: unchanged for the default view, suffixed with
/// the camel-cased view name otherwise.
pub fn projected_type_name(type_name: &str, view: &str) -> String {
    if view == DEFAULT_VIEW {
        type_name.to_string()
    } else {
        format!("{}{}", type_name, camel_case(view))
    }
}

/// `"link-view"` → `"LinkView"`.
pub fn camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for part in s.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

fn parse_media_type(identifier: &str) -> (String, BTreeMap<String, String>) {
    let mut parts = identifier.split(';');
    let base = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
    let mut params = BTreeMap::new();
    for part in parts {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.split_once('=') {
            Some((k, v)) => {
                params.insert(
                    k.trim().to_ascii_lowercase(),
                    v.trim().trim_matches('"').to_string(),
                );
            }
            None => {
                params.insert(part.to_ascii_lowercase(), String::new());
            }
        }
    }
    (base, params)
}

fn format_media_type(base: &str, params: &BTreeMap<String, String>) -> String {
    let mut out = base.to_string();
    for (k, v) in params {
        out.push_str("; ");
        out.push_str(k);
        out.push('=');
        out.push_str(v);
    }
    out
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Object, Primitive};

    #[test]
    fn normalize_appends_subtype_and_sorts_params() {
        assert_eq!(normalize_identifier("mt"), "mt/json");
        assert_eq!(
            normalize_identifier("application/vnd.Bottle+json; b=2; a=1"),
            "application/vnd.bottle+json; a=1; b=2"
        );
    }

    #[test]
    fn canonical_strips_suffix() {
        assert_eq!(
            canonical_identifier("application/vnd.menu+json"),
            canonical_identifier("application/vnd.menu")
        );
        assert_eq!(canonical_identifier("mt"), "mt/json");
    }

    #[test]
    fn type_names_from_identifiers() {
        assert_eq!(type_name_from_identifier("application/vnd.test"), "Test");
        assert_eq!(type_name_from_identifier("application/vnd.menu+json"), "Menu");
        assert_eq!(type_name_from_identifier("mt/json"), "Mt");
        assert_eq!(type_name_from_identifier("application/vnd.acme.error"), "Error");
    }

    #[test]
    fn project_identifier_sets_view_param() {
        assert_eq!(
            project_identifier("application/vnd.bottle+json", "tiny"),
            "application/vnd.bottle+json; view=tiny"
        );
        assert_eq!(
            project_identifier("application/vnd.bottle; view=default", "tiny"),
            "application/vnd.bottle; view=tiny"
        );
    }

    #[test]
    fn collection_identifier_adds_type_param() {
        assert_eq!(
            collection_identifier("application/vnd.menu"),
            "application/vnd.menu; type=collection"
        );
    }

    #[test]
    fn projected_type_names() {
        assert_eq!(projected_type_name("Bottle", "default"), "Bottle");
        assert_eq!(projected_type_name("Bottle", "tiny"), "BottleTiny");
        assert_eq!(projected_type_name("Bottle", "extra-full"), "BottleExtraFull");
    }

    #[test]
    fn iterate_views_is_sorted_and_propagates_errors() {
        let mut mt = MediaTypeDefinition::new(
            "application/vnd.x",
            "X",
            AttributeDefinition::new(Object::new()),
        );
        for name in ["d", "c", "a", "b"] {
            mt.views.insert(name.into(), ViewDefinition::new(name));
        }
        let mut seen = Vec::new();
        let ok: Result<(), ()> = mt.iterate_views(|v| {
            seen.push(v.name.clone());
            Ok(())
        });
        assert_eq!(ok, Ok(()));
        assert_eq!(seen, vec!["a", "b", "c", "d"]);

        let mut seen = Vec::new();
        let err = mt.iterate_views(|v| {
            if seen.len() > 2 {
                return Err("foo");
            }
            seen.push(v.name.clone());
            Ok(())
        });
        assert_eq!(err, Err("foo"));
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[test]
    fn named_type_labels() {
        let ut = NamedType::User(UserTypeDefinition::new(
            "Bottle",
            AttributeDefinition::new(Primitive::String),
        ));
        assert_eq!(ut.label(), "type \"Bottle\"");
        assert!(!ut.is_media());
        assert_eq!(ut.data_type(TypeId(3)), DataType::UserType(TypeId(3)));
    }
}
