//! View projection: materializing one view of a media type as a media type
//! of its own.
//!
//! A projection of `(media type, view)` is a new media type, allocated in the
//! registry arena but not indexed by identifier, that:
//!
//! - keeps only the attributes the view lists, with nested media types
//!   replaced by their own projections;
//! - carries `view=<view>` in its identifier and `TypeName + CamelCase(view)`
//!   as its type name (no suffix for `default`);
//! - defines exactly one view, `default`, so consumers need no further
//!   projection;
//! - has no example.
//!
//! When the view lists `links` and the media type has no real `links`
//! attribute, a links user type is synthesized with one entry per declared
//! link (possibly none), each projected with the link's view (`link` if the
//! target defines it, otherwise `default`).
//!
//! Results are cached per `(canonical identifier, view)`. The cache entry is
//! inserted before recursing into nested media types, which is what makes
//! mutually referencing media types terminate. A failed projection rolls
//! back everything it allocated, including nested projections that were
//! cached while it was in progress.

use crate::definitions::{
    canonical_identifier, project_identifier, projected_type_name, MediaTypeDefinition, NamedType,
    UserTypeDefinition, ViewDefinition, DEFAULT_VIEW, LINKS_ATTRIBUTE, LINK_VIEW,
};
use crate::error::ProjectionError;
use crate::registry::Registry;
use crate::types::{Array, AttributeDefinition, DataType, Object, TypeId};

/// Result of [`Registry::project`]: the projected media type and, when the
/// view exposes links, the synthesized links type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection {
    pub media_type: TypeId,
    pub links: Option<TypeId>,
}

impl Registry {
    /// Project media type `id` onto `view`.
    ///
    /// A second call with the same media type and view returns the cached
    /// result until the next finalize clears the cache.
    pub fn project(&mut self, id: TypeId, view: &str) -> Result<Projection, ProjectionError> {
        if view.is_empty() {
            return Err(ProjectionError::EmptyView);
        }
        let identifier = match self.get(id) {
            Some(NamedType::Media(mt)) => mt.identifier.clone(),
            Some(other) => return Err(ProjectionError::NotMediaType(other.label())),
            None => return Err(ProjectionError::NotMediaType(format!("#{}", id.index()))),
        };
        let key = (canonical_identifier(&identifier), view.to_string());
        if let Some(cached) = self.projections.get(&key) {
            tracing::trace!(identifier = %identifier, view, "projection cache hit");
            return Ok(*cached);
        }

        let mark = self.arena.len();
        let result = if self.is_collection(id) {
            self.project_collection(id, view, key)
        } else {
            self.project_single(id, view, key)
        };
        if result.is_err() {
            self.rollback_projections(mark);
        }
        result
    }

    /// Forget every projection allocated at or after arena slot `mark`.
    /// Projections are never indexed, so nothing else refers to them.
    fn rollback_projections(&mut self, mark: usize) {
        self.projections.retain(|_, p| p.media_type.index() < mark);
        self.arena.truncate(mark);
        tracing::trace!(mark, "rolled back failed projection");
    }

    /// The view a link to `target` renders with: the explicit one, else
    /// `link` when the target defines it, else `default`.
    pub fn link_view(&self, target: TypeId, explicit: Option<&str>) -> String {
        if let Some(view) = explicit {
            return view.to_string();
        }
        match self.media(target) {
            Some(mt) if mt.has_view(LINK_VIEW) => LINK_VIEW.to_string(),
            _ => DEFAULT_VIEW.to_string(),
        }
    }

    fn project_single(
        &mut self,
        id: TypeId,
        view: &str,
        key: (String, String),
    ) -> Result<Projection, ProjectionError> {
        let Some(source) = self.media(id).cloned() else {
            return Err(ProjectionError::NotMediaType(format!("#{}", id.index())));
        };
        let Some(view_def) = source.views.get(view).cloned() else {
            return Err(ProjectionError::UnknownView {
                identifier: source.identifier.clone(),
                view: view.to_string(),
            });
        };
        let source_object = self
            .object_of(&source.attribute().data_type)
            .cloned()
            .unwrap_or_default();

        let type_name = projected_type_name(source.type_name(), view);
        let mut projected = MediaTypeDefinition::new(
            project_identifier(&source.identifier, view),
            type_name.clone(),
            AttributeDefinition::new(Object::new()),
        );
        let mut default_view = view_def.clone();
        default_view.name = DEFAULT_VIEW.to_string();
        projected.views.insert(DEFAULT_VIEW.to_string(), default_view);
        let projected_id = self.alloc(NamedType::Media(projected));

        let wants_links =
            view_def.contains(LINKS_ATTRIBUTE) && !source_object.contains_key(LINKS_ATTRIBUTE);
        let links_id = wants_links.then(|| {
            let links_name = format!("{type_name}Links");
            let description = format!(
                "{links_name} contains links to related resources of {type_name}."
            );
            self.alloc(NamedType::User(UserTypeDefinition::new(
                links_name,
                AttributeDefinition::new(Object::new()).with_description(description),
            )))
        });

        let projection = Projection {
            media_type: projected_id,
            links: links_id,
        };
        self.projections.insert(key, projection);

        let mut object = Object::new();
        for (name, view_att) in &view_def.attributes {
            if let Some(att) = source_object.get(name) {
                let mut att = self.dup_att(att);
                if let DataType::MediaType(target) = att.data_type {
                    let nested = view_att
                        .view
                        .clone()
                        .or_else(|| att.view.clone())
                        .unwrap_or_else(|| DEFAULT_VIEW.to_string());
                    let inner = self.project(target, &nested).map_err(|e| {
                        ProjectionError::Attribute {
                            attribute: name.clone(),
                            view: nested.clone(),
                            source: Box::new(e),
                        }
                    })?;
                    att.data_type = DataType::MediaType(inner.media_type);
                    att.view = None;
                }
                for (k, v) in &view_att.metadata {
                    att.metadata.insert(k.clone(), v.clone());
                }
                object.insert(name.clone(), att);
            } else if name == LINKS_ATTRIBUTE {
                if let Some(links_id) = links_id {
                    object.insert(
                        LINKS_ATTRIBUTE,
                        AttributeDefinition::new(DataType::UserType(links_id)),
                    );
                }
            } else {
                return Err(ProjectionError::UnknownAttribute {
                    identifier: source.identifier.clone(),
                    view: view.to_string(),
                    attribute: name.clone(),
                });
            }
        }

        if let Some(links_id) = links_id {
            let links_object = self.project_links(&source, &source_object)?;
            self.named_mut(links_id).attribute_mut().data_type = DataType::Object(links_object);
        }

        let source_att = source.attribute();
        let mut validation = source_att.validation.clone();
        if let Some(v) = validation.as_mut() {
            v.required.retain(|r| object.contains_key(r));
        }
        let description = if source_att.description.is_empty() {
            format!("{} media type ({} view)", source.type_name(), view)
        } else {
            format!("{} ({} view)", source_att.description, view)
        };
        let att = self.named_mut(projected_id).attribute_mut();
        att.data_type = DataType::Object(object);
        att.description = description;
        att.metadata = source_att.metadata.clone();
        att.validation = validation.filter(|v| !v.is_empty());
        att.example = None;

        tracing::debug!(identifier = %source.identifier, view, "projected media type");
        Ok(projection)
    }

    fn project_links(
        &mut self,
        source: &MediaTypeDefinition,
        source_object: &Object,
    ) -> Result<Object, ProjectionError> {
        let mut links = Object::new();
        for (name, link) in &source.links {
            let Some(att) = source_object.get(&link.name) else {
                return Err(ProjectionError::UnknownLinkAttribute {
                    identifier: source.identifier.clone(),
                    link: name.clone(),
                });
            };
            let DataType::MediaType(target) = att.data_type else {
                return Err(ProjectionError::LinkTargetNotMediaType {
                    identifier: source.identifier.clone(),
                    link: name.clone(),
                });
            };
            let view = self.link_view(target, link.view.as_deref());
            let inner = self
                .project(target, &view)
                .map_err(|e| ProjectionError::Attribute {
                    attribute: name.clone(),
                    view: view.clone(),
                    source: Box::new(e),
                })?;
            let mut entry = AttributeDefinition::new(DataType::MediaType(inner.media_type));
            entry.description = att.description.clone();
            entry.metadata = att.metadata.clone();
            links.insert(name.clone(), entry);
        }
        Ok(links)
    }

    fn project_collection(
        &mut self,
        id: TypeId,
        view: &str,
        key: (String, String),
    ) -> Result<Projection, ProjectionError> {
        let Some(source) = self.media(id).cloned() else {
            return Err(ProjectionError::NotMediaType(format!("#{}", id.index())));
        };
        let elem = match source.attribute().data_type.as_array() {
            Some(Array {
                elem:
                    AttributeDefinition {
                        data_type: DataType::MediaType(elem),
                        ..
                    },
            }) => *elem,
            _ => {
                return Err(ProjectionError::NotMediaType(format!(
                    "element of media type {:?}",
                    source.identifier
                )))
            }
        };
        let inner = self
            .project(elem, view)
            .map_err(|e| ProjectionError::CollectionElement(Box::new(e)))?;

        let elem_name = self.named(inner.media_type).type_name().to_string();
        let mut projected = MediaTypeDefinition::new(
            project_identifier(&source.identifier, view),
            format!("{elem_name}Collection"),
            AttributeDefinition::new(Array {
                elem: AttributeDefinition::new(DataType::MediaType(inner.media_type)),
            })
            .with_description(source.attribute().description.clone()),
        );
        let elem_view = self
            .media(inner.media_type)
            .and_then(|mt| mt.views.get(DEFAULT_VIEW))
            .cloned()
            .unwrap_or_else(|| ViewDefinition::new(DEFAULT_VIEW));
        projected.views.insert(DEFAULT_VIEW.to_string(), elem_view);
        let projected_id = self.alloc(NamedType::Media(projected));

        let links = inner.links.map(|elem_links| {
            let name = format!("{}Array", self.named(elem_links).type_name());
            self.alloc(NamedType::User(UserTypeDefinition::new(
                name,
                AttributeDefinition::new(Array {
                    elem: AttributeDefinition::new(DataType::UserType(elem_links)),
                }),
            )))
        });

        let projection = Projection {
            media_type: projected_id,
            links,
        };
        self.projections.insert(key, projection);
        Ok(projection)
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Kind, Primitive};

    /// `Foo` with `att1: Integer`, `att2: String` and views
    /// `default = {att1, att2}`, `tiny = {att2}`.
    fn foo(reg: &mut Registry) -> TypeId {
        let mut obj = Object::new();
        obj.insert("att1", AttributeDefinition::new(Primitive::Integer));
        obj.insert("att2", AttributeDefinition::new(Primitive::String));
        let mut mt = MediaTypeDefinition::new(
            "vnd.application/foo",
            "Foo",
            AttributeDefinition::new(obj),
        );
        mt.views.insert(
            "default".into(),
            ViewDefinition::with_attributes("default", &["att1", "att2"]),
        );
        mt.views
            .insert("tiny".into(), ViewDefinition::with_attributes("tiny", &["att2"]));
        reg.alloc(NamedType::Media(mt))
    }

    #[test]
    fn empty_view_fails() {
        let mut reg = Registry::new();
        let id = foo(&mut reg);
        assert_eq!(reg.project(id, ""), Err(ProjectionError::EmptyView));
    }

    #[test]
    fn unknown_view_fails_and_is_not_cached() {
        let mut reg = Registry::new();
        let id = foo(&mut reg);
        assert!(matches!(
            reg.project(id, "huge"),
            Err(ProjectionError::UnknownView { .. })
        ));
        assert!(reg.projections.is_empty());
    }

    #[test]
    fn default_view_projection() {
        let mut reg = Registry::new();
        let id = foo(&mut reg);
        let p = reg.project(id, "default").unwrap();
        let mt = reg.media(p.media_type).unwrap();
        assert_eq!(mt.identifier, "vnd.application/foo; view=default");
        assert_eq!(mt.type_name(), "Foo");
        assert_eq!(mt.views.keys().collect::<Vec<_>>(), vec!["default"]);
        let obj = mt.attribute().data_type.as_object().unwrap();
        assert_eq!(obj.get("att1").unwrap().data_type.kind(), Kind::Integer);
        assert!(p.links.is_none());
    }

    #[test]
    fn tiny_view_projection() {
        let mut reg = Registry::new();
        let id = foo(&mut reg);
        let p = reg.project(id, "tiny").unwrap();
        let mt = reg.media(p.media_type).unwrap();
        assert!(mt.identifier.contains("view=tiny"));
        assert_eq!(mt.type_name(), "FooTiny");
        assert_eq!(mt.views.len(), 1);
        assert_eq!(mt.views["default"].names().collect::<Vec<_>>(), vec!["att2"]);
        let obj = mt.attribute().data_type.as_object().unwrap();
        assert_eq!(obj.names().collect::<Vec<_>>(), vec!["att2"]);
        assert_eq!(obj.get("att2").unwrap().data_type.kind(), Kind::String);
    }

    #[test]
    fn second_call_hits_the_cache() {
        let mut reg = Registry::new();
        let id = foo(&mut reg);
        let first = reg.project(id, "tiny").unwrap();
        let arena = reg.arena.len();
        let second = reg.project(id, "tiny").unwrap();
        assert_eq!(first, second);
        assert_eq!(reg.arena.len(), arena);
    }

    #[test]
    fn real_links_attribute_wins() {
        let mut reg = Registry::new();
        let mut obj = Object::new();
        obj.insert("att1", AttributeDefinition::new(Primitive::Integer));
        obj.insert("links", AttributeDefinition::new(Primitive::String));
        let mut mt = MediaTypeDefinition::new("vnd.application/foo", "Foo", AttributeDefinition::new(obj));
        mt.views.insert(
            "default".into(),
            ViewDefinition::with_attributes("default", &["att1", "links"]),
        );
        let id = reg.alloc(NamedType::Media(mt));
        let p = reg.project(id, "default").unwrap();
        let projected = reg.media(p.media_type).unwrap();
        let links = projected
            .attribute()
            .data_type
            .as_object()
            .unwrap()
            .get("links")
            .unwrap();
        assert_eq!(links.data_type.kind(), Kind::String);
        assert!(p.links.is_none());
    }

    #[test]
    fn required_is_filtered_to_the_view() {
        let mut reg = Registry::new();
        let id = foo(&mut reg);
        reg.named_mut(id)
            .attribute_mut()
            .validation_mut()
            .add_required(&["att1", "att2"]);
        let p = reg.project(id, "tiny").unwrap();
        let att = reg.named(p.media_type).attribute();
        assert_eq!(att.validation.as_ref().unwrap().required, vec!["att2".to_string()]);
    }

    #[test]
    fn link_view_falls_back_to_default() {
        let mut reg = Registry::new();
        let id = foo(&mut reg);
        assert_eq!(reg.link_view(id, None), "default");
        if let Some(mt) = reg.named_mut(id).as_media_mut() {
            mt.views.insert("link".into(), ViewDefinition::with_attributes("link", &["att1"]));
        }
        assert_eq!(reg.link_view(id, None), "link");
        assert_eq!(reg.link_view(id, Some("tiny")), "tiny");
    }

    #[test]
    fn user_type_is_not_projectable() {
        let mut reg = Registry::new();
        let ut = reg.alloc(NamedType::User(UserTypeDefinition::new(
            "Plain",
            AttributeDefinition::new(Object::new()),
        )));
        assert_eq!(
            reg.project(ut, "default"),
            Err(ProjectionError::NotMediaType("type \"Plain\"".into()))
        );
    }

    /// `Mt1.att -> Mt2` (with metadata) and `Mt2.att2 -> Mt1`, each linking
    /// to the other's default view. `Mt1`'s tiny view renders `att` with
    /// `Mt2`'s tiny view, which lists only `links`.
    fn cyclic_pair() -> (Registry, TypeId) {
        let mut reg = Registry::new();
        let mt1 = reg.define_media_type("vnd.application/MT1", |m| {
            m.type_name("Mt1");
            m.attributes(|a| {
                a.attribute_with("att", "vnd.application/MT2", |att| {
                    att.metadata("foo", &["bar"]);
                });
            });
            m.link_with_view("att", "default");
            m.view("default", |v| {
                v.attribute("att").attribute("links");
            });
            m.view("tiny", |v| {
                v.attribute_with("att", |a| {
                    a.view = Some("tiny".into());
                });
            });
        });
        reg.define_media_type("vnd.application/MT2", |m| {
            m.type_name("Mt2");
            m.attributes(|a| {
                a.attribute("att2", "vnd.application/MT1");
            });
            m.link_with_view("att2", "default");
            m.view("default", |v| {
                v.attribute("att2").attribute("links");
            });
            m.view("tiny", |v| {
                v.attribute("links");
            });
        });
        if let Err(errors) = reg.run() {
            panic!("{errors}");
        }
        (reg, mt1.named_id().unwrap())
    }

    #[test]
    fn view_override_projects_nested_media_type() {
        let (mut reg, mt1) = cyclic_pair();
        let p = reg.project(mt1, "tiny").unwrap();
        let obj = reg.named(p.media_type).attribute().data_type.as_object().unwrap();
        assert_eq!(obj.names().collect::<Vec<_>>(), vec!["att"]);

        let nested = obj.get("att").unwrap().data_type.named_id().unwrap();
        let nested_mt = reg.media(nested).unwrap();
        assert_eq!(nested_mt.identifier, "vnd.application/mt2; view=tiny");
        assert_eq!(nested_mt.type_name(), "Mt2Tiny");
        let nested_obj = nested_mt.attribute().data_type.as_object().unwrap();
        assert_eq!(nested_obj.names().collect::<Vec<_>>(), vec!["links"]);
    }

    #[test]
    fn links_entries_carry_attribute_metadata() {
        let (mut reg, mt1) = cyclic_pair();
        let p = reg.project(mt1, "default").unwrap();
        let links = reg.named(p.links.unwrap()).attribute();
        let entry = links.data_type.as_object().unwrap().get("att").unwrap();
        assert_eq!(entry.metadata["foo"], vec!["bar".to_string()]);
        let target = reg.media(entry.data_type.named_id().unwrap()).unwrap();
        assert_eq!(target.identifier, "vnd.application/mt2; view=default");

        // The projected attribute keeps its own metadata too.
        let obj = reg.named(p.media_type).attribute().data_type.as_object().unwrap();
        assert_eq!(obj.get("att").unwrap().metadata["foo"], vec!["bar".to_string()]);
    }

    #[test]
    fn view_attribute_metadata_is_merged() {
        let mut reg = Registry::new();
        let id = foo(&mut reg);
        if let Some(view) = reg
            .named_mut(id)
            .as_media_mut()
            .and_then(|mt| mt.views.get_mut("tiny"))
        {
            if let Some(att) = view.attributes.get_mut("att2") {
                att.metadata
                    .insert("struct:tag:json".into(), vec!["att2,omitempty".into()]);
            }
        }
        let p = reg.project(id, "tiny").unwrap();
        let obj = reg.named(p.media_type).attribute().data_type.as_object().unwrap();
        assert_eq!(
            obj.get("att2").unwrap().metadata["struct:tag:json"],
            vec!["att2,omitempty".to_string()]
        );
        let source = reg.named(id).attribute().data_type.as_object().unwrap();
        assert!(source.get("att2").unwrap().metadata.is_empty());
    }

    #[test]
    fn links_type_without_declared_links_is_empty() {
        let mut reg = Registry::new();
        let id = foo(&mut reg);
        if let Some(mt) = reg.named_mut(id).as_media_mut() {
            mt.views.insert(
                "full".into(),
                ViewDefinition::with_attributes("full", &["att1", "links"]),
            );
        }
        let p = reg.project(id, "full").unwrap();
        let links = reg.named(p.links.unwrap());
        assert_eq!(links.type_name(), "FooFullLinks");
        assert_eq!(links.attribute().data_type.as_object().unwrap().names().count(), 0);

        let projected = reg.named(p.media_type).attribute();
        assert_eq!(projected.description, "Foo media type (full view)");
        let obj = projected.data_type.as_object().unwrap();
        assert_eq!(obj.names().collect::<Vec<_>>(), vec!["att1", "links"]);
    }

    #[test]
    fn failed_projection_rolls_back_nested_projections() {
        let mut reg = Registry::new();
        let a = reg.alloc(NamedType::Media(MediaTypeDefinition::new(
            "vnd.application/a",
            "A",
            AttributeDefinition::new(Object::new()),
        )));
        let mut obj = Object::new();
        obj.insert("a", AttributeDefinition::new(DataType::MediaType(a)));
        let mut b_def = MediaTypeDefinition::new("vnd.application/b", "B", AttributeDefinition::new(obj));
        b_def
            .views
            .insert("default".into(), ViewDefinition::with_attributes("default", &["a"]));
        let b = reg.alloc(NamedType::Media(b_def));

        // A's view lists B, then an attribute A does not have.
        let mut obj = Object::new();
        obj.insert("b", AttributeDefinition::new(DataType::MediaType(b)));
        *reg.named_mut(a).attribute_mut() = AttributeDefinition::new(obj);
        if let Some(mt) = reg.named_mut(a).as_media_mut() {
            mt.views.insert(
                "default".into(),
                ViewDefinition::with_attributes("default", &["b", "zzz"]),
            );
        }

        let arena = reg.arena.len();
        assert!(matches!(
            reg.project(a, "default"),
            Err(ProjectionError::UnknownAttribute { attribute, .. }) if attribute == "zzz"
        ));
        assert!(reg.projections.is_empty());
        assert_eq!(reg.arena.len(), arena);

        // B reaches A again and fails with it instead of returning a stale node.
        let err = reg.project(b, "default").unwrap_err();
        assert!(matches!(&err, ProjectionError::Attribute { attribute, .. } if attribute == "a"));
        assert!(matches!(err.root_cause(), ProjectionError::UnknownAttribute { .. }));
        assert!(reg.projections.is_empty());
        assert_eq!(reg.arena.len(), arena);
    }
}
