//! The two-pass execution engine.
//!
//! Pass 1 runs every pending root block in registration order. A block that
//! registers further roots queues them behind the ones already pending;
//! nested blocks (attributes, views, actions) run immediately. References to
//! roots not yet executed are recorded by name.
//!
//! Pass 2 (finalize) works over the completed table:
//!
//! 1. clear the projection cache;
//! 2. materialize collection media types from their element;
//! 3. report duplicate names and identifiers;
//! 4. resolve every name reference;
//! 5. fill in the view of each link that has none;
//! 6. validate every attribute tree and media type;
//! 7. check that each response's view exists on its media type;
//! 8. generate missing examples.
//!
//! Every error is collected; nothing stops the sweep early.

use crate::definitions::{ViewDefinition, DEFAULT_VIEW};
use crate::error::{DesignError, ErrorList, ProjectionError};
use crate::example::ExampleGenerator;
use crate::registry::Registry;
use crate::types::{AttributeDefinition, DataType, Primitive, TypeId};
use crate::validation::{validate_attribute, validate_media_type};

impl Registry {
    /// Run both passes over everything registered so far.
    ///
    /// Returns every declaration, reference, validation, and response
    /// projection error of the run, in the order found. An empty registry
    /// runs cleanly, and running again without new registrations re-checks
    /// the same graph.
    pub fn run(&mut self) -> Result<(), ErrorList> {
        self.finalized = false;
        self.run_definitions();
        self.finalize();

        let errors = std::mem::take(&mut self.errors);
        tracing::info!(
            definitions = self.declared.len(),
            resources = self.resources.len(),
            errors = errors.len(),
            "design run complete"
        );
        if errors.is_empty() {
            self.finalized = true;
            Ok(())
        } else {
            Err(ErrorList::from(errors))
        }
    }

    /// Pass 1: execute pending root blocks, first registered first.
    pub(crate) fn run_definitions(&mut self) {
        tracing::debug!(pending = self.pending.len(), "definition pass start");
        let mut executed = 0usize;
        while let Some(block) = self.pending.pop_front() {
            tracing::trace!(root = executed, "running root block");
            block(self);
            executed += 1;
        }
        tracing::debug!(executed, "definition pass end");
    }

    /// Pass 2.
    fn finalize(&mut self) {
        tracing::debug!(declared = self.declared.len(), "finalize pass start");
        self.projections.clear();
        self.materialize_collections();

        let live = self.unique_roots();
        self.resolve_references(&live);
        self.fill_link_views(&live);
        self.validate_roots(&live);
        self.check_responses();

        if self.config.generate_examples && self.errors.is_empty() {
            self.generate_examples(&live);
        }
        tracing::debug!(errors = self.errors.len(), "finalize pass end");
    }

    fn materialize_collections(&mut self) {
        for (id, elem) in self.collections.clone() {
            let context = self.named(id).label();
            let Some(elem_id) = self.find_media_type(&elem) else {
                self.report(DesignError::reference(context, elem));
                // Reported once here; keep name resolution from seeing it again.
                if let DataType::Array(array) = &mut self.named_mut(id).attribute_mut().data_type {
                    array.elem.data_type = DataType::Primitive(Primitive::Any);
                }
                continue;
            };
            let Some(elem_mt) = self.media(elem_id) else {
                continue;
            };
            let type_name = format!("{}Collection", elem_mt.type_name());
            let description = elem_mt.attribute().description.clone();
            let views: Vec<String> = elem_mt.views.keys().cloned().collect();

            if let Some(mt) = self.named_mut(id).as_media_mut() {
                mt.user_type.type_name = type_name;
                mt.views = views
                    .into_iter()
                    .map(|v| (v.clone(), ViewDefinition::new(v)))
                    .collect();
                let att = &mut mt.user_type.attribute;
                if att.description.is_empty() {
                    att.description = description;
                }
                if let DataType::Array(array) = &mut att.data_type {
                    array.elem.data_type = DataType::MediaType(elem_id);
                }
            }
        }
    }

    /// Declared roots that own their name, reporting the ones that don't.
    fn unique_roots(&mut self) -> Vec<TypeId> {
        let mut live = Vec::with_capacity(self.declared.len());
        for id in self.declared.clone() {
            let named = self.named(id);
            let owner = match named.as_media() {
                Some(mt) => self.find_media_type(&mt.identifier),
                None => self.find_type(named.type_name()),
            };
            if owner == Some(id) {
                live.push(id);
            } else {
                let what = if named.is_media() { "media type" } else { "type" };
                let context = named.label();
                self.report(DesignError::declaration(context, format!("duplicate {what}")));
            }
        }
        live
    }

    fn resolve_references(&mut self, live: &[TypeId]) {
        let mut errors = Vec::new();
        for &id in live {
            let context = self.named(id).label();
            let mut att = self.take_attribute(id);
            self.resolve_attribute(&mut att, &context, &mut errors);
            *self.named_mut(id).attribute_mut() = att;
        }

        let mut resources = std::mem::take(&mut self.resources);
        for resource in &mut resources {
            let context = format!("resource {:?}", resource.name);
            if let Some(media) = &mut resource.default_media {
                self.resolve_type(media, &format!("{context} default media"), &mut errors);
            }
            for action in &mut resource.actions {
                let context = format!("{context} action {:?}", action.name);
                if let Some(payload) = &mut action.payload {
                    self.resolve_attribute(payload, &format!("{context} payload"), &mut errors);
                }
                if let Some(params) = &mut action.params {
                    self.resolve_attribute(params, &format!("{context} params"), &mut errors);
                }
                for response in &mut action.responses {
                    if let Some(media) = &mut response.media_type {
                        let context = format!("{context} response {:?}", response.name);
                        self.resolve_type(media, &context, &mut errors);
                    }
                }
            }
        }
        self.resources = resources;

        for error in errors {
            self.report(error);
        }
    }

    fn resolve_attribute(
        &self,
        att: &mut AttributeDefinition,
        context: &str,
        errors: &mut Vec<DesignError>,
    ) {
        self.resolve_type(&mut att.data_type, context, errors);
    }

    fn resolve_type(&self, dt: &mut DataType, context: &str, errors: &mut Vec<DesignError>) {
        match dt {
            DataType::Reference(name) => match self.lookup(name) {
                Some(resolved) => *dt = resolved,
                None => errors.push(DesignError::reference(context, name.clone())),
            },
            DataType::Array(a) => {
                self.resolve_attribute(&mut a.elem, &format!("{context} element"), errors);
            }
            DataType::Hash(h) => {
                self.resolve_attribute(&mut h.key, &format!("{context} key"), errors);
                self.resolve_attribute(&mut h.elem, &format!("{context} value"), errors);
            }
            DataType::Object(o) => {
                for (name, child) in o.iter_mut() {
                    let context = format!("{context} attribute {name:?}");
                    self.resolve_attribute(child, &context, errors);
                }
            }
            DataType::Primitive(_) | DataType::UserType(_) | DataType::MediaType(_) => {}
        }
    }

    /// Links without a view get `link` when their target defines it,
    /// otherwise `default`.
    fn fill_link_views(&mut self, live: &[TypeId]) {
        for &id in live {
            let Some(mt) = self.media(id) else {
                continue;
            };
            let Some(object) = self.object_of(&mt.attribute().data_type) else {
                continue;
            };
            let filled: Vec<(String, String)> = mt
                .links
                .iter()
                .filter(|(_, link)| link.view.is_none())
                .filter_map(|(key, link)| match object.get(&link.name)?.data_type {
                    DataType::MediaType(target) => Some((key.clone(), self.link_view(target, None))),
                    _ => None,
                })
                .collect();
            if let Some(mt) = self.named_mut(id).as_media_mut() {
                for (key, view) in filled {
                    if let Some(link) = mt.links.get_mut(&key) {
                        link.view = Some(view);
                    }
                }
            }
        }
    }

    fn validate_roots(&mut self, live: &[TypeId]) {
        let mut errors = Vec::new();
        for &id in live {
            let named = self.named(id);
            errors.extend(validate_attribute(self, &named.label(), named.attribute()));
            if named.is_media() {
                errors.extend(validate_media_type(self, id));
            }
        }
        for resource in &self.resources {
            for action in &resource.actions {
                let context = format!("resource {:?} action {:?}", resource.name, action.name);
                if let Some(payload) = &action.payload {
                    errors.extend(validate_attribute(self, &format!("{context} payload"), payload));
                }
                if let Some(params) = &action.params {
                    errors.extend(validate_attribute(self, &format!("{context} params"), params));
                }
            }
        }
        for error in errors {
            self.report(error);
        }
    }

    /// Project each response's media type with its view. A response with a
    /// view but no media type uses the resource's default media type.
    fn check_responses(&mut self) {
        let mut checks = Vec::new();
        for resource in &self.resources {
            for action in &resource.actions {
                for response in &action.responses {
                    let media = match (&response.media_type, &response.view) {
                        (Some(media), _) => media,
                        (None, Some(_)) => match &resource.default_media {
                            Some(media) => media,
                            None => continue,
                        },
                        (None, None) => continue,
                    };
                    let context = format!(
                        "resource {:?} action {:?} response {:?}",
                        resource.name, action.name, response.name
                    );
                    let view = response.view.clone().unwrap_or_else(|| DEFAULT_VIEW.to_string());
                    checks.push((context, media.clone(), view));
                }
            }
        }

        for (context, media, view) in checks {
            let result = match media {
                DataType::MediaType(id) => self.project(id, &view).map(|_| ()),
                // Already reported by name resolution.
                DataType::Reference(_) => Ok(()),
                other => Err(ProjectionError::NotMediaType(self.type_name(&other))),
            };
            if let Err(e) = result {
                self.report(DesignError::projection(context, e));
            }
        }
    }

    fn generate_examples(&mut self, live: &[TypeId]) {
        let mut generator =
            ExampleGenerator::new(&self.config.example_seed, self.config.max_example_depth);
        let mut generated = 0usize;
        for &id in live {
            let att = self.named(id).attribute();
            if att.example.is_some() {
                continue;
            }
            if let Some(example) = generator.generate(self, att) {
                self.named_mut(id).attribute_mut().example = Some(example);
                generated += 1;
            }
        }
        tracing::debug!(generated, "generated examples");
    }
}

// --- tests -------------------------------------------------------------------
