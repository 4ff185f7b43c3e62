use std::collections::{BTreeMap, HashMap, HashSet};
use std::convert::Infallible;
use std::ops::ControlFlow;

use crate::definitions::NamedType;
use crate::registry::Registry;
use crate::types::{Array, AttributeDefinition, DataType, Hash, Object, TypeId};

/// Cycle-safe algorithms over the type graph held by a [`Registry`].
///
/// The graph is not a tree: named types may reference each other and
/// themselves. Every algorithm here keeps a visited set (by name for walks,
/// by arena id for clones and comparisons) so it terminates on any graph.
impl Registry {
    /// Depth-first traversal from `root`.
    ///
    /// Object attributes are visited in sorted name order. Each named type is
    /// entered once per walk, identified by its name (user types) or
    /// identifier (media types), however many paths reach it. The attribute
    /// that refers to a named type is always visited.
    ///
    /// `visit` returning [`ControlFlow::Break`] stops the walk at once and the
    /// break value is returned as the error.
    pub fn walk<B>(
        &self,
        root: &AttributeDefinition,
        mut visit: impl FnMut(&AttributeDefinition) -> ControlFlow<B>,
    ) -> Result<(), B> {
        let mut seen = HashSet::new();
        self.walk_attribute(root, &mut visit, &mut seen)
    }

    /// Every named type reachable from the attributes of `object`, keyed by
    /// type name.
    pub fn user_types(&self, object: &Object) -> BTreeMap<String, TypeId> {
        let mut found = BTreeMap::new();
        let mut seen = HashSet::new();
        let mut collect = |att: &AttributeDefinition| -> ControlFlow<Infallible> {
            if let Some(id) = att.data_type.named_id() {
                if let Some(named) = self.get(id) {
                    found.entry(named.type_name().to_string()).or_insert(id);
                }
            }
            ControlFlow::Continue(())
        };
        for (_, att) in object {
            let _ = self.walk_attribute(att, &mut collect, &mut seen);
        }
        found
    }

    /// Deep copy of `dt`.
    ///
    /// Named types are copied into fresh arena slots that keep the same name
    /// but are not indexed, so lookups still find the originals. A named type
    /// reached twice maps to the same copy, which preserves the cyclic shape
    /// of self- and mutually-referencing types. Primitives and unresolved
    /// references are returned as they are.
    pub fn dup(&mut self, dt: &DataType) -> DataType {
        let mut memo = HashMap::new();
        self.dup_type(dt, &mut memo)
    }

    /// Copy of `att`. A media type it points at directly is kept by
    /// reference; anything else is copied as by [`Registry::dup`].
    pub fn dup_att(&mut self, att: &AttributeDefinition) -> AttributeDefinition {
        if let DataType::MediaType(_) = att.data_type {
            return att.clone();
        }
        let mut memo = HashMap::new();
        self.dup_attribute(att, &mut memo)
    }

    /// Structural equality modulo arena identity: named types are compared
    /// by content, with a one-to-one pairing of ids so cycles terminate.
    pub fn shape_eq(&self, a: &DataType, b: &DataType) -> bool {
        let mut pairs = Pairing::default();
        self.type_shape_eq(a, b, &mut pairs)
    }

    /// [`Registry::shape_eq`] for attributes: every field but the type must
    /// be equal.
    pub fn attribute_shape_eq(&self, a: &AttributeDefinition, b: &AttributeDefinition) -> bool {
        let mut pairs = Pairing::default();
        self.attribute_eq(a, b, &mut pairs)
    }

    // --- walk ----------------------------------------------------------------

    fn walk_attribute<B, F>(
        &self,
        att: &AttributeDefinition,
        visit: &mut F,
        seen: &mut HashSet<String>,
    ) -> Result<(), B>
    where
        F: FnMut(&AttributeDefinition) -> ControlFlow<B>,
    {
        if let ControlFlow::Break(b) = visit(att) {
            return Err(b);
        }
        match &att.data_type {
            DataType::Array(a) => self.walk_attribute(&a.elem, visit, seen),
            DataType::Hash(h) => {
                self.walk_attribute(&h.key, visit, seen)?;
                self.walk_attribute(&h.elem, visit, seen)
            }
            DataType::Object(o) => {
                for (_, child) in o {
                    self.walk_attribute(child, visit, seen)?;
                }
                Ok(())
            }
            DataType::UserType(id) | DataType::MediaType(id) => {
                let Some(named) = self.get(*id) else {
                    return Ok(());
                };
                if !seen.insert(walk_key(named)) {
                    return Ok(());
                }
                self.walk_attribute(named.attribute(), visit, seen)
            }
            DataType::Primitive(_) | DataType::Reference(_) => Ok(()),
        }
    }

    // --- dup -----------------------------------------------------------------

    fn dup_type(&mut self, dt: &DataType, memo: &mut HashMap<TypeId, TypeId>) -> DataType {
        match dt {
            DataType::Primitive(_) | DataType::Reference(_) => dt.clone(),
            DataType::Array(a) => DataType::from(Array {
                elem: self.dup_attribute(&a.elem, memo),
            }),
            DataType::Hash(h) => DataType::from(Hash {
                key: self.dup_attribute(&h.key, memo),
                elem: self.dup_attribute(&h.elem, memo),
            }),
            DataType::Object(o) => {
                let mut copy = Object::new();
                for (name, att) in o {
                    copy.insert(name.clone(), self.dup_attribute(att, memo));
                }
                DataType::Object(copy)
            }
            DataType::UserType(id) | DataType::MediaType(id) => {
                if let Some(&copy) = memo.get(id) {
                    return self.named(copy).data_type(copy);
                }
                let Some(source) = self.get(*id) else {
                    return dt.clone();
                };
                let mut definition = source.clone();
                let att = std::mem::replace(
                    definition.attribute_mut(),
                    AttributeDefinition::new(Object::new()),
                );
                let copy = self.alloc(definition);
                memo.insert(*id, copy);
                let att = self.dup_attribute(&att, memo);
                let named = self.named_mut(copy);
                *named.attribute_mut() = att;
                named.data_type(copy)
            }
        }
    }

    fn dup_attribute(
        &mut self,
        att: &AttributeDefinition,
        memo: &mut HashMap<TypeId, TypeId>,
    ) -> AttributeDefinition {
        AttributeDefinition {
            data_type: self.dup_type(&att.data_type, memo),
            description: att.description.clone(),
            metadata: att.metadata.clone(),
            validation: att.validation.clone(),
            example: att.example.clone(),
            default_value: att.default_value.clone(),
            view: att.view.clone(),
        }
    }

    // --- shape equality ------------------------------------------------------

    fn type_shape_eq(&self, a: &DataType, b: &DataType, pairs: &mut Pairing) -> bool {
        match (a, b) {
            (DataType::Primitive(x), DataType::Primitive(y)) => x == y,
            (DataType::Reference(x), DataType::Reference(y)) => x == y,
            (DataType::Array(x), DataType::Array(y)) => self.attribute_eq(&x.elem, &y.elem, pairs),
            (DataType::Hash(x), DataType::Hash(y)) => {
                self.attribute_eq(&x.key, &y.key, pairs) && self.attribute_eq(&x.elem, &y.elem, pairs)
            }
            (DataType::Object(x), DataType::Object(y)) => {
                x.len() == y.len()
                    && x.iter().zip(y.iter()).all(|((nx, ax), (ny, ay))| {
                        nx == ny && self.attribute_eq(ax, ay, pairs)
                    })
            }
            (DataType::UserType(x), DataType::UserType(y))
            | (DataType::MediaType(x), DataType::MediaType(y)) => {
                if let Some(consistent) = pairs.pair(*x, *y) {
                    return consistent;
                }
                let (Some(nx), Some(ny)) = (self.get(*x), self.get(*y)) else {
                    return x == y;
                };
                let header_eq = match (nx, ny) {
                    (NamedType::User(ux), NamedType::User(uy)) => ux.type_name == uy.type_name,
                    (NamedType::Media(mx), NamedType::Media(my)) => {
                        mx.type_name() == my.type_name()
                            && mx.identifier == my.identifier
                            && mx.views == my.views
                            && mx.links == my.links
                    }
                    _ => false,
                };
                header_eq && self.attribute_eq(nx.attribute(), ny.attribute(), pairs)
            }
            _ => false,
        }
    }

    fn attribute_eq(&self, a: &AttributeDefinition, b: &AttributeDefinition, pairs: &mut Pairing) -> bool {
        a.description == b.description
            && a.metadata == b.metadata
            && a.validation == b.validation
            && a.example == b.example
            && a.default_value == b.default_value
            && a.view == b.view
            && self.type_shape_eq(&a.data_type, &b.data_type, pairs)
    }
}

// --- helpers -----------------------------------------------------------------

fn walk_key(named: &NamedType) -> String {
    match named {
        NamedType::User(ut) => format!("type:{}", ut.type_name),
        NamedType::Media(mt) => format!("media:{}", mt.identifier),
    }
}

/// One-to-one pairing of arena ids built up while comparing two graphs.
#[derive(Default)]
struct Pairing {
    forward: HashMap<TypeId, TypeId>,
    backward: HashMap<TypeId, TypeId>,
}

impl Pairing {
    /// `Some(consistent)` when either id is already paired, `None` after
    /// recording a new pair.
    fn pair(&mut self, a: TypeId, b: TypeId) -> Option<bool> {
        match (self.forward.get(&a), self.backward.get(&b)) {
            (None, None) => {
                self.forward.insert(a, b);
                self.backward.insert(b, a);
                None
            }
            (Some(&fb), Some(&ba)) => Some(fb == b && ba == a),
            _ => Some(false),
        }
    }
}

// --- tests -------------------------------------------------------------------
