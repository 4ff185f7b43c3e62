//! The definition registry: an explicit, resettable context holding every
//! root definition of one design.
//!
//! Named types live in an arena (`Vec<NamedType>`) and are addressed by
//! [`TypeId`]. User types are indexed by name and media types by canonical
//! identifier. Registration only records a root and queues its declaration
//! block; blocks execute during [`Registry::run`].
//!
//! The registry has no internal locking. One run at a time per registry.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::config::EngineConfig;
use crate::definitions::{
    canonical_identifier, collection_identifier, normalize_identifier,
    type_name_from_identifier, ApiDefinition, MediaTypeDefinition, NamedType, ResourceDefinition,
    UserTypeDefinition,
};
use crate::dsl::{ApiBuilder, AttributeBuilder, MediaTypeBuilder, ResourceBuilder};
use crate::error::DesignError;
use crate::project::Projection;
use crate::types::{Array, AttributeDefinition, DataType, Kind, Object, TypeId};

pub(crate) type RootBlock = Box<dyn FnOnce(&mut Registry)>;

/// All definitions of one design plus the state of its engine run.
pub struct Registry {
    pub(crate) config: EngineConfig,
    pub(crate) api: Option<ApiDefinition>,
    pub(crate) resources: Vec<ResourceDefinition>,
    pub(crate) arena: Vec<NamedType>,
    /// User type name → first definition with that name.
    pub(crate) types: BTreeMap<String, TypeId>,
    /// Canonical identifier → first media type with that identifier.
    pub(crate) media_types: BTreeMap<String, TypeId>,
    /// Root named types in registration order, duplicates included.
    pub(crate) declared: Vec<TypeId>,
    /// Generated collection media types and their element identifier.
    pub(crate) collections: Vec<(TypeId, String)>,
    pub(crate) pending: VecDeque<RootBlock>,
    pub(crate) errors: Vec<DesignError>,
    /// `(canonical identifier, view)` → projection. Cleared at each finalize.
    pub(crate) projections: HashMap<(String, String), Projection>,
    pub(crate) finalized: bool,
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("api", &self.api)
            .field("resources", &self.resources.len())
            .field("named_types", &self.arena.len())
            .field("pending", &self.pending.len())
            .field("errors", &self.errors)
            .field("finalized", &self.finalized)
            .finish()
    }
}

impl Registry {
    /// An empty registry with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            api: None,
            resources: Vec::new(),
            arena: Vec::new(),
            types: BTreeMap::new(),
            media_types: BTreeMap::new(),
            declared: Vec::new(),
            collections: Vec::new(),
            pending: VecDeque::new(),
            errors: Vec::new(),
            projections: HashMap::new(),
            finalized: false,
        }
    }

    /// Drop every definition and pending block, keeping the configuration.
    /// Previously handed-out [`TypeId`]s become invalid.
    pub fn reset(&mut self) {
        let config = std::mem::take(&mut self.config);
        *self = Self::with_config(config);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- registration --------------------------------------------------------

    /// Declare the API root. A second declaration is reported immediately and
    /// its block never runs.
    pub fn define_api<F>(&mut self, name: impl Into<String>, block: F)
    where
        F: FnOnce(&mut ApiBuilder<'_>) + 'static,
    {
        let name = name.into();
        if let Some(existing) = &self.api {
            let context = format!("API {:?}", name);
            let message = format!("API already defined as {:?}", existing.name);
            self.report(DesignError::declaration(context, message));
            return;
        }
        self.api = Some(ApiDefinition {
            name,
            ..ApiDefinition::default()
        });
        self.pending.push_back(Box::new(move |reg: &mut Registry| {
            if let Some(api) = reg.api.as_mut() {
                block(&mut ApiBuilder::new(api));
            }
        }));
    }

    /// Declare a resource. Resources become visible once their block has run.
    pub fn define_resource<F>(&mut self, name: impl Into<String>, block: F)
    where
        F: FnOnce(&mut ResourceBuilder<'_>) + 'static,
    {
        let name = name.into();
        self.pending.push_back(Box::new(move |reg: &mut Registry| {
            let mut builder = ResourceBuilder::new(reg, name);
            block(&mut builder);
            let resource = builder.finish();
            if reg.resources.iter().any(|r| r.name == resource.name) {
                let context = format!("resource {:?}", resource.name);
                reg.report(DesignError::declaration(context, "duplicate resource"));
                return;
            }
            reg.resources.push(resource);
        }));
    }

    /// Declare a user type. Its underlying type starts as an empty object;
    /// the block adds attributes or replaces the type.
    ///
    /// The returned [`DataType`] may be used in other declarations right
    /// away, even though the block has not run yet.
    pub fn define_type<F>(&mut self, name: impl Into<String>, block: F) -> DataType
    where
        F: FnOnce(&mut AttributeBuilder<'_>) + 'static,
    {
        let name = name.into();
        let ut = UserTypeDefinition::new(name.clone(), AttributeDefinition::new(Object::new()));
        let id = self.alloc(NamedType::User(ut));
        self.types.entry(name.clone()).or_insert(id);
        self.declared.push(id);
        self.pending.push_back(Box::new(move |reg: &mut Registry| {
            let context = format!("type {:?}", name);
            let att = reg.take_attribute(id);
            let mut builder = AttributeBuilder::new(reg, context, att);
            block(&mut builder);
            let att = builder.finish();
            *reg.arena[id.0].attribute_mut() = att;
        }));
        DataType::UserType(id)
    }

    /// Declare a media type. The identifier is normalized (`/json` appended
    /// when it has no subtype) and the type name defaults to one derived
    /// from it.
    pub fn define_media_type<F>(&mut self, identifier: impl AsRef<str>, block: F) -> DataType
    where
        F: FnOnce(&mut MediaTypeBuilder<'_>) + 'static,
    {
        let identifier = normalize_identifier(identifier.as_ref());
        let type_name = type_name_from_identifier(&identifier);
        let mt = MediaTypeDefinition::new(
            identifier.clone(),
            type_name,
            AttributeDefinition::new(Object::new()),
        );
        let id = self.alloc(NamedType::Media(mt));
        self.media_types
            .entry(canonical_identifier(&identifier))
            .or_insert(id);
        self.declared.push(id);
        self.pending.push_back(Box::new(move |reg: &mut Registry| {
            let context = format!("media type {:?}", identifier);
            block(&mut MediaTypeBuilder::new(reg, id, context));
        }));
        DataType::MediaType(id)
    }

    /// The collection media type of `identifier`, created on first use.
    ///
    /// The element is looked up when finalize starts, so the element media
    /// type may be declared later, or be the media type being declared.
    pub fn collection_of(&mut self, identifier: &str) -> DataType {
        let elem = normalize_identifier(identifier);
        let collection = collection_identifier(&elem);
        let canonical = canonical_identifier(&collection);
        if let Some(&id) = self.media_types.get(&canonical) {
            return DataType::MediaType(id);
        }
        let array = Array {
            elem: AttributeDefinition::new(DataType::Reference(elem.clone())),
        };
        let mt = MediaTypeDefinition::new(collection, String::new(), AttributeDefinition::new(array));
        let id = self.alloc(NamedType::Media(mt));
        self.media_types.insert(canonical, id);
        self.declared.push(id);
        self.collections.push((id, elem));
        DataType::MediaType(id)
    }

    // --- lookup --------------------------------------------------------------

    /// The definition at `id`.
    ///
    /// # Panics
    ///
    /// If `id` was not handed out by this registry since its last reset.
    pub fn named(&self, id: TypeId) -> &NamedType {
        &self.arena[id.0]
    }

    pub fn get(&self, id: TypeId) -> Option<&NamedType> {
        self.arena.get(id.0)
    }

    pub(crate) fn named_mut(&mut self, id: TypeId) -> &mut NamedType {
        &mut self.arena[id.0]
    }

    pub fn media(&self, id: TypeId) -> Option<&MediaTypeDefinition> {
        self.get(id).and_then(NamedType::as_media)
    }

    pub fn find_type(&self, name: &str) -> Option<TypeId> {
        self.types.get(name).copied()
    }

    /// Look up a media type by any spelling of its identifier.
    pub fn find_media_type(&self, identifier: &str) -> Option<TypeId> {
        self.media_types.get(&canonical_identifier(identifier)).copied()
    }

    /// Resolve a forward reference: user type names first, then media type
    /// identifiers.
    pub fn lookup(&self, name: &str) -> Option<DataType> {
        if let Some(id) = self.find_type(name) {
            return Some(DataType::UserType(id));
        }
        self.find_media_type(name).map(DataType::MediaType)
    }

    /// Follow named types down to the first structural type. `None` for an
    /// alias cycle (`A = B`, `B = A`).
    pub fn underlying<'a>(&'a self, dt: &'a DataType) -> Option<&'a DataType> {
        let mut current = dt;
        for _ in 0..=self.arena.len() {
            match current.named_id().and_then(|id| self.get(id)) {
                Some(named) => current = &named.attribute().data_type,
                None => return Some(current),
            }
        }
        None
    }

    /// Kind after following named types; [`Kind::Reference`] when unresolved.
    pub fn kind_of(&self, dt: &DataType) -> Kind {
        self.underlying(dt).map_or(Kind::Reference, DataType::kind)
    }

    /// The object behind `dt`, following named types.
    pub fn object_of<'a>(&'a self, dt: &'a DataType) -> Option<&'a Object> {
        self.underlying(dt).and_then(DataType::as_object)
    }

    /// A display name for `dt`: `Integer`, `Array<Bottle>`,
    /// `Hash<String, Integer>`, `Object`, or the named type's name.
    pub fn type_name(&self, dt: &DataType) -> String {
        match dt {
            DataType::Primitive(p) => p.to_string(),
            DataType::Array(a) => format!("Array<{}>", self.type_name(&a.elem.data_type)),
            DataType::Hash(h) => format!(
                "Hash<{}, {}>",
                self.type_name(&h.key.data_type),
                self.type_name(&h.elem.data_type)
            ),
            DataType::Object(_) => "Object".to_string(),
            DataType::UserType(id) | DataType::MediaType(id) => self
                .get(*id)
                .map_or_else(|| format!("#{}", id.0), |n| n.type_name().to_string()),
            DataType::Reference(name) => name.clone(),
        }
    }

    /// Root named types in registration order.
    pub fn declared(&self) -> &[TypeId] {
        &self.declared
    }

    /// User types by name.
    pub fn user_type_ids(&self) -> impl Iterator<Item = (&str, TypeId)> {
        self.types.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Media types by canonical identifier.
    pub fn media_type_ids(&self) -> impl Iterator<Item = (&str, TypeId)> {
        self.media_types.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_collection(&self, id: TypeId) -> bool {
        self.collections.iter().any(|(c, _)| *c == id)
    }

    pub fn api(&self) -> Option<&ApiDefinition> {
        self.api.as_ref()
    }

    pub fn resources(&self) -> &[ResourceDefinition] {
        &self.resources
    }

    pub fn resource(&self, name: &str) -> Option<&ResourceDefinition> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// True once [`Registry::run`] has completed without errors.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    // --- internals -----------------------------------------------------------

    pub(crate) fn alloc(&mut self, named: NamedType) -> TypeId {
        self.arena.push(named);
        TypeId(self.arena.len() - 1)
    }

    pub(crate) fn report(&mut self, error: DesignError) {
        tracing::debug!(%error, "design error");
        self.errors.push(error);
    }

    /// Move a definition's attribute out, leaving an empty object behind.
    pub(crate) fn take_attribute(&mut self, id: TypeId) -> AttributeDefinition {
        std::mem::replace(
            self.arena[id.0].attribute_mut(),
            AttributeDefinition::new(Object::new()),
        )
    }
}

// --- tests -------------------------------------------------------------------
