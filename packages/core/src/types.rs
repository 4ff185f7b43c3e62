//! Attribute model: the primitive vocabulary of data types and the attribute
//! node that carries a type plus validation and metadata.
//!
//! Named types ([`UserTypeDefinition`](crate::definitions::UserTypeDefinition)
//! and [`MediaTypeDefinition`](crate::definitions::MediaTypeDefinition)) are
//! never embedded in a [`DataType`]. They live in the
//! [`Registry`](crate::Registry) arena and are referenced by [`TypeId`], so a
//! type graph may contain cycles without owning pointers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Index of a named type in a [`Registry`](crate::Registry) arena.
///
/// Ids are only handed out by the registry that owns the definition and stay
/// valid until [`Registry::reset`](crate::Registry::reset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    /// Position of the definition in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// The closed set of primitive types.
///
/// Serialises as the DSL name (e.g. `"DateTime"`, `"UUID"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    Boolean,
    Integer,
    Number,
    String,
    DateTime,
    #[serde(rename = "UUID")]
    Uuid,
    Any,
    File,
}

/// Formats the primitive as its DSL name.
impl std::fmt::Display for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Primitive::Boolean => write!(f, "Boolean"),
            Primitive::Integer => write!(f, "Integer"),
            Primitive::Number => write!(f, "Number"),
            Primitive::String => write!(f, "String"),
            Primitive::DateTime => write!(f, "DateTime"),
            Primitive::Uuid => write!(f, "UUID"),
            Primitive::Any => write!(f, "Any"),
            Primitive::File => write!(f, "File"),
        }
    }
}

/// Parses a [`Primitive`] from its DSL name.
///
/// Returns `Err` with a descriptive message if the string is not recognised.
impl std::str::FromStr for Primitive {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Boolean" => Ok(Primitive::Boolean),
            "Integer" => Ok(Primitive::Integer),
            "Number" => Ok(Primitive::Number),
            "String" => Ok(Primitive::String),
            "DateTime" => Ok(Primitive::DateTime),
            "UUID" => Ok(Primitive::Uuid),
            "Any" => Ok(Primitive::Any),
            "File" => Ok(Primitive::File),
            _ => Err(format!(
                "unknown primitive type {:?}; expected one of: \
                 Boolean, Integer, Number, String, DateTime, UUID, Any, File",
                s
            )),
        }
    }
}

/// Coarse classification of a [`DataType`] after following named types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Boolean,
    Integer,
    Number,
    String,
    DateTime,
    Uuid,
    Any,
    File,
    Array,
    Hash,
    Object,
    UserType,
    MediaType,
    /// A forward reference that has not been resolved (or an alias cycle).
    Reference,
}

impl Kind {
    pub fn is_numeric(self) -> bool {
        matches!(self, Kind::Integer | Kind::Number)
    }

    /// Kinds whose values have a length: characters, elements, or entries.
    pub fn has_length(self) -> bool {
        matches!(self, Kind::String | Kind::Array | Kind::Hash)
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Kind::Boolean => "Boolean",
            Kind::Integer => "Integer",
            Kind::Number => "Number",
            Kind::String => "String",
            Kind::DateTime => "DateTime",
            Kind::Uuid => "UUID",
            Kind::Any => "Any",
            Kind::File => "File",
            Kind::Array => "Array",
            Kind::Hash => "Hash",
            Kind::Object => "Object",
            Kind::UserType => "UserType",
            Kind::MediaType => "MediaType",
            Kind::Reference => "unresolved reference",
        };
        f.write_str(s)
    }
}

impl From<Primitive> for Kind {
    fn from(p: Primitive) -> Self {
        match p {
            Primitive::Boolean => Kind::Boolean,
            Primitive::Integer => Kind::Integer,
            Primitive::Number => Kind::Number,
            Primitive::String => Kind::String,
            Primitive::DateTime => Kind::DateTime,
            Primitive::Uuid => Kind::Uuid,
            Primitive::Any => Kind::Any,
            Primitive::File => Kind::File,
        }
    }
}

/// A data type: a primitive, a composite, or a reference to a named type.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    Primitive(Primitive),
    Array(Box<Array>),
    Hash(Box<Hash>),
    Object(Object),
    /// A user type in the registry arena.
    UserType(TypeId),
    /// A media type in the registry arena.
    MediaType(TypeId),
    /// A type name or media type identifier recorded during the definition
    /// pass and resolved by name during finalize.
    Reference(String),
}

impl DataType {
    /// The kind of this node, without following named types.
    pub fn kind(&self) -> Kind {
        match self {
            DataType::Primitive(p) => Kind::from(*p),
            DataType::Array(_) => Kind::Array,
            DataType::Hash(_) => Kind::Hash,
            DataType::Object(_) => Kind::Object,
            DataType::UserType(_) => Kind::UserType,
            DataType::MediaType(_) => Kind::MediaType,
            DataType::Reference(_) => Kind::Reference,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, DataType::Primitive(_))
    }

    /// True only for a literal object node. Use
    /// [`Registry::object_of`](crate::Registry::object_of) to see through
    /// named types.
    pub fn is_object(&self) -> bool {
        matches!(self, DataType::Object(_))
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            DataType::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            DataType::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            DataType::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<&Hash> {
        match self {
            DataType::Hash(h) => Some(h),
            _ => None,
        }
    }

    /// The arena id of a user type or media type node.
    pub fn named_id(&self) -> Option<TypeId> {
        match self {
            DataType::UserType(id) | DataType::MediaType(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<Primitive> for DataType {
    fn from(p: Primitive) -> Self {
        DataType::Primitive(p)
    }
}

impl From<Object> for DataType {
    fn from(o: Object) -> Self {
        DataType::Object(o)
    }
}

impl From<Array> for DataType {
    fn from(a: Array) -> Self {
        DataType::Array(Box::new(a))
    }
}

impl From<Hash> for DataType {
    fn from(h: Hash) -> Self {
        DataType::Hash(Box::new(h))
    }
}

/// A bare string is a forward reference to a type name or media type
/// identifier.
impl From<&str> for DataType {
    fn from(name: &str) -> Self {
        DataType::Reference(name.to_string())
    }
}

impl From<String> for DataType {
    fn from(name: String) -> Self {
        DataType::Reference(name)
    }
}

/// An ordered sequence; the element attribute carries its own validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    pub elem: AttributeDefinition,
}

/// A keyed mapping with independently typed and validated keys and values.
#[derive(Debug, Clone, PartialEq)]
pub struct Hash {
    pub key: AttributeDefinition,
    pub elem: AttributeDefinition,
}

/// Mapping from attribute name to attribute.
///
/// Names are unique and case-sensitive. Iteration is always in sorted key
/// order so that everything derived from an object is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object(BTreeMap<String, AttributeDefinition>);

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an attribute, returning the previous one with the same name.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        attribute: AttributeDefinition,
    ) -> Option<AttributeDefinition> {
        self.0.insert(name.into(), attribute)
    }

    pub fn get(&self, name: &str) -> Option<&AttributeDefinition> {
        self.0.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut AttributeDefinition> {
        self.0.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeDefinition> {
        self.0.remove(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Attributes in sorted name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeDefinition)> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut AttributeDefinition)> {
        self.0.iter_mut()
    }

    /// Attribute names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, AttributeDefinition)> for Object {
    fn from_iter<I: IntoIterator<Item = (String, AttributeDefinition)>>(iter: I) -> Self {
        Object(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Object {
    type Item = (&'a String, &'a AttributeDefinition);
    type IntoIter = std::collections::btree_map::Iter<'a, String, AttributeDefinition>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Free-form key → values annotations consumed by generators.
pub type Metadata = BTreeMap<String, Vec<String>>;

/// Optional per-attribute constraint bundle.
///
/// Which fields are legal depends on the attribute's kind; see
/// [`validate_attribute`](crate::validation::validate_attribute).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationDefinition {
    /// Allowed values (`Enum`).
    pub values: Vec<Value>,
    /// One of [`FORMATS`](crate::validation::FORMATS).
    pub format: Option<String>,
    /// Regular expression string values must match.
    pub pattern: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    /// String length, or array/hash element count.
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    /// Names of attributes that must be present on an object value.
    pub required: Vec<String>,
}

impl ValidationDefinition {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
            && self.format.is_none()
            && self.pattern.is_none()
            && self.minimum.is_none()
            && self.maximum.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.required.is_empty()
    }

    /// Append required names, skipping ones already listed.
    pub fn add_required<S: AsRef<str>>(&mut self, names: &[S]) {
        for name in names {
            let name = name.as_ref();
            if !self.required.iter().any(|r| r == name) {
                self.required.push(name.to_string());
            }
        }
    }
}

/// A typed slot: the type plus description, metadata, validation, and
/// example.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDefinition {
    pub data_type: DataType,
    pub description: String,
    pub metadata: Metadata,
    pub validation: Option<ValidationDefinition>,
    /// Explicit or generated example. Generated during finalize when absent.
    pub example: Option<Value>,
    pub default_value: Option<Value>,
    /// View used when this attribute's media type is rendered inside a
    /// projection. `None` means `"default"`.
    pub view: Option<String>,
}

impl AttributeDefinition {
    pub fn new(data_type: impl Into<DataType>) -> Self {
        Self {
            data_type: data_type.into(),
            description: String::new(),
            metadata: Metadata::new(),
            validation: None,
            example: None,
            default_value: None,
            view: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// The validation bundle, created empty on first use.
    pub fn validation_mut(&mut self) -> &mut ValidationDefinition {
        self.validation.get_or_insert_with(ValidationDefinition::default)
    }

    /// Whether `name` is listed as required on this attribute.
    pub fn is_required(&self, name: &str) -> bool {
        self.validation
            .as_ref()
            .map_or(false, |v| v.required.iter().any(|r| r == name))
    }
}

// --- tests -------------------------------------------------------------------
