//! Deterministic example values.
//!
//! The generator is seeded from a string, so the same seed and the same
//! graph shape always give the same examples. Values honor enum, bounds,
//! length, and format validations. Expansion through named types stops at a
//! type already being expanded, or past the configured depth, by omitting
//! the value.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use serde_json::{Map, Number, Value};

use crate::registry::Registry;
use crate::types::{AttributeDefinition, DataType, Primitive, TypeId, ValidationDefinition};

const WORDS: &[&str] = &[
    "amber", "basalt", "cellar", "dune", "ember", "fjord", "garnet", "harbor", "iris", "juniper",
    "kestrel", "lagoon", "meadow", "nectar", "orchard", "pebble", "quartz", "ridge", "saffron",
    "timber", "umber", "vintage", "willow", "zephyr",
];

/// 2000-01-01T00:00:00Z
const EPOCH_START: i64 = 946_684_800;
/// 2030-01-01T00:00:00Z
const EPOCH_END: i64 = 1_893_456_000;

/// Pattern attempts before settling for a non-matching candidate.
const PATTERN_ATTEMPTS: usize = 8;

/// Arrays and hashes whose `min_length` exceeds this get no example.
pub const MAX_EXAMPLE_LEN: usize = 16;

/// Strings whose `min_length` exceeds this get no example.
pub const MAX_EXAMPLE_TEXT: usize = 1024;

/// Seeded random example generator.
pub struct ExampleGenerator {
    rng: StdRng,
    max_depth: usize,
}

impl ExampleGenerator {
    pub fn new(seed: &str, max_depth: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed_hash(seed)),
            max_depth,
        }
    }

    /// An example for `att`, or `None` when its type cannot be expanded
    /// (unresolved, or cut off by the cycle and depth bounds at the root).
    pub fn generate(&mut self, registry: &Registry, att: &AttributeDefinition) -> Option<Value> {
        let mut expanding = Vec::new();
        self.attribute(registry, att, &mut expanding)
    }

    fn attribute(
        &mut self,
        registry: &Registry,
        att: &AttributeDefinition,
        expanding: &mut Vec<TypeId>,
    ) -> Option<Value> {
        if let Some(example) = &att.example {
            return Some(example.clone());
        }
        let validation = att.validation.as_ref();
        if let Some(v) = validation.filter(|v| !v.values.is_empty()) {
            let i = self.rng.gen_range(0..v.values.len());
            return Some(v.values[i].clone());
        }

        match &att.data_type {
            DataType::Primitive(p) => self.primitive(*p, validation),
            DataType::Array(a) => {
                let n = self.count(validation)?;
                let items = (0..n)
                    .filter_map(|_| self.attribute(registry, &a.elem, expanding))
                    .collect();
                Some(Value::Array(items))
            }
            DataType::Hash(h) => {
                let n = self.count(validation)?;
                let mut map = Map::new();
                for _ in 0..n {
                    let key = self.attribute(registry, &h.key, expanding);
                    let value = self.attribute(registry, &h.elem, expanding);
                    if let (Some(key), Some(value)) = (key, value) {
                        map.insert(stringify_key(key), value);
                    }
                }
                Some(Value::Object(map))
            }
            DataType::Object(o) => {
                let mut map = Map::new();
                for (name, child) in o {
                    if let Some(value) = self.attribute(registry, child, expanding) {
                        map.insert(name.clone(), value);
                    }
                }
                Some(Value::Object(map))
            }
            DataType::UserType(id) | DataType::MediaType(id) => {
                if expanding.contains(id) || expanding.len() >= self.max_depth {
                    return None;
                }
                let named = registry.get(*id)?;
                expanding.push(*id);
                let value = self.attribute(registry, named.attribute(), expanding);
                expanding.pop();
                value
            }
            DataType::Reference(_) => None,
        }
    }

    fn primitive(&mut self, p: Primitive, v: Option<&ValidationDefinition>) -> Option<Value> {
        let value = match p {
            Primitive::Boolean => Value::Bool(self.rng.gen_bool(0.5)),
            Primitive::Integer => {
                let (lo, hi) = bounds(v, 1.0, 1000.0);
                let lo = lo.ceil() as i64;
                let hi = (hi.floor() as i64).max(lo);
                Value::from(self.rng.gen_range(lo..=hi))
            }
            Primitive::Number => {
                let (lo, hi) = bounds(v, 0.0, 100.0);
                let x = if hi <= lo {
                    lo
                } else if (hi - lo).is_finite() {
                    self.rng.gen_range(lo..=hi)
                } else {
                    // Interpolate so the span itself is never computed.
                    let t: f64 = self.rng.gen();
                    (lo * (1.0 - t) + hi * t).clamp(lo, hi)
                };
                let rounded = (x * 100.0).round() / 100.0;
                let x = if (lo..=hi).contains(&rounded) { rounded } else { x };
                Number::from_f64(x).map_or(Value::Null, Value::Number)
            }
            Primitive::String => Value::String(self.string(v)?),
            Primitive::DateTime => Value::String(self.date_time().to_rfc3339_opts(SecondsFormat::Secs, true)),
            Primitive::Uuid => {
                let bytes: [u8; 16] = self.rng.gen();
                Value::String(uuid::Builder::from_random_bytes(bytes).into_uuid().to_string())
            }
            Primitive::Any => Value::String(self.word().to_string()),
            Primitive::File => Value::String(format!("{}.txt", self.word())),
        };
        Some(value)
    }

    fn string(&mut self, v: Option<&ValidationDefinition>) -> Option<String> {
        if let Some(format) = v.and_then(|v| v.format.as_deref()) {
            return Some(self.formatted(format));
        }
        let pattern = v
            .and_then(|v| v.pattern.as_deref())
            .and_then(|p| Regex::new(p).ok());
        let (min, max) = v.map_or((None, None), |v| (v.min_length, v.max_length));
        if min.is_some_and(|min| min > MAX_EXAMPLE_TEXT) {
            return None;
        }

        let mut first = None;
        for _ in 0..PATTERN_ATTEMPTS {
            let candidate = self.sized_text(min, max);
            match &pattern {
                Some(re) if !re.is_match(&candidate) => {
                    first.get_or_insert(candidate);
                }
                _ => return Some(candidate),
            }
        }
        first
    }

    /// Words joined until at least `min` characters, cut at `max`.
    fn sized_text(&mut self, min: Option<usize>, max: Option<usize>) -> String {
        let min = min.unwrap_or(0);
        let mut text = self.word().to_string();
        while text.chars().count() < min {
            text.push(' ');
            text.push_str(self.word());
        }
        if let Some(max) = max {
            text = text.chars().take(max).collect();
        }
        text
    }

    fn formatted(&mut self, format: &str) -> String {
        match format {
            "date" => self.date_time().format("%Y-%m-%d").to_string(),
            "date-time" => self.date_time().to_rfc3339_opts(SecondsFormat::Secs, true),
            "rfc1123" => self.date_time().format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
            "email" => format!("{}@example.com", self.word()),
            "hostname" => format!("{}.example.com", self.word()),
            "ipv4" | "ip" => {
                let [a, b, c]: [u8; 3] = self.rng.gen();
                format!("10.{a}.{b}.{c}")
            }
            "ipv6" => format!("2001:db8::{:x}", self.rng.gen::<u16>()),
            "uri" => format!("https://example.com/{}", self.word()),
            "mac" => {
                let b: [u8; 5] = self.rng.gen();
                format!("02:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", b[0], b[1], b[2], b[3], b[4])
            }
            "cidr" => format!("10.0.0.0/{}", self.rng.gen_range(8..=30)),
            "regexp" => format!("^{}$", self.word()),
            "json" => format!("{{\"{}\":{}}}", self.word(), self.rng.gen_range(0..100)),
            _ => self.word().to_string(),
        }
    }

    fn date_time(&mut self) -> DateTime<Utc> {
        let secs = self.rng.gen_range(EPOCH_START..EPOCH_END);
        DateTime::from_timestamp(secs, 0).unwrap_or_default()
    }

    fn word(&mut self) -> &'static str {
        WORDS[self.rng.gen_range(0..WORDS.len())]
    }

    /// Element count for arrays and hashes, within the length bounds.
    /// `None` when the minimum is too large to build.
    fn count(&mut self, v: Option<&ValidationDefinition>) -> Option<usize> {
        let min = v.and_then(|v| v.min_length).unwrap_or(1);
        if min > MAX_EXAMPLE_LEN {
            return None;
        }
        let max = v
            .and_then(|v| v.max_length)
            .unwrap_or(min.saturating_add(2))
            .clamp(min, min.saturating_add(5));
        Some(self.rng.gen_range(min..=max))
    }
}

// --- helpers -----------------------------------------------------------------

/// FNV-1a, stable across platforms and releases.
fn seed_hash(seed: &str) -> u64 {
    seed.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}

/// Sampling range from the declared bounds, always finite.
fn bounds(v: Option<&ValidationDefinition>, lo: f64, hi: f64) -> (f64, f64) {
    let min = v.and_then(|v| v.minimum);
    let max = v.and_then(|v| v.maximum);
    let (lo, hi) = match (min, max) {
        (Some(min), Some(max)) => (min, max.max(min)),
        (Some(min), None) => (min, min + (hi - lo)),
        (None, Some(max)) => (max - (hi - lo), max),
        (None, None) => (lo, hi),
    };
    (lo.clamp(-f64::MAX, f64::MAX), hi.clamp(-f64::MAX, f64::MAX))
}

fn stringify_key(key: Value) -> String {
    match key {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::{NamedType, UserTypeDefinition};
    use crate::dsl::array_of;
    use crate::types::{Array, Hash, Object};
    use serde_json::json;

    fn generate(seed: &str, att: &AttributeDefinition) -> Option<Value> {
        let reg = Registry::new();
        ExampleGenerator::new(seed, 4).generate(&reg, att)
    }

    #[test]
    fn same_seed_same_example() {
        let mut o = Object::new();
        o.insert("id", AttributeDefinition::new(Primitive::Integer));
        o.insert("name", AttributeDefinition::new(Primitive::String));
        o.insert("at", AttributeDefinition::new(Primitive::DateTime));
        let att = AttributeDefinition::new(o);
        assert_eq!(generate("foo", &att), generate("foo", &att));
    }

    #[test]
    fn uuid_example_is_a_string() {
        let v = generate("foo", &AttributeDefinition::new(Primitive::Uuid)).unwrap();
        let s = v.as_str().unwrap();
        assert!(uuid::Uuid::parse_str(s).is_ok());
    }

    #[test]
    fn hash_keyed_by_uuid_has_string_keys() {
        let att = AttributeDefinition::new(Hash {
            key: AttributeDefinition::new(Primitive::Uuid),
            elem: AttributeDefinition::new(Primitive::String),
        });
        let v = generate("foo", &att).unwrap();
        let map = v.as_object().unwrap();
        assert!(!map.is_empty());
        assert!(map.keys().all(|k| uuid::Uuid::parse_str(k).is_ok()));
        assert!(map.values().all(Value::is_string));
    }

    #[test]
    fn enum_and_bounds_are_honored() {
        let mut color = AttributeDefinition::new(Primitive::String);
        color.validation_mut().values = vec![json!("red"), json!("blue")];
        for seed in ["a", "b", "c", "d"] {
            let v = generate(seed, &color).unwrap();
            assert!(v == json!("red") || v == json!("blue"));
        }

        let mut age = AttributeDefinition::new(Primitive::Integer);
        age.validation_mut().minimum = Some(0.0);
        age.validation_mut().maximum = Some(130.0);
        for seed in ["a", "b", "c", "d"] {
            let n = generate(seed, &age).unwrap().as_i64().unwrap();
            assert!((0..=130).contains(&n));
        }
    }

    #[test]
    fn lengths_are_honored() {
        let mut name = AttributeDefinition::new(Primitive::String);
        name.validation_mut().min_length = Some(12);
        name.validation_mut().max_length = Some(14);
        let s = generate("x", &name).unwrap();
        let len = s.as_str().unwrap().chars().count();
        assert!((12..=14).contains(&len));

        let mut tags = AttributeDefinition::new(Array {
            elem: AttributeDefinition::new(Primitive::String),
        });
        tags.validation_mut().min_length = Some(2);
        tags.validation_mut().max_length = Some(2);
        assert_eq!(generate("x", &tags).unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn formats_are_honored() {
        let mut email = AttributeDefinition::new(Primitive::String);
        email.validation_mut().format = Some("email".into());
        assert!(generate("x", &email).unwrap().as_str().unwrap().ends_with("@example.com"));

        let mut date = AttributeDefinition::new(Primitive::String);
        date.validation_mut().format = Some("date-time".into());
        let s = generate("x", &date).unwrap();
        assert!(DateTime::parse_from_rfc3339(s.as_str().unwrap()).is_ok());
    }

    #[test]
    fn explicit_example_wins() {
        let mut att = AttributeDefinition::new(Primitive::Integer);
        att.example = Some(json!(42));
        assert_eq!(generate("x", &att), Some(json!(42)));
    }

    #[test]
    fn recursive_type_terminates() {
        let mut reg = Registry::new();
        let id = reg.alloc(NamedType::User(UserTypeDefinition::new(
            "Node",
            AttributeDefinition::new(Object::new()),
        )));
        let mut o = Object::new();
        o.insert("name", AttributeDefinition::new(Primitive::String));
        o.insert("next", AttributeDefinition::new(DataType::UserType(id)));
        *reg.named_mut(id).attribute_mut() = AttributeDefinition::new(o);

        let root = AttributeDefinition::new(DataType::UserType(id));
        let v = ExampleGenerator::new("x", 4).generate(&reg, &root).unwrap();
        let map = v.as_object().unwrap();
        assert!(map.contains_key("name"));
        assert!(!map.contains_key("next"));
    }

    #[test]
    fn extreme_number_bounds_stay_in_range() {
        let mut wide = AttributeDefinition::new(Primitive::Number);
        wide.validation_mut().minimum = Some(-1e308);
        wide.validation_mut().maximum = Some(1e308);
        for seed in ["a", "b", "c", "d"] {
            let x = generate(seed, &wide).unwrap().as_f64().unwrap();
            assert!(x.is_finite());
            assert!((-1e308..=1e308).contains(&x));
        }

        let mut top = AttributeDefinition::new(Primitive::Number);
        top.validation_mut().minimum = Some(f64::MAX);
        let x = generate("a", &top).unwrap().as_f64().unwrap();
        assert_eq!(x, f64::MAX);

        let mut reg = Registry::new();
        reg.define_type("Wide", |t| {
            t.attribute_with("x", Primitive::Number, |x| {
                x.minimum(-1e308).maximum(1e308);
            });
        });
        assert!(reg.run().is_ok());
    }

    #[test]
    fn oversized_lengths_omit_the_example() {
        for min in [usize::MAX, 1_000_000_000, MAX_EXAMPLE_LEN + 1] {
            let mut list = AttributeDefinition::new(Array {
                elem: AttributeDefinition::new(Primitive::Integer),
            });
            list.validation_mut().min_length = Some(min);
            assert_eq!(generate("x", &list), None);

            let mut map = AttributeDefinition::new(Hash {
                key: AttributeDefinition::new(Primitive::String),
                elem: AttributeDefinition::new(Primitive::Integer),
            });
            map.validation_mut().min_length = Some(min);
            assert_eq!(generate("x", &map), None);
        }

        let mut text = AttributeDefinition::new(Primitive::String);
        text.validation_mut().min_length = Some(usize::MAX);
        assert_eq!(generate("x", &text), None);

        let mut reg = Registry::new();
        reg.define_type("Big", |t| {
            t.attribute("id", Primitive::Integer);
            t.attribute_with("ids", array_of(Primitive::Integer), |a| {
                a.min_length(usize::MAX);
            });
        });
        assert!(reg.run().is_ok());
        let id = reg.find_type("Big").unwrap();
        let example = reg.named(id).attribute().example.clone().unwrap();
        assert!(example.get("id").is_some());
        assert!(example.get("ids").is_none());
    }

    #[test]
    fn lengths_at_the_cap_are_built() {
        let mut list = AttributeDefinition::new(Array {
            elem: AttributeDefinition::new(Primitive::Integer),
        });
        list.validation_mut().min_length = Some(MAX_EXAMPLE_LEN);
        let len = generate("x", &list).unwrap().as_array().unwrap().len();
        assert!((MAX_EXAMPLE_LEN..=MAX_EXAMPLE_LEN + 5).contains(&len));
    }

    #[test]
    fn seed_hash_is_stable() {
        assert_eq!(seed_hash(""), 0xcbf2_9ce4_8422_2325);
        assert_ne!(seed_hash("a"), seed_hash("b"));
    }
}
