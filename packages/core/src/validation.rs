use regex::Regex;
use serde_json::Value;

use crate::definitions::{NamedType, DEFAULT_VIEW, LINKS_ATTRIBUTE};
use crate::error::{DesignError, ValidationError};
use crate::registry::Registry;
use crate::types::{AttributeDefinition, DataType, Kind, Primitive, TypeId, ValidationDefinition};

/// Recognized values of the `format` validation.
pub const FORMATS: &[&str] = &[
    "date",
    "date-time",
    "email",
    "hostname",
    "ipv4",
    "ipv6",
    "ip",
    "uri",
    "mac",
    "cidr",
    "regexp",
    "json",
    "rfc1123",
];

/// Formats that also apply to `DateTime` attributes.
const DATE_TIME_FORMATS: &[&str] = &["date", "date-time", "rfc1123"];

/// Check an attribute tree against the validation rules.
///
/// Children are checked before their parent and every violation is
/// collected. Named types reached from `att` are not entered: each is
/// validated once as its own root during finalize. Attributes whose type is
/// still an unresolved reference skip the type-dependent checks; the
/// reference itself is reported by name resolution.
pub fn validate_attribute(
    registry: &Registry,
    context: &str,
    att: &AttributeDefinition,
) -> Vec<DesignError> {
    let mut errors = Vec::new();
    check_attribute(registry, context, att, &mut errors);
    errors
}

/// Media-type-level checks: the default view, the attributes listed by each
/// view, and the links.
pub fn validate_media_type(registry: &Registry, id: TypeId) -> Vec<DesignError> {
    let mut errors = Vec::new();
    let Some(NamedType::Media(mt)) = registry.get(id) else {
        return errors;
    };
    // Collections take their views from the element.
    if registry.is_collection(id) {
        return errors;
    }
    let context = format!("media type {:?}", mt.identifier);
    let mut fail = |e: ValidationError| errors.push(DesignError::validation(context.clone(), e));

    if !mt.has_view(DEFAULT_VIEW) {
        fail(ValidationError::MissingDefaultView);
    }

    let object = registry.object_of(&mt.attribute().data_type);
    for view in mt.views.values() {
        for name in view.names() {
            if name == LINKS_ATTRIBUTE {
                continue;
            }
            if !object.is_some_and(|o| o.contains_key(name)) {
                fail(ValidationError::UnknownViewAttribute {
                    view: view.name.clone(),
                    attribute: name.to_string(),
                });
            }
        }
    }

    for link in mt.links.values() {
        match object.and_then(|o| o.get(&link.name)) {
            None => fail(ValidationError::UnknownLinkAttribute(link.name.clone())),
            Some(att) => match &att.data_type {
                DataType::MediaType(_) | DataType::Reference(_) => {}
                _ => fail(ValidationError::LinkTargetNotMediaType(link.name.clone())),
            },
        }
    }

    errors
}

/// Whether `value` is a legal value of `dt`. Unresolved types accept
/// anything.
pub fn is_assignable(registry: &Registry, dt: &DataType, value: &Value) -> bool {
    let Some(dt) = registry.underlying(dt) else {
        return true;
    };
    match dt {
        DataType::Primitive(p) => match p {
            Primitive::Boolean => value.is_boolean(),
            Primitive::Integer => value.is_i64() || value.is_u64(),
            Primitive::Number => value.is_number(),
            Primitive::String | Primitive::File => value.is_string(),
            Primitive::DateTime => value
                .as_str()
                .is_some_and(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok()),
            Primitive::Uuid => value
                .as_str()
                .is_some_and(|s| uuid::Uuid::parse_str(s).is_ok()),
            Primitive::Any => true,
        },
        DataType::Array(a) => value.as_array().is_some_and(|items| {
            items
                .iter()
                .all(|v| is_assignable(registry, &a.elem.data_type, v))
        }),
        DataType::Hash(h) => value.as_object().is_some_and(|entries| {
            entries.iter().all(|(k, v)| {
                is_key_assignable(registry, &h.key.data_type, k)
                    && is_assignable(registry, &h.elem.data_type, v)
            })
        }),
        DataType::Object(o) => value.as_object().is_some_and(|fields| {
            fields.iter().all(|(k, v)| {
                o.get(k)
                    .is_some_and(|att| is_assignable(registry, &att.data_type, v))
            })
        }),
        DataType::UserType(_) | DataType::MediaType(_) | DataType::Reference(_) => true,
    }
}

// --- helpers -----------------------------------------------------------------

/// JSON object keys are strings: a key matches either as a string or as the
/// JSON value it spells (`"1"` for Integer keys).
fn is_key_assignable(registry: &Registry, dt: &DataType, key: &str) -> bool {
    is_assignable(registry, dt, &Value::String(key.to_string()))
        || serde_json::from_str::<Value>(key).is_ok_and(|v| is_assignable(registry, dt, &v))
}

fn check_attribute(
    registry: &Registry,
    context: &str,
    att: &AttributeDefinition,
    errors: &mut Vec<DesignError>,
) {
    match &att.data_type {
        DataType::Array(a) => {
            check_attribute(registry, &format!("{context} element"), &a.elem, errors)
        }
        DataType::Hash(h) => {
            check_attribute(registry, &format!("{context} key"), &h.key, errors);
            check_attribute(registry, &format!("{context} value"), &h.elem, errors);
        }
        DataType::Object(o) => {
            for (name, child) in o {
                check_attribute(registry, &format!("{context} attribute {name:?}"), child, errors);
            }
        }
        _ => {}
    }

    let kind = registry.kind_of(&att.data_type);
    let mut found = Vec::new();
    if let Some(validation) = &att.validation {
        check_validation(registry, kind, att, validation, &mut found);
    }
    if let Some(default) = &att.default_value {
        if kind != Kind::Reference && !is_assignable(registry, &att.data_type, default) {
            found.push(ValidationError::DefaultValueMismatch {
                value: default.to_string(),
                expected: kind,
            });
        }
    }
    errors.extend(
        found
            .into_iter()
            .map(|e| DesignError::validation(context, e)),
    );
}

fn check_validation(
    registry: &Registry,
    kind: Kind,
    att: &AttributeDefinition,
    v: &ValidationDefinition,
    found: &mut Vec<ValidationError>,
) {
    let resolved = kind != Kind::Reference;

    if resolved {
        for value in &v.values {
            if !is_assignable(registry, &att.data_type, value) {
                found.push(ValidationError::EnumValueMismatch {
                    value: value.to_string(),
                    expected: kind,
                });
            }
        }
    }

    if let Some(format) = &v.format {
        if !FORMATS.contains(&format.as_str()) {
            found.push(ValidationError::UnknownFormat(format.clone()));
        } else if resolved && !format_allowed(format, kind) {
            found.push(ValidationError::FormatNotAllowed {
                format: format.clone(),
                kind,
            });
        }
    }

    if let Some(pattern) = &v.pattern {
        if let Err(e) = Regex::new(pattern) {
            found.push(ValidationError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            });
        }
        if resolved && kind != Kind::String {
            found.push(ValidationError::PatternNotAllowed(kind));
        }
    }

    if v.minimum.is_some() || v.maximum.is_some() {
        if resolved && !kind.is_numeric() {
            found.push(ValidationError::BoundsNotAllowed(kind));
        }
        if let (Some(minimum), Some(maximum)) = (v.minimum, v.maximum) {
            if minimum > maximum {
                found.push(ValidationError::InvertedBounds { minimum, maximum });
            }
        }
    }

    if v.min_length.is_some() || v.max_length.is_some() {
        if resolved && !kind.has_length() {
            found.push(ValidationError::LengthNotAllowed(kind));
        }
        if let (Some(min), Some(max)) = (v.min_length, v.max_length) {
            if min > max {
                found.push(ValidationError::InvertedLength { min, max });
            }
        }
    }

    if !v.required.is_empty() {
        match registry.object_of(&att.data_type) {
            Some(object) => {
                for name in &v.required {
                    if !object.contains_key(name) {
                        found.push(ValidationError::UnknownRequired(name.clone()));
                    }
                }
            }
            None if resolved => found.push(ValidationError::RequiredNotObject(kind)),
            None => {}
        }
    }
}

fn format_allowed(format: &str, kind: Kind) -> bool {
    match kind {
        Kind::String => true,
        Kind::DateTime => DATE_TIME_FORMATS.contains(&format),
        _ => false,
    }
}

// --- tests -------------------------------------------------------------------
