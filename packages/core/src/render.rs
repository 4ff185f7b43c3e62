//! Human-readable text rendering of named types and whole designs.
//!
//! The output is stable plain text suitable for terminals and debugging. It
//! is not a canonical format; generators read the finalized [`Registry`]
//! directly.

use crate::definitions::NamedType;
use crate::registry::Registry;
use crate::types::{AttributeDefinition, TypeId};

/// Render one named type (user type or media type) as indented plain text.
///
/// ```text
/// [media type] application/vnd.bottle+json  Bottle
/// "A bottle of wine"
///
/// Attributes:
///   id       Integer  required
///   name     String   required  min_length=2
///   account  Account
///
/// Views:
///   default  id, links, name
///   tiny     id
///
/// Links:
///   account  view: link
/// ```
pub fn render_media_type(registry: &Registry, id: TypeId) -> String {
    let Some(named) = registry.get(id) else {
        return format!("[unknown] #{}\n", id.index());
    };
    let mut out = String::new();

    // header line
    match named {
        NamedType::Media(mt) => {
            out.push_str(&format!("[media type] {}  {}", mt.identifier, mt.type_name()))
        }
        NamedType::User(ut) => out.push_str(&format!("[type] {}", ut.type_name)),
    }
    out.push('\n');

    let att = named.attribute();
    if !att.description.is_empty() {
        out.push_str(&wrap_content(&att.description, 80));
        out.push('\n');
    }

    match registry.object_of(&att.data_type) {
        Some(object) if !object.is_empty() => {
            out.push('\n');
            out.push_str("Attributes:\n");
            let width = object.names().map(str::len).max().unwrap_or(0);
            for (name, child) in object {
                let mut line = format!(
                    "  {:<width$}  {}",
                    name,
                    registry.type_name(&child.data_type)
                );
                if att.is_required(name) {
                    line.push_str("  required");
                }
                let constraints = constraints(child);
                if !constraints.is_empty() {
                    line.push_str("  ");
                    line.push_str(&constraints);
                }
                out.push_str(line.trim_end());
                out.push('\n');
            }
        }
        Some(_) => {}
        None => {
            out.push('\n');
            out.push_str(&format!("Type: {}\n", registry.type_name(&att.data_type)));
        }
    }

    if let NamedType::Media(mt) = named {
        if !mt.views.is_empty() {
            out.push('\n');
            out.push_str("Views:\n");
            let width = mt.views.keys().map(String::len).max().unwrap_or(0);
            for (name, view) in &mt.views {
                let attributes: Vec<&str> = view.names().collect();
                let line = format!("  {:<width$}  {}", name, attributes.join(", "));
                out.push_str(line.trim_end());
                out.push('\n');
            }
        }
        if !mt.links.is_empty() {
            out.push('\n');
            out.push_str("Links:\n");
            for (name, link) in &mt.links {
                match &link.view {
                    Some(view) => out.push_str(&format!("  {}  view: {}\n", name, view)),
                    None => out.push_str(&format!("  {}\n", name)),
                }
            }
        }
    }

    if let Some(example) = &att.example {
        out.push('\n');
        out.push_str(&format!("Example: {}\n", example));
    }

    out
}

/// Render a whole design as a summary: the API, then user types, media
/// types, and resources, each sorted by name.
///
/// ```text
/// API cellar  2 types, 3 media types, 1 resource
/// ──────────────────────────────────────────────
///
/// TYPES (2)
///   BottlePayload  "Payload of bottle create and update"
///
/// MEDIA TYPES (3)
///   application/vnd.bottle  Bottle
///
/// RESOURCES (1)
///   bottle  list, show
/// ```
pub fn render_design(registry: &Registry) -> String {
    let types: Vec<(&str, TypeId)> = registry.user_type_ids().collect();
    let media_types: Vec<(&str, TypeId)> = registry.media_type_ids().collect();
    let resources = registry.resources();

    let name = registry.api().map_or("(unnamed)", |api| api.name.as_str());
    let header = format!(
        "API {}  {}, {}, {}",
        name,
        plural(types.len(), "type"),
        plural(media_types.len(), "media type"),
        plural(resources.len(), "resource"),
    );
    let rule = "─".repeat(header.chars().count());
    let mut out = format!("{}\n{}\n", header, rule);

    if let Some(api) = registry.api() {
        if !api.title.is_empty() || !api.version.is_empty() {
            out.push_str(format!("{}  {}\n", api.title, api.version).trim_start());
        }
    }

    if !types.is_empty() {
        out.push('\n');
        out.push_str(&format!("TYPES ({})\n", types.len()));
        for (name, id) in &types {
            let description = registry.named(*id).user_type().description();
            out.push_str(&summary_line(name, description));
        }
    }

    if !media_types.is_empty() {
        out.push('\n');
        out.push_str(&format!("MEDIA TYPES ({})\n", media_types.len()));
        for (_, id) in &media_types {
            if let Some(mt) = registry.media(*id) {
                out.push_str(&format!("  {}  {}\n", mt.identifier, mt.type_name()));
            }
        }
    }

    if !resources.is_empty() {
        let mut sorted: Vec<_> = resources.iter().collect();
        sorted.sort_by_key(|r| r.name.as_str());
        out.push('\n');
        out.push_str(&format!("RESOURCES ({})\n", sorted.len()));
        for resource in sorted {
            let mut actions: Vec<&str> = resource.actions.iter().map(|a| a.name.as_str()).collect();
            actions.sort_unstable();
            let line = format!("  {}  {}", resource.name, actions.join(", "));
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }

    out
}

// --- helpers -----------------------------------------------------------------

fn constraints(att: &AttributeDefinition) -> String {
    let Some(v) = &att.validation else {
        return String::new();
    };
    let mut parts = Vec::new();
    if !v.values.is_empty() {
        let values: Vec<String> = v.values.iter().map(|x| x.to_string()).collect();
        parts.push(format!("enum=[{}]", values.join(", ")));
    }
    if let Some(format) = &v.format {
        parts.push(format!("format={}", format));
    }
    if let Some(pattern) = &v.pattern {
        parts.push(format!("pattern={}", pattern));
    }
    if let Some(minimum) = v.minimum {
        parts.push(format!("minimum={}", minimum));
    }
    if let Some(maximum) = v.maximum {
        parts.push(format!("maximum={}", maximum));
    }
    if let Some(min) = v.min_length {
        parts.push(format!("min_length={}", min));
    }
    if let Some(max) = v.max_length {
        parts.push(format!("max_length={}", max));
    }
    parts.join("  ")
}

fn summary_line(name: &str, description: &str) -> String {
    if description.is_empty() {
        format!("  {}\n", name)
    } else {
        format!("  {}  \"{}\"\n", name, truncate(description, 72))
    }
}

fn plural(n: usize, noun: &str) -> String {
    format!("{} {}{}", n, noun, if n == 1 { "" } else { "s" })
}

fn wrap_content(content: &str, width: usize) -> String {
    if content.len() <= width {
        return format!("\"{}\"", content);
    }
    let mut result = String::from("\"");
    let mut line_len = 1usize;
    for word in content.split_whitespace() {
        if line_len + word.len() + 1 > width {
            result.push('\n');
            result.push(' ');
            line_len = 1;
        } else if line_len > 1 {
            result.push(' ');
            line_len += 1;
        }
        result.push_str(word);
        line_len += word.len();
    }
    result.push('"');
    result
}

fn truncate(s: &str, max: usize) -> String {
    let s = s.trim();
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max - 1).collect();
        format!("{}…", cut)
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Primitive;

    fn cellar() -> (Registry, TypeId) {
        let mut reg = Registry::new();
        reg.define_api("cellar", |a| {
            a.title("The virtual wine cellar").version("1.0");
        });
        reg.define_type("BottlePayload", |t| {
            t.description("Payload of bottle create and update");
            t.attribute("name", Primitive::String);
        });
        let bottle = reg.define_media_type("application/vnd.bottle", |m| {
            m.description("A bottle of wine");
            m.attributes(|a| {
                a.attribute("id", Primitive::Integer);
                a.attribute_with("name", Primitive::String, |n| {
                    n.min_length(2);
                });
                a.required(&["id", "name"]);
            });
            m.view("default", |v| {
                v.attribute("id").attribute("name");
            });
            m.view("tiny", |v| {
                v.attribute("id");
            });
        });
        reg.define_resource("bottle", |r| {
            r.action("show", |_| {});
            r.action("list", |_| {});
        });
        reg.run().unwrap();
        (reg, bottle.named_id().unwrap())
    }

    #[test]
    fn render_media_type_contains_key_fields() {
        let (reg, bottle) = cellar();
        let rendered = render_media_type(&reg, bottle);
        assert!(rendered.starts_with("[media type] application/vnd.bottle  Bottle\n"));
        assert!(rendered.contains("\"A bottle of wine\""));
        assert!(rendered.contains("  name  String  required  min_length=2\n"));
        assert!(rendered.contains("  tiny     id\n"));
        assert!(rendered.contains("Example: "));
    }

    #[test]
    fn render_design_summarizes_everything() {
        let (reg, _) = cellar();
        let rendered = render_design(&reg);
        assert!(rendered.starts_with("API cellar  1 type, 1 media type, 1 resource\n"));
        assert!(rendered.contains("The virtual wine cellar  1.0\n"));
        assert!(rendered.contains("  BottlePayload  \"Payload of bottle create and update\"\n"));
        assert!(rendered.contains("  application/vnd.bottle  Bottle\n"));
        assert!(rendered.contains("  bottle  list, show\n"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééééé", 4), "ééé…");
    }
}
