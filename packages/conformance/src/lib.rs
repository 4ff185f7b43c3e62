//! Shared design fixtures for the apidesign conformance test suite.
//!
//! Each fixture registers a small design on a fresh [`Registry`] and
//! returns it unrun, so tests decide when the two passes happen. The
//! [`CELLAR_DOCUMENT`] constant holds the cellar design in the JSON document
//! format.

use apidesign::{array_of, hash_of, DataType, Primitive, Registry};

pub const ACCOUNT: &str = "application/vnd.account+json";
pub const BOTTLE: &str = "application/vnd.bottle+json";
pub const MENU: &str = "application/vnd.menu+json";
pub const MT1: &str = "application/mt1";
pub const MT2: &str = "application/mt2";

/// A wine cellar: accounts own bottles, bottles link back to their account,
/// and a resource serves both views of a bottle.
pub fn cellar() -> Registry {
    let mut reg = Registry::new();

    reg.define_api("cellar", |a| {
        a.title("The virtual wine cellar")
            .description("A basic example of an API implemented with apidesign")
            .version("1.0");
    });

    reg.define_media_type(ACCOUNT, |m| {
        m.description("A tenant account");
        // The bottle media type is declared below; the collection resolves at finalize.
        let bottles = m.collection_of(BOTTLE);
        m.attributes(move |a| {
            a.attribute("id", Primitive::Integer);
            a.attribute("href", Primitive::String);
            a.attribute_with("name", Primitive::String, |n| {
                n.min_length(1).max_length(64);
            });
            a.attribute_with("created_at", Primitive::DateTime, |c| {
                c.format("date-time");
            });
            a.attribute("bottles", bottles);
            a.required(&["id", "name"]);
        });
        m.view("default", |v| {
            v.attribute("id").attribute("href").attribute("name").attribute("created_at");
        });
        m.view("link", |v| {
            v.attribute("id").attribute("href");
        });
    });

    reg.define_type("BottlePayload", |t| {
        t.description("Payload of bottle create and update");
        t.attribute_with("name", Primitive::String, |n| {
            n.min_length(2);
        });
        t.attribute_with("vintage", Primitive::Integer, |v| {
            v.minimum(1900.0).maximum(2030.0);
        });
        t.attribute_with("color", Primitive::String, |c| {
            c.enum_values(["red", "white", "rose", "yellow", "sparkling"]);
        });
        t.attribute("ratings", hash_of(Primitive::Uuid, Primitive::Integer));
        t.required(&["name", "vintage", "color"]);
    });

    reg.define_media_type(BOTTLE, |m| {
        m.description("A bottle of wine");
        m.attributes(|a| {
            a.attribute("id", Primitive::Integer);
            a.attribute("href", Primitive::String);
            a.attribute("name", Primitive::String);
            a.attribute("vintage", Primitive::Integer);
            a.attribute("tags", array_of(Primitive::String));
            a.attribute("account", ACCOUNT);
            a.required(&["id", "name"]);
        });
        m.link("account");
        m.view("default", |v| {
            v.attribute("id")
                .attribute("href")
                .attribute("name")
                .attribute("vintage")
                .attribute("tags")
                .attribute("links");
        });
        m.view("tiny", |v| {
            v.attribute("id").attribute("href").attribute("name");
        });
        m.view("full", |v| {
            v.attribute("id").attribute("name").attribute_with("account", |a| {
                a.view = Some("link".into());
            });
        });
    });

    reg.define_resource("bottle", |r| {
        r.description("A wine bottle");
        r.default_media(BOTTLE);
        r.action("list", |a| {
            a.params(|p| {
                p.attribute("years", array_of(Primitive::Integer));
            });
            a.response_media("OK", 200, "application/vnd.bottle; type=collection", Some("tiny"));
        });
        r.action("show", |a| {
            a.params(|p| {
                p.attribute("bottleID", Primitive::Integer);
                p.required(&["bottleID"]);
            });
            a.response_media("OK", 200, BOTTLE, None);
            a.response("NotFound", 404);
        });
        r.action("create", |a| {
            a.payload("BottlePayload");
            a.response("Created", 201);
        });
    });
    reg
}

/// Two media types referencing each other through their default views.
pub fn mutual_media_types() -> Registry {
    let mut reg = Registry::new();
    reg.define_media_type(MT1, |m| {
        m.attributes(|a| {
            a.attribute("id", Primitive::String);
            a.attribute("mt2", MT2);
        });
        m.view("default", |v| {
            v.attribute("id").attribute("mt2");
        });
    });
    reg.define_media_type(MT2, |m| {
        m.attributes(|a| {
            a.attribute("id", Primitive::String);
            a.attribute("mt1", MT1);
        });
        m.view("default", |v| {
            v.attribute("id").attribute("mt1");
        });
    });
    reg
}

/// A menu whose children are a collection of menus.
pub fn menu() -> Registry {
    let mut reg = Registry::new();
    reg.define_media_type(MENU, |m| {
        let children = m.collection_of(MENU);
        m.attributes(move |a| {
            a.attribute("name", Primitive::String);
            a.attribute("children", children);
        });
        m.view("default", |v| {
            v.attribute("name").attribute("children");
        });
    });
    reg
}

/// User types `A` and `B` referencing each other, and `Node` referencing
/// itself twice.
pub fn recursive_types() -> Registry {
    let mut reg = Registry::new();
    reg.define_type("A", |t| {
        t.attribute("name", Primitive::String);
        t.attribute("b", "B");
    });
    reg.define_type("B", |t| {
        t.attribute("name", Primitive::String);
        t.attribute("a", "A");
    });
    reg.define_type("Node", |t| {
        t.attribute("name", Primitive::String);
        t.attribute("next", "Node");
        t.attribute("children", array_of("Node"));
    });
    reg
}

/// The named type `name` of a run registry.
pub fn type_of(reg: &Registry, name: &str) -> DataType {
    reg.lookup(name)
        .unwrap_or_else(|| panic!("{name} is not defined"))
}

/// The cellar design as a JSON design document.
pub const CELLAR_DOCUMENT: &str = r#"{
  "api": { "name": "cellar", "title": "The virtual wine cellar", "version": "1.0" },
  "types": [
    { "name": "BottlePayload",
      "description": "Payload of bottle create and update",
      "attributes": {
        "name": { "type": "String", "min_length": 2 },
        "vintage": { "type": "Integer", "minimum": 1900, "maximum": 2030 },
        "color": { "enum": ["red", "white", "rose", "yellow", "sparkling"] },
        "ratings": { "type": { "hash_of": ["UUID", "Integer"] } }
      },
      "required": ["name", "vintage", "color"] }
  ],
  "media_types": [
    { "identifier": "application/vnd.account+json",
      "description": "A tenant account",
      "attributes": {
        "id": { "type": "Integer" },
        "href": {},
        "name": { "min_length": 1, "max_length": 64 },
        "created_at": { "type": "DateTime", "format": "date-time" },
        "bottles": { "type": { "collection_of": "application/vnd.bottle+json" } }
      },
      "required": ["id", "name"],
      "views": { "default": ["id", "href", "name", "created_at"], "link": ["id", "href"] } },
    { "identifier": "application/vnd.bottle+json",
      "description": "A bottle of wine",
      "attributes": {
        "id": { "type": "Integer" },
        "href": {},
        "name": {},
        "vintage": { "type": "Integer" },
        "tags": { "type": { "array_of": "String" } },
        "account": { "type": "application/vnd.account" }
      },
      "required": ["id", "name"],
      "links": ["account"],
      "views": {
        "default": ["id", "href", "name", "vintage", "tags", "links"],
        "tiny": ["id", "href", "name"],
        "full": ["id", "name", { "name": "account", "view": "link" }]
      } }
  ],
  "resources": [
    { "name": "bottle",
      "description": "A wine bottle",
      "default_media": "application/vnd.bottle",
      "actions": [
        { "name": "list",
          "params": { "attributes": { "years": { "type": { "array_of": "Integer" } } } },
          "responses": [
            { "name": "OK", "status": 200,
              "media_type": "application/vnd.bottle; type=collection", "view": "tiny" }
          ] },
        { "name": "show",
          "params": { "attributes": { "bottleID": { "type": "Integer" } }, "required": ["bottleID"] },
          "responses": [
            { "name": "OK", "status": 200, "media_type": "application/vnd.bottle" },
            { "name": "NotFound", "status": 404 }
          ] },
        { "name": "create",
          "payload": { "type": "BottlePayload" },
          "responses": [ { "name": "Created", "status": 201 } ] }
      ] }
  ]
}"#;
