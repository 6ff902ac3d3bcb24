//! # django-async-template
//!
//! A thin [`Engine`] over [`tera`] that speaks in the terms template
//! responses need: "render the first of these names that exists".
//!
//! ```
//! use django_async_template::{Context, Engine};
//!
//! let engine = Engine::new();
//! engine.add_string_template("library/author_list.html", "{% for a in object_list %}{{ a }} {% endfor %}").unwrap();
//!
//! let names = vec!["missing.html".to_string(), "library/author_list.html".to_string()];
//! let chosen = engine.select_template(&names).unwrap();
//! assert_eq!(chosen, "library/author_list.html");
//!
//! let mut ctx = Context::new();
//! ctx.insert("object_list".into(), serde_json::json!(["Ada", "Grace"]));
//! assert_eq!(engine.render_to_string(&chosen, &ctx).unwrap(), "Ada Grace ");
//! ```

pub mod engine;

pub use engine::{Context, Engine};
