//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use arc_swap::ArcSwap;
use route_dispatch::config::{parse_config, AppConfig};
use route_dispatch::http::{echo, DispatchTable, HandlerRegistry};
use route_dispatch::routing::Router;

/// A route table exercising placeholders, locales, auth and relative matching.
pub const SITE: &str = r#"
[router]
script_name = "/index.php"
server_side_rewrite = true
locales = ["en", "de"]

[roles]
admin = ["editor"]
editor = ["member"]

[[routes]]
id = "login"
path = "login"
controller = "echo"

[[routes]]
id = "user"
path = "user/{id}/{tab=profile}"
methods = ["GET"]
controller = "echo"
method = "show"

[[routes.placeholders]]
name = "id"
match = '\d+'

[[routes]]
id = "product_literal"
path = "product/5"
controller = "echo"

[[routes]]
id = "product"
path = "product/{id}"
controller = "echo"

[[routes]]
id = "articles"
path = "articles/{page=1}"
relative = true
controller = "echo"

[[routes]]
id = "admin"
path = "admin"
auth = "admin"
redirect = "login"
controller = "echo"

[[routes]]
id = "drafts"
path = "drafts"
auth = "editor"
redirect = "login"
controller = "echo"

[[routes]]
id = "unbound"
path = "unbound"
"#;

pub fn config(toml_str: &str) -> AppConfig {
    parse_config(toml_str).expect("test config must be valid")
}

pub fn router_from(toml_str: &str) -> Router {
    Router::from_config(&config(toml_str)).expect("test router must build")
}

pub fn registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register("echo", echo);
    registry
}

pub fn table(toml_str: &str) -> Arc<ArcSwap<DispatchTable>> {
    let config = config(toml_str);
    let router = Arc::new(Router::from_config(&config).unwrap());
    let table = registry().resolve(router, config.router.script_name.clone()).unwrap();
    Arc::new(ArcSwap::from_pointee(table))
}
