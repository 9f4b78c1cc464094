use std::collections::BTreeMap;
use std::path::PathBuf;

use axum::http::{Method, StatusCode};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use route_dispatch::config::load_config;
use route_dispatch::routing::{Route, Router, SimpleRequest};
use route_dispatch::security::{SessionUser, User};

#[derive(Parser)]
#[command(name = "route-cli")]
#[command(about = "Inspect and exercise a route table offline", long_about = None)]
struct Cli {
    /// Route configuration file.
    #[arg(short, long, default_value = "config/routes.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List routes in registration order
    Routes,
    /// Resolve a request path to a route
    Resolve {
        /// Path info, e.g. /user/42
        path: String,

        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Resolve as this authenticated user
        #[arg(long)]
        user: Option<String>,

        /// Role held by the user (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,

        /// Host used for absolute redirect locations
        #[arg(long)]
        host: Option<String>,
    },
    /// Generate the URL of a route
    Url {
        route: String,

        /// Placeholder value as name=value (repeatable)
        #[arg(short, long = "param", value_parser = parse_pair)]
        params: Vec<(String, String)>,
    },
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{s}'"))
}

fn describe(route: &Route) -> Value {
    json!({
        "id": route.id(),
        "script": route.script_name(),
        "path": route.path_template(),
        "match": route.match_expression().source(),
        "relative": route.is_relative(),
        "methods": route.methods().iter().map(|m| m.as_str()).collect::<Vec<_>>(),
        "auth": route.auth(),
        "redirect": route.redirect_target(),
        "controller": route.controller(),
        "method": route.method_name(),
        "url_prefix": route.url_prefix(),
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let router = Router::from_config(&config)?;

    let output = match cli.command {
        Commands::Routes => Value::Array(router.routes().map(|r| describe(r)).collect()),
        Commands::Resolve {
            path,
            method,
            user,
            roles,
            host,
        } => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
            let mut request =
                SimpleRequest::new(method, path).with_script(config.router.script_name.clone());
            if let Some(host) = host {
                request = request.with_host(host);
            }
            let session = user.map(|name| SessionUser::authenticated(name, roles));

            let resolution = router
                .get_route_from_path_info(&request, session.as_ref().map(|u| u as &dyn User))?;
            let redirect = resolution.redirect(&[], StatusCode::FOUND)?;
            let parameters: BTreeMap<&str, &str> = resolution.parameters().iter().collect();

            json!({
                "route": resolution.route().id(),
                "matched": resolution.matched().id(),
                "redirected_by": resolution.redirected_by().map(|r| r.id()),
                "location": redirect.map(|r| r.location),
                "checked_path": resolution.context().checked_path(),
                "locale": resolution.locale(),
                "parameters": parameters,
            })
        }
        Commands::Url { route, params } => {
            let params: Vec<(&str, &str)> = params
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            let url = router.require_route(&route)?.url(&params)?;
            json!({ "route": route, "url": url })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
