use std::time::Duration;

use anyhow::{Context, anyhow};
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tokio::time::timeout;
use url::Url;

use crate::config::AppConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl DbConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            endpoint: config.surreal_endpoint.clone(),
            namespace: config.surreal_ns.clone(),
            database: config.surreal_db.clone(),
            username: config.surreal_user.clone(),
            password: config.surreal_pass.clone(),
        }
    }
}

/// Opens an authenticated websocket session scoped to the configured
/// namespace and database.
pub async fn connect(db_config: &DbConfig) -> anyhow::Result<Surreal<Client>> {
    let address = parse_socket_address(&db_config.endpoint)?;
    let db = Surreal::<Client>::init();
    timeout(CONNECT_TIMEOUT, db.connect::<Ws>(address.as_str()))
        .await
        .map_err(|_| anyhow!("surreal connect to {address} timed out"))?
        .with_context(|| format!("surreal connect to {address} failed"))?;
    db.signin(Root {
        username: &db_config.username,
        password: &db_config.password,
    })
    .await
    .context("surreal signin failed")?;
    db.use_ns(&db_config.namespace)
        .use_db(&db_config.database)
        .await
        .context("surreal namespace selection failed")?;

    tracing::info!(
        endpoint = %address,
        namespace = %db_config.namespace,
        database = %db_config.database,
        "connected to surrealdb"
    );
    Ok(db)
}

/// Reduces an endpoint such as `ws://db:8000/rpc` to the `host:port` form
/// the websocket engine expects.
fn parse_socket_address(endpoint: &str) -> anyhow::Result<String> {
    let normalized = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("ws://{endpoint}")
    };
    let parsed = Url::parse(&normalized)
        .map_err(|err| anyhow!("invalid surreal endpoint '{endpoint}': {err}"))?;

    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("missing surreal host in endpoint '{endpoint}'"))?;
    let port = parsed.port().unwrap_or(match parsed.scheme() {
        "wss" | "https" => 443,
        _ => 8000,
    });
    Ok(format!("{host}:{port}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_explicit_port() {
        assert_eq!(
            parse_socket_address("ws://127.0.0.1:8001").expect("address"),
            "127.0.0.1:8001"
        );
    }

    #[test]
    fn endpoint_without_scheme_defaults_to_ws_port() {
        assert_eq!(
            parse_socket_address("surreal.internal").expect("address"),
            "surreal.internal:8000"
        );
    }

    #[test]
    fn secure_scheme_defaults_to_443() {
        assert_eq!(
            parse_socket_address("wss://db.example.org/rpc").expect("address"),
            "db.example.org:443"
        );
    }

    #[test]
    fn endpoint_without_host_is_rejected() {
        assert!(parse_socket_address("ws://:8000").is_err());
    }
}
