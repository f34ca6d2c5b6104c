//! HTTP client pool keyed by base URL.
//!
//! Every provider (chat endpoint, search API, news sources) gets one shared
//! `reqwest::Client`, so connections, DNS lookups and TLS sessions are reused
//! across the many short calls a research run makes.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::time::Duration;

/// Global cache of HTTP clients indexed by base URL.
static CLIENT_POOL: Lazy<DashMap<String, reqwest::Client>> = Lazy::new(DashMap::new);

/// Creates or retrieves a shared HTTP client for the given base URL.
///
/// The client is configured with:
/// - up to 100 idle connections per host
/// - 90-second idle timeout
/// - TCP keepalive every 60 seconds
/// - 30-second connect timeout
///
/// No whole-request timeout is set; analysis streams may run for minutes.
pub fn get_or_create_client(base_url: &str) -> reqwest::Client {
    CLIENT_POOL
        .entry(base_url.to_string())
        .or_insert_with(create_pooled_client)
        .clone()
}

fn create_pooled_client() -> reqwest::Client {
    reqwest::ClientBuilder::new()
        .pool_max_idle_per_host(100)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|err| {
            log::warn!("http_client_pool: falling back to default client ({})", err);
            reqwest::Client::new()
        })
}
