//! Application configuration loaded from environment variables.

use std::time::Duration;

use common::{AgentId, ItemId};

const DEFAULT_TIMEOUT_SECS: u64 = 600;
const DEFAULT_INVENTORY: &str = "pizza=5,burger=10";
const DEFAULT_AGENTS: &str = "agent1@location1,agent2@location2";

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `TRANSACTION_TIMEOUT_SECS` — advisory transaction timeout (default: `600`)
/// - `SEED_INVENTORY` — `item=quantity` pairs (default: `"pizza=5,burger=10"`)
/// - `SEED_AGENTS` — `agent@location` pairs (default: `"agent1@location1,agent2@location2"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub transaction_timeout: Duration,
    pub seed_inventory: Vec<(ItemId, u32)>,
    pub seed_agents: Vec<(AgentId, String)>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            transaction_timeout: Duration::from_secs(
                std::env::var("TRANSACTION_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            seed_inventory: parse_inventory(
                &std::env::var("SEED_INVENTORY").unwrap_or_else(|_| DEFAULT_INVENTORY.to_string()),
            ),
            seed_agents: parse_agents(
                &std::env::var("SEED_AGENTS").unwrap_or_else(|_| DEFAULT_AGENTS.to_string()),
            ),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            transaction_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            seed_inventory: parse_inventory(DEFAULT_INVENTORY),
            seed_agents: parse_agents(DEFAULT_AGENTS),
        }
    }
}

/// Parses `item=quantity` pairs separated by commas, skipping bad entries.
pub fn parse_inventory(raw: &str) -> Vec<(ItemId, u32)> {
    entries(raw)
        .filter_map(|entry| {
            let parsed = entry
                .split_once('=')
                .and_then(|(item, quantity)| {
                    let item = item.trim();
                    let quantity = quantity.trim().parse().ok()?;
                    (!item.is_empty()).then(|| (ItemId::from(item), quantity))
                });
            if parsed.is_none() {
                tracing::warn!(%entry, "ignoring malformed inventory entry");
            }
            parsed
        })
        .collect()
}

/// Parses `agent@location` pairs separated by commas, skipping bad entries.
pub fn parse_agents(raw: &str) -> Vec<(AgentId, String)> {
    entries(raw)
        .filter_map(|entry| {
            let parsed = entry.split_once('@').and_then(|(agent, location)| {
                let (agent, location) = (agent.trim(), location.trim());
                (!agent.is_empty() && !location.is_empty())
                    .then(|| (AgentId::from(agent), location.to_string()))
            });
            if parsed.is_none() {
                tracing::warn!(%entry, "ignoring malformed agent entry");
            }
            parsed
        })
        .collect()
}

fn entries(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|e| !e.is_empty())
}
