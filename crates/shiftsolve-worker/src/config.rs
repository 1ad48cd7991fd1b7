//! Environment-driven configuration for a worker instance.

use std::time::Duration;

/// Typed view over the environment variables in the external interface
/// table, each with the spec's documented default.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_db: i64,
    pub request_stream: String,
    pub result_stream: String,
    pub consumer_group: String,
    pub read_block: Duration,
    pub read_count: usize,
    pub reconnect_delay: Duration,
}

impl WorkerConfig {
    /// Reads configuration from the environment, falling back to the
    /// documented defaults for any variable that is unset or unparsable.
    pub fn from_env() -> Self {
        WorkerConfig {
            redis_host: env_or("REDIS_HOST", "redis"),
            redis_port: env_parsed_or("REDIS_PORT", 6379),
            redis_db: env_parsed_or("REDIS_DB", 0),
            request_stream: env_or("REDIS_REQUEST_STREAM", "schedule:requests"),
            result_stream: env_or("REDIS_RESULT_STREAM", "schedule:results"),
            consumer_group: env_or("REDIS_CONSUMER_GROUP", "scheduler_service"),
            read_block: Duration::from_millis(env_parsed_or("READ_BLOCK_MS", 5000)),
            read_count: env_parsed_or("READ_COUNT", 10),
            reconnect_delay: Duration::from_secs(env_parsed_or("RECONNECT_DELAY", 5)),
        }
    }

    /// The `redis://` connection URL built from host/port/db.
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/{}", self.redis_host, self.redis_port, self.redis_db)
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parsed_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Builds a consumer name unique to this process: hostname plus a short
/// random-looking suffix, matching the source's `hostname-uuid8` scheme.
pub fn consumer_name() -> String {
    let hostname = hostname_best_effort();
    let suffix = process_suffix();
    format!("{hostname}-{suffix}")
}

fn hostname_best_effort() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "worker".to_string())
}

fn process_suffix() -> String {
    format!("{:08x}", std::process::id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        // SAFETY-free: reading env vars that are assumed unset in test runs.
        std::env::remove_var("REDIS_HOST");
        std::env::remove_var("READ_BLOCK_MS");
        let config = WorkerConfig::from_env();
        assert_eq!(config.redis_host, "redis");
        assert_eq!(config.read_block, Duration::from_millis(5000));
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
    }

    #[test]
    fn redis_url_combines_host_port_db() {
        let mut config = WorkerConfig::from_env();
        config.redis_host = "example".to_string();
        config.redis_port = 1234;
        config.redis_db = 2;
        assert_eq!(config.redis_url(), "redis://example:1234/2");
    }
}
