//! Fixed-window admission control shared by gateway transports.
//!
//! Two independent counters per client identifier: a message-rate window
//! that resets wholesale at expiry, and a connection-concurrency gauge. A
//! periodic sweep drops fully-elapsed windows so memory stays bounded to
//! active identifiers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Rate limiter settings.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Messages allowed per window.
    pub max_messages_per_window: u32,
    /// Window duration.
    pub window: Duration,
    /// Concurrent connections allowed per identifier.
    pub max_connections_per_ip: u32,
    /// How often expired windows are swept.
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_messages_per_window: 60,
            window: Duration::from_secs(60),
            max_connections_per_ip: 5,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Outcome of a message admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// Rejected; retry once this much time has passed.
    Limited { retry_after: Duration },
}

#[derive(Debug)]
struct RateLimitEntry {
    count: u32,
    window_reset_at: Instant,
}

/// Current counters, for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterStats {
    pub tracked_identifiers: usize,
    pub active_connections: u32,
    pub unique_ips: usize,
}

/// Sliding-window message limiter plus connection gauge.
pub struct RateLimiter {
    messages: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
    connections: Mutex<HashMap<String, u32>>,
    config: RateLimitConfig,
    sweeper: JoinHandle<()>,
}

impl RateLimiter {
    /// Create a limiter and start its sweep task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: RateLimitConfig) -> Self {
        let messages: Arc<Mutex<HashMap<String, RateLimitEntry>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let sweeper = spawn_sweeper(Arc::clone(&messages), config.sweep_interval);
        Self {
            messages,
            connections: Mutex::new(HashMap::new()),
            config,
            sweeper,
        }
    }

    /// Admit or reject a message from this identifier.
    pub fn check_message(&self, identifier: &str) -> RateDecision {
        let now = Instant::now();
        let mut messages = self.messages.lock().unwrap();

        match messages.get_mut(identifier) {
            Some(entry) if now < entry.window_reset_at => {
                if entry.count >= self.config.max_messages_per_window {
                    let retry_after = entry.window_reset_at - now;
                    tracing::warn!(
                        identifier,
                        count = entry.count,
                        limit = self.config.max_messages_per_window,
                        retry_after_secs = retry_after.as_secs(),
                        "rate limit exceeded"
                    );
                    return RateDecision::Limited { retry_after };
                }
                entry.count += 1;
                RateDecision::Allowed
            }
            _ => {
                // New window: the counter resets wholesale.
                messages.insert(
                    identifier.to_string(),
                    RateLimitEntry {
                        count: 1,
                        window_reset_at: now + self.config.window,
                    },
                );
                RateDecision::Allowed
            }
        }
    }

    /// Track a new connection. Returns false once the ceiling is reached.
    pub fn track_connection(&self, ip: &str) -> bool {
        let mut connections = self.connections.lock().unwrap();
        let current = connections.get(ip).copied().unwrap_or(0);
        if current >= self.config.max_connections_per_ip {
            tracing::warn!(
                ip,
                current,
                limit = self.config.max_connections_per_ip,
                "connection limit exceeded"
            );
            return false;
        }
        connections.insert(ip.to_string(), current + 1);
        true
    }

    /// Release a tracked connection.
    pub fn release_connection(&self, ip: &str) {
        let mut connections = self.connections.lock().unwrap();
        match connections.get_mut(ip) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                connections.remove(ip);
            }
            None => {}
        }
    }

    /// Current counters, for monitoring.
    pub fn stats(&self) -> RateLimiterStats {
        let connections = self.connections.lock().unwrap();
        RateLimiterStats {
            tracked_identifiers: self.messages.lock().unwrap().len(),
            active_connections: connections.values().sum(),
            unique_ips: connections.len(),
        }
    }

    /// Stop the sweep task.
    pub fn shutdown(&self) {
        self.sweeper.abort();
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}

fn spawn_sweeper(
    messages: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
    sweep_interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let now = Instant::now();
            let mut messages = messages.lock().unwrap();
            let before = messages.len();
            messages.retain(|_, entry| now < entry.window_reset_at);
            let cleaned = before - messages.len();
            if cleaned > 0 {
                tracing::debug!(cleaned, "rate limiter sweep");
            }
        }
    })
}
