//! wicket-gateway: the channel-facing surface — agent service, user
//! allowlist, rate limiting, and pairing codes.

mod allowlist;
mod pairing;
mod ratelimit;
mod service;

pub use allowlist::{Allowlist, AllowlistError};
pub use pairing::{generate_pairing_code, verify_pairing_code};
pub use ratelimit::{RateDecision, RateLimitConfig, RateLimiter, RateLimiterStats};
pub use service::{AgentService, ChannelMessage, ServiceError};
