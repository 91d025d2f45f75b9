pub mod client;
pub mod errors;
pub mod parsing;
pub mod prompts;
pub mod rate_limiter;
pub mod types;

pub use client::{ClaudeOracle, ClaudeOracleConfig};
pub use rate_limiter::TokenBucketRateLimiter;
pub use types::{Message, MessageRequest, MessageResponse};
