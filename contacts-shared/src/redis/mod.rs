/// Redis integration
///
/// Redis backs the per-user request rate limiter. It is optional: without a
/// configured URL the API runs with rate limiting turned off.

pub mod client;

pub use client::{RedisClient, RedisClientError, RedisConfig};
