/// Middleware modules for the API server
///
/// - `security`: security response headers
/// - `rate_limit`: per-user request rate limiting

pub mod rate_limit;
pub mod security;
