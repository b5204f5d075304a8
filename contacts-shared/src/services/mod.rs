/// Outbound integrations
///
/// - `email`: SMTP delivery of password reset and confirmation mail
/// - `avatar`: avatar upload to an external image host
///
/// Each is a trait with one production implementation so the API can hold
/// them as `Arc<dyn ...>` and tests can substitute fakes.

pub mod avatar;
pub mod email;
