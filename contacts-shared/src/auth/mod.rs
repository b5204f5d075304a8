/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: Access, password-reset, and email-confirmation tokens
/// - [`middleware`]: Bearer-token request authentication
/// - [`authorization`]: Role checks
///
/// # Example
///
/// ```no_run
/// use contacts_shared::auth::password::{hash_password, verify_password};
/// use contacts_shared::auth::jwt::{create_access_token, get_email_from_token, JwtKeys};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let keys = JwtKeys::new("secret-key-at-least-32-bytes-long!!", "HS256")?;
/// let token = create_access_token("user@example.com", 30, &keys)?;
/// assert_eq!(get_email_from_token(&token, &keys)?, "user@example.com");
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
