/// Database models
///
/// - `user`: accounts, roles, and credentials
/// - `contact`: address-book entries, always scoped to their owning user
///
/// # Example
///
/// ```no_run
/// use contacts_shared::models::contact::Contact;
/// use contacts_shared::models::user::User;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// if let Some(user) = User::find_by_email(&pool, "user@example.com").await? {
///     let contacts = Contact::list(&pool, user.id).await?;
///     println!("{} has {} contacts", user.email, contacts.len());
/// }
/// # Ok(())
/// # }
/// ```

pub mod contact;
pub mod user;
