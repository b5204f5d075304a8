/// Contact model and owner-scoped database operations
///
/// Every contact belongs to exactly one user. Each query here takes the
/// caller's `user_id` and puts `user_id = $n` in its `WHERE` clause, so a
/// contact owned by someone else behaves exactly like a missing one: it is
/// never returned, updated, or deleted. Rows are never fetched first and
/// checked for ownership afterwards.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE contacts (
///     id BIGSERIAL PRIMARY KEY,
///     first_name VARCHAR(100) NOT NULL,
///     last_name VARCHAR(100) NOT NULL,
///     email VARCHAR(255) NOT NULL,
///     phone_number VARCHAR(50) NOT NULL,
///     birthday DATE NOT NULL,
///     additional_info TEXT,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use chrono::NaiveDate;
/// use contacts_shared::models::contact::{Contact, CreateContact};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let contact = Contact::create(
///     &pool,
///     CreateContact {
///         first_name: "Alice".to_string(),
///         last_name: "Smith".to_string(),
///         email: "alice@example.com".to_string(),
///         phone_number: "123456789".to_string(),
///         birthday: NaiveDate::from_ymd_opt(1990, 5, 20).unwrap(),
///         additional_info: Some("Friend".to_string()),
///     },
///     1,
/// )
/// .await?;
///
/// let matches = Contact::search(&pool, "ali", 1).await?;
/// assert!(matches.iter().any(|c| c.id == contact.id));
/// # Ok(())
/// # }
/// ```

use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

const CONTACT_COLUMNS: &str =
    "id, first_name, last_name, email, phone_number, birthday, additional_info, user_id";

/// Days ahead of today covered by the upcoming-birthdays query
pub const UPCOMING_BIRTHDAY_DAYS: i64 = 7;

/// Contact owned by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub birthday: NaiveDate,
    pub additional_info: Option<String>,

    /// Owning user
    pub user_id: i64,
}

/// Input for creating a contact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub birthday: NaiveDate,
    pub additional_info: Option<String>,
}

/// Partial update of a contact
///
/// Only fields that are `Some` are written. For `additional_info`, an
/// absent JSON key deserializes to `None` (left untouched) and an explicit
/// `null` to `Some(None)` (cleared).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateContact {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub birthday: Option<NaiveDate>,

    #[serde(default, deserialize_with = "present_or_null")]
    pub additional_info: Option<Option<String>>,
}

impl UpdateContact {
    /// True if no field would be written
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.phone_number.is_none()
            && self.birthday.is_none()
            && self.additional_info.is_none()
    }
}

/// Maps a present key to `Some`, whether its value is null or not
///
/// Pair with `#[serde(default)]` so an absent key stays `None`.
pub fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Escapes `LIKE` wildcards so `query` matches literally
pub fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Month/day bounds, encoded as `month * 100 + day`, of the birthday window
/// starting at `today`
///
/// The window is not carried over into January: when `today + 7 days`
/// lands in the next year, the upper bound is clamped to Dec 31.
pub fn birthday_window(today: NaiveDate) -> (i32, i32) {
    let end = today + Duration::days(UPCOMING_BIRTHDAY_DAYS);
    let start_key = month_day_key(today);

    let end_key = if end.year() > today.year() {
        1231
    } else {
        month_day_key(end)
    };

    (start_key, end_key)
}

fn month_day_key(date: NaiveDate) -> i32 {
    (date.month() * 100 + date.day()) as i32
}

impl Contact {
    /// Lists all contacts owned by `user_id`
    pub async fn list(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM contacts WHERE user_id = $1 ORDER BY id",
            CONTACT_COLUMNS
        );

        sqlx::query_as::<_, Contact>(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Creates a contact owned by `user_id`
    ///
    /// The generated ID comes back from the same `INSERT ... RETURNING`.
    pub async fn create(pool: &PgPool, data: CreateContact, user_id: i64) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO contacts
                (first_name, last_name, email, phone_number, birthday, additional_info, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            CONTACT_COLUMNS
        );

        let contact = sqlx::query_as::<_, Contact>(&sql)
            .bind(data.first_name)
            .bind(data.last_name)
            .bind(data.email)
            .bind(data.phone_number)
            .bind(data.birthday)
            .bind(data.additional_info)
            .bind(user_id)
            .fetch_one(pool)
            .await?;

        tracing::debug!(contact_id = contact.id, user_id, "Contact created");
        Ok(contact)
    }

    /// Finds a contact by ID among those owned by `user_id`
    pub async fn find(pool: &PgPool, id: i64, user_id: i64) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM contacts WHERE id = $1 AND user_id = $2",
            CONTACT_COLUMNS
        );

        sqlx::query_as::<_, Contact>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Applies a partial update to a contact owned by `user_id`
    ///
    /// Returns `None` if the contact does not exist or is not owned by
    /// `user_id`. An empty update returns the contact unchanged.
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdateContact,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() {
            return Self::find(pool, id, user_id).await;
        }

        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE contacts SET ");
        let mut fields = query.separated(", ");

        if let Some(first_name) = data.first_name {
            fields.push("first_name = ").push_bind_unseparated(first_name);
        }
        if let Some(last_name) = data.last_name {
            fields.push("last_name = ").push_bind_unseparated(last_name);
        }
        if let Some(email) = data.email {
            fields.push("email = ").push_bind_unseparated(email);
        }
        if let Some(phone_number) = data.phone_number {
            fields.push("phone_number = ").push_bind_unseparated(phone_number);
        }
        if let Some(birthday) = data.birthday {
            fields.push("birthday = ").push_bind_unseparated(birthday);
        }
        if let Some(additional_info) = data.additional_info {
            fields.push("additional_info = ").push_bind_unseparated(additional_info);
        }

        query.push(" WHERE id = ").push_bind(id);
        query.push(" AND user_id = ").push_bind(user_id);
        query.push(" RETURNING ").push(CONTACT_COLUMNS);

        query
            .build_query_as::<Contact>()
            .fetch_optional(pool)
            .await
    }

    /// Deletes a contact owned by `user_id`
    ///
    /// Returns the deleted row, or `None` if nothing matched.
    pub async fn delete(pool: &PgPool, id: i64, user_id: i64) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "DELETE FROM contacts WHERE id = $1 AND user_id = $2 RETURNING {}",
            CONTACT_COLUMNS
        );

        sqlx::query_as::<_, Contact>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Case-insensitive substring search on first name, last name, or email
    pub async fn search(pool: &PgPool, query: &str, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {}
            FROM contacts
            WHERE user_id = $1
              AND (first_name ILIKE $2 ESCAPE '\'
                   OR last_name ILIKE $2 ESCAPE '\'
                   OR email ILIKE $2 ESCAPE '\')
            ORDER BY id
            "#,
            CONTACT_COLUMNS
        );

        sqlx::query_as::<_, Contact>(&sql)
            .bind(user_id)
            .bind(format!("%{}%", escape_like(query)))
            .fetch_all(pool)
            .await
    }

    /// Contacts whose birthday falls within the next seven days, today included
    pub async fn upcoming_birthdays(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        Self::upcoming_birthdays_from(pool, user_id, Utc::now().date_naive()).await
    }

    /// Like [`Contact::upcoming_birthdays`], with an explicit `today`
    pub async fn upcoming_birthdays_from(
        pool: &PgPool,
        user_id: i64,
        today: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let (start, end) = birthday_window(today);

        let sql = format!(
            r#"
            SELECT {}
            FROM contacts
            WHERE user_id = $1
              AND (EXTRACT(MONTH FROM birthday)::INT * 100 + EXTRACT(DAY FROM birthday)::INT)
                  BETWEEN $2 AND $3
            ORDER BY EXTRACT(MONTH FROM birthday), EXTRACT(DAY FROM birthday), id
            "#,
            CONTACT_COLUMNS
        );

        sqlx::query_as::<_, Contact>(&sql)
            .bind(user_id)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("alice"), "alice");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("first_name"), "first\\_name");
        assert_eq!(escape_like(r"a\b"), r"a\\b");
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_birthday_window_mid_year() {
        assert_eq!(birthday_window(date(2026, 5, 1)), (501, 508));
    }

    #[test]
    fn test_birthday_window_crosses_month() {
        assert_eq!(birthday_window(date(2026, 4, 27)), (427, 504));
    }

    #[test]
    fn test_birthday_window_clamped_at_year_end() {
        assert_eq!(birthday_window(date(2026, 12, 28)), (1228, 1231));
        assert_eq!(birthday_window(date(2026, 12, 24)), (1224, 1231));
    }

    #[test]
    fn test_birthday_window_leap_day() {
        assert_eq!(birthday_window(date(2028, 2, 25)), (225, 303));
    }

    #[test]
    fn test_window_includes_today_plus_five_excludes_plus_ten() {
        let today = date(2026, 6, 10);
        let (start, end) = birthday_window(today);

        let plus_five = month_day_key(today + Duration::days(5));
        let plus_ten = month_day_key(today + Duration::days(10));

        assert!((start..=end).contains(&plus_five));
        assert!(!(start..=end).contains(&plus_ten));
    }

    #[test]
    fn test_update_contact_absent_vs_null() {
        let absent: UpdateContact = serde_json::from_str(r#"{"first_name": "NewName"}"#).unwrap();
        assert_eq!(absent.first_name.as_deref(), Some("NewName"));
        assert!(absent.additional_info.is_none());
        assert!(absent.last_name.is_none());

        let cleared: UpdateContact = serde_json::from_str(r#"{"additional_info": null}"#).unwrap();
        assert_eq!(cleared.additional_info, Some(None));
        assert!(!cleared.is_empty());
    }

    #[test]
    fn test_update_contact_empty() {
        let update: UpdateContact = serde_json::from_str("{}").unwrap();
        assert!(update.is_empty());
    }

    #[test]
    fn test_contact_birthday_serializes_as_iso_date() {
        let contact = Contact {
            id: 1,
            first_name: "Alice".to_string(),
            last_name: "Smith".to_string(),
            email: "alice@example.com".to_string(),
            phone_number: "123456789".to_string(),
            birthday: date(1990, 5, 20),
            additional_info: None,
            user_id: 1,
        };

        let json = serde_json::to_value(&contact).unwrap();
        assert_eq!(json["birthday"], "1990-05-20");
        assert_eq!(json["user_id"], 1);
    }
}
