/// Contact endpoints
///
/// Every handler works on the authenticated user's own contacts. A contact
/// that belongs to someone else answers exactly like a missing one (404).
///
/// # Endpoints
///
/// - `GET /contacts/` - List contacts
/// - `POST /contacts/` - Create a contact
/// - `GET /contacts/:id` - Get one contact
/// - `PUT /contacts/:id` - Update some or all fields
/// - `DELETE /contacts/:id` - Delete a contact
/// - `GET /contacts/search/?query=` - Match first name, last name, or email
/// - `GET /contacts/birthdays/upcoming` - Birthdays in the next 7 days

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::{Json, Path, Query},
};
use axum::{extract::State, http::StatusCode, Extension};
use chrono::NaiveDate;
use contacts_shared::{
    auth::middleware::AuthContext,
    models::contact::{present_or_null, Contact, CreateContact, UpdateContact},
};
use serde::Deserialize;
use validator::Validate;

const MAX_ADDITIONAL_INFO: usize = 250;

/// New contact body
#[derive(Debug, Deserialize, Validate)]
pub struct ContactCreateRequest {
    #[validate(length(min = 1, max = 50, message = "First name must be 1 to 50 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 50, message = "Last name must be 1 to 50 characters"))]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 20, message = "Phone number must be 1 to 20 characters"))]
    pub phone_number: String,

    /// `YYYY-MM-DD`
    pub birthday: NaiveDate,

    #[validate(length(max = 250, message = "Additional info must be at most 250 characters"))]
    pub additional_info: Option<String>,
}

impl From<ContactCreateRequest> for CreateContact {
    fn from(req: ContactCreateRequest) -> Self {
        Self {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            phone_number: req.phone_number,
            birthday: req.birthday,
            additional_info: req.additional_info,
        }
    }
}

/// Contact update body; absent fields are left unchanged
///
/// `"additional_info": null` clears the field.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ContactUpdateRequest {
    #[validate(length(min = 1, max = 50, message = "First name must be 1 to 50 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Last name must be 1 to 50 characters"))]
    pub last_name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 20, message = "Phone number must be 1 to 20 characters"))]
    pub phone_number: Option<String>,

    pub birthday: Option<NaiveDate>,

    #[serde(default, deserialize_with = "present_or_null")]
    pub additional_info: Option<Option<String>>,
}

impl ContactUpdateRequest {
    fn check(&self) -> ApiResult<()> {
        self.validate()?;

        let too_long = matches!(
            &self.additional_info,
            Some(Some(info)) if info.chars().count() > MAX_ADDITIONAL_INFO
        );
        if too_long {
            return Err(ApiError::ValidationError(vec![ValidationErrorDetail {
                field: "additional_info".to_string(),
                message: "Additional info must be at most 250 characters".to_string(),
            }]));
        }

        Ok(())
    }
}

impl From<ContactUpdateRequest> for UpdateContact {
    fn from(req: ContactUpdateRequest) -> Self {
        Self {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            phone_number: req.phone_number,
            birthday: req.birthday,
            additional_info: req.additional_info,
        }
    }
}

/// Search query string
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
}

fn contact_not_found() -> ApiError {
    ApiError::NotFound("Contact not found".to_string())
}

pub async fn list_contacts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Contact>>> {
    let contacts = Contact::list(&state.db, auth.user_id()).await?;
    Ok(Json(contacts))
}

/// # Errors
///
/// - `422 Unprocessable Entity`: validation failed
pub async fn create_contact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ContactCreateRequest>,
) -> ApiResult<(StatusCode, Json<Contact>)> {
    req.validate()?;

    let contact = Contact::create(&state.db, req.into(), auth.user_id()).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

pub async fn get_contact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(contact_id): Path<i64>,
) -> ApiResult<Json<Contact>> {
    Contact::find(&state.db, contact_id, auth.user_id())
        .await?
        .map(Json)
        .ok_or_else(contact_not_found)
}

/// # Errors
///
/// - `404 Not Found`: no such contact for this user
/// - `422 Unprocessable Entity`: validation failed
pub async fn update_contact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(contact_id): Path<i64>,
    Json(req): Json<ContactUpdateRequest>,
) -> ApiResult<Json<Contact>> {
    req.check()?;

    Contact::update(&state.db, contact_id, req.into(), auth.user_id())
        .await?
        .map(Json)
        .ok_or_else(contact_not_found)
}

/// Returns the deleted contact
pub async fn delete_contact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(contact_id): Path<i64>,
) -> ApiResult<Json<Contact>> {
    let contact = Contact::delete(&state.db, contact_id, auth.user_id())
        .await?
        .ok_or_else(contact_not_found)?;

    tracing::info!(contact_id, user_id = auth.user_id(), "Contact deleted");
    Ok(Json(contact))
}

pub async fn search_contacts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Contact>>> {
    let contacts = Contact::search(&state.db, &params.query, auth.user_id()).await?;
    Ok(Json(contacts))
}

pub async fn upcoming_birthdays(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Contact>>> {
    let contacts = Contact::upcoming_birthdays(&state.db, auth.user_id()).await?;
    Ok(Json(contacts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_body() -> serde_json::Value {
        json!({
            "first_name": "Alice",
            "last_name": "Smith",
            "email": "alice@example.com",
            "phone_number": "123456789",
            "birthday": "1990-05-20",
            "additional_info": "Friend"
        })
    }

    #[test]
    fn test_create_request_valid() {
        let req: ContactCreateRequest = serde_json::from_value(create_body()).unwrap();
        assert!(req.validate().is_ok());

        let contact: CreateContact = req.into();
        assert_eq!(contact.birthday, NaiveDate::from_ymd_opt(1990, 5, 20).unwrap());
    }

    #[test]
    fn test_create_request_rejects_bad_fields() {
        let mut body = create_body();
        body["first_name"] = json!("");
        body["email"] = json!("not-an-email");
        body["phone_number"] = json!("1".repeat(21));
        body["additional_info"] = json!("x".repeat(251));

        let req: ContactCreateRequest = serde_json::from_value(body).unwrap();
        let errors = req.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 4);
    }

    #[test]
    fn test_create_request_rejects_bad_birthday() {
        let mut body = create_body();
        body["birthday"] = json!("20-05-1990");
        assert!(serde_json::from_value::<ContactCreateRequest>(body).is_err());
    }

    #[test]
    fn test_update_request_partial() {
        let req: ContactUpdateRequest =
            serde_json::from_value(json!({"first_name": "NewName"})).unwrap();
        assert!(req.check().is_ok());

        let update: UpdateContact = req.into();
        assert_eq!(update.first_name.as_deref(), Some("NewName"));
        assert!(update.last_name.is_none());
        assert!(update.additional_info.is_none());
    }

    #[test]
    fn test_update_request_null_clears_info() {
        let req: ContactUpdateRequest =
            serde_json::from_value(json!({"additional_info": null})).unwrap();
        let update: UpdateContact = req.into();
        assert_eq!(update.additional_info, Some(None));
    }

    #[test]
    fn test_update_request_validates_present_fields() {
        let req: ContactUpdateRequest =
            serde_json::from_value(json!({"email": "bad"})).unwrap();
        assert!(req.check().is_err());

        let req: ContactUpdateRequest =
            serde_json::from_value(json!({"additional_info": "x".repeat(251)})).unwrap();
        assert!(matches!(req.check(), Err(ApiError::ValidationError(_))));
    }
}
