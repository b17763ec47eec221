//! Customer user endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::db::{CreateUserRequest, NewUser, UpdateUserRequest, User, UserResponse, UserStatus};
use crate::AppState;

use super::auth::hash_password;
use super::error::{ApiError, ValidationErrorBuilder};
use super::qualifications::ListQuery;
use super::validation::{
    validate_email, validate_name, validate_password, validate_phone, validate_status,
};

fn validate_create_request(req: &CreateUserRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    errors
        .check("email", validate_email(&req.email))
        .check("firstName", validate_name(&req.first_name, "First name"))
        .check("lastName", validate_name(&req.last_name, "Last name"))
        .check("phoneNumber", validate_phone(&req.phone_number))
        .check("password", validate_password(&req.password));

    if let Some(ref status) = req.status {
        errors.check("status", validate_status(status));
    }

    errors.finish()
}

fn validate_update_request(req: &UpdateUserRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Some(ref name) = req.first_name {
        errors.check("firstName", validate_name(name, "First name"));
    }
    if let Some(ref name) = req.last_name {
        errors.check("lastName", validate_name(name, "Last name"));
    }
    if let Some(ref phone) = req.phone_number {
        errors.check("phoneNumber", validate_phone(phone));
    }
    if let Some(ref status) = req.status {
        errors.check("status", validate_status(status));
    }

    errors.finish()
}

/// GET /api/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let (limit, offset) = query.bounds();
    let users = User::list(&state.db, limit, offset).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_create_request(&req)?;

    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        return Err(ApiError::conflict("A user with this email already exists"));
    }

    let password_hash = hash_password(&req.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    let status = req
        .status
        .as_deref()
        .and_then(UserStatus::from_str)
        .unwrap_or(UserStatus::Unverified);

    let user = User::insert(
        &state.db,
        NewUser {
            email: req.email.trim().to_lowercase(),
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            phone_number: req.phone_number.trim().to_string(),
            password_hash,
            status,
            address: req.address,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "Created user");

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = User::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(UserResponse::from(user)))
}

/// PATCH /api/users/:id
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    validate_update_request(&req)?;

    if !User::update_profile(&state.db, &id, &req).await? {
        return Err(ApiError::not_found("User not found"));
    }

    let user = User::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(UserResponse::from(user)))
}

/// DELETE /api/users/:id
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !User::delete(&state.db, &id).await? {
        return Err(ApiError::not_found("User not found"));
    }
    tracing::info!(user_id = %id, "Deleted user");
    Ok(StatusCode::NO_CONTENT)
}
