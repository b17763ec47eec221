//! TMF679 CheckProductOfferingQualification endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::{Qualification, QualificationRecord};
use crate::qualification::{self, QualificationRequest};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::metrics::record_qualification;
use super::validation::validate_location;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListQuery {
    pub fn bounds(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

fn validate_request(req: &QualificationRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    for (field, message) in validate_location(&req.location) {
        errors.add(field, message);
    }
    errors.finish()
}

/// POST /checkProductOfferingQualification
pub async fn create_qualification(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QualificationRequest>,
) -> Result<(StatusCode, Json<QualificationRecord>), ApiError> {
    validate_request(&req)?;

    let record = qualification::evaluate(state.infrastructure.as_ref(), &req)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Infrastructure lookup failed");
            ApiError::upstream("Infrastructure availability lookup failed")
        })?;

    Qualification::insert(&state.db, &record).await?;

    let result = record
        .qualification_result
        .map(|r| r.as_str())
        .unwrap_or("unknown");
    record_qualification(result);
    tracing::info!(
        qualification_id = %record.id,
        district = %req.location.district,
        result,
        "Qualification check recorded"
    );

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /checkProductOfferingQualification
pub async fn list_qualifications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<QualificationRecord>>, ApiError> {
    let (limit, offset) = query.bounds();
    let rows = Qualification::list(&state.db, limit, offset).await?;
    Ok(Json(rows.iter().map(Qualification::to_record).collect()))
}

/// GET /checkProductOfferingQualification/:id
pub async fn get_qualification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<QualificationRecord>, ApiError> {
    let row = Qualification::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Qualification not found"))?;
    Ok(Json(row.to_record()))
}

/// DELETE /checkProductOfferingQualification/:id
pub async fn delete_qualification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !Qualification::delete(&state.db, &id).await? {
        return Err(ApiError::not_found("Qualification not found"));
    }
    tracing::info!(qualification_id = %id, "Qualification deleted");
    Ok(StatusCode::NO_CONTENT)
}
