//! Address sync: copies qualification locations onto user records.
//!
//! A run walks the newest qualifications that carry a location, resolves the
//! location (structured column first, `SLT_LOCATION:` note second), picks a
//! target user and overwrites that user's address. Records are processed one
//! at a time; a failure on one record is counted and logged and never aborts
//! the run.
//!
//! Runs are not idempotent: which user lacks an address changes as the run
//! progresses. Two concurrent runs may pick the same user; the last write wins.

pub mod matcher;
pub mod note;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::metrics::{record_sync_record, record_sync_run};
use crate::db::{Address, DbPool, Qualification, QualificationRecord, User};
use matcher::{select_target_user, MatchKind};
use note::parse_location_note;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("User not found")]
    UserNotFound,

    #[error("No qualification with location data found")]
    LocationNotFound,

    #[error("Qualification {0} has no parsable location")]
    MalformedLocation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Outcome of a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub total_qualifications: usize,
    pub synced_count: usize,
    pub error_count: usize,
    pub success_rate: String,
}

/// Address coverage snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub total_users: i64,
    pub users_with_address: i64,
    pub users_without_address: i64,
    pub qualifications_with_location: i64,
    pub sync_percentage: String,
}

/// Format `part / total` as a percentage with two decimals; `"0%"` when `total` is zero.
pub fn format_percentage(part: usize, total: usize) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    format!("{:.2}%", part as f64 / total as f64 * 100.0)
}

/// Resolve the address a qualification points at.
///
/// A complete structured location wins; otherwise the first `SLT_LOCATION:` note
/// is parsed.
pub fn resolve_address(record: &QualificationRecord) -> Option<Address> {
    match record.location {
        Some(ref location) if location.is_complete() => Some(location.to_address()),
        _ => parse_location_note(&record.note),
    }
}

pub struct AddressSyncService {
    db: DbPool,
    batch_limit: i64,
}

impl AddressSyncService {
    pub fn new(db: DbPool, batch_limit: i64) -> Self {
        Self { db, batch_limit }
    }

    /// Run one batch over the newest qualifications with a location.
    ///
    /// Only the initial fetch can fail the run.
    pub async fn sync_all(&self) -> Result<SyncStats, SyncError> {
        let rows = Qualification::list_with_location(&self.db, self.batch_limit).await?;
        let total = rows.len();

        info!(total, limit = self.batch_limit, "Starting address sync");

        let mut synced = 0;
        let mut errors = 0;

        for row in rows {
            let record = row.to_record();
            match self.sync_record(&record).await {
                Ok((user_id, kind)) => {
                    synced += 1;
                    record_sync_record("synced");
                    debug!(
                        qualification_id = %record.id,
                        user_id = %user_id,
                        match_kind = kind.as_str(),
                        "Address synced"
                    );
                }
                Err(e) => {
                    errors += 1;
                    record_sync_record("error");
                    warn!(qualification_id = %record.id, error = %e, "Skipping qualification");
                }
            }
        }

        let stats = SyncStats {
            total_qualifications: total,
            synced_count: synced,
            error_count: errors,
            success_rate: format_percentage(synced, total),
        };

        record_sync_run();
        info!(
            total = stats.total_qualifications,
            synced = stats.synced_count,
            errors = stats.error_count,
            success_rate = %stats.success_rate,
            "Address sync completed"
        );

        Ok(stats)
    }

    async fn sync_record(
        &self,
        record: &QualificationRecord,
    ) -> Result<(String, MatchKind), SyncError> {
        let address = resolve_address(record)
            .ok_or_else(|| SyncError::MalformedLocation(record.id.clone()))?;

        let (user, kind) = select_target_user(&self.db, &record.related_party_emails())
            .await?
            .ok_or(SyncError::UserNotFound)?;

        if kind.is_heuristic() {
            warn!(
                qualification_id = %record.id,
                user_id = %user.id,
                match_kind = kind.as_str(),
                "No related party email matched; address assigned heuristically"
            );
        }

        if !User::update_address(&self.db, &user.id, &address).await? {
            return Err(SyncError::UserNotFound);
        }

        Ok((user.id, kind))
    }

    pub async fn status(&self) -> Result<SyncStatus, SyncError> {
        let coverage = User::address_coverage(&self.db).await?;
        let with_location = Qualification::count_with_location(&self.db).await?;

        Ok(SyncStatus {
            total_users: coverage.total,
            users_with_address: coverage.with_address,
            users_without_address: coverage.total - coverage.with_address,
            qualifications_with_location: with_location,
            sync_percentage: format_percentage(
                coverage.with_address.max(0) as usize,
                coverage.total.max(0) as usize,
            ),
        })
    }

    /// Apply the newest qualification's location to one named user,
    /// bypassing the matcher.
    pub async fn sync_user(&self, user_id: &str) -> Result<User, SyncError> {
        let user = User::find_by_id(&self.db, user_id)
            .await?
            .ok_or(SyncError::UserNotFound)?;

        let record = Qualification::list_with_location(&self.db, 1)
            .await?
            .into_iter()
            .next()
            .ok_or(SyncError::LocationNotFound)?
            .to_record();

        let address = resolve_address(&record)
            .ok_or_else(|| SyncError::MalformedLocation(record.id.clone()))?;

        if !User::update_address(&self.db, &user.id, &address).await? {
            return Err(SyncError::UserNotFound);
        }

        info!(user_id = %user.id, qualification_id = %record.id, "Address synced for user");

        User::find_by_id(&self.db, &user.id)
            .await?
            .ok_or(SyncError::UserNotFound)
    }
}
