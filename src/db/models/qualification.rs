//! TMF679 CheckProductOfferingQualification models and queries.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::common::{now_timestamp, parse_json_list, parse_json_opt, Location};
use crate::infrastructure::{Infrastructure, Technology};

/// Base path for the TMF679 resources served by this crate
pub const QUALIFICATION_BASE_PATH: &str =
    "/tmf-api/productOfferingQualification/v5/checkProductOfferingQualification";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QualificationState {
    Acknowledged,
    InProgress,
    Done,
    TerminatedWithError,
}

impl QualificationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualificationState::Acknowledged => "acknowledged",
            QualificationState::InProgress => "inProgress",
            QualificationState::Done => "done",
            QualificationState::TerminatedWithError => "terminatedWithError",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "acknowledged" => Some(QualificationState::Acknowledged),
            "inProgress" => Some(QualificationState::InProgress),
            "done" => Some(QualificationState::Done),
            "terminatedWithError" => Some(QualificationState::TerminatedWithError),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualificationResult {
    Qualified,
    Unqualified,
    Conditional,
}

impl QualificationResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualificationResult::Qualified => "qualified",
            QualificationResult::Unqualified => "unqualified",
            QualificationResult::Conditional => "conditional",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "qualified" => Some(QualificationResult::Qualified),
            "unqualified" => Some(QualificationResult::Unqualified),
            "conditional" => Some(QualificationResult::Conditional),
            _ => None,
        }
    }
}

/// Free-text TMF note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// TMF party reference (usually the customer)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedParty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_party_role")]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

fn default_party_role() -> String {
    "customer".to_string()
}

/// An available service offered instead of (or alongside) the requested ones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alternative {
    pub service: Technology,
    pub monthly_fee: u32,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_speed: Option<String>,
}

/// A qualification record as exposed over the TMF679 API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualificationRecord {
    pub id: String,
    pub href: String,
    pub state: QualificationState,
    pub creation_date: String,
    pub qualification_result: Option<QualificationResult>,
    pub location: Option<Location>,
    pub infrastructure: Option<Infrastructure>,
    #[serde(default)]
    pub requested_services: Vec<String>,
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
    #[serde(default)]
    pub note: Vec<Note>,
    #[serde(default)]
    pub related_party: Vec<RelatedParty>,
    #[serde(rename = "@type")]
    pub at_type: String,
}

impl QualificationRecord {
    pub fn href_for(id: &str) -> String {
        format!("{}/{}", QUALIFICATION_BASE_PATH, id)
    }

    /// Non-empty emails carried on related parties
    pub fn related_party_emails(&self) -> Vec<String> {
        self.related_party
            .iter()
            .filter_map(|p| p.email.as_deref())
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Row has a structured location, or a note whose text starts with `SLT_LOCATION:`.
/// Unparsable `notes` columns count as having no note.
const HAS_LOCATION: &str = "(location IS NOT NULL OR CASE WHEN json_valid(notes) THEN EXISTS (
    SELECT 1 FROM json_each(notes)
    WHERE substr(json_extract(value, '$.text'), 1, 13) = 'SLT_LOCATION:'
) ELSE 0 END)";

/// Database row. JSON-valued columns hold serialized sub-documents.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Qualification {
    pub id: String,
    pub state: String,
    pub creation_date: String,
    pub qualification_result: Option<String>,
    pub infrastructure: Option<String>,
    pub notes: String,
    pub related_parties: String,
    pub requested_services: String,
    pub alternatives: String,
    pub created_at: String,
    pub updated_at: String,
    pub location: Option<String>,
}

impl Qualification {
    pub fn to_record(&self) -> QualificationRecord {
        QualificationRecord {
            id: self.id.clone(),
            href: QualificationRecord::href_for(&self.id),
            state: QualificationState::from_str(&self.state)
                .unwrap_or(QualificationState::Acknowledged),
            creation_date: self.creation_date.clone(),
            qualification_result: self
                .qualification_result
                .as_deref()
                .and_then(QualificationResult::from_str),
            location: parse_json_opt(self.location.as_deref()),
            infrastructure: parse_json_opt(self.infrastructure.as_deref()),
            requested_services: parse_json_list(&self.requested_services),
            alternatives: parse_json_list(&self.alternatives),
            note: parse_json_list(&self.notes),
            related_party: parse_json_list(&self.related_parties),
            at_type: "CheckProductOfferingQualification".to_string(),
        }
    }

    pub async fn insert(
        db: &SqlitePool,
        record: &QualificationRecord,
    ) -> Result<(), sqlx::Error> {
        let now = now_timestamp();
        let encode = |e: serde_json::Error| sqlx::Error::Encode(Box::new(e));

        let location = record
            .location
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(encode)?;
        let infrastructure = record
            .infrastructure
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(encode)?;
        let notes = serde_json::to_string(&record.note).map_err(encode)?;
        let related_parties = serde_json::to_string(&record.related_party).map_err(encode)?;
        let requested_services =
            serde_json::to_string(&record.requested_services).map_err(encode)?;
        let alternatives = serde_json::to_string(&record.alternatives).map_err(encode)?;

        sqlx::query(
            r#"
            INSERT INTO qualifications (
                id, state, creation_date, qualification_result, infrastructure, notes,
                related_parties, requested_services, alternatives, created_at, updated_at, location
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(record.state.as_str())
        .bind(&record.creation_date)
        .bind(record.qualification_result.map(|r| r.as_str()))
        .bind(&infrastructure)
        .bind(&notes)
        .bind(&related_parties)
        .bind(&requested_services)
        .bind(&alternatives)
        .bind(&now)
        .bind(&now)
        .bind(&location)
        .execute(db)
        .await?;

        Ok(())
    }

    pub async fn find_by_id(
        db: &SqlitePool,
        id: &str,
    ) -> Result<Option<Qualification>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM qualifications WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list(
        db: &SqlitePool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Qualification>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM qualifications ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    /// Newest records carrying a location, either structured or as a note
    pub async fn list_with_location(
        db: &SqlitePool,
        limit: i64,
    ) -> Result<Vec<Qualification>, sqlx::Error> {
        let sql = format!(
            "SELECT * FROM qualifications WHERE {} ORDER BY created_at DESC, rowid DESC LIMIT ?",
            HAS_LOCATION
        );
        sqlx::query_as(&sql)
            .bind(limit)
            .fetch_all(db)
            .await
    }

    pub async fn count_with_location(db: &SqlitePool) -> Result<i64, sqlx::Error> {
        let sql = format!("SELECT COUNT(*) FROM qualifications WHERE {}", HAS_LOCATION);
        sqlx::query_scalar(&sql).fetch_one(db).await
    }

    pub async fn delete(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM qualifications WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_in_memory;

    fn record(id: &str, location: Option<Location>, notes: Vec<&str>) -> QualificationRecord {
        QualificationRecord {
            id: id.to_string(),
            href: QualificationRecord::href_for(id),
            state: QualificationState::Done,
            creation_date: now_timestamp(),
            qualification_result: Some(QualificationResult::Conditional),
            location,
            infrastructure: None,
            requested_services: vec!["Fiber".to_string()],
            alternatives: vec![],
            note: notes
                .into_iter()
                .map(|text| Note {
                    text: text.to_string(),
                    author: None,
                    date: None,
                })
                .collect(),
            related_party: vec![RelatedParty {
                id: None,
                name: Some("Kamal".to_string()),
                role: "customer".to_string(),
                email: Some(" kamal@example.lk ".to_string()),
            }],
            at_type: "CheckProductOfferingQualification".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = init_in_memory().await.unwrap();
        let location = Location {
            address: "5 Lake Rd".to_string(),
            district: "Kandy".to_string(),
            province: "Central".to_string(),
            postal_code: None,
        };
        let original = record("q1", Some(location), vec!["hello"]);
        Qualification::insert(&db, &original).await.unwrap();

        let row = Qualification::find_by_id(&db, "q1").await.unwrap().unwrap();
        assert_eq!(row.to_record(), original);
        assert_eq!(original.related_party_emails(), vec!["kamal@example.lk"]);
    }

    #[tokio::test]
    async fn test_location_filter_matches_structured_and_note() {
        let db = init_in_memory().await.unwrap();
        Qualification::insert(&db, &record("plain", None, vec!["no location here"]))
            .await
            .unwrap();
        Qualification::insert(
            &db,
            &record("legacy", None, vec!["SLT_LOCATION:{\"address\":\"x\"}"]),
        )
        .await
        .unwrap();
        Qualification::insert(&db, &record("structured", Some(Location::default()), vec![]))
            .await
            .unwrap();

        let rows = Qualification::list_with_location(&db, 50).await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["structured", "legacy"]);
        assert_eq!(Qualification::count_with_location(&db).await.unwrap(), 2);

        let limited = Qualification::list_with_location(&db, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_location_prefix_must_start_the_note() {
        let db = init_in_memory().await.unwrap();
        Qualification::insert(
            &db,
            &record("mid", None, vec!["agent: customer lacks SLT_LOCATION: data"]),
        )
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO qualifications (id, creation_date, notes, created_at, updated_at) VALUES ('broken', '', 'SLT_LOCATION:{', '', '')",
        )
        .execute(&db)
        .await
        .unwrap();

        assert!(Qualification::list_with_location(&db, 50).await.unwrap().is_empty());
        assert_eq!(Qualification::count_with_location(&db).await.unwrap(), 0);

        Qualification::insert(
            &db,
            &record("real", None, vec!["intro", "SLT_LOCATION:{\"address\":\"x\"}"]),
        )
        .await
        .unwrap();
        let rows = Qualification::list_with_location(&db, 50).await.unwrap();
        assert_eq!(rows.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["real"]);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = init_in_memory().await.unwrap();
        Qualification::insert(&db, &record("gone", None, vec![])).await.unwrap();
        assert!(Qualification::delete(&db, "gone").await.unwrap());
        assert!(!Qualification::delete(&db, "gone").await.unwrap());
        assert!(Qualification::find_by_id(&db, "gone").await.unwrap().is_none());
    }

    #[test]
    fn test_unknown_state_falls_back_to_acknowledged() {
        let row = Qualification {
            id: "x".to_string(),
            state: "weird".to_string(),
            creation_date: String::new(),
            qualification_result: Some("maybe".to_string()),
            infrastructure: Some("{not json".to_string()),
            notes: "[]".to_string(),
            related_parties: "[]".to_string(),
            requested_services: "[]".to_string(),
            alternatives: "[]".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
            location: None,
        };
        let record = row.to_record();
        assert_eq!(record.state, QualificationState::Acknowledged);
        assert_eq!(record.qualification_result, None);
        assert_eq!(record.infrastructure, None);
    }
}
