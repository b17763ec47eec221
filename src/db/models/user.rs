//! Customer user models and queries.

use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};

use super::common::{now_timestamp, Address};

/// Account lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Unverified,
    Active,
    Pending,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Unverified => "unverified",
            UserStatus::Active => "active",
            UserStatus::Pending => "pending",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "unverified" => Some(UserStatus::Unverified),
            "active" => Some(UserStatus::Active),
            "pending" => Some(UserStatus::Pending),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub password_hash: String,
    pub status: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// A user has an address once a district has been recorded.
    pub fn has_address(&self) -> bool {
        self.district
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }

    pub fn address(&self) -> Option<Address> {
        if !self.has_address() {
            return None;
        }
        Some(Address {
            street: self.street.clone().unwrap_or_default(),
            city: self.city.clone().unwrap_or_default(),
            district: self.district.clone().unwrap_or_default(),
            province: self.province.clone().unwrap_or_default(),
            postal_code: self.postal_code.clone().unwrap_or_default(),
        })
    }
}

/// User as exposed over the API. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub status: String,
    pub address: Option<Address>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let address = user.address();
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone_number: user.phone_number,
            status: user.status,
            address,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
    pub password: String,
    pub status: Option<String>,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub status: Option<String>,
    pub address: Option<Address>,
}

/// Fields for a new user row. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub password_hash: String,
    pub status: UserStatus,
    pub address: Option<Address>,
}

/// Aggregate address coverage across all users
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressCoverage {
    pub total: i64,
    pub with_address: i64,
}

impl User {
    pub async fn insert(db: &SqlitePool, new: NewUser) -> Result<User, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();
        let address = new.address.unwrap_or_default();
        let has_address = !address.district.trim().is_empty();
        let column = |value: String| if has_address { Some(value) } else { None };

        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, first_name, last_name, phone_number, password_hash, status,
                street, city, district, province, postal_code, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.email)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.phone_number)
        .bind(&new.password_hash)
        .bind(new.status.as_str())
        .bind(column(address.street))
        .bind(column(address.city))
        .bind(column(address.district))
        .bind(column(address.province))
        .bind(column(address.postal_code))
        .bind(&now)
        .bind(&now)
        .execute(db)
        .await?;

        Self::find_by_id(db, &id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(db: &SqlitePool, id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Case-insensitive lookup by email
    pub async fn find_by_email(db: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE lower(email) = lower(?)")
            .bind(email.trim())
            .fetch_optional(db)
            .await
    }

    pub async fn list(db: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM users ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    /// Most recently created user whose district is missing or blank
    pub async fn most_recent_without_address(
        db: &SqlitePool,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM users
            WHERE district IS NULL OR trim(district) = ''
            ORDER BY created_at DESC, rowid DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(db)
        .await
    }

    pub async fn most_recent(db: &SqlitePool) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users ORDER BY created_at DESC, rowid DESC LIMIT 1")
            .fetch_optional(db)
            .await
    }

    /// Overwrite the address columns and bump `updated_at`.
    pub async fn update_address(
        db: &SqlitePool,
        id: &str,
        address: &Address,
    ) -> Result<bool, sqlx::Error> {
        Self::write_address(db, id, address).await
    }

    async fn write_address<'e, E>(
        executor: E,
        id: &str,
        address: &Address,
    ) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET street = ?, city = ?, district = ?, province = ?, postal_code = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.district)
        .bind(&address.province)
        .bind(&address.postal_code)
        .bind(now_timestamp())
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Apply a partial profile update. `None` fields are left untouched.
    ///
    /// Profile fields and address are written in one transaction.
    pub async fn update_profile(
        db: &SqlitePool,
        id: &str,
        req: &UpdateUserRequest,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = db.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE users SET
                first_name = COALESCE(?, first_name),
                last_name = COALESCE(?, last_name),
                phone_number = COALESCE(?, phone_number),
                status = COALESCE(?, status),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&req.first_name)
        .bind(&req.last_name)
        .bind(&req.phone_number)
        .bind(req.status.as_deref().map(str::to_lowercase))
        .bind(now_timestamp())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(ref address) = req.address {
            Self::write_address(&mut *tx, id, address).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    pub async fn update_password_hash(
        db: &SqlitePool,
        id: &str,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(now_timestamp())
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn delete(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn address_coverage(db: &SqlitePool) -> Result<AddressCoverage, sqlx::Error> {
        let (total, with_address): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN district IS NOT NULL AND trim(district) != '' THEN 1 ELSE 0 END), 0)
            FROM users
            "#,
        )
        .fetch_one(db)
        .await?;

        Ok(AddressCoverage {
            total,
            with_address,
        })
    }

    /// Every user, oldest first
    pub async fn list_all(db: &SqlitePool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users ORDER BY created_at ASC, rowid ASC")
            .fetch_all(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_in_memory;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            first_name: "Nimal".to_string(),
            last_name: "Perera".to_string(),
            phone_number: "0771234567".to_string(),
            password_hash: "$argon2id$v=19$stub".to_string(),
            status: UserStatus::Active,
            address: None,
        }
    }

    fn kandy() -> Address {
        Address {
            street: "12 Main St".to_string(),
            city: "Kandy".to_string(),
            district: "Kandy".to_string(),
            province: "Central".to_string(),
            postal_code: "20000".to_string(),
        }
    }

    #[test]
    fn test_user_status_parsing() {
        assert_eq!(UserStatus::from_str("Active"), Some(UserStatus::Active));
        assert_eq!(UserStatus::from_str("pending"), Some(UserStatus::Pending));
        assert_eq!(UserStatus::from_str("banned"), None);
        assert_eq!(UserStatus::Unverified.to_string(), "unverified");
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let db = init_in_memory().await.unwrap();
        let user = User::insert(&db, new_user("nimal@example.lk")).await.unwrap();

        assert!(!user.has_address());
        assert_eq!(user.status, "active");

        let found = User::find_by_email(&db, "NIMAL@example.lk").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = init_in_memory().await.unwrap();
        User::insert(&db, new_user("dup@example.lk")).await.unwrap();
        assert!(User::insert(&db, new_user("dup@example.lk")).await.is_err());
    }

    #[tokio::test]
    async fn test_update_address_round_trip() {
        let db = init_in_memory().await.unwrap();
        let user = User::insert(&db, new_user("a@example.lk")).await.unwrap();

        assert!(User::update_address(&db, &user.id, &kandy()).await.unwrap());
        let updated = User::find_by_id(&db, &user.id).await.unwrap().unwrap();
        assert_eq!(updated.address(), Some(kandy()));
        assert!(updated.updated_at >= user.updated_at);

        assert!(!User::update_address(&db, "missing", &kandy()).await.unwrap());
    }

    #[tokio::test]
    async fn test_most_recent_without_address_skips_addressed_users() {
        let db = init_in_memory().await.unwrap();
        let older = User::insert(&db, new_user("older@example.lk")).await.unwrap();
        let newer = User::insert(&db, new_user("newer@example.lk")).await.unwrap();
        User::update_address(&db, &newer.id, &kandy()).await.unwrap();

        let target = User::most_recent_without_address(&db).await.unwrap().unwrap();
        assert_eq!(target.id, older.id);

        let latest = User::most_recent(&db).await.unwrap().unwrap();
        assert_eq!(latest.id, newer.id);
    }

    #[tokio::test]
    async fn test_blank_district_counts_as_missing() {
        let db = init_in_memory().await.unwrap();
        let user = User::insert(&db, new_user("blank@example.lk")).await.unwrap();
        let blank = Address {
            street: "somewhere".to_string(),
            ..Address::default()
        };
        User::update_address(&db, &user.id, &blank).await.unwrap();

        let target = User::most_recent_without_address(&db).await.unwrap();
        assert_eq!(target.map(|u| u.id), Some(user.id));

        let coverage = User::address_coverage(&db).await.unwrap();
        assert_eq!(coverage.total, 1);
        assert_eq!(coverage.with_address, 0);
    }

    #[tokio::test]
    async fn test_update_profile_partial() {
        let db = init_in_memory().await.unwrap();
        let user = User::insert(&db, new_user("p@example.lk")).await.unwrap();

        let req = UpdateUserRequest {
            phone_number: Some("0112345678".to_string()),
            status: Some("Pending".to_string()),
            ..Default::default()
        };
        assert!(User::update_profile(&db, &user.id, &req).await.unwrap());

        let updated = User::find_by_id(&db, &user.id).await.unwrap().unwrap();
        assert_eq!(updated.first_name, "Nimal");
        assert_eq!(updated.phone_number, "0112345678");
        assert_eq!(updated.status, "pending");
    }

    #[tokio::test]
    async fn test_update_profile_rolls_back_when_address_write_fails() {
        let db = init_in_memory().await.unwrap();
        let user = User::insert(&db, new_user("tx@example.lk")).await.unwrap();
        sqlx::query(
            "CREATE TRIGGER reject_district BEFORE UPDATE OF district ON users \
             BEGIN SELECT RAISE(ABORT, 'district locked'); END",
        )
        .execute(&db)
        .await
        .unwrap();

        let req = UpdateUserRequest {
            phone_number: Some("0112345678".to_string()),
            address: Some(kandy()),
            ..Default::default()
        };
        assert!(User::update_profile(&db, &user.id, &req).await.is_err());

        let unchanged = User::find_by_id(&db, &user.id).await.unwrap().unwrap();
        assert_eq!(unchanged.phone_number, "0771234567");
        assert!(!unchanged.has_address());
    }

    #[tokio::test]
    async fn test_update_profile_missing_user() {
        let db = init_in_memory().await.unwrap();
        let req = UpdateUserRequest {
            address: Some(kandy()),
            ..Default::default()
        };
        assert!(!User::update_profile(&db, "missing", &req).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_all_oldest_first() {
        let db = init_in_memory().await.unwrap();
        User::insert(&db, new_user("first@example.lk")).await.unwrap();
        User::insert(&db, new_user("second@example.lk")).await.unwrap();

        let emails: Vec<_> = User::list_all(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.email)
            .collect();
        assert_eq!(emails, vec!["first@example.lk", "second@example.lk"]);
    }

    #[test]
    fn test_response_hides_password_hash() {
        let user = User {
            id: "u1".to_string(),
            email: "x@example.lk".to_string(),
            first_name: "X".to_string(),
            last_name: "Y".to_string(),
            phone_number: String::new(),
            password_hash: "$argon2id$secret".to_string(),
            status: "active".to_string(),
            street: None,
            city: None,
            district: None,
            province: None,
            postal_code: None,
            created_at: String::new(),
            updated_at: String::new(),
        };

        let json = serde_json::to_string(&UserResponse::from(user)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"address\":null"));
    }
}
