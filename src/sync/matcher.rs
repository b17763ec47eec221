//! Target user selection for address sync.

use sqlx::SqlitePool;

use crate::db::User;

/// How a target user was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// A related party email on the qualification matched the user
    RelatedPartyEmail,
    /// Newest user without an address (heuristic)
    WithoutAddress,
    /// Newest user overall, existing address overwritten (heuristic)
    MostRecent,
}

impl MatchKind {
    pub fn is_heuristic(&self) -> bool {
        !matches!(self, MatchKind::RelatedPartyEmail)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::RelatedPartyEmail => "related_party_email",
            MatchKind::WithoutAddress => "without_address",
            MatchKind::MostRecent => "most_recent",
        }
    }
}

/// Pick the user that should receive a qualification's address.
///
/// Related party emails are tried first. Without one, the newest user lacking
/// an address wins, then the newest user overall. Returns `None` only when
/// there are no users.
pub async fn select_target_user(
    db: &SqlitePool,
    related_party_emails: &[String],
) -> Result<Option<(User, MatchKind)>, sqlx::Error> {
    for email in related_party_emails {
        if let Some(user) = User::find_by_email(db, email).await? {
            return Ok(Some((user, MatchKind::RelatedPartyEmail)));
        }
    }

    if let Some(user) = User::most_recent_without_address(db).await? {
        return Ok(Some((user, MatchKind::WithoutAddress)));
    }

    Ok(User::most_recent(db)
        .await?
        .map(|user| (user, MatchKind::MostRecent)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_in_memory, Address, NewUser, UserStatus};

    async fn add_user(db: &SqlitePool, email: &str, district: Option<&str>) -> User {
        let user = User::insert(
            db,
            NewUser {
                email: email.to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                phone_number: String::new(),
                password_hash: "$argon2id$stub".to_string(),
                status: UserStatus::Active,
                address: None,
            },
        )
        .await
        .unwrap();

        if let Some(district) = district {
            let address = Address {
                district: district.to_string(),
                ..Address::default()
            };
            User::update_address(db, &user.id, &address).await.unwrap();
        }
        user
    }

    #[tokio::test]
    async fn test_empty_collection_yields_none() {
        let db = init_in_memory().await.unwrap();
        assert!(select_target_user(&db, &[]).await.unwrap().is_none());
        assert!(select_target_user(&db, &["x@example.lk".to_string()])
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_prefers_newest_user_without_address() {
        let db = init_in_memory().await.unwrap();
        add_user(&db, "first@example.lk", None).await;
        let second = add_user(&db, "second@example.lk", None).await;
        add_user(&db, "third@example.lk", Some("Galle")).await;

        let (user, kind) = select_target_user(&db, &[]).await.unwrap().unwrap();
        assert_eq!(user.id, second.id);
        assert_eq!(kind, MatchKind::WithoutAddress);
        assert!(kind.is_heuristic());
    }

    #[tokio::test]
    async fn test_falls_back_to_most_recent() {
        let db = init_in_memory().await.unwrap();
        add_user(&db, "first@example.lk", Some("Kandy")).await;
        let newest = add_user(&db, "second@example.lk", Some("Matara")).await;

        let (user, kind) = select_target_user(&db, &[]).await.unwrap().unwrap();
        assert_eq!(user.id, newest.id);
        assert_eq!(kind, MatchKind::MostRecent);
    }

    #[tokio::test]
    async fn test_related_party_email_wins() {
        let db = init_in_memory().await.unwrap();
        let owner = add_user(&db, "owner@example.lk", Some("Kandy")).await;
        add_user(&db, "someone-else@example.lk", None).await;

        let emails = vec!["nobody@example.lk".to_string(), "Owner@Example.lk".to_string()];
        let (user, kind) = select_target_user(&db, &emails).await.unwrap().unwrap();
        assert_eq!(user.id, owner.id);
        assert_eq!(kind, MatchKind::RelatedPartyEmail);
        assert!(!kind.is_heuristic());
    }
}
