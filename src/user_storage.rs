use crate::error::StorageError;
use crate::user_models::{NewUser, User};
use chrono::Utc;
use sqlx::SqlitePool;

const USER_COLUMNS: &str = "id, username, password_hash, email";

#[derive(Clone)]
pub struct UserStorage {
    pool: SqlitePool,
}

impl UserStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        let saved = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, password_hash, email, date_created)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.email)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::memory_pool;

    fn user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "hash".to_string(),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn created_user_can_be_found_by_username() {
        let storage = UserStorage::new(memory_pool().await);
        let saved = storage.create_user(user("ada", "ada@example.com")).await.unwrap();

        let found = storage.get_user_by_username("ada").await.unwrap().unwrap();
        assert_eq!(found.id, saved.id);
        assert_eq!(found.email, "ada@example.com");
    }

    #[tokio::test]
    async fn lookup_is_exact() {
        let storage = UserStorage::new(memory_pool().await);
        storage.create_user(user("ada", "ada@example.com")).await.unwrap();

        assert!(storage.get_user_by_username("ADA").await.unwrap().is_none());
        assert!(storage.get_user_by_username("ad").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_or_email_is_a_conflict() {
        let storage = UserStorage::new(memory_pool().await);
        storage.create_user(user("ada", "ada@example.com")).await.unwrap();

        let same_name = storage.create_user(user("ada", "other@example.com")).await;
        assert!(matches!(same_name, Err(StorageError::Conflict(_))));

        let same_email = storage.create_user(user("grace", "ada@example.com")).await;
        assert!(matches!(same_email, Err(StorageError::Conflict(_))));
    }
}
