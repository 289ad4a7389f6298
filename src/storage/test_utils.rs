//! Test utilities for storage initialization
//!
//! In-memory databases hold a single shared connection, so the embedded
//! migrations applied at startup are visible to every later query.

use crate::error::Result;
use crate::storage::libsql::{ConnectionMode, LibsqlStorage};
use std::sync::Arc;

/// Create an in-memory storage backend with the schema applied
pub async fn create_test_storage() -> Result<Arc<LibsqlStorage>> {
    let storage = LibsqlStorage::new_with_validation(ConnectionMode::InMemory, true).await?;
    Ok(Arc::new(storage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageBackend;
    use crate::types::{Role, User, UserId};
    use chrono::Utc;

    #[tokio::test]
    async fn test_in_memory_storage_keeps_schema_across_calls() {
        let storage = create_test_storage().await.unwrap();
        let user = User {
            id: UserId::new(),
            email: "ada@example.com".to_string(),
            name: "Ada".to_string(),
            role: Role::Student,
            created_at: Utc::now(),
        };
        storage.create_user(&user, "hash").await.unwrap();
        let stored = storage.get_user(user.id).await.unwrap();
        assert_eq!(stored.email, user.email);
        assert_eq!(stored.role, Role::Student);
    }
}
