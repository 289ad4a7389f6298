//! Registration, login and user administration

use super::Lms;
use crate::access::{require_admin, require_self_or_admin, Actor, AuditAction};
use crate::auth::{hash_password, verify_password, IssuedSession};
use crate::error::{LyceumError, Result};
use crate::types::{Role, User, UserId};
use crate::utils::string::normalize_email;
use crate::utils::validation::{validate_email, validate_password, validate_title};
use chrono::Utc;
use tracing::{info, warn};

impl Lms {
    /// Open sign-up; always creates a student
    pub async fn register(&self, email: &str, name: &str, password: &str) -> Result<User> {
        let user = self.insert_user(email, name, password, Role::Student).await?;
        self.audit(
            &Actor::from(&user),
            AuditAction::UserCreated,
            user.id,
            Some(serde_json::json!({ "role": user.role, "self_service": true })),
        )
        .await?;
        Ok(user)
    }

    /// Create a user with any role (admin only)
    pub async fn create_user(
        &self,
        actor: &Actor,
        email: &str,
        name: &str,
        password: &str,
        role: Role,
    ) -> Result<User> {
        require_admin(actor)?;
        let user = self.insert_user(email, name, password, role).await?;
        self.audit(
            actor,
            AuditAction::UserCreated,
            user.id,
            Some(serde_json::json!({ "role": user.role })),
        )
        .await?;
        Ok(user)
    }

    async fn insert_user(&self, email: &str, name: &str, password: &str, role: Role) -> Result<User> {
        let email = normalize_email(email);
        validate_email(&email)?;
        validate_title("name", name)?;
        validate_password(password)?;

        let password = password.to_string();
        let iterations = self.settings.password_iterations;
        let hash = tokio::task::spawn_blocking(move || hash_password(&password, iterations))
            .await
            .map_err(|e| LyceumError::Other(format!("password hashing task failed: {}", e)))?;

        let user = User {
            id: UserId::new(),
            email,
            name: name.trim().to_string(),
            role,
            created_at: Utc::now(),
        };
        self.storage.create_user(&user, &hash).await?;
        info!("Created {} account {}", user.role, user.email);
        Ok(user)
    }

    /// Check credentials and issue a session token
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedSession> {
        let invalid = || LyceumError::Unauthenticated("invalid email or password".to_string());

        let (user, stored) = self
            .storage
            .find_user_by_email(&normalize_email(email))
            .await?
            .ok_or_else(invalid)?;

        let password = password.to_string();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|e| LyceumError::Other(format!("password check task failed: {}", e)))?;
        if !valid {
            warn!("Failed login for {}", user.email);
            return Err(invalid());
        }

        let session = self.sessions.issue(user.id);
        self.storage
            .create_session(&self.sessions.digest(&session.token), user.id, session.expires_at)
            .await?;
        info!("User {} logged in", user.id);
        Ok(session)
    }

    /// Resolve a bearer token to its user
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        self.storage
            .session_user(&self.sessions.digest(token), Utc::now())
            .await?
            .ok_or_else(|| LyceumError::Unauthenticated("invalid or expired session".to_string()))
    }

    /// Revoke a session; returns false if it did not exist
    pub async fn logout(&self, token: &str) -> Result<bool> {
        self.storage.delete_session(&self.sessions.digest(token)).await
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64> {
        self.storage.purge_expired_sessions(Utc::now()).await
    }

    pub async fn get_user(&self, actor: &Actor, user_id: UserId) -> Result<User> {
        require_self_or_admin(actor, user_id)?;
        self.storage.get_user(user_id).await
    }

    pub async fn list_users(&self, actor: &Actor, limit: usize) -> Result<Vec<User>> {
        require_admin(actor)?;
        self.storage.list_users(limit).await
    }

    pub async fn set_role(&self, actor: &Actor, user_id: UserId, role: Role) -> Result<User> {
        require_admin(actor)?;
        let before = self.storage.get_user(user_id).await?;
        self.storage.set_user_role(user_id, role).await?;
        self.audit(
            actor,
            AuditAction::RoleChanged,
            user_id,
            Some(serde_json::json!({ "from": before.role, "to": role })),
        )
        .await?;
        info!("Role of {} changed from {} to {}", before.email, before.role, role);
        Ok(User { role, ..before })
    }
}
