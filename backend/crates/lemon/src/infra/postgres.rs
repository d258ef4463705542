//! PostgreSQL Repository Implementations

use chrono::{DateTime, Duration, Utc};
use platform::password::HashedPassword;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{auth::Auth, auth_session::AuthSession, user::User};
use crate::domain::repository::{AuthRepository, AuthSessionRepository, UserRepository};
use crate::domain::value_object::{
    SessionId, UserId, display_name::DisplayName, email::Email, role::Role,
};
use crate::error::{LemonError, LemonResult};

/// PostgreSQL-backed Lemon repository
#[derive(Clone)]
pub struct PgLemonRepository {
    pool: PgPool,
}

impl PgLemonRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map a unique violation on the email column to a field error
fn map_email_conflict(err: sqlx::Error) -> LemonError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            LemonError::field("email", "DuplicateEmail", "Email already in use")
        }
        _ => LemonError::Database(err),
    }
}

fn role_codes(user: &User) -> Vec<String> {
    user.roles.iter().map(|r| r.code().to_string()).collect()
}

const USER_COLUMNS: &str = r#"
    user_id,
    email,
    name,
    roles,
    verification_code_hash,
    forgot_password_code_hash,
    forgot_password_expires_at,
    credentials_updated_at,
    last_login_at,
    created_at,
    updated_at
"#;

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for PgLemonRepository {
    async fn create_user_with_auth(&self, user: &User, auth: &Auth) -> LemonResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (
                user_id,
                email,
                name,
                roles,
                verification_code_hash,
                forgot_password_code_hash,
                forgot_password_expires_at,
                credentials_updated_at,
                last_login_at,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(user.email.as_str())
        .bind(user.name.as_str())
        .bind(role_codes(user))
        .bind(&user.verification_code_hash)
        .bind(&user.forgot_password_code_hash)
        .bind(user.forgot_password_expires_at)
        .bind(user.credentials_updated_at)
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_email_conflict)?;

        sqlx::query(
            r#"
            INSERT INTO auth_credentials (
                user_id,
                password_hash,
                login_failed_count,
                last_failed_at,
                locked_until,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(auth.user_id.as_uuid())
        .bind(auth.password_hash.as_str())
        .bind(auth.login_failed_count as i16)
        .bind(auth.last_failed_at)
        .bind(auth.locked_until)
        .bind(auth.created_at)
        .bind(auth.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_user_by_id(&self, user_id: &UserId) -> LemonResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_user))
    }

    async fn find_user_by_email(&self, email: &Email) -> LemonResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_user))
    }

    async fn find_user_by_reset_code_hash(&self, code_hash: &str) -> LemonResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE forgot_password_code_hash = $1"
        ))
        .bind(code_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_user))
    }

    async fn exists_by_email(&self, email: &Email) -> LemonResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn update_user(&self, user: &User) -> LemonResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE users SET
                email = $2,
                name = $3,
                roles = $4,
                verification_code_hash = $5,
                forgot_password_code_hash = $6,
                forgot_password_expires_at = $7,
                credentials_updated_at = $8,
                last_login_at = $9,
                updated_at = $10
            WHERE user_id = $1
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(user.email.as_str())
        .bind(user.name.as_str())
        .bind(role_codes(user))
        .bind(&user.verification_code_hash)
        .bind(&user.forgot_password_code_hash)
        .bind(user.forgot_password_expires_at)
        .bind(user.credentials_updated_at)
        .bind(user.last_login_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_email_conflict)?
        .rows_affected();

        if updated == 0 {
            return Err(LemonError::UserNotFound);
        }
        Ok(())
    }
}

// ============================================================================
// Auth Repository Implementation
// ============================================================================

impl AuthRepository for PgLemonRepository {
    async fn find_auth(&self, user_id: &UserId) -> LemonResult<Option<Auth>> {
        let row = sqlx::query_as::<_, AuthRow>(
            r#"
            SELECT
                user_id,
                password_hash,
                login_failed_count,
                last_failed_at,
                locked_until,
                created_at,
                updated_at
            FROM auth_credentials
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AuthRow::into_auth))
    }

    async fn update_auth(&self, auth: &Auth) -> LemonResult<()> {
        sqlx::query(
            r#"
            UPDATE auth_credentials SET
                password_hash = $2,
                login_failed_count = $3,
                last_failed_at = $4,
                locked_until = $5,
                updated_at = $6
            WHERE user_id = $1
            "#,
        )
        .bind(auth.user_id.as_uuid())
        .bind(auth.password_hash.as_str())
        .bind(auth.login_failed_count as i16)
        .bind(auth.last_failed_at)
        .bind(auth.locked_until)
        .bind(auth.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_login_attempt(&self, user_id: &UserId) -> LemonResult<Option<Auth>> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, AuthRow>(
            r#"
            UPDATE auth_credentials SET
                login_failed_count = LEAST(login_failed_count + 1, 32767),
                last_failed_at = $2,
                locked_until = CASE
                    WHEN login_failed_count + 1 >= $3 THEN $4
                    ELSE locked_until
                END,
                updated_at = $2
            WHERE user_id = $1
              AND (locked_until IS NULL OR locked_until <= $2)
            RETURNING
                user_id,
                password_hash,
                login_failed_count,
                last_failed_at,
                locked_until,
                created_at,
                updated_at
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(now)
        .bind(Auth::MAX_LOGIN_FAILURES as i16)
        .bind(now + Duration::minutes(Auth::LOCKOUT_MINUTES))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AuthRow::into_auth))
    }
}

// ============================================================================
// Auth Session Repository Implementation
// ============================================================================

impl AuthSessionRepository for PgLemonRepository {
    async fn create_session(&self, session: &AuthSession) -> LemonResult<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_sessions (
                session_id,
                user_id,
                expires_at_ms,
                remember_me,
                client_fingerprint_hash,
                client_ip,
                user_agent,
                created_at,
                last_activity_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(session.session_id.as_uuid())
        .bind(session.user_id.as_uuid())
        .bind(session.expires_at_ms)
        .bind(session.remember_me)
        .bind(&session.client_fingerprint_hash)
        .bind(&session.client_ip)
        .bind(&session.user_agent)
        .bind(session.created_at)
        .bind(session.last_activity_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_session(&self, session_id: &SessionId) -> LemonResult<Option<AuthSession>> {
        let now_ms = Utc::now().timestamp_millis();

        let row = sqlx::query_as::<_, AuthSessionRow>(
            r#"
            SELECT
                session_id,
                user_id,
                expires_at_ms,
                remember_me,
                client_fingerprint_hash,
                client_ip,
                user_agent,
                created_at,
                last_activity_at
            FROM auth_sessions
            WHERE session_id = $1 AND expires_at_ms > $2
            "#,
        )
        .bind(session_id.as_uuid())
        .bind(now_ms)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AuthSessionRow::into_session))
    }

    async fn update_session(&self, session: &AuthSession) -> LemonResult<()> {
        sqlx::query(
            r#"
            UPDATE auth_sessions SET
                expires_at_ms = $2,
                last_activity_at = $3
            WHERE session_id = $1
            "#,
        )
        .bind(session.session_id.as_uuid())
        .bind(session.expires_at_ms)
        .bind(session.last_activity_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_session(&self, session_id: &SessionId) -> LemonResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE session_id = $1")
            .bind(session_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_sessions_for_user(
        &self,
        user_id: &UserId,
        except: Option<&SessionId>,
    ) -> LemonResult<u64> {
        let deleted = match except {
            Some(except_id) => {
                sqlx::query("DELETE FROM auth_sessions WHERE user_id = $1 AND session_id != $2")
                    .bind(user_id.as_uuid())
                    .bind(except_id.as_uuid())
                    .execute(&self.pool)
                    .await?
                    .rows_affected()
            }
            None => sqlx::query("DELETE FROM auth_sessions WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .execute(&self.pool)
                .await?
                .rows_affected(),
        };

        Ok(deleted)
    }

    async fn cleanup_expired_sessions(&self) -> LemonResult<u64> {
        let now_ms = Utc::now().timestamp_millis();

        let deleted = sqlx::query("DELETE FROM auth_sessions WHERE expires_at_ms < $1")
            .bind(now_ms)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!(sessions_deleted = deleted, "Cleaned up expired auth sessions");

        Ok(deleted)
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: Uuid,
    email: String,
    name: String,
    roles: Vec<String>,
    verification_code_hash: Option<String>,
    forgot_password_code_hash: Option<String>,
    forgot_password_expires_at: Option<DateTime<Utc>>,
    credentials_updated_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            user_id: UserId::from_uuid(self.user_id),
            email: Email::from_db(self.email),
            name: DisplayName::from_db(self.name),
            roles: Role::parse_all(&self.roles),
            verification_code_hash: self.verification_code_hash,
            forgot_password_code_hash: self.forgot_password_code_hash,
            forgot_password_expires_at: self.forgot_password_expires_at,
            credentials_updated_at: self.credentials_updated_at,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AuthRow {
    user_id: Uuid,
    password_hash: String,
    login_failed_count: i16,
    last_failed_at: Option<DateTime<Utc>>,
    locked_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AuthRow {
    fn into_auth(self) -> Auth {
        Auth {
            user_id: UserId::from_uuid(self.user_id),
            password_hash: HashedPassword::new(self.password_hash),
            login_failed_count: self.login_failed_count.max(0) as u16,
            last_failed_at: self.last_failed_at,
            locked_until: self.locked_until,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AuthSessionRow {
    session_id: Uuid,
    user_id: Uuid,
    expires_at_ms: i64,
    remember_me: bool,
    client_fingerprint_hash: Vec<u8>,
    client_ip: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
}

impl AuthSessionRow {
    fn into_session(self) -> AuthSession {
        AuthSession {
            session_id: SessionId::from_uuid(self.session_id),
            user_id: UserId::from_uuid(self.user_id),
            expires_at_ms: self.expires_at_ms,
            remember_me: self.remember_me,
            client_fingerprint_hash: self.client_fingerprint_hash,
            client_ip: self.client_ip,
            user_agent: self.user_agent,
            created_at: self.created_at,
            last_activity_at: self.last_activity_at,
        }
    }
}
