//! LibSQL storage backend implementation
//!
//! Persists users, the course content tree, enrollments and grading data in
//! a local libSQL (SQLite) database. Schema migrations are embedded in the
//! binary and tracked in `_migrations_applied`.

use crate::access::{AuditAction, AuditEntry};
use crate::analytics::{CourseStats, LeaderboardEntry};
use crate::error::{LyceumError, Result};
use crate::progress::{apply_progress, compute_progress};
use crate::storage::StorageBackend;
use crate::types::{
    AttemptId, CompletionOutcome, Course, CourseFilter, CourseId, CourseStatus, EnrollOutcome,
    Enrollment, Grade, Lesson, LessonContent, LessonId, Module, ModuleId, PointsEntry,
    QuizAttempt, Role, Submission, SubmissionId, User, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::params::IntoParams;
use libsql::{params, Builder, Connection, Database, TransactionBehavior};
use tracing::{debug, info, warn};

/// Migrations applied in order at startup
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_initial_schema.sql",
        include_str!("../../migrations/libsql/001_initial_schema.sql"),
    ),
    (
        "002_add_indexes.sql",
        include_str!("../../migrations/libsql/002_add_indexes.sql"),
    ),
];

const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;";

const USER_COLUMNS: &str = "u.id, u.email, u.name, u.role, u.created_at";
const COURSE_COLUMNS: &str =
    "c.id, c.instructor_id, c.title, c.slug, c.description, c.status, c.created_at, c.updated_at";
const LESSON_COLUMNS: &str = "l.id, l.module_id, l.title, l.position, l.content";
const ENROLLMENT_COLUMNS: &str = "e.user_id, e.course_id, e.progress, e.enrolled_at, e.completed_at";
const SUBMISSION_COLUMNS: &str = "s.id, s.lesson_id, s.user_id, s.body, s.submitted_at, \
     s.score, s.max_points, s.feedback, s.graded_by, s.graded_at";
const ATTEMPT_COLUMNS: &str =
    "a.id, a.lesson_id, a.user_id, a.answers, a.score, a.passed, a.attempted_at";

/// Parse SQL file into individual statements, handling multi-line constructs like triggers
fn parse_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;

    for line in sql.lines() {
        let trimmed = line.trim();

        if current.is_empty() && (trimmed.is_empty() || trimmed.starts_with("--")) {
            continue;
        }

        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);

        let upper = trimmed.to_uppercase();
        if upper.starts_with("BEGIN") || upper.contains(" BEGIN") {
            depth += 1;
        }
        if upper.starts_with("END") {
            depth = depth.saturating_sub(1);
        }

        if trimmed.ends_with(';') && depth == 0 {
            statements.push(current.clone());
            current.clear();
        }
    }

    if !current.trim().is_empty() {
        statements.push(current);
    }

    statements
}

/// Fixed-width UTC timestamp so text comparison matches time order
fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LyceumError::Database(format!("Invalid timestamp '{}': {}", s, e)))
}

fn parse_opt_ts(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
    s.map(|s| parse_ts(&s)).transpose()
}

fn row_to_user(row: &libsql::Row) -> Result<User> {
    let id: String = row.get(0)?;
    let role: String = row.get(3)?;
    let created_at: String = row.get(4)?;
    Ok(User {
        id: UserId::from_string(&id)?,
        email: row.get(1)?,
        name: row.get(2)?,
        role: role.parse()?,
        created_at: parse_ts(&created_at)?,
    })
}

fn row_to_course(row: &libsql::Row) -> Result<Course> {
    let id: String = row.get(0)?;
    let instructor_id: String = row.get(1)?;
    let status: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;
    Ok(Course {
        id: CourseId::from_string(&id)?,
        instructor_id: UserId::from_string(&instructor_id)?,
        title: row.get(2)?,
        slug: row.get(3)?,
        description: row.get(4)?,
        status: status.parse::<CourseStatus>()?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

fn row_to_module(row: &libsql::Row) -> Result<Module> {
    let id: String = row.get(0)?;
    let course_id: String = row.get(1)?;
    let position: i64 = row.get(3)?;
    Ok(Module {
        id: ModuleId::from_string(&id)?,
        course_id: CourseId::from_string(&course_id)?,
        title: row.get(2)?,
        position: position as u32,
    })
}

fn row_to_lesson(row: &libsql::Row) -> Result<Lesson> {
    let id: String = row.get(0)?;
    let module_id: String = row.get(1)?;
    let position: i64 = row.get(3)?;
    let content_json: String = row.get(4)?;
    let content: LessonContent = serde_json::from_str(&content_json)?;
    Ok(Lesson {
        id: LessonId::from_string(&id)?,
        module_id: ModuleId::from_string(&module_id)?,
        title: row.get(2)?,
        position: position as u32,
        content,
    })
}

fn row_to_enrollment(row: &libsql::Row) -> Result<Enrollment> {
    let user_id: String = row.get(0)?;
    let course_id: String = row.get(1)?;
    let progress: i64 = row.get(2)?;
    let enrolled_at: String = row.get(3)?;
    let completed_at: Option<String> = row.get(4)?;
    Ok(Enrollment {
        user_id: UserId::from_string(&user_id)?,
        course_id: CourseId::from_string(&course_id)?,
        progress: progress.clamp(0, 100) as u8,
        enrolled_at: parse_ts(&enrolled_at)?,
        completed_at: parse_opt_ts(completed_at)?,
    })
}

fn row_to_submission(row: &libsql::Row) -> Result<Submission> {
    let id: String = row.get(0)?;
    let lesson_id: String = row.get(1)?;
    let user_id: String = row.get(2)?;
    let submitted_at: String = row.get(4)?;
    let score: Option<i64> = row.get(5)?;
    let max_points: Option<i64> = row.get(6)?;
    let feedback: Option<String> = row.get(7)?;
    let graded_by: Option<String> = row.get(8)?;
    let graded_at: Option<String> = row.get(9)?;

    let grade = match (score, graded_by, graded_at) {
        (Some(score), Some(graded_by), Some(graded_at)) => Some(Grade {
            score: score as u32,
            max_points: max_points.unwrap_or(0) as u32,
            feedback: feedback.unwrap_or_default(),
            graded_by: UserId::from_string(&graded_by)?,
            graded_at: parse_ts(&graded_at)?,
        }),
        _ => None,
    };

    Ok(Submission {
        id: SubmissionId::from_string(&id)?,
        lesson_id: LessonId::from_string(&lesson_id)?,
        user_id: UserId::from_string(&user_id)?,
        body: row.get(3)?,
        submitted_at: parse_ts(&submitted_at)?,
        grade,
    })
}

fn row_to_attempt(row: &libsql::Row) -> Result<QuizAttempt> {
    let id: String = row.get(0)?;
    let lesson_id: String = row.get(1)?;
    let user_id: String = row.get(2)?;
    let answers_json: String = row.get(3)?;
    let score: i64 = row.get(4)?;
    let passed: i64 = row.get(5)?;
    let attempted_at: String = row.get(6)?;
    Ok(QuizAttempt {
        id: AttemptId::from_string(&id)?,
        lesson_id: LessonId::from_string(&lesson_id)?,
        user_id: UserId::from_string(&user_id)?,
        answers: serde_json::from_str(&answers_json)?,
        score: score.clamp(0, 100) as u8,
        passed: passed != 0,
        attempted_at: parse_ts(&attempted_at)?,
    })
}

/// Run a query expected to return a single integer
async fn query_i64(conn: &Connection, sql: &str, params: impl IntoParams) -> Result<i64> {
    let mut rows = conn.query(sql, params).await?;
    match rows.next().await? {
        Some(row) => Ok(row.get::<i64>(0)?),
        None => Ok(0),
    }
}

async fn fetch_enrollment(
    conn: &Connection,
    user_id: UserId,
    course_id: CourseId,
) -> Result<Option<Enrollment>> {
    let sql = format!(
        "SELECT {} FROM enrollments e WHERE e.user_id = ? AND e.course_id = ?",
        ENROLLMENT_COLUMNS
    );
    let mut rows = conn
        .query(&sql, params![user_id.to_string(), course_id.to_string()])
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_enrollment(&row)?)),
        None => Ok(None),
    }
}

/// Count completions and lessons, fold the percentage into `enrollment` and persist it.
/// Returns true when the enrollment transitioned to complete.
async fn refresh_progress(
    conn: &Connection,
    enrollment: &mut Enrollment,
    now: DateTime<Utc>,
) -> Result<bool> {
    let user = enrollment.user_id.to_string();
    let course = enrollment.course_id.to_string();

    let completed = query_i64(
        conn,
        r#"
        SELECT COUNT(*)
        FROM lesson_completions c
        JOIN lessons l ON c.lesson_id = l.id
        JOIN modules m ON l.module_id = m.id
        WHERE c.user_id = ? AND m.course_id = ?
        "#,
        params![user.clone(), course.clone()],
    )
    .await?;

    let total = query_i64(
        conn,
        r#"
        SELECT COUNT(*)
        FROM lessons l
        JOIN modules m ON l.module_id = m.id
        WHERE m.course_id = ?
        "#,
        params![course.clone()],
    )
    .await?;

    let computed = compute_progress(completed.max(0) as usize, total.max(0) as usize);
    let transitioned = apply_progress(enrollment, computed, now);

    conn.execute(
        "UPDATE enrollments SET progress = ?, completed_at = ? WHERE user_id = ? AND course_id = ?",
        params![
            enrollment.progress as i64,
            enrollment.completed_at.as_ref().map(ts),
            user,
            course
        ],
    )
    .await?;

    debug!(
        "Progress for {} in {}: {}/{} lessons -> {}%",
        enrollment.user_id, enrollment.course_id, completed, total, enrollment.progress
    );
    Ok(transitioned)
}

/// LibSQL storage backend
pub struct LibsqlStorage {
    db: Database,
    /// In-memory databases are per-connection, so they share one
    shared: Option<Connection>,
}

/// Database connection mode
#[derive(Debug, Clone)]
pub enum ConnectionMode {
    /// Local file-based database
    Local(String),
    /// In-memory database (for testing)
    InMemory,
}

impl LibsqlStorage {
    /// Validate database file before opening
    ///
    /// Returns `Ok(true)` if the file exists and carries the SQLite header,
    /// `Ok(false)` if it does not exist and `must_exist` is false.
    fn validate_database_file(db_path: &str, must_exist: bool) -> Result<bool> {
        use std::fs;
        use std::io::Read;
        use std::path::Path;

        let path = Path::new(db_path);

        if !path.exists() {
            if must_exist {
                return Err(LyceumError::Database(format!(
                    "Database file not found at '{}'. Please run 'lyceum init' first or check your database path.",
                    db_path
                )));
            }
            return Ok(false);
        }

        let mut header = [0u8; 16];
        let read = fs::File::open(path).and_then(|mut f| f.read_exact(&mut header));
        match read {
            Ok(()) => {
                // Freshly created empty files are fine; SQLite initialises them
                if &header != b"SQLite format 3\0" {
                    return Err(LyceumError::Database(format!(
                        "Database file at '{}' is corrupted or not a valid SQLite database.",
                        db_path
                    )));
                }
                debug!("Database file validation passed: {}", db_path);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                if fs::metadata(path).map(|m| m.len() == 0).unwrap_or(false) {
                    Ok(true)
                } else {
                    Err(LyceumError::Database(format!(
                        "Database file at '{}' is corrupted or invalid (file too small).",
                        db_path
                    )))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => Err(LyceumError::Database(
                format!(
                    "Cannot read database file at '{}': Permission denied. Please check file permissions.",
                    db_path
                ),
            )),
            Err(e) => Err(LyceumError::Database(format!(
                "Cannot read database file at '{}': {}",
                db_path, e
            ))),
        }
    }

    /// Create a new LibSQL storage backend with validation
    ///
    /// # Arguments
    /// * `mode` - Connection mode (local or in-memory)
    /// * `create_if_missing` - If true, create the database (and its parent
    ///   directory) if it doesn't exist. If false, error on missing database.
    pub async fn new_with_validation(mode: ConnectionMode, create_if_missing: bool) -> Result<Self> {
        info!(
            "Connecting to LibSQL database: {:?} (create_if_missing: {})",
            mode, create_if_missing
        );

        let (db, shared) = match &mode {
            ConnectionMode::Local(path) => {
                let exists = Self::validate_database_file(path, !create_if_missing)?;
                if create_if_missing && !exists {
                    if let Some(parent) = std::path::Path::new(path).parent() {
                        if !parent.as_os_str().is_empty() {
                            std::fs::create_dir_all(parent).map_err(|e| {
                                LyceumError::Database(format!(
                                    "Failed to create database directory {}: {}",
                                    parent.display(),
                                    e
                                ))
                            })?;
                        }
                    }
                }

                let db = Builder::new_local(path).build().await.map_err(|e| {
                    LyceumError::Database(format!("Failed to create local database: {}", e))
                })?;
                (db, None)
            }
            ConnectionMode::InMemory => {
                let db = Builder::new_local(":memory:").build().await.map_err(|e| {
                    LyceumError::Database(format!("Failed to create in-memory database: {}", e))
                })?;
                let conn = db
                    .connect()
                    .map_err(|e| LyceumError::Database(format!("Failed to get connection: {}", e)))?;
                conn.execute_batch(CONNECTION_PRAGMAS).await?;
                (db, Some(conn))
            }
        };

        info!("LibSQL database connection established");

        let storage = Self { db, shared };

        if let ConnectionMode::Local(_) = mode {
            let conn = storage.get_conn().await?;
            if let Err(e) = conn.execute_batch("PRAGMA journal_mode = WAL;").await {
                warn!("Could not enable WAL mode: {}", e);
            }
        }

        storage.verify_database_health().await?;
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Open an existing database (secure by default: it must already exist)
    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        Self::new_with_validation(mode, false).await
    }

    /// Open or create a database from a path; `:memory:` selects an ephemeral store
    pub async fn from_path(database_path: &str, create_if_missing: bool) -> Result<Self> {
        let mode = if database_path == ":memory:" {
            ConnectionMode::InMemory
        } else {
            ConnectionMode::Local(database_path.to_string())
        };
        Self::new_with_validation(mode, create_if_missing).await
    }

    /// Verify database health before operations
    async fn verify_database_health(&self) -> Result<()> {
        let conn = self.get_conn().await?;

        conn.query("SELECT 1", params![]).await.map_err(|e| {
            LyceumError::Database(format!(
                "Database corruption detected or invalid database file: {}",
                e
            ))
        })?;

        let write_test = r#"
            CREATE TABLE IF NOT EXISTS _health_check (id INTEGER PRIMARY KEY);
            DROP TABLE IF EXISTS _health_check;
        "#;

        if let Err(e) = conn.execute_batch(write_test).await {
            let error_msg = e.to_string().to_lowercase();
            if error_msg.contains("readonly") || error_msg.contains("permission") {
                return Err(LyceumError::Database(format!(
                    "Database is read-only or lacks write permissions: {}",
                    e
                )));
            }
            return Err(LyceumError::Database(format!(
                "Database write test failed: {}",
                e
            )));
        }

        debug!("Database health check passed");
        Ok(())
    }

    /// Run embedded migrations that have not been applied yet
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");

        let conn = self.get_conn().await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations_applied (
                migration_name TEXT PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )",
            params![],
        )
        .await
        .map_err(|e| LyceumError::Migration(format!("Failed to create migrations table: {}", e)))?;

        for (name, sql) in MIGRATIONS {
            let already_applied = query_i64(
                &conn,
                "SELECT COUNT(*) FROM _migrations_applied WHERE migration_name = ?",
                params![*name],
            )
            .await?;

            if already_applied > 0 {
                debug!("Skipping already applied migration: {}", name);
                continue;
            }

            let statements = parse_sql_statements(sql);
            debug!("Parsed {} statements from {}", statements.len(), name);
            for (i, statement) in statements.iter().enumerate() {
                let statement = statement.trim();
                if statement.is_empty() {
                    continue;
                }
                conn.execute(statement, params![]).await.map_err(|e| {
                    LyceumError::Migration(format!(
                        "Failed to execute statement #{} in {}: {}\nStatement: {}",
                        i + 1,
                        name,
                        e,
                        crate::utils::string::truncate_at_char_boundary(statement, 300)
                    ))
                })?;
            }

            conn.execute(
                "INSERT INTO _migrations_applied (migration_name, applied_at) VALUES (?, ?)",
                params![*name, Utc::now().timestamp()],
            )
            .await
            .map_err(|e| LyceumError::Migration(format!("Failed to record migration: {}", e)))?;

            info!("Executed migration: {}", name);
        }

        info!("Database migrations completed");
        Ok(())
    }

    /// Get a connection with per-connection pragmas applied
    async fn get_conn(&self) -> Result<Connection> {
        if let Some(conn) = &self.shared {
            return Ok(conn.clone());
        }
        let conn = self
            .db
            .connect()
            .map_err(|e| LyceumError::Database(format!("Failed to get connection: {}", e)))?;
        conn.execute_batch(CONNECTION_PRAGMAS).await?;
        Ok(conn)
    }

    /// Check if database is healthy and operational
    pub async fn check_database_health(&self) -> Result<()> {
        debug!("Checking database health...");

        let conn = self.get_conn().await.map_err(|e| {
            LyceumError::Database(format!(
                "Health check failed: cannot establish connection: {}",
                e
            ))
        })?;

        match conn.query("SELECT 1", ()).await {
            Ok(_) => {
                debug!("Database health check passed");
                Ok(())
            }
            Err(e) => {
                let error_msg = e.to_string();
                if error_msg.contains("readonly") || error_msg.contains("permission") {
                    Err(LyceumError::Database(
                        "Database is read-only or permission denied. Check file permissions."
                            .to_string(),
                    ))
                } else if error_msg.contains("corrupt") || error_msg.contains("malformed") {
                    Err(LyceumError::Database(
                        "Database appears to be corrupted. Consider restoring from backup."
                            .to_string(),
                    ))
                } else {
                    Err(LyceumError::Database(format!(
                        "Health check failed: {}",
                        error_msg
                    )))
                }
            }
        }
    }

    async fn count(&self, sql: &str, params: impl IntoParams) -> Result<u64> {
        let conn = self.get_conn().await?;
        Ok(query_i64(&conn, sql, params).await?.max(0) as u64)
    }
}

#[async_trait]
impl StorageBackend for LibsqlStorage {
    async fn create_user(&self, user: &User, password_hash: &str) -> Result<()> {
        debug!("Storing user: {}", user.id);
        let conn = self.get_conn().await?;
        conn.execute(
            r#"
            INSERT INTO users (id, email, name, role, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                user.id.to_string(),
                user.email.clone(),
                user.name.clone(),
                user.role.as_str(),
                password_hash,
                ts(&user.created_at)
            ],
        )
        .await
        .map_err(|e| match LyceumError::from(e) {
            LyceumError::AlreadyExists(_) => {
                LyceumError::AlreadyExists(format!("user with email {}", user.email))
            }
            other => other,
        })?;
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<User> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM users u WHERE u.id = ?", USER_COLUMNS);
        let mut rows = conn.query(&sql, params![id.to_string()]).await?;
        match rows.next().await? {
            Some(row) => row_to_user(&row),
            None => Err(LyceumError::not_found("User", id)),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<(User, String)>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {}, u.password_hash FROM users u WHERE u.email = ?",
            USER_COLUMNS
        );
        let mut rows = conn.query(&sql, params![email]).await?;
        match rows.next().await? {
            Some(row) => {
                let user = row_to_user(&row)?;
                let hash: String = row.get(5)?;
                Ok(Some((user, hash)))
            }
            None => Ok(None),
        }
    }

    async fn list_users(&self, limit: usize) -> Result<Vec<User>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {} FROM users u ORDER BY u.created_at ASC LIMIT ?",
            USER_COLUMNS
        );
        let mut rows = conn.query(&sql, params![limit as i64]).await?;
        let mut users = Vec::new();
        while let Some(row) = rows.next().await? {
            users.push(row_to_user(&row)?);
        }
        Ok(users)
    }

    async fn set_user_role(&self, id: UserId, role: Role) -> Result<()> {
        let conn = self.get_conn().await?;
        let affected = conn
            .execute(
                "UPDATE users SET role = ? WHERE id = ?",
                params![role.as_str(), id.to_string()],
            )
            .await?;
        if affected == 0 {
            return Err(LyceumError::not_found("User", id));
        }
        Ok(())
    }

    async fn create_session(
        &self,
        token_digest: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO sessions (token_digest, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
            params![
                token_digest,
                user_id.to_string(),
                ts(&Utc::now()),
                ts(&expires_at)
            ],
        )
        .await?;
        Ok(())
    }

    async fn session_user(&self, token_digest: &str, now: DateTime<Utc>) -> Result<Option<User>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            r#"
            SELECT {}
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token_digest = ? AND s.expires_at > ?
            "#,
            USER_COLUMNS
        );
        let mut rows = conn.query(&sql, params![token_digest, ts(&now)]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    async fn delete_session(&self, token_digest: &str) -> Result<bool> {
        let conn = self.get_conn().await?;
        let affected = conn
            .execute(
                "DELETE FROM sessions WHERE token_digest = ?",
                params![token_digest],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let conn = self.get_conn().await?;
        let affected = conn
            .execute(
                "DELETE FROM sessions WHERE expires_at <= ?",
                params![ts(&now)],
            )
            .await?;
        if affected > 0 {
            info!("Purged {} expired sessions", affected);
        }
        Ok(affected)
    }

    async fn create_course(&self, course: &Course) -> Result<()> {
        debug!("Storing course: {} ({})", course.id, course.slug);
        let conn = self.get_conn().await?;
        conn.execute(
            r#"
            INSERT INTO courses (id, instructor_id, title, slug, description, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                course.id.to_string(),
                course.instructor_id.to_string(),
                course.title.clone(),
                course.slug.clone(),
                course.description.clone(),
                course.status.as_str(),
                ts(&course.created_at),
                ts(&course.updated_at)
            ],
        )
        .await?;
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Course> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM courses c WHERE c.id = ?", COURSE_COLUMNS);
        let mut rows = conn.query(&sql, params![id.to_string()]).await?;
        match rows.next().await? {
            Some(row) => row_to_course(&row),
            None => Err(LyceumError::not_found("Course", id)),
        }
    }

    async fn update_course(&self, course: &Course) -> Result<()> {
        let conn = self.get_conn().await?;
        let affected = conn
            .execute(
                r#"
                UPDATE courses
                SET title = ?, description = ?, status = ?, updated_at = ?
                WHERE id = ?
                "#,
                params![
                    course.title.clone(),
                    course.description.clone(),
                    course.status.as_str(),
                    ts(&course.updated_at),
                    course.id.to_string()
                ],
            )
            .await?;
        if affected == 0 {
            return Err(LyceumError::not_found("Course", course.id));
        }
        Ok(())
    }

    async fn delete_course(&self, id: CourseId) -> Result<()> {
        let conn = self.get_conn().await?;
        let affected = conn
            .execute("DELETE FROM courses WHERE id = ?", params![id.to_string()])
            .await?;
        if affected == 0 {
            return Err(LyceumError::not_found("Course", id));
        }
        info!("Deleted course {}", id);
        Ok(())
    }

    async fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            r#"
            SELECT {}
            FROM courses c
            WHERE (?1 IS NULL OR c.status = ?1)
              AND (?2 IS NULL OR c.instructor_id = ?2)
            ORDER BY c.created_at DESC
            "#,
            COURSE_COLUMNS
        );
        let mut rows = conn
            .query(
                &sql,
                params![
                    filter.status.map(|s| s.as_str().to_string()),
                    filter.instructor_id.map(|id| id.to_string())
                ],
            )
            .await?;
        let mut courses = Vec::new();
        while let Some(row) = rows.next().await? {
            courses.push(row_to_course(&row)?);
        }
        Ok(courses)
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool> {
        Ok(self
            .count("SELECT COUNT(*) FROM courses WHERE slug = ?", params![slug])
            .await?
            > 0)
    }

    async fn create_module(&self, module: &Module) -> Result<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO modules (id, course_id, title, position) VALUES (?, ?, ?, ?)",
            params![
                module.id.to_string(),
                module.course_id.to_string(),
                module.title.clone(),
                module.position as i64
            ],
        )
        .await?;
        Ok(())
    }

    async fn get_module(&self, id: ModuleId) -> Result<Module> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT id, course_id, title, position FROM modules WHERE id = ?",
                params![id.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => row_to_module(&row),
            None => Err(LyceumError::not_found("Module", id)),
        }
    }

    async fn list_modules(&self, course_id: CourseId) -> Result<Vec<Module>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT id, course_id, title, position FROM modules WHERE course_id = ? ORDER BY position ASC",
                params![course_id.to_string()],
            )
            .await?;
        let mut modules = Vec::new();
        while let Some(row) = rows.next().await? {
            modules.push(row_to_module(&row)?);
        }
        Ok(modules)
    }

    async fn delete_module(&self, id: ModuleId) -> Result<()> {
        let conn = self.get_conn().await?;
        let affected = conn
            .execute("DELETE FROM modules WHERE id = ?", params![id.to_string()])
            .await?;
        if affected == 0 {
            return Err(LyceumError::not_found("Module", id));
        }
        Ok(())
    }

    async fn next_module_position(&self, course_id: CourseId) -> Result<u32> {
        let next = self
            .count(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM modules WHERE course_id = ?",
                params![course_id.to_string()],
            )
            .await?;
        Ok(next as u32)
    }

    async fn create_lesson(&self, lesson: &Lesson) -> Result<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            r#"
            INSERT INTO lessons (id, module_id, title, position, kind, content)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                lesson.id.to_string(),
                lesson.module_id.to_string(),
                lesson.title.clone(),
                lesson.position as i64,
                lesson.content.kind(),
                serde_json::to_string(&lesson.content)?
            ],
        )
        .await?;
        Ok(())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Lesson> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM lessons l WHERE l.id = ?", LESSON_COLUMNS);
        let mut rows = conn.query(&sql, params![id.to_string()]).await?;
        match rows.next().await? {
            Some(row) => row_to_lesson(&row),
            None => Err(LyceumError::not_found("Lesson", id)),
        }
    }

    async fn list_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            r#"
            SELECT {}
            FROM lessons l
            JOIN modules m ON l.module_id = m.id
            WHERE m.course_id = ?
            ORDER BY m.position ASC, l.position ASC
            "#,
            LESSON_COLUMNS
        );
        let mut rows = conn.query(&sql, params![course_id.to_string()]).await?;
        let mut lessons = Vec::new();
        while let Some(row) = rows.next().await? {
            lessons.push(row_to_lesson(&row)?);
        }
        Ok(lessons)
    }

    async fn delete_lesson(&self, id: LessonId) -> Result<()> {
        let conn = self.get_conn().await?;
        let affected = conn
            .execute("DELETE FROM lessons WHERE id = ?", params![id.to_string()])
            .await?;
        if affected == 0 {
            return Err(LyceumError::not_found("Lesson", id));
        }
        Ok(())
    }

    async fn next_lesson_position(&self, module_id: ModuleId) -> Result<u32> {
        let next = self
            .count(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM lessons WHERE module_id = ?",
                params![module_id.to_string()],
            )
            .await?;
        Ok(next as u32)
    }

    async fn course_for_lesson(&self, lesson_id: LessonId) -> Result<CourseId> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT m.course_id FROM lessons l JOIN modules m ON l.module_id = m.id WHERE l.id = ?",
                params![lesson_id.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => {
                let id: String = row.get(0)?;
                Ok(CourseId::from_string(&id)?)
            }
            None => Err(LyceumError::not_found("Lesson", lesson_id)),
        }
    }

    async fn count_lessons(&self, course_id: CourseId) -> Result<u64> {
        self.count(
            "SELECT COUNT(*) FROM lessons l JOIN modules m ON l.module_id = m.id WHERE m.course_id = ?",
            params![course_id.to_string()],
        )
        .await
    }

    async fn enroll(&self, user_id: UserId, course_id: CourseId) -> Result<EnrollOutcome> {
        let conn = self.get_conn().await?;
        let enrollment = Enrollment::new(user_id, course_id);

        let inserted = conn
            .execute(
                r#"
                INSERT OR IGNORE INTO enrollments (user_id, course_id, progress, enrolled_at, completed_at)
                VALUES (?, ?, 0, ?, NULL)
                "#,
                params![
                    user_id.to_string(),
                    course_id.to_string(),
                    ts(&enrollment.enrolled_at)
                ],
            )
            .await?;

        let stored = fetch_enrollment(&conn, user_id, course_id)
            .await?
            .ok_or_else(|| LyceumError::Database("enrollment vanished after insert".to_string()))?;

        debug!(
            "Enroll {} in {}: {}",
            user_id,
            course_id,
            if inserted > 0 { "created" } else { "already enrolled" }
        );
        Ok(EnrollOutcome {
            enrollment: stored,
            created: inserted > 0,
        })
    }

    async fn get_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>> {
        let conn = self.get_conn().await?;
        fetch_enrollment(&conn, user_id, course_id).await
    }

    async fn list_user_enrollments(&self, user_id: UserId) -> Result<Vec<Enrollment>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {} FROM enrollments e WHERE e.user_id = ? ORDER BY e.enrolled_at DESC",
            ENROLLMENT_COLUMNS
        );
        let mut rows = conn.query(&sql, params![user_id.to_string()]).await?;
        let mut enrollments = Vec::new();
        while let Some(row) = rows.next().await? {
            enrollments.push(row_to_enrollment(&row)?);
        }
        Ok(enrollments)
    }

    async fn list_course_enrollments(&self, course_id: CourseId) -> Result<Vec<Enrollment>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {} FROM enrollments e WHERE e.course_id = ? ORDER BY e.enrolled_at ASC",
            ENROLLMENT_COLUMNS
        );
        let mut rows = conn.query(&sql, params![course_id.to_string()]).await?;
        let mut enrollments = Vec::new();
        while let Some(row) = rows.next().await? {
            enrollments.push(row_to_enrollment(&row)?);
        }
        Ok(enrollments)
    }

    async fn unenroll(&self, user_id: UserId, course_id: CourseId) -> Result<bool> {
        let conn = self.get_conn().await?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?;

        tx.execute(
            r#"
            DELETE FROM lesson_completions
            WHERE user_id = ?
              AND lesson_id IN (
                SELECT l.id FROM lessons l JOIN modules m ON l.module_id = m.id
                WHERE m.course_id = ?
              )
            "#,
            params![user_id.to_string(), course_id.to_string()],
        )
        .await?;

        let affected = tx
            .execute(
                "DELETE FROM enrollments WHERE user_id = ? AND course_id = ?",
                params![user_id.to_string(), course_id.to_string()],
            )
            .await?;

        tx.commit().await?;
        Ok(affected > 0)
    }

    async fn complete_lesson(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome> {
        let conn = self.get_conn().await?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?;

        let course_id = {
            let mut rows = tx
                .query(
                    "SELECT m.course_id FROM lessons l JOIN modules m ON l.module_id = m.id WHERE l.id = ?",
                    params![lesson_id.to_string()],
                )
                .await?;
            match rows.next().await? {
                Some(row) => CourseId::from_string(&row.get::<String>(0)?)?,
                None => return Err(LyceumError::not_found("Lesson", lesson_id)),
            }
        };

        let mut enrollment = fetch_enrollment(&tx, user_id, course_id)
            .await?
            .ok_or_else(|| {
                LyceumError::denied(format!(
                    "user {} is not enrolled in course {}",
                    user_id, course_id
                ))
            })?;

        let inserted = tx
            .execute(
                "INSERT OR IGNORE INTO lesson_completions (user_id, lesson_id, completed_at) VALUES (?, ?, ?)",
                params![user_id.to_string(), lesson_id.to_string(), ts(&now)],
            )
            .await?;

        let course_completed = refresh_progress(&tx, &mut enrollment, now).await?;
        tx.commit().await?;

        Ok(CompletionOutcome {
            enrollment,
            newly_completed: inserted > 0,
            course_completed,
        })
    }

    async fn recompute_progress(&self, user_id: UserId, course_id: CourseId) -> Result<Enrollment> {
        let conn = self.get_conn().await?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?;

        let mut enrollment = fetch_enrollment(&tx, user_id, course_id)
            .await?
            .ok_or_else(|| LyceumError::not_found("Enrollment", format!("{}/{}", user_id, course_id)))?;

        refresh_progress(&tx, &mut enrollment, Utc::now()).await?;
        tx.commit().await?;
        Ok(enrollment)
    }

    async fn completed_lessons(&self, user_id: UserId, course_id: CourseId) -> Result<Vec<LessonId>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                r#"
                SELECT c.lesson_id
                FROM lesson_completions c
                JOIN lessons l ON c.lesson_id = l.id
                JOIN modules m ON l.module_id = m.id
                WHERE c.user_id = ? AND m.course_id = ?
                ORDER BY c.completed_at ASC
                "#,
                params![user_id.to_string(), course_id.to_string()],
            )
            .await?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(LessonId::from_string(&row.get::<String>(0)?)?);
        }
        Ok(ids)
    }

    async fn completion_times(&self, user_id: UserId) -> Result<Vec<DateTime<Utc>>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT completed_at FROM lesson_completions WHERE user_id = ?",
                params![user_id.to_string()],
            )
            .await?;
        let mut times = Vec::new();
        while let Some(row) = rows.next().await? {
            times.push(parse_ts(&row.get::<String>(0)?)?);
        }
        Ok(times)
    }

    async fn create_submission(&self, submission: &Submission) -> Result<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            r#"
            INSERT INTO submissions (id, lesson_id, user_id, body, submitted_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                submission.id.to_string(),
                submission.lesson_id.to_string(),
                submission.user_id.to_string(),
                submission.body.clone(),
                ts(&submission.submitted_at)
            ],
        )
        .await?;
        Ok(())
    }

    async fn get_submission(&self, id: SubmissionId) -> Result<Submission> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM submissions s WHERE s.id = ?", SUBMISSION_COLUMNS);
        let mut rows = conn.query(&sql, params![id.to_string()]).await?;
        match rows.next().await? {
            Some(row) => row_to_submission(&row),
            None => Err(LyceumError::not_found("Submission", id)),
        }
    }

    async fn list_lesson_submissions(&self, lesson_id: LessonId) -> Result<Vec<Submission>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {} FROM submissions s WHERE s.lesson_id = ? ORDER BY s.submitted_at DESC",
            SUBMISSION_COLUMNS
        );
        let mut rows = conn.query(&sql, params![lesson_id.to_string()]).await?;
        let mut submissions = Vec::new();
        while let Some(row) = rows.next().await? {
            submissions.push(row_to_submission(&row)?);
        }
        Ok(submissions)
    }

    async fn list_user_submissions(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<Submission>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            r#"
            SELECT {}
            FROM submissions s
            JOIN lessons l ON s.lesson_id = l.id
            JOIN modules m ON l.module_id = m.id
            WHERE s.user_id = ? AND m.course_id = ?
            ORDER BY s.submitted_at DESC
            "#,
            SUBMISSION_COLUMNS
        );
        let mut rows = conn
            .query(&sql, params![user_id.to_string(), course_id.to_string()])
            .await?;
        let mut submissions = Vec::new();
        while let Some(row) = rows.next().await? {
            submissions.push(row_to_submission(&row)?);
        }
        Ok(submissions)
    }

    async fn set_grade(&self, id: SubmissionId, grade: &Grade) -> Result<()> {
        let conn = self.get_conn().await?;
        let affected = conn
            .execute(
                r#"
                UPDATE submissions
                SET score = ?, max_points = ?, feedback = ?, graded_by = ?, graded_at = ?
                WHERE id = ?
                "#,
                params![
                    grade.score as i64,
                    grade.max_points as i64,
                    grade.feedback.clone(),
                    grade.graded_by.to_string(),
                    ts(&grade.graded_at),
                    id.to_string()
                ],
            )
            .await?;
        if affected == 0 {
            return Err(LyceumError::not_found("Submission", id));
        }
        Ok(())
    }

    async fn record_quiz_attempt(&self, attempt: &QuizAttempt) -> Result<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            r#"
            INSERT INTO quiz_attempts (id, lesson_id, user_id, answers, score, passed, attempted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                attempt.id.to_string(),
                attempt.lesson_id.to_string(),
                attempt.user_id.to_string(),
                serde_json::to_string(&attempt.answers)?,
                attempt.score as i64,
                if attempt.passed { 1i64 } else { 0i64 },
                ts(&attempt.attempted_at)
            ],
        )
        .await?;
        Ok(())
    }

    async fn list_quiz_attempts(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Vec<QuizAttempt>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {} FROM quiz_attempts a WHERE a.user_id = ? AND a.lesson_id = ? ORDER BY a.attempted_at DESC",
            ATTEMPT_COLUMNS
        );
        let mut rows = conn
            .query(&sql, params![user_id.to_string(), lesson_id.to_string()])
            .await?;
        let mut attempts = Vec::new();
        while let Some(row) = rows.next().await? {
            attempts.push(row_to_attempt(&row)?);
        }
        Ok(attempts)
    }

    async fn best_quiz_scores(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<(LessonId, u8)>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                r#"
                SELECT a.lesson_id, MAX(a.score)
                FROM quiz_attempts a
                JOIN lessons l ON a.lesson_id = l.id
                JOIN modules m ON l.module_id = m.id
                WHERE a.user_id = ? AND m.course_id = ?
                GROUP BY a.lesson_id
                "#,
                params![user_id.to_string(), course_id.to_string()],
            )
            .await?;
        let mut scores = Vec::new();
        while let Some(row) = rows.next().await? {
            let lesson = LessonId::from_string(&row.get::<String>(0)?)?;
            let score: i64 = row.get(1)?;
            scores.push((lesson, score.clamp(0, 100) as u8));
        }
        Ok(scores)
    }

    async fn has_perfect_quiz(&self, user_id: UserId) -> Result<bool> {
        Ok(self
            .count(
                "SELECT COUNT(*) FROM quiz_attempts WHERE user_id = ? AND score = 100",
                params![user_id.to_string()],
            )
            .await?
            > 0)
    }

    async fn award_points(&self, entry: &PointsEntry) -> Result<bool> {
        let conn = self.get_conn().await?;
        let inserted = conn
            .execute(
                r#"
                INSERT OR IGNORE INTO points_ledger (user_id, course_id, reason_key, points, awarded_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
                params![
                    entry.user_id.to_string(),
                    entry.course_id.to_string(),
                    entry.reason_key.clone(),
                    entry.points as i64,
                    ts(&entry.awarded_at)
                ],
            )
            .await?;
        Ok(inserted > 0)
    }

    async fn user_points(&self, user_id: UserId) -> Result<u64> {
        self.count(
            "SELECT COALESCE(SUM(points), 0) FROM points_ledger WHERE user_id = ?",
            params![user_id.to_string()],
        )
        .await
    }

    async fn leaderboard(&self, course_id: CourseId, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                r#"
                SELECT p.user_id, u.name, SUM(p.points) AS total, MAX(p.awarded_at) AS last_award
                FROM points_ledger p
                JOIN users u ON u.id = p.user_id
                WHERE p.course_id = ?
                GROUP BY p.user_id, u.name
                ORDER BY total DESC, last_award ASC
                LIMIT ?
                "#,
                params![course_id.to_string(), limit as i64],
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            let total: i64 = row.get(2)?;
            entries.push(LeaderboardEntry {
                rank: entries.len() as u32 + 1,
                user_id: UserId::from_string(&row.get::<String>(0)?)?,
                name: row.get(1)?,
                points: total.max(0) as u64,
            });
        }
        Ok(entries)
    }

    async fn course_stats(&self, course_id: CourseId) -> Result<CourseStats> {
        let conn = self.get_conn().await?;
        let course = course_id.to_string();

        let mut rows = conn
            .query(
                r#"
                SELECT COUNT(*),
                       COALESCE(SUM(CASE WHEN completed_at IS NOT NULL THEN 1 ELSE 0 END), 0),
                       COALESCE(AVG(progress), 0.0)
                FROM enrollments
                WHERE course_id = ?
                "#,
                params![course.clone()],
            )
            .await?;
        let (enrolled, completed, average) = match rows.next().await? {
            Some(row) => (
                row.get::<i64>(0)?,
                row.get::<i64>(1)?,
                row.get::<f64>(2)?,
            ),
            None => (0, 0, 0.0),
        };

        let lesson_count = query_i64(
            &conn,
            "SELECT COUNT(*) FROM lessons l JOIN modules m ON l.module_id = m.id WHERE m.course_id = ?",
            params![course.clone()],
        )
        .await?;

        let pending = query_i64(
            &conn,
            r#"
            SELECT COUNT(*)
            FROM submissions s
            JOIN lessons l ON s.lesson_id = l.id
            JOIN modules m ON l.module_id = m.id
            WHERE m.course_id = ? AND s.score IS NULL
            "#,
            params![course],
        )
        .await?;

        Ok(CourseStats::from_counts(
            course_id,
            enrolled.max(0) as u64,
            completed.max(0) as u64,
            average,
            lesson_count.max(0) as u64,
            pending.max(0) as u64,
        ))
    }

    async fn count_completed_courses(&self, user_id: UserId) -> Result<u64> {
        self.count(
            "SELECT COUNT(*) FROM enrollments WHERE user_id = ? AND completed_at IS NOT NULL",
            params![user_id.to_string()],
        )
        .await
    }

    async fn log_audit(&self, entry: &AuditEntry) -> Result<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO audit_log (id, actor_id, action, target, timestamp, details) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                entry.id.clone(),
                entry.actor_id.map(|id| id.to_string()),
                entry.action.as_str(),
                entry.target.clone(),
                ts(&entry.timestamp),
                entry.details.as_ref().map(|d| d.to_string())
            ],
        )
        .await?;
        Ok(())
    }

    async fn list_audit(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT id, actor_id, action, target, timestamp, details FROM audit_log ORDER BY timestamp DESC LIMIT ?",
                params![limit as i64],
            )
            .await?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            let actor: Option<String> = row.get(1)?;
            let action: String = row.get(2)?;
            let timestamp: String = row.get(4)?;
            let details: Option<String> = row.get(5)?;
            entries.push(AuditEntry {
                id: row.get(0)?,
                actor_id: actor.map(|a| UserId::from_string(&a)).transpose()?,
                action: action.parse::<AuditAction>()?,
                target: row.get(3)?,
                timestamp: parse_ts(&timestamp)?,
                details: details.map(|d| serde_json::from_str(&d)).transpose()?,
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sql_statements_splits_on_semicolons() {
        let sql = "-- comment\nCREATE TABLE a (id INTEGER);\n\nCREATE INDEX i ON a(id);\n";
        let statements = parse_sql_statements(sql);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE"));
    }

    #[test]
    fn test_parse_sql_statements_keeps_triggers_whole() {
        let sql = "CREATE TRIGGER t AFTER INSERT ON a\nBEGIN\n  UPDATE a SET id = 1;\nEND;\n";
        let statements = parse_sql_statements(sql);
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_embedded_migrations_parse() {
        for (name, sql) in MIGRATIONS {
            assert!(!parse_sql_statements(sql).is_empty(), "{} is empty", name);
        }
    }

    #[test]
    fn test_timestamps_sort_lexicographically() {
        let a = Utc::now();
        let b = a + chrono::Duration::milliseconds(1500);
        assert!(ts(&a) < ts(&b));
        assert_eq!(parse_ts(&ts(&a)).unwrap().timestamp_micros(), a.timestamp_micros());
    }

    #[test]
    fn test_validate_missing_file() {
        assert!(LibsqlStorage::validate_database_file("/nonexistent/x.db", true).is_err());
        assert!(!LibsqlStorage::validate_database_file("/nonexistent/x.db", false).unwrap());
    }

    #[test]
    fn test_validate_rejects_non_sqlite_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.db");
        std::fs::write(&path, b"definitely not a database file").unwrap();
        assert!(LibsqlStorage::validate_database_file(path.to_str().unwrap(), true).is_err());
    }

    #[tokio::test]
    async fn test_open_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("lyceum.db");
        let storage = LibsqlStorage::from_path(path.to_str().unwrap(), true)
            .await
            .unwrap();
        storage.check_database_health().await.unwrap();

        // Re-running migrations is a no-op
        storage.run_migrations().await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_open_without_create_requires_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        assert!(LibsqlStorage::from_path(path.to_str().unwrap(), false)
            .await
            .is_err());
    }
}
