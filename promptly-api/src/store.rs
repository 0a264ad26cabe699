//! Persistence for the Promptly API.
//!
//! SQLite-backed store holding user profiles, prompt responses, and prompt
//! usage records. Rows are keyed by the external identity-provider user ID.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// User profile row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Local user ID (seeded from the identity-provider ID)
    pub id: String,
    /// External identity-provider user ID
    pub clerk_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_vibes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_interest: Option<String>,
    pub profile_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields accepted on profile update (all optional; the upsert
/// writes the payload as given).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub orientation: Option<Vec<String>>,
    #[serde(default)]
    pub selected_vibes: Option<Vec<String>>,
    #[serde(default)]
    pub interests: Option<Vec<String>>,
    #[serde(default)]
    pub unique_interest: Option<String>,
    #[serde(default)]
    pub profile_completed: Option<bool>,
}

/// Lifecycle status of a prompt row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromptStatus {
    Active,
    Archived,
    Deleted,
}

impl PromptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Archived => "ARCHIVED",
            Self::Deleted => "DELETED",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "ARCHIVED" => Self::Archived,
            "DELETED" => Self::Deleted,
            _ => Self::Active,
        }
    }
}

/// Provenance of a prompt row's response text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromptType {
    Generated,
    UserWritten,
    Edited,
}

impl PromptType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generated => "GENERATED",
            Self::UserWritten => "USER_WRITTEN",
            Self::Edited => "EDITED",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "USER_WRITTEN" => Self::UserWritten,
            "EDITED" => Self::Edited,
            _ => Self::Generated,
        }
    }
}

/// A saved prompt response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub id: String,
    pub user_id: String,
    pub category: String,
    pub response_text: String,
    pub ai_generated: bool,
    pub prompt_type: PromptType,
    pub status: PromptStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A prompt usage record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptUsage {
    pub id: String,
    pub prompt_id: String,
    pub operation_user: String,
    pub created_at: DateTime<Utc>,
}

/// Store backed by SQLite.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the store at the given database path.
    pub fn new(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                clerk_user_id TEXT UNIQUE NOT NULL,
                email TEXT,
                name TEXT,
                age INTEGER,
                gender TEXT,
                orientation TEXT,
                selected_vibes TEXT,
                interests TEXT,
                unique_interest TEXT,
                profile_completed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_users_clerk_user_id ON users(clerk_user_id);

            CREATE TABLE IF NOT EXISTS prompts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                category TEXT NOT NULL,
                response_text TEXT NOT NULL,
                ai_generated INTEGER NOT NULL DEFAULT 0,
                prompt_type TEXT NOT NULL DEFAULT 'GENERATED',
                status TEXT NOT NULL DEFAULT 'ACTIVE',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_prompts_user_id ON prompts(user_id);
            CREATE INDEX IF NOT EXISTS idx_prompts_status ON prompts(status);

            CREATE TABLE IF NOT EXISTS prompt_usage (
                id TEXT PRIMARY KEY,
                prompt_id TEXT NOT NULL,
                operation_user TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            ",
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Get a user by their external identity-provider ID.
    pub fn get_user_by_external_id(&self, external_id: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("{}", e))?;

        conn.query_row(
            "SELECT id, clerk_user_id, email, name, age, gender, orientation, selected_vibes,
                    interests, unique_interest, profile_completed, created_at, updated_at
             FROM users WHERE clerk_user_id = ?1",
            params![external_id],
            map_user_row,
        )
        .optional()
        .with_context(|| format!("Failed to get user {}", external_id))
    }

    /// Create a user row on first contact. The local ID is seeded from the
    /// external ID, matching how profiles are keyed upstream.
    pub fn create_user(&self, external_id: &str, email: Option<&str>) -> Result<User> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("{}", e))?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO users (id, clerk_user_id, email, profile_completed, created_at, updated_at)
             VALUES (?1, ?1, ?2, 0, ?3, ?3)",
            params![external_id, email, now.to_rfc3339()],
        )
        .with_context(|| format!("Failed to create user {}", external_id))?;

        Ok(User {
            id: external_id.to_string(),
            clerk_user_id: external_id.to_string(),
            email: email.map(|e| e.to_string()),
            name: None,
            age: None,
            gender: None,
            orientation: None,
            selected_vibes: None,
            interests: None,
            unique_interest: None,
            profile_completed: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Upsert a user's profile, keyed on the external ID. The payload is
    /// written as given; absent fields clear their columns, matching the
    /// full-payload upsert of the profile update endpoint.
    pub fn upsert_profile(&self, external_id: &str, update: &ProfileUpdate) -> Result<User> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("{}", e))?;
        let now = Utc::now().to_rfc3339();

        let orientation = to_json_opt(&update.orientation)?;
        let selected_vibes = to_json_opt(&update.selected_vibes)?;
        let interests = to_json_opt(&update.interests)?;

        conn.execute(
            r"
            INSERT INTO users (id, clerk_user_id, email, name, age, gender, orientation,
                               selected_vibes, interests, unique_interest, profile_completed,
                               created_at, updated_at)
            VALUES (?1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            ON CONFLICT(clerk_user_id) DO UPDATE SET
                email = excluded.email,
                name = excluded.name,
                age = excluded.age,
                gender = excluded.gender,
                orientation = excluded.orientation,
                selected_vibes = excluded.selected_vibes,
                interests = excluded.interests,
                unique_interest = excluded.unique_interest,
                profile_completed = excluded.profile_completed,
                updated_at = excluded.updated_at
            ",
            params![
                external_id,
                update.email,
                update.name,
                update.age,
                update.gender,
                orientation,
                selected_vibes,
                interests,
                update.unique_interest,
                update.profile_completed.unwrap_or(false),
                now,
            ],
        )
        .with_context(|| format!("Failed to upsert profile for {}", external_id))?;

        drop(conn);
        self.get_user_by_external_id(external_id)?
            .context("Upserted user not found")
    }

    // ------------------------------------------------------------------
    // Prompts
    // ------------------------------------------------------------------

    /// Save a new prompt response for a user.
    pub fn insert_prompt(
        &self,
        user_id: &str,
        category: &str,
        response_text: &str,
        prompt_type: PromptType,
    ) -> Result<Prompt> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("{}", e))?;
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        let ai_generated = prompt_type == PromptType::Generated;

        conn.execute(
            "INSERT INTO prompts (id, user_id, category, response_text, ai_generated,
                                  prompt_type, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'ACTIVE', ?7, ?7)",
            params![
                id,
                user_id,
                category,
                response_text,
                ai_generated,
                prompt_type.as_str(),
                now.to_rfc3339(),
            ],
        )
        .context("Failed to save prompt")?;

        Ok(Prompt {
            id,
            user_id: user_id.to_string(),
            category: category.to_string(),
            response_text: response_text.to_string(),
            ai_generated,
            prompt_type,
            status: PromptStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }

    /// List a user's active prompts, newest first.
    pub fn list_active_prompts(&self, user_id: &str) -> Result<Vec<Prompt>> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("{}", e))?;

        let mut stmt = conn.prepare(
            "SELECT id, user_id, category, response_text, ai_generated, prompt_type, status,
                    created_at, updated_at
             FROM prompts WHERE user_id = ?1 AND status = 'ACTIVE'
             ORDER BY created_at DESC, rowid DESC",
        )?;

        let prompts = stmt
            .query_map(params![user_id], map_prompt_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(prompts)
    }

    /// Update a prompt's response text. Sets the type to EDITED
    /// unconditionally, whatever it was before. Scoped to the owning user;
    /// returns `None` when no matching row exists.
    pub fn update_prompt_text(
        &self,
        prompt_id: &str,
        user_id: &str,
        response_text: &str,
    ) -> Result<Option<Prompt>> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("{}", e))?;
        let now = Utc::now().to_rfc3339();

        let rows = conn.execute(
            "UPDATE prompts SET response_text = ?1, prompt_type = 'EDITED', updated_at = ?2
             WHERE id = ?3 AND user_id = ?4",
            params![response_text, now, prompt_id, user_id],
        )?;

        if rows == 0 {
            return Ok(None);
        }

        conn.query_row(
            "SELECT id, user_id, category, response_text, ai_generated, prompt_type, status,
                    created_at, updated_at
             FROM prompts WHERE id = ?1",
            params![prompt_id],
            map_prompt_row,
        )
        .optional()
        .with_context(|| format!("Failed to reload prompt {}", prompt_id))
    }

    /// Record a usage of a prompt.
    pub fn record_usage(&self, prompt_id: &str, operation_user: &str) -> Result<PromptUsage> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("{}", e))?;
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO prompt_usage (id, prompt_id, operation_user, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, prompt_id, operation_user, now.to_rfc3339()],
        )
        .context("Failed to save prompt usage record")?;

        Ok(PromptUsage {
            id,
            prompt_id: prompt_id.to_string(),
            operation_user: operation_user.to_string(),
            created_at: now,
        })
    }

    /// Count user rows. Used by tests to assert the absence of side
    /// effects on rejected requests.
    pub fn count_users(&self) -> Result<u64> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("{}", e))?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn to_json_opt(value: &Option<Vec<String>>) -> Result<Option<String>> {
    value
        .as_ref()
        .map(|v| serde_json::to_string(v).context("Failed to encode list column"))
        .transpose()
}

fn parse_json_list(value: Option<String>) -> Option<Vec<String>> {
    value.and_then(|s| serde_json::from_str(&s).ok())
}

fn parse_timestamp(value: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        clerk_user_id: row.get(1)?,
        email: row.get(2)?,
        name: row.get(3)?,
        age: row.get(4)?,
        gender: row.get(5)?,
        orientation: parse_json_list(row.get(6)?),
        selected_vibes: parse_json_list(row.get(7)?),
        interests: parse_json_list(row.get(8)?),
        unique_interest: row.get(9)?,
        profile_completed: row.get::<_, i64>(10)? != 0,
        created_at: parse_timestamp(row.get(11)?),
        updated_at: parse_timestamp(row.get(12)?),
    })
}

fn map_prompt_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Prompt> {
    let prompt_type: String = row.get(5)?;
    let status: String = row.get(6)?;

    Ok(Prompt {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category: row.get(2)?,
        response_text: row.get(3)?,
        ai_generated: row.get::<_, i64>(4)? != 0,
        prompt_type: PromptType::parse(&prompt_type),
        status: PromptStatus::parse(&status),
        created_at: parse_timestamp(row.get(7)?),
        updated_at: parse_timestamp(row.get(8)?),
    })
}
