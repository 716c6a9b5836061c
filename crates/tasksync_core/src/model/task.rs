//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical to-do record persisted locally and mirrored remotely.
//! - Own the `updated_at` refresh rule so callers cannot forget to apply it.
//!
//! # Invariants
//! - `id` is a non-nil UUID and never changes after construction.
//! - `updated_at` never decreases; any field change strictly increases it.
//! - `owner_id` is written by the sync layer only and never bumps `updated_at`.

use chrono::{DateTime, Duration, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one task, shared by the local file and remote documents.
pub type TaskId = Uuid;

/// Validation errors for task identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    NilId,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "task id must not be nil"),
        }
    }
}

impl Error for TaskValidationError {}

/// One to-do item.
///
/// Fields are private: content changes go through the setters below, which
/// refresh `updated_at`. Serialized with camelCase names (`updatedAt`,
/// `ownerId`) for both the local file and remote documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "TaskRecord")]
pub struct Task {
    id: TaskId,
    title: String,
    completed: bool,
    /// Always written, `null` when absent, so remote merge-writes clear it.
    due: Option<NaiveDate>,
    #[serde(with = "updated_at_format")]
    updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner_id: Option<String>,
}

/// Wire shape accepted on decode; converted through identity validation.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    id: TaskId,
    title: String,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    due: Option<NaiveDate>,
    #[serde(with = "updated_at_format")]
    updated_at: DateTime<Utc>,
    #[serde(default)]
    owner_id: Option<String>,
}

impl TryFrom<TaskRecord> for Task {
    type Error = TaskValidationError;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        let mut task = Task::with_id(record.id, record.title, record.due, record.updated_at)?;
        task.completed = record.completed;
        task.owner_id = record.owner_id;
        Ok(task)
    }
}

impl Task {
    /// Creates a not-yet-completed task with a fresh id and `updated_at = now`.
    pub fn new(title: impl Into<String>, due: Option<NaiveDate>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            completed: false,
            due,
            updated_at: now_millis(),
            owner_id: None,
        }
    }

    /// Creates a task with a caller-provided identity and timestamp.
    ///
    /// Used by decode and import paths where identity already exists.
    pub fn with_id(
        id: TaskId,
        title: impl Into<String>,
        due: Option<NaiveDate>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, TaskValidationError> {
        if id.is_nil() {
            return Err(TaskValidationError::NilId);
        }
        Ok(Self {
            id,
            title: title.into(),
            completed: false,
            due,
            updated_at: updated_at.trunc_subsecs(3),
            owner_id: None,
        })
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn due(&self) -> Option<NaiveDate> {
        self.due
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    /// Replaces the title. Returns whether anything changed.
    pub fn set_title(&mut self, title: impl Into<String>) -> bool {
        let title = title.into();
        if self.title == title {
            return false;
        }
        self.title = title;
        self.touch();
        true
    }

    /// Sets the completion flag. Returns whether anything changed.
    pub fn set_completed(&mut self, completed: bool) -> bool {
        if self.completed == completed {
            return false;
        }
        self.completed = completed;
        self.touch();
        true
    }

    /// Sets or clears the due date. Returns whether anything changed.
    pub fn set_due(&mut self, due: Option<NaiveDate>) -> bool {
        if self.due == due {
            return false;
        }
        self.due = due;
        self.touch();
        true
    }

    /// Applies a full edit of the user-facing fields with a single bump.
    ///
    /// Returns whether any field changed; `updated_at` is untouched otherwise.
    pub fn update_fields(
        &mut self,
        title: impl Into<String>,
        completed: bool,
        due: Option<NaiveDate>,
    ) -> bool {
        let title = title.into();
        let changed = self.title != title || self.completed != completed || self.due != due;
        if !changed {
            return false;
        }
        self.title = title;
        self.completed = completed;
        self.due = due;
        self.touch();
        true
    }

    /// Binds the task to a remote owner. Not a content change.
    pub(crate) fn set_owner(&mut self, owner_id: impl Into<String>) {
        self.owner_id = Some(owner_id.into());
    }

    // Never earlier than previous + 1ms, even if the wall clock stepped back.
    fn touch(&mut self) {
        let floor = self.updated_at + Duration::milliseconds(1);
        self.updated_at = now_millis().max(floor);
    }
}

fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// `updatedAt` codec: millisecond UTC on write; RFC 3339 or zone-less on read.
mod updated_at_format {
    use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const WRITE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";
    const ZONELESS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(WRITE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(raw.trim())
            .map(|value| value.trunc_subsecs(3))
            .ok_or_else(|| de::Error::custom(format!("invalid updatedAt timestamp `{raw}`")))
    }

    pub(super) fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
            return Some(value.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, ZONELESS_FORMAT)
            .ok()
            .map(|value| value.and_utc())
    }
}
