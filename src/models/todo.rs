use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Input structure for creating a todo.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TodoInput {
    /// The title of the todo.
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// Free-form details for the todo.
    /// Maximum length of 2000 characters if provided.
    #[validate(length(max = 2000))]
    pub details: Option<String>,

    /// Optional due date.
    pub due_date: Option<DateTime<Utc>>,

    /// Completion flag; defaults to false when omitted.
    #[serde(default)]
    pub completed: bool,
}

/// Partial update for a todo. Absent fields keep their stored value.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TodoUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 2000))]
    pub details: Option<String>,

    pub due_date: Option<DateTime<Utc>>,

    pub completed: Option<bool>,
}

/// A todo document as stored and returned by the API.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Todo {
    /// Unique identifier (UUID v4), assigned by the store adapter.
    pub id: Uuid,
    pub title: String,
    pub details: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    /// Creates a new `Todo` from input fields, assigning a fresh id and
    /// stamping creation time.
    pub fn new(input: TodoInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            details: input.details,
            due_date: input.due_date,
            completed: input.completed,
            created_at: now,
            updated_at: now,
        }
    }
}
