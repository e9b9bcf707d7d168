//!
//! # Store Adapters
//!
//! The database is reached through two lifecycle-scoped adapters handed to the
//! request handlers as shared app data: [`TodoStore`] for the todo collection
//! and [`UserStore`] for user accounts. Handlers never touch SQL directly;
//! "no such id" is distinguished from other store failures here so the routes
//! can map them to 404 versus 500.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::hash_password;
use crate::error::AppError;
use crate::models::{Role, Todo, TodoInput, TodoUpdate, User};

/// Opens a connection pool against the configured database.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
}

/// CRUD adapter over the todo collection.
#[derive(Clone)]
pub struct TodoStore {
    pool: PgPool,
}

impl TodoStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a new todo, assigning its id, and returns the stored document.
    pub async fn create(&self, input: TodoInput) -> Result<Todo, AppError> {
        let todo = Todo::new(input);

        let created = sqlx::query_as::<_, Todo>(
            "INSERT INTO todos (id, title, details, due_date, completed, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, title, details, due_date, completed, created_at, updated_at",
        )
        .bind(todo.id)
        .bind(&todo.title)
        .bind(&todo.details)
        .bind(todo.due_date)
        .bind(todo.completed)
        .bind(todo.created_at)
        .bind(todo.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Returns every todo, newest first.
    pub async fn list_all(&self) -> Result<Vec<Todo>, AppError> {
        let todos = sqlx::query_as::<_, Todo>(
            "SELECT id, title, details, due_date, completed, created_at, updated_at
             FROM todos ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(todos)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Todo, AppError> {
        let todo = sqlx::query_as::<_, Todo>(
            "SELECT id, title, details, due_date, completed, created_at, updated_at
             FROM todos WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        todo.ok_or_else(|| AppError::NotFound("Todo not found".into()))
    }

    /// Applies a partial-field merge and returns the post-update document.
    /// Fields absent from `changes` keep their stored values.
    pub async fn update_by_id(&self, id: Uuid, changes: TodoUpdate) -> Result<Todo, AppError> {
        let updated = sqlx::query_as::<_, Todo>(
            "UPDATE todos
             SET title = COALESCE($2, title),
                 details = COALESCE($3, details),
                 due_date = COALESCE($4, due_date),
                 completed = COALESCE($5, completed),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING id, title, details, due_date, completed, created_at, updated_at",
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.details)
        .bind(changes.due_date)
        .bind(changes.completed)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| AppError::NotFound("Todo not found".into()))
    }

    pub async fn delete_by_id(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM todos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Todo not found".into()));
        }

        Ok(())
    }
}

/// Adapter over the user collection. Users are created at sign-up or seeded
/// at process start; they are never mutated or deleted.
#[derive(Clone)]
pub struct UserStore {
    pool: PgPool,
}

impl UserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, role, created_at
             FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn email_taken(&self, email: &str) -> Result<bool, AppError> {
        let existing = sqlx::query_as::<_, (i32,)>("SELECT id FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(existing.is_some())
    }

    pub async fn insert(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, password_hash, role)
             VALUES ($1, $2, $3, $4)
             RETURNING id, username, email, password_hash, role, created_at",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Seeds an admin account from `ADMIN_USERNAME` / `ADMIN_EMAIL` /
    /// `ADMIN_PASSWORD` when those are configured and the account does not
    /// exist yet. Without them the only way to an admin role is a manual
    /// role change in the store.
    pub async fn seed_admin(&self) -> Result<(), AppError> {
        let (username, password) = match (
            std::env::var("ADMIN_USERNAME"),
            std::env::var("ADMIN_PASSWORD"),
        ) {
            (Ok(username), Ok(password)) => (username, password),
            _ => return Ok(()),
        };

        if self.find_by_username(&username).await?.is_some() {
            return Ok(());
        }

        let email = std::env::var("ADMIN_EMAIL")
            .unwrap_or_else(|_| format!("{}@localhost", username));
        let password_hash = hash_password(&password)?;
        self.insert(&username, &email, &password_hash, Role::Admin)
            .await?;

        log::info!("seeded admin account '{}'", username);
        Ok(())
    }
}
