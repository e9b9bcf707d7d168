use crate::{
    auth::{authorize, AuthenticatedUser},
    error::AppError,
    models::{Role, TodoInput, TodoUpdate},
    store::TodoStore,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use uuid::Uuid;
use validator::Validate;

/// Allowed-role sets per route group. Sets are explicit and closed: admin is
/// not implicitly a member of the read set, it is listed there.
const READ_ROLES: &[Role] = &[Role::Admin, Role::Viewer];
const WRITE_ROLES: &[Role] = &[Role::Admin];

/// Creates a new todo.
///
/// ## Request Body:
/// A JSON object matching `TodoInput`:
/// - `title`: the title of the todo (required, 1-200 chars).
/// - `details` (optional): free-form text.
/// - `due_date` (optional): RFC 3339 timestamp.
/// - `completed` (optional): defaults to false.
///
/// ## Responses:
/// - `201 Created`: the stored `Todo` with its generated id.
/// - `400 Bad Request`: invalid input.
/// - `401 Unauthorized` / `403 Forbidden`: authentication or role failure.
#[post("")]
pub async fn create_todo(
    store: web::Data<TodoStore>,
    todo_data: web::Json<TodoInput>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    authorize(&user.0, WRITE_ROLES)?;
    todo_data.validate()?;

    let todo = store.create(todo_data.into_inner()).await?;

    Ok(HttpResponse::Created().json(todo))
}

/// Lists every todo, newest first.
///
/// ## Responses:
/// - `200 OK`: JSON array of `Todo` objects.
/// - `401 Unauthorized` / `403 Forbidden`: authentication or role failure.
/// - `500 Internal Server Error`: store failure.
#[get("")]
pub async fn list_todos(
    store: web::Data<TodoStore>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    authorize(&user.0, READ_ROLES)?;

    let todos = store.list_all().await?;

    Ok(HttpResponse::Ok().json(todos))
}

/// Retrieves a single todo by id.
///
/// ## Responses:
/// - `200 OK`: the `Todo` object.
/// - `404 Not Found`: no todo with the given id.
/// - `401 Unauthorized` / `403 Forbidden`: authentication or role failure.
/// - `500 Internal Server Error`: store failure.
#[get("/{id}")]
pub async fn get_todo(
    store: web::Data<TodoStore>,
    todo_id: web::Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    authorize(&user.0, READ_ROLES)?;

    let todo = store.get_by_id(todo_id.into_inner()).await?;

    Ok(HttpResponse::Ok().json(todo))
}

/// Updates a todo by id.
///
/// The body is a partial document: absent fields keep their stored values.
/// Returns the post-update document.
///
/// ## Responses:
/// - `200 OK`: the updated `Todo`.
/// - `400 Bad Request`: invalid update fields.
/// - `404 Not Found`: no todo with the given id.
/// - `401 Unauthorized` / `403 Forbidden`: authentication or role failure.
#[put("/{id}")]
pub async fn update_todo(
    store: web::Data<TodoStore>,
    todo_id: web::Path<Uuid>,
    todo_data: web::Json<TodoUpdate>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    authorize(&user.0, WRITE_ROLES)?;
    todo_data.validate()?;

    let todo = store
        .update_by_id(todo_id.into_inner(), todo_data.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(todo))
}

/// Deletes a todo by id.
///
/// ## Responses:
/// - `200 OK`: confirmation message.
/// - `404 Not Found`: no todo with the given id (a repeated delete lands
///   here, it does not error out).
/// - `401 Unauthorized` / `403 Forbidden`: authentication or role failure.
/// - `500 Internal Server Error`: store failure.
#[delete("/{id}")]
pub async fn delete_todo(
    store: web::Data<TodoStore>,
    todo_id: web::Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    authorize(&user.0, WRITE_ROLES)?;

    store.delete_by_id(todo_id.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Todo deleted"
    })))
}
