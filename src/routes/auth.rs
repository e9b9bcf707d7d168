use crate::{
    auth::{
        generate_token, hash_password, verify_password, AuthResponse, AuthenticatedUser,
        LoginRequest, SignupRequest, TokenBlacklist,
    },
    error::AppError,
    models::{Role, UserResponse},
    store::UserStore,
};
use actix_web::{http::header, post, web, HttpRequest, HttpResponse, Responder};
use validator::Validate;

/// Sign up a new user
///
/// Creates a new account with the default `user` role. Only the salted hash
/// of the password is stored.
#[post("/signup")]
pub async fn signup(
    users: web::Data<UserStore>,
    signup_data: web::Json<SignupRequest>,
) -> Result<impl Responder, AppError> {
    // Validate input
    signup_data.validate()?;

    // Check if username or email already exists
    if users.find_by_username(&signup_data.username).await?.is_some() {
        return Err(AppError::BadRequest("Username already taken".into()));
    }
    if users.email_taken(&signup_data.email).await? {
        return Err(AppError::BadRequest("Email already registered".into()));
    }

    // Hash password
    let password_hash = hash_password(&signup_data.password)?;

    let user = users
        .insert(
            &signup_data.username,
            &signup_data.email,
            &password_hash,
            Role::User,
        )
        .await?;

    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// Login user
///
/// Authenticates a username/password pair and issues a bearer token carrying
/// the user's id and role, valid for one hour. An unknown username and a
/// wrong password produce the same response, so the two cases cannot be told
/// apart from outside.
#[post("/login")]
pub async fn login(
    users: web::Data<UserStore>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    // Validate input
    login_data.validate()?;

    let user = users.find_by_username(&login_data.username).await?;

    match user {
        Some(user) => {
            if verify_password(&login_data.password, &user.password_hash)? {
                let token = generate_token(user.id, user.role)?;
                Ok(HttpResponse::Ok().json(AuthResponse {
                    token,
                    user_id: user.id,
                }))
            } else {
                Err(AppError::BadRequest("Invalid credentials".into()))
            }
        }
        None => Err(AppError::BadRequest("Invalid credentials".into())),
    }
}

/// Logout
///
/// Blacklists the presented token until its natural expiry. The request has
/// already passed verification in the middleware, so the bearer header is
/// present and valid here. Idempotent: logging out twice is a no-op.
#[post("/logout")]
pub async fn logout(
    blacklist: web::Data<TokenBlacklist>,
    user: AuthenticatedUser,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;

    blacklist.revoke(token, user.0.exp);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Logged out"
    })))
}
