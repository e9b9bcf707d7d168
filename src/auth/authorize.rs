use crate::auth::token::Claims;
use crate::error::AppError;
use crate::models::Role;

/// Checks a verified claim against a route's allowed-role set.
///
/// Pure membership test: allowed iff the claim's role appears in
/// `required_roles`. Roles carry no hierarchy; every route names its full
/// allowed set explicitly.
pub fn authorize(claims: &Claims, required_roles: &[Role]) -> Result<(), AppError> {
    if required_roles.contains(&claims.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Access denied".into()))
    }
}
