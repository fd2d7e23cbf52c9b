use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::app::AppState;
use crate::auth::{AuthError, Identity};
use crate::error::AppError;

/// Verifies the bearer token, resolves the user and attaches an [`Identity`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return Err(AppError::Unauthorized("Not authorized, no token provided"));
    };

    let claims = state.auth.verify(bearer.token()).map_err(|err| match err {
        AuthError::Expired => AppError::Unauthorized("Not authorized, token expired"),
        AuthError::Invalid => AppError::Unauthorized("Not authorized, invalid token"),
    })?;

    let user = state
        .users
        .find_user(claims.id)
        .await
        .map_err(AppError::storage("Authentication failed"))?
        .ok_or(AppError::Unauthorized("Not authorized, user not found"))?;

    let identity = Identity::from(user);
    tracing::Span::current().record("user_id", identity.user_id);
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
