use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{error::AppError, AppState};

/// Authentication middleware. Resolves the bearer token to a `Principal`
/// and stores it in the request extensions for the handlers.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AppError::Unauthorized)?;

    let principal = state.auth_service().authenticate(bearer.token()).await?;

    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}
