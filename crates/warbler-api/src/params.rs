use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use tracing::debug;

use crate::error::AppError;

/// A numeric row id taken from the route.
///
/// An id that does not parse as `i64` cannot name a stored row, so it is
/// rejected as `NotFound` instead of axum's 400.
#[derive(Debug, Clone, Copy)]
pub struct RowId(pub i64);

impl<S> FromRequestParts<S> for RowId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<i64>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(RowId(id)),
            Err(rejection) => {
                debug!(%rejection, path = %parts.uri.path(), "Unparseable row id");
                Err(AppError::NotFound)
            }
        }
    }
}
