use axum_core::extract::FromRequestParts;
use http::{StatusCode, request::Parts};

use crate::Sessions;
use crate::store::RecordStore;

/// Axum Extractor for [`Sessions`].
///
/// Requires the [`SessionLayer`](crate::SessionLayer), wrapped by `CookieManagerLayer`.
impl<S, R> FromRequestParts<S> for Sessions<R>
where
    S: Sync + Send,
    R: RecordStore,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Sessions<R>>().cloned().ok_or_else(|| {
            tracing::error!("session layer not found in the request extensions");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "session layer not found in the request extensions",
            )
        })
    }
}
