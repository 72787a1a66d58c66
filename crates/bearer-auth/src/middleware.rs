//! axum middleware wiring a `Guard` in front of route handlers
//!
//! ```ignore
//! let guard = strategies.guard(&["bearer"])?;
//! let protected = Router::new().route("/bearer", post(handler));
//! app = app.merge(bearer_auth::protect(protected, guard));
//! ```

use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};

use crate::context::AuthContext;
use crate::registry::Guard;

/// Require `guard` on every route of `router`.
///
/// Uses `route_layer` so unmatched paths still 404 instead of demanding
/// credentials.
pub fn protect<S>(router: Router<S>, guard: Guard) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(guard, authenticate))
}

/// Authenticate the request; on success attach `AuthContext` and run the
/// handler, otherwise answer with the rejection.
pub async fn authenticate(
    State(guard): State<Guard>,
    mut request: Request,
    next: Next,
) -> Response {
    let attempt = guard.authenticate(request.headers()).await;

    match attempt.result.into_credentials() {
        Ok(credentials) => {
            request.extensions_mut().insert(AuthContext {
                strategy: attempt.strategy,
                credentials,
            });
            next.run(request).await
        }
        Err(rejection) => rejection.into_response(),
    }
}
