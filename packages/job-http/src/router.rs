//! Builds the axum [`Router`] mounting the submit and status route
//! shapes over a [`JobHttpState`].
//!
//! Grounded on `packages/server/src/server/app.rs`'s pattern of
//! building a `Router` from a handful of `.route(path, method(handler))`
//! calls plus a `tower_http::trace::TraceLayer`, generalized so the
//! submit side is data-driven by a list of [`SubmitRoute`]s instead of
//! one fixed route table.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, RawQuery};
use axum::http::{HeaderMap, Method};
use axum::routing::{delete, get, patch, post, put, MethodRouter};
use axum::Router;
use job_core::JobManager;
use tower_http::trace::TraceLayer;

use crate::state::JobHttpState;
use crate::submit::SubmitRoute;
use crate::{status, submit};

/// Mounts one [`status::handle`] route at `status_path` (expected to
/// carry an `:id` segment, e.g. `/jobs/:id`) plus one route per entry in
/// `submit_routes`, and layers `tower_http`'s request tracing the same
/// way `app.rs` does for every other route group.
pub fn job_router(state: JobHttpState, submit_routes: Vec<SubmitRoute>, status_path: &str) -> Router {
    let mut router = Router::new();

    for route in submit_routes {
        let method_router = submit_method_router(state.manager.clone(), route.clone());
        router = router.route(&route.path, method_router);
    }

    let manager = state.manager.clone();
    router = router.route(
        status_path,
        get(move |path: Path<uuid::Uuid>| {
            let manager = manager.clone();
            async move { status::handle(manager, path).await }
        }),
    );

    router.layer(TraceLayer::new_for_http())
}

fn submit_method_router(manager: Arc<JobManager>, route: SubmitRoute) -> MethodRouter {
    let method = route.method.clone();
    let handler = move |headers: HeaderMap, path: Path<HashMap<String, String>>, query: RawQuery, body: Bytes| {
        let manager = manager.clone();
        let route = route.clone();
        async move { submit::handle(manager, route, headers, path, query, body).await }
    };

    match method {
        Method::PUT => put(handler),
        Method::PATCH => patch(handler),
        Method::DELETE => delete(handler),
        _ => post(handler),
    }
}
