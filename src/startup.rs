use crate::config::Config;
use crate::db;
use crate::polls;
use crate::storage::Backend;
use crate::voting::PollService;
use axum::{
    Router,
    extract::Extension,
    http::{
        Method, StatusCode,
        header::{ACCEPT, CONTENT_TYPE},
    },
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub polls: Arc<PollService<Backend>>,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let storage = db::init_storage(&config.storage)?;
        Ok(Self::with_storage(storage))
    }

    pub fn with_storage(storage: Backend) -> Self {
        AppState {
            polls: Arc::new(PollService::new(Arc::new(storage))),
        }
    }
}

pub fn app(app_state: AppState) -> Router {
    Router::new()
        .route("/polls", post(polls::create_poll))
        .route("/polls/:poll_id", get(polls::get_poll))
        .route("/polls/:poll_id/audit", get(polls::get_audit_log))
        .route(
            "/polls/:poll_id/voters",
            post(polls::add_voter).delete(polls::remove_voter),
        )
        .route(
            "/ballot/:token",
            get(polls::get_ballot).post(polls::cast_vote),
        )
        .layer(Extension(app_state))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::mirror_request())
                .allow_methods([Method::POST, Method::GET, Method::DELETE, Method::OPTIONS])
                .allow_headers([CONTENT_TYPE, ACCEPT]),
        )
        .fallback(handler_404)
}

async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}
