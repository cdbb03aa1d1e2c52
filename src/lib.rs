pub mod auth;
pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod models;
pub mod store;

use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{config::Config, engine::ExpPolicy, store::ReputationStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReputationStore>,
    pub policy: ExpPolicy,
    pub config: Arc<Config>,
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .allowed_origins
                .iter()
                .map(|origin| origin.parse::<HeaderValue>().unwrap())
                .collect::<Vec<_>>(),
        )
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    // EXP reads are public: leveling and notification systems consume them.
    let public_routes = Router::new()
        .route("/api/users/{user_id}/exp", get(handlers::exp::get_user_exp))
        .route(
            "/api/users/{user_id}/exp/history",
            get(handlers::exp::get_user_exp_history),
        );

    // Vote routes require an authenticated acting user.
    let vote_routes = Router::new()
        .route(
            "/api/posts/{post_id}/vote",
            post(handlers::votes::vote_post).get(handlers::votes::get_post_vote),
        )
        .route(
            "/api/comments/{comment_id}/vote",
            post(handlers::votes::vote_comment).get(handlers::votes::get_comment_vote),
        );

    Router::new()
        .merge(public_routes)
        .merge(vote_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
