use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/login", post(handlers::login))
        .route("/signup", post(handlers::signup))
        .route("/recover", post(handlers::recover))
        .route("/logout", post(handlers::logout))
        .route("/status", get(handlers::status))
        .route("/tracker", get(handlers::tracker))
        .route("/input", get(handlers::input_form).post(handlers::input_submit))
        .route("/export.xlsx", get(handlers::export))
        .route(
            "/api/categories",
            get(handlers::list_categories).post(handlers::update_category),
        )
        .route("/api/breakdown", get(handlers::get_breakdown))
        .with_state(state)
}
