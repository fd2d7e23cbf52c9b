use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::api;
use crate::auth::AuthKeys;
use crate::dispatch::SosDispatcher;
use crate::store::{AlertStore, ContactStore, UserDirectory};

/// Shared handles for every request. All fields are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub alerts: Arc<dyn AlertStore>,
    pub contacts: Arc<dyn ContactStore>,
    pub users: Arc<dyn UserDirectory>,
    pub dispatcher: SosDispatcher,
    pub auth: AuthKeys,
    pub alert_history_limit: u64,
}

async fn health_check() -> &'static str {
    "OK"
}

/// API routes without the HTTP middleware stack (tracing, CORS, metrics).
pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/alerts",
            get(api::alerts::list_alerts).post(api::alerts::trigger_alert),
        )
        .route(
            "/alerts/:id",
            get(api::alerts::get_alert)
                .put(api::alerts::update_alert)
                .delete(api::alerts::delete_alert),
        )
        .route(
            "/contacts",
            get(api::contacts::list_contacts).post(api::contacts::create_contact),
        )
        .route(
            "/contacts/:id",
            axum::routing::put(api::contacts::update_contact)
                .delete(api::contacts::delete_contact),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            api::middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .with_state(state)
}
