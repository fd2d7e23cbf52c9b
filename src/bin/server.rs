use std::sync::Arc;

use axum::routing::get;
use careconnect_sos::{
    app::{self, AppState},
    auth::AuthKeys,
    config::Config,
    dispatch::SosDispatcher,
    migrator,
    notifications::{registry::http_client, ChannelRegistry},
    store::DbStore,
};
use sea_orm::Database;

#[tokio::main]
async fn main() {
    // Load .env if present (dotenvy)
    dotenvy::dotenv().ok();

    let config = Config::from_env().expect("Invalid configuration");

    careconnect_sos::telemetry::init_telemetry("careconnect-sos", &config.telemetry)
        .expect("Failed to install OpenTelemetry tracer");

    let metric_handle =
        careconnect_sos::metrics::install_recorder().expect("Failed to install metrics recorder");

    let db = Database::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    use sea_orm_migration::MigratorTrait;
    migrator::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let store = Arc::new(DbStore::new(db));
    careconnect_sos::metrics::init_metrics(store.as_ref()).await;

    let client = http_client().expect("Failed to build HTTP client");
    let channels = ChannelRegistry::from_config(&config.notifications, client)
        .expect("Failed to compile notification templates");
    tracing::info!("Notification channels: {:?}", channels.names());

    let state = AppState {
        alerts: store.clone(),
        contacts: store.clone(),
        users: store.clone(),
        dispatcher: SosDispatcher::new(store.clone(), store.clone(), channels),
        auth: AuthKeys::from_secret(config.jwt_secret.as_bytes()),
        alert_history_limit: config.alert_history_limit,
    };

    let cors_origin = config
        .cors_allowed_origin
        .parse::<axum::http::HeaderValue>()
        .expect("Invalid CORS_ALLOWED_ORIGIN");

    let app = app::router(state)
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<axum::body::Body>| {
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched| matched.as_str());

                    // "METHOD /path", e.g. "POST /alerts"
                    let span_name = if let Some(path) = matched_path {
                        format!("{} {}", request.method(), path)
                    } else {
                        format!("{} {}", request.method(), request.uri().path())
                    };

                    let user_ip = request
                        .headers()
                        .get("x-forwarded-for")
                        .and_then(|v| v.to_str().ok())
                        .or_else(|| {
                            request
                                .headers()
                                .get("x-real-ip")
                                .and_then(|v| v.to_str().ok())
                        })
                        .unwrap_or("unknown");

                    tracing::info_span!(
                        "request",
                        "otel.name" = span_name,
                        user_ip = user_ip,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        // Filled in by the auth middleware and handlers
                        user_id = tracing::field::Empty,
                        alert_id = tracing::field::Empty,
                        action = tracing::field::Empty,
                        error = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency = tracing::field::Empty,
                    )
                })
                .on_request(|_request: &axum::http::Request<axum::body::Body>, _span: &tracing::Span| {
                    // Only the completion line is logged.
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        span.record("status", tracing::field::display(response.status()));
                        span.record("latency", tracing::field::debug(latency));
                        careconnect_sos::metrics::increment_http_requests(response.status().as_u16());

                        tracing::info!("request completed");
                    },
                ),
        )
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(cors_origin)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                ])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                ])
                .allow_credentials(true),
        )
        .route("/metrics", get(|| async move { metric_handle.render() }));

    tracing::info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
