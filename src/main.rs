// Bus Walk API v0.1
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod errors;
mod helpers;
mod routes;
mod services;

use config::AppConfig;
use routes::AppState;
use services::open_meteo::OpenMeteoClient;
use services::publisher::{
    default_cadences, PublisherContext, PublisherState, SharedPublisherState,
};

/// Bus Walk API OpenAPI document.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bus Walk API",
        version = "0.1.0",
        description = "Which bus to catch after a 13:00 class at London Aquatics Centre. \
            Builds the day's timetables for routes 108 and 339, estimates the walk to \
            the stop from Open-Meteo's current weather, and recommends the first trip \
            that can still be reached. The same data is kept retained on MQTT topics \
            for AR displays.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Timetable", description = "Route timetables and the day plan"),
        (name = "Walk", description = "Weather-adjusted walking time"),
        (name = "Publisher", description = "Background MQTT publisher status"),
    ),
    paths(
        routes::health::health_check,
        routes::timetable::get_timetable,
        routes::day_plan::get_day_plan,
        routes::walk::get_current_walk,
        routes::walk::get_walk_history,
        routes::publisher::get_publisher_status,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            services::timetable::Route,
            services::timetable::Trip,
            services::walk_model::WeatherCondition,
            services::walk_model::WeatherSample,
            services::walk_model::DailyWalkRecord,
            services::walk_model::WalkHistory,
            services::publisher::PublisherState,
            services::publisher::ArtifactStatus,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bus_walk_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // Open-Meteo client shared by the publisher and the HTTP handlers
    let weather = OpenMeteoClient::new(
        &config.open_meteo_url,
        config.weather_location.clone(),
        config.weather_timeout,
    );

    // MQTT: the event loop reports connection state, the publisher waits on it
    let (connected_tx, connected_rx) = watch::channel(false);
    let (sink, eventloop) = services::mqtt::connect(&config.mqtt, connected_rx.clone());
    tokio::spawn(services::mqtt::drive_event_loop(eventloop, connected_tx));
    tracing::info!(
        "Connecting to MQTT broker {}:{} as {}",
        config.mqtt.host,
        config.mqtt.port,
        config.mqtt.client_id
    );

    let publisher_state: SharedPublisherState = Arc::new(RwLock::new(PublisherState::new()));
    tokio::spawn(services::publisher::run_publisher(
        PublisherContext {
            weather: weather.clone(),
            topics: config.topics.clone(),
            walk_history_days: config.cadence.walk_history_days,
        },
        sink,
        default_cadences(&config.cadence),
        publisher_state.clone(),
        connected_rx,
    ));

    // CORS: read-only API, restrict methods to GET
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);

    // Build router
    // On-demand routes use AppState; health and status read the publisher state.
    let api_routes = Router::new()
        .route(
            "/api/timetable/:route",
            get(routes::timetable::get_timetable),
        )
        .route("/api/day-plan", get(routes::day_plan::get_day_plan))
        .route("/api/current-walk", get(routes::walk::get_current_walk))
        .route("/api/walk-history", get(routes::walk::get_walk_history))
        .with_state(AppState { weather });

    let status_routes = Router::new()
        .route("/api/health", get(routes::health::health_check))
        .route(
            "/api/publisher/status",
            get(routes::publisher::get_publisher_status),
        )
        .with_state(publisher_state);

    let app = Router::new()
        .merge(api_routes)
        .merge(status_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
