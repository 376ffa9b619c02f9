use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use redis::Client as RedisClient;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tutorspace_api::{
    config::Config,
    db,
    middleware::auth::JwtSecret,
    routes,
    services::{email::EmailService, geo::GeoService, metrics},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let redis_client = RedisClient::open(config.redis_url.as_str())?;
    let redis_conn = redis_client.get_multiplexed_async_connection().await?;
    info!("Redis connected");

    let email = EmailService::new(&config).map(Arc::new);
    if email.is_some() {
        info!("SMTP email service configured");
    } else {
        info!("SMTP not configured — invoice and reset emails disabled");
    }

    let geo = Arc::new(GeoService::new(config.geocoding_url.clone()));

    metrics::start(pool.clone());

    let state = AppState {
        db: pool,
        redis: redis_conn,
        config: config.clone(),
        email,
        geo,
    };

    // Build CORS: allow the configured app origin; localhost is always
    // allowed for development.
    let base_url = config.app_base_url.clone();
    let cors_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let o = match origin.to_str() {
            Ok(s) => s,
            Err(_) => return false,
        };
        if o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1") {
            return true;
        }
        o == base_url
    });

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_origin(cors_origin);

    let jwt_secret = JwtSecret(config.jwt_secret.clone());
    let media_dir = config.media_dir.clone();

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::metrics::metrics_handler))
        // Auth
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh_token))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/me", get(routes::auth::me))
        .route("/auth/change-password", post(routes::auth::change_password))
        .route("/auth/forgot-password", post(routes::auth::forgot_password))
        .route("/auth/reset-password", post(routes::auth::reset_password))
        // Students (CRM roster)
        .route("/students", get(routes::students::list_students).post(routes::students::create_student))
        .route("/students/import", post(routes::students::import_students))
        .route("/students/{id}", get(routes::students::get_student).put(routes::students::update_student).delete(routes::students::delete_student))
        .route("/students/{id}/dashboard", get(routes::students::student_dashboard))
        .route("/students/{id}/grades", get(routes::grades::list_grades).post(routes::grades::create_grade))
        // Calendar
        .route("/classes", get(routes::classes::list_classes).post(routes::classes::create_class))
        .route("/classes/{id}", put(routes::classes::update_class).delete(routes::classes::delete_class))
        // Billing
        .route("/billing/summary", get(routes::billing::summary))
        .route("/billing/mark-unpaid", post(routes::billing::mark_unpaid))
        .route("/billing/students/{id}/mark-paid", post(routes::billing::mark_paid))
        .route("/billing/students/{id}/invoice", get(routes::billing::download_invoice))
        .route("/billing/students/{id}/invoice/send", post(routes::billing::send_invoice))
        // Grades
        .route("/grades/{id}", put(routes::grades::update_grade).delete(routes::grades::delete_grade))
        // Profile & settings
        .route("/profile", get(routes::profile::get_profile).put(routes::profile::update_profile))
        .route("/profile/avatar", post(routes::profile::upload_avatar))
        // Marketplace & bookings
        .route("/marketplace/teachers", get(routes::marketplace::list_teachers))
        .route("/marketplace/teachers/{id}", get(routes::marketplace::teacher_detail))
        .route("/bookings", get(routes::bookings::list_bookings).post(routes::bookings::create_booking))
        .route("/bookings/{id}/confirm", post(routes::bookings::confirm_booking))
        .route("/bookings/{id}/cancel", post(routes::bookings::cancel_booking))
        .route("/bookings/{id}/complete", post(routes::bookings::complete_booking))
        .route("/bookings/{id}/review", post(routes::bookings::review_booking))
        // Dashboard
        .route("/dashboard", get(routes::dashboard::overview))
        // Geo autocomplete
        .route("/geo/cities", get(routes::geo::search_cities))
        // Stored avatars
        .nest_service("/media", ServeDir::new(media_dir))
        .layer(axum::Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Avatar and roster uploads stay small
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("tutorspace API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
