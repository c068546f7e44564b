use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use login_verifier::{
    config::AppConfig,
    infrastructure::{
        configured_password_hasher::ConfiguredPasswordHasher,
        in_memory_credential_repository::InMemoryCredentialRepository,
    },
    presentation::handlers::auth_handler::create_auth_router,
    usecase::verify_usecase::VerifyUsecase,
};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // a missing .env file is fine; the process environment still applies
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;

    let password_hasher =
        ConfiguredPasswordHasher::build(config.hash_algorithm, config.hash_salt.as_deref())?;
    let credential_repository =
        InMemoryCredentialRepository::load(config.registrations, &password_hasher)?;
    if credential_repository.is_empty() {
        warn!("no registrations configured; every login will fail");
    }
    let accounts = credential_repository.len();

    let verify_service =
        VerifyUsecase::new(credential_repository, password_hasher, config.login_delay)?;
    info!(
        accounts,
        algorithm = %config.hash_algorithm,
        delay_ms = u64::try_from(verify_service.delay().as_millis()).unwrap_or(u64::MAX),
        "credential store ready"
    );

    let app = Router::new()
        .route("/", get(|| async { "login-verifier" }))
        .nest("/api", create_auth_router(verify_service));

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
