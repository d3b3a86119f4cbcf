use std::sync::Arc;
use backend::{
    build_rocket,
    config::AppConfig,
    mailer::{LogMailer, Mailer, ResendMailer},
    pg_store::PgStore,
    store::{Stores, TallyStore},
    utils::SystemClock,
};
use shuttle_runtime::CustomError;
use sqlx::PgPool;
use tracing::{info, warn};

#[shuttle_runtime::main]
async fn rocket(
    #[shuttle_shared_db::Postgres] pool: PgPool,
    #[shuttle_runtime::Secrets] secret_store: shuttle_runtime::SecretStore,
) -> shuttle_rocket::ShuttleRocket {
    info!("🚀 Starting voting server");

    let config = AppConfig::from_lookup(|key| secret_store.get(key)).map_err(CustomError::new)?;
    info!(
        "🗳️ Election \"{}\" v{} with {} positions",
        config.election.title,
        config.election.version,
        config.election.positions.len()
    );

    let mailer: Arc<dyn Mailer> = match &config.resend_api_key {
        Some(api_key) => Arc::new(ResendMailer::new(api_key.clone(), config.mail_from.clone()).map_err(CustomError::new)?),
        None => {
            warn!("RESEND_API_KEY not found - emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    if config.admin_token.is_none() {
        warn!("ADMIN_TOKEN not found - admin routes will be disabled");
    }

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(CustomError::new)?;

    info!("📋 Migrations complete");

    let store = Arc::new(PgStore::new(pool));
    store.seed(&config.election).await.map_err(CustomError::new)?;

    let rocket = build_rocket(&config, Stores::from_backend(store), mailer, Arc::new(SystemClock));

    Ok(rocket.into())
}
