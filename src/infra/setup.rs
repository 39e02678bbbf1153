use crate::{
    adapters::{
        http::app_state::AppState, region::HttpRegionOracle, user_center::HttpUserCenter,
    },
    infra::{
        InfraError, config::AppConfig, http_client::try_build_client, postgres_persistence,
        token_cache::RedisCacheStore,
    },
    use_cases::token_validator::TokenValidator,
};
use std::fs::File;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env()?;

    let cache = Arc::new(RedisCacheStore::connect(&config.redis_url).await?);
    let postgres_arc =
        Arc::new(postgres_persistence(&config.database_url, config.database_max_connections).await?);

    let client = try_build_client().map_err(InfraError::HttpClient)?;
    let user_center = Arc::new(HttpUserCenter::new(
        client.clone(),
        config.user_center_url.clone(),
    ));
    let regions = Arc::new(HttpRegionOracle::new(
        client,
        config.region_oracle_url.clone(),
    ));

    let token_validator = TokenValidator::new(
        cache,
        postgres_arc,
        user_center,
        regions,
        config.client_apps.clone(),
        config.serving_region.clone(),
        config.timeouts,
    );

    info!(
        serving_region = %config.serving_region,
        client_apps = config.client_apps.len(),
        "token validator ready"
    );

    Ok(AppState {
        config: Arc::new(config),
        token_validator: Arc::new(token_validator),
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tokengate=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs); skipped when the file cannot be created.
    let json_layer = match File::create("app.log") {
        Ok(file) => Some(
            fmt::layer()
                .json()
                .with_writer(Arc::new(file))
                .with_current_span(true)
                .with_span_list(true),
        ),
        Err(err) => {
            eprintln!("cannot create app.log, JSON logs disabled: {err}");
            None
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
