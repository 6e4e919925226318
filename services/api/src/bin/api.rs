//! services/api/src/bin/api.rs

use std::sync::Arc;

use api_lib::{
    adapters::{DisabledGenerator, DisabledPayments, JsonFileStore, OpenAiChatAdapter, PgStore, RazorpayPayments},
    config::{Config, StoreBackend},
    error::ApiError,
    web::{router, state::AppState, ApiDoc},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::http::Method;
use habitchat_core::{
    ChatManager, HabitManager, PaymentService, PlanManager, SessionManager, TextGenerationService,
    UserStore,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open the User Store ---
    let store: Arc<dyn UserStore> = match &config.store {
        StoreBackend::Postgres { database_url } => {
            info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let store = PgStore::new(pool);
            store.init_schema().await?;
            info!("Database schema ready.");
            Arc::new(store)
        }
        StoreBackend::JsonFile { path } => {
            info!("Using JSON file store at {}", path.display());
            Arc::new(JsonFileStore::open(path).await?)
        }
    };

    // --- 3. Initialize Collaborator Adapters ---
    // A missing key disables the capability rather than failing startup.
    let generator: Arc<dyn TextGenerationService> = match &config.openai_api_key {
        Some(key) => {
            let openai_config = OpenAIConfig::new().with_api_key(key);
            Arc::new(OpenAiChatAdapter::new(
                Client::with_config(openai_config),
                config.chat_model.clone(),
                config.chat_max_tokens,
                config.chat_temperature,
            ))
        }
        None => {
            warn!("OPENAI_API_KEY is not set; chat generation is disabled");
            Arc::new(DisabledGenerator)
        }
    };

    let payments: Arc<dyn PaymentService> = match &config.payments {
        Some(payment_config) => Arc::new(RazorpayPayments::new(payment_config.clone())),
        None => {
            warn!("Billing credentials are not set; paid plan changes are disabled");
            Arc::new(DisabledPayments)
        }
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        config.clone(),
        SessionManager::new(store.clone()),
        HabitManager::new(store.clone()),
        ChatManager::new(
            store.clone(),
            generator,
            config.quota,
            config.chat_memoize,
        ),
        PlanManager::new(store, payments, config.pricing),
    ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    // --- 5. Create the Web Router ---
    let app = router(app_state)
        .layer(cors)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
