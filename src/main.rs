use {
    axum::extract::DefaultBodyLimit,
    sqlx::postgres::PgPoolOptions,
    std::{env, sync::Arc, time::Duration},
    tokio::{signal, sync::watch},
    tower_http::timeout::TimeoutLayer,
    trip_sync::{
        AppState, ProviderSecrets,
        adapters::{gateway_client::HttpRefundGateway, notify::LogNotifier, routes},
        infra::postgres::PgStore,
        services::retry,
    },
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let secrets = ProviderSecrets {
        card: required_env("CARD_WEBHOOK_SECRET").into(),
        wallet: required_env("WALLET_WEBHOOK_SECRET").into(),
        sms: required_env("SMS_WEBHOOK_SECRET").into(),
        email: required_env("EMAIL_WEBHOOK_SECRET").into(),
    };
    let gateway_timeout = env::var("GATEWAY_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10u64);

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&database_url)
        .await
        .expect("failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    let gateway = HttpRefundGateway::new(
        required_env("CARD_GATEWAY_URL"),
        required_env("WALLET_GATEWAY_URL"),
        required_env("CARD_GATEWAY_API_KEY"),
        required_env("WALLET_GATEWAY_API_KEY"),
        Duration::from_secs(gateway_timeout),
    )
    .expect("failed to build refund gateway client");

    let state = AppState {
        store: Arc::new(PgStore::new(pool)),
        gateway: Arc::new(gateway),
        notifier: Arc::new(LogNotifier),
        secrets: Arc::new(secrets),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tokio::spawn(retry::run_sweeper(state.clone(), shutdown_rx));

    let app = routes(state)
        .layer(DefaultBodyLimit::max(64 * 1024)) // gateway events stay small
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    tracing::info!("listening on 0.0.0.0:3000");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    shutdown_tx.send(true).ok();
    sweeper.await.ok();
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} must be set"))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
