//! vpn-billing server entry point.
//!
//! Wires the configured adapters into the payment webhook route and the
//! reconciliation worker, then serves until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use vpn_billing::adapters::http::{build_router, PaymentAppState, RouterOptions};
use vpn_billing::adapters::http::middleware::IpAllowlist;
use vpn_billing::adapters::{
    PostgresAccountRepository, PostgresPaymentRepository, PostgresReferralRepository,
    PostgresSubscriptionRepository, RedisDedupCache, RemnawaveClient, RemnawaveConfig,
    TelegramConfig, TelegramGateway,
};
use vpn_billing::application::{
    AccountLocks, Ledger, ProcessPaymentWebhookHandler, ReconciliationWorker,
    ReconciliationWorkerConfig, SubscriptionManager,
};
use vpn_billing::config::AppConfig;
use vpn_billing::ports::{
    AccountRepository, DedupCache, NotificationGateway, PaymentRepository, ProvisioningProvider,
    ReferralRepository, SubscriptionRepository,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        vpn_billing::adapters::postgres::run_migrations(&pool).await?;
        tracing::info!("database migrations applied");
    }

    let accounts: Arc<dyn AccountRepository> =
        Arc::new(PostgresAccountRepository::new(pool.clone()));
    let subscriptions: Arc<dyn SubscriptionRepository> =
        Arc::new(PostgresSubscriptionRepository::new(pool.clone()));
    let payments: Arc<dyn PaymentRepository> =
        Arc::new(PostgresPaymentRepository::new(pool.clone()));
    let referrals: Arc<dyn ReferralRepository> =
        Arc::new(PostgresReferralRepository::new(pool.clone()));

    let dedup: Arc<dyn DedupCache> = Arc::new(RedisDedupCache::connect(&config.redis.url).await?);

    let provider: Arc<dyn ProvisioningProvider> = Arc::new(RemnawaveClient::new(
        RemnawaveConfig::new(
            config.provisioning.api_url.clone(),
            config.provisioning.api_key.expose_secret().clone(),
            config.provisioning.squad_id.clone(),
        )
        .with_timeout(config.provisioning.timeout()),
    )?);

    let notifier: Arc<dyn NotificationGateway> = Arc::new(TelegramGateway::new(
        TelegramConfig::new(config.telegram.bot_token.expose_secret().clone())
            .with_api_url(config.telegram.api_url.clone())
            .with_timeout(config.telegram.timeout()),
    )?);

    let locks = AccountLocks::new();
    let ledger = Arc::new(Ledger::new(accounts.clone(), referrals, notifier.clone()));
    let manager = Arc::new(SubscriptionManager::new(
        accounts.clone(),
        subscriptions.clone(),
        provider,
    ));

    let webhook_handler = Arc::new(ProcessPaymentWebhookHandler::new(
        accounts.clone(),
        payments,
        ledger,
        manager.clone(),
        notifier.clone(),
        locks.clone(),
    ));

    let (window_start, window_end) = config.worker.warning_window();
    let worker = ReconciliationWorker::new(accounts, subscriptions, manager, notifier, dedup, locks)
        .with_config(
            ReconciliationWorkerConfig::default()
                .with_interval(config.worker.interval())
                .with_warning_window(window_start, window_end)
                .with_warning_ttl(config.worker.warning_ttl()),
        );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_task = tokio::spawn(async move { worker.run(shutdown_rx).await });

    let allowlist = if config.payment.enforce_ip_allowlist {
        Some(
            IpAllowlist::parse(config.payment.allowed_networks.as_slice())?
                .with_trusted_proxies(config.payment.trusted_proxies.as_slice())?,
        )
    } else {
        None
    };
    let router = build_router(
        PaymentAppState { webhook_handler },
        RouterOptions {
            webhook_path: config.payment.webhook_path.clone(),
            allowlist,
            request_timeout: config.server.request_timeout(),
        },
    );

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        webhook_path = %config.payment.webhook_path,
        ip_allowlist = config.payment.enforce_ip_allowlist,
        trusted_proxies = config.payment.trusted_proxies.len(),
        "vpn-billing listening"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
        }
        tracing::info!("shutdown requested");
        let _ = shutdown_tx.send(true);
    })
    .await?;

    worker_task.await?;
    pool.close().await;
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .pretty()
            .init();
    }
}
