//! Application router.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::health::health;
use super::middleware::{ip_allowlist_middleware, IpAllowlist};
use super::payment::{handle_payment_webhook, PaymentAppState};

/// Options that shape the router.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub webhook_path: String,
    /// When set, only these networks may call the webhook route.
    pub allowlist: Option<IpAllowlist>,
    pub request_timeout: Duration,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            webhook_path: "/yookassa-webhook".to_string(),
            allowlist: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Builds the HTTP surface.
///
/// # Routes
/// - `POST {webhook_path}` - payment notifications (other methods get 405)
/// - `GET /health` - liveness
pub fn build_router(state: PaymentAppState, options: RouterOptions) -> Router {
    let mut webhook = Router::new()
        .route(&options.webhook_path, post(handle_payment_webhook))
        .with_state(state);

    if let Some(allowlist) = options.allowlist {
        webhook = webhook.layer(middleware::from_fn_with_state(
            Arc::new(allowlist),
            ip_allowlist_middleware,
        ));
    }

    Router::new()
        .route("/health", get(health))
        .merge(webhook)
        .layer(TimeoutLayer::new(options.request_timeout))
        .layer(TraceLayer::new_for_http())
}
