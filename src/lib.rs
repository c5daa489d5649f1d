pub mod adapters;
pub mod domain;
pub mod infra;
pub mod services;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use std::sync::Arc;

use crate::domain::{
    event::Provider,
    gateway::{NotificationDispatch, RefundGateway},
    store::Store,
};

/// Per-provider webhook signing secrets.
#[derive(Clone)]
pub struct ProviderSecrets {
    pub card: Arc<str>,
    pub wallet: Arc<str>,
    pub sms: Arc<str>,
    pub email: Arc<str>,
}

impl ProviderSecrets {
    pub fn for_provider(&self, provider: Provider) -> &str {
        match provider {
            Provider::CardGateway => &self.card,
            Provider::WalletGateway => &self.wallet,
            Provider::SmsProvider => &self.sms,
            Provider::EmailProvider => &self.email,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub gateway: Arc<dyn RefundGateway>,
    pub notifier: Arc<dyn NotificationDispatch>,
    pub secrets: Arc<ProviderSecrets>,
}
