//! Application context
//!
//! Owns one instance of each state container. Build it once at startup and
//! pass it by reference; nothing here is global.

use eyre::Result;
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::{LenderApi, LenderBackend};
use crate::config::Config;
use crate::onboarding::{JsonFileStore, KeyValueStore, OnboardingSettings, OnboardingStore};
use crate::sync::{LenderSummary, LenderStore};
use crate::wallet::{StaticWalletProvider, WalletProvider, WalletStore};

pub struct AppContext {
    config: Config,
    lender: LenderStore,
    wallet: WalletStore,
    onboarding: OnboardingStore,
}

impl AppContext {
    pub fn new(
        config: Config,
        backend: Arc<dyn LenderBackend>,
        wallet_provider: Arc<dyn WalletProvider>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Self {
        let lender = LenderStore::new(backend, config.stale_policy);
        let wallet = WalletStore::new(wallet_provider);
        let onboarding = OnboardingStore::new(storage, OnboardingSettings::from_config(&config));

        Self {
            config,
            lender,
            wallet,
            onboarding,
        }
    }

    /// Wire the HTTP backend, the configured wallet and on-disk storage
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;

        let backend = Arc::new(LenderApi::new(&config)?);
        let wallet = Arc::new(StaticWalletProvider::new(config.wallet_address.clone()));
        let storage = Arc::new(JsonFileStore::open(&config.storage_path)?);
        debug!("Onboarding storage at {}", storage.path().display());

        Ok(Self::new(config, backend, wallet, storage))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn lender(&self) -> &LenderStore {
        &self.lender
    }

    pub fn wallet(&self) -> &WalletStore {
        &self.wallet
    }

    pub fn onboarding(&self) -> &OnboardingStore {
        &self.onboarding
    }

    /// Fetch every lender resource for the connected wallet.
    /// Without a connected wallet this is a no-op.
    pub async fn refresh(&self) -> LenderSummary {
        let wallet = self.wallet.address().await;
        match wallet.as_deref() {
            Some(address) => info!("Refreshing lender data for {}", address),
            None => debug!("No wallet connected; skipping refresh"),
        }

        self.lender
            .refresh_all(wallet.as_deref(), Some(self.config.quote_token.as_str()))
            .await;
        self.lender.summary().await
    }
}
