//! Wallet connection state
//!
//! Mirrors an external wallet provider:
//!
//! ```text
//! Disconnected --connect--> Connecting --ok--> Connected
//!       ^                       |                  |
//!       +-------- failure ------+                  |
//!       +------- disconnect / provider failure ----+
//! ```
//!
//! A second `connect` while one is in flight is rejected with
//! `WalletError::ConnectInProgress` and leaves state alone.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::error::WalletError;
use crate::format::format_address;

// ============================================
// PROVIDER CAPABILITY
// ============================================

/// Account as reported by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub is_connected: bool,
    pub address: Option<String>,
}

/// Opaque handle naming the wallet connector to use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connector {
    pub id: String,
    pub name: String,
}

impl Connector {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectResult {
    pub account: Option<String>,
}

/// What the dashboard needs from a wallet library
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn get_account(&self) -> Account;

    async fn connect(&self, connector: &Connector) -> Result<ConnectResult, WalletError>;

    async fn disconnect(&self) -> Result<(), WalletError>;
}

/// Provider over a fixed, configured address (CLI use)
pub struct StaticWalletProvider {
    address: Option<String>,
    connected: AtomicBool,
}

impl StaticWalletProvider {
    /// A configured address counts as an existing session
    pub fn new(address: Option<String>) -> Self {
        let connected = AtomicBool::new(address.is_some());
        Self { address, connected }
    }
}

#[async_trait]
impl WalletProvider for StaticWalletProvider {
    fn get_account(&self) -> Account {
        let is_connected = self.connected.load(Ordering::SeqCst);
        Account {
            is_connected,
            address: if is_connected { self.address.clone() } else { None },
        }
    }

    async fn connect(&self, _connector: &Connector) -> Result<ConnectResult, WalletError> {
        let address = self
            .address
            .clone()
            .ok_or_else(|| WalletError::Provider("No wallet address configured".to_string()))?;
        self.connected.store(true, Ordering::SeqCst);
        Ok(ConnectResult {
            account: Some(address),
        })
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================
// STATE
// ============================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalletState {
    pub status: ConnectionStatus,
    pub address: Option<String>,
    pub error: Option<String>,
}

impl WalletState {
    fn from_account(account: &Account) -> Self {
        if account.is_connected {
            Self {
                status: ConnectionStatus::Connected,
                address: account.address.clone(),
                error: None,
            }
        } else {
            Self::default()
        }
    }

    pub fn connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    pub fn connecting(&self) -> bool {
        self.status == ConnectionStatus::Connecting
    }

    /// `ABCDEF...WXYZ` for display
    pub fn short_address(&self) -> Option<String> {
        self.address.as_deref().map(|a| format_address(a, 6, 4))
    }
}

fn provider_message(err: &WalletError, fallback: &str) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

pub struct WalletStore {
    provider: Arc<dyn WalletProvider>,
    state: RwLock<WalletState>,
}

impl WalletStore {
    /// Adopts whatever session the provider already holds
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        let account = provider.get_account();
        if account.is_connected {
            info!("Restored wallet session: {:?}", account.address);
        }
        Self {
            state: RwLock::new(WalletState::from_account(&account)),
            provider,
        }
    }

    /// Re-read the provider's account unless a connect is in flight
    pub async fn sync_from_provider(&self) {
        let account = self.provider.get_account();
        let mut state = self.state.write().await;
        if state.connecting() {
            return;
        }
        if account.is_connected {
            state.status = ConnectionStatus::Connected;
            state.address = account.address;
        } else if state.connected() {
            debug!("Provider reports no session; marking wallet disconnected");
            *state = WalletState::default();
        }
    }

    pub async fn connect(&self, connector: &Connector) -> Result<(), WalletError> {
        let previous = {
            let mut state = self.state.write().await;
            if state.connecting() {
                return Err(WalletError::ConnectInProgress);
            }
            let previous = state.clone();
            state.status = ConnectionStatus::Connecting;
            state.error = None;
            previous
        };

        let result = self.provider.connect(connector).await;

        let mut state = self.state.write().await;
        match result {
            Ok(ConnectResult {
                account: Some(address),
            }) => {
                info!("✓ Wallet connected via {}: {}", connector.name, address);
                state.status = ConnectionStatus::Connected;
                state.address = Some(address);
                Ok(())
            }
            Ok(ConnectResult { account: None }) => {
                // Provider finished without an account; nothing changed
                debug!("Connector {} returned no account", connector.name);
                state.status = previous.status;
                state.address = previous.address;
                Ok(())
            }
            Err(e) => {
                error!("Wallet connection failed: {}", e);
                *state = WalletState {
                    status: ConnectionStatus::Disconnected,
                    address: None,
                    error: Some(provider_message(&e, "Connection failed")),
                };
                Err(e)
            }
        }
    }

    pub async fn disconnect(&self) -> Result<(), WalletError> {
        match self.provider.disconnect().await {
            Ok(()) => {
                *self.state.write().await = WalletState::default();
                info!("Wallet disconnected");
                Ok(())
            }
            Err(e) => {
                error!("Wallet disconnection failed: {}", e);
                self.state.write().await.error = Some(provider_message(&e, "Disconnection failed"));
                Err(e)
            }
        }
    }

    /// The provider reported the session is gone
    pub async fn provider_failed(&self, reason: &str) {
        let mut state = self.state.write().await;
        if state.connected() {
            error!("Wallet provider failure: {}", reason);
            *state = WalletState {
                status: ConnectionStatus::Disconnected,
                address: None,
                error: Some(reason.to_string()),
            };
        }
    }

    pub async fn state(&self) -> WalletState {
        self.state.read().await.clone()
    }

    pub async fn address(&self) -> Option<String> {
        self.state.read().await.address.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.state.read().await.connected()
    }

    pub async fn short_address(&self) -> Option<String> {
        self.state.read().await.short_address()
    }
}

// ============================================
// TESTS
// ============================================
