//! First-run onboarding and risk disclosure
//!
//! Flags live in a `KeyValueStore` under `<prefix>_onboarding_completed`,
//! `<prefix>_onboarding_skipped` and `<prefix>_risk_acknowledged`.
//!
//! Risk acknowledgments expire after a validity window. A stored record that
//! cannot be read counts as no acknowledgment: the disclosure is shown again.

pub mod storage;

pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::constants::defaults;
use crate::error::StorageError;

pub const RISK_ACK_VERSION: &str = "1.0";

// ============================================
// SETTINGS & KEYS
// ============================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub completed: String,
    pub skipped: String,
    pub risk_acknowledged: String,
}

impl StorageKeys {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            completed: format!("{}_onboarding_completed", prefix),
            skipped: format!("{}_onboarding_skipped", prefix),
            risk_acknowledged: format!("{}_risk_acknowledged", prefix),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OnboardingSettings {
    pub keys: StorageKeys,
    /// Wait before the welcome modal appears
    pub welcome_delay: Duration,
    pub risk_ack_validity: ChronoDuration,
}

impl OnboardingSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            keys: StorageKeys::with_prefix(&config.storage_prefix),
            welcome_delay: Duration::from_millis(config.welcome_delay_ms),
            risk_ack_validity: ChronoDuration::days(
                config
                    .risk_ack_validity_days
                    .clamp(1, defaults::MAX_RISK_ACK_VALIDITY_DAYS),
            ),
        }
    }
}

impl Default for OnboardingSettings {
    fn default() -> Self {
        Self {
            keys: StorageKeys::with_prefix("lavarage"),
            welcome_delay: Duration::from_millis(1000),
            risk_ack_validity: ChronoDuration::days(30),
        }
    }
}

// ============================================
// RECORDS & STATE
// ============================================

/// Persisted acknowledgment, `timestamp` in milliseconds since the epoch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAcknowledgment {
    pub timestamp: i64,
    #[serde(default)]
    pub version: String,
}

/// Outcome of inspecting the stored acknowledgment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskCheck {
    Missing,
    Valid,
    Expired,
    /// Stored value is not a readable record
    Corrupt,
}

impl RiskCheck {
    pub fn requires_disclosure(&self) -> bool {
        !matches!(self, RiskCheck::Valid)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingState {
    pub show_welcome_modal: bool,
    pub show_risk_disclosure: bool,
    pub onboarding_completed: bool,
    pub risk_acknowledged: bool,
}

/// Known analytics event names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingEvent {
    WelcomeModalShown,
    WelcomeModalCompleted,
    WelcomeModalSkipped,
    RiskDisclosureShown,
    RiskDisclosureAccepted,
    FaqViewed,
    HowItWorksViewed,
}

impl OnboardingEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnboardingEvent::WelcomeModalShown => "welcome_modal_shown",
            OnboardingEvent::WelcomeModalCompleted => "welcome_modal_completed",
            OnboardingEvent::WelcomeModalSkipped => "welcome_modal_skipped",
            OnboardingEvent::RiskDisclosureShown => "risk_disclosure_shown",
            OnboardingEvent::RiskDisclosureAccepted => "risk_disclosure_accepted",
            OnboardingEvent::FaqViewed => "faq_viewed",
            OnboardingEvent::HowItWorksViewed => "how_it_works_viewed",
        }
    }
}

/// Analytics hook. Currently only logged.
pub fn track_event(name: &str, payload: Option<&Value>) {
    match payload {
        Some(data) => info!(event = name, data = %data, "Onboarding event"),
        None => info!(event = name, "Onboarding event"),
    }
}

// ============================================
// STORE
// ============================================

pub struct OnboardingStore {
    storage: Arc<dyn KeyValueStore>,
    settings: OnboardingSettings,
    state: Arc<RwLock<OnboardingState>>,
}

impl OnboardingStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, settings: OnboardingSettings) -> Self {
        Self {
            storage,
            settings,
            state: Arc::new(RwLock::new(OnboardingState::default())),
        }
    }

    /// Load persisted flags into memory; returns whether onboarding is done
    pub async fn check_status(&self) -> bool {
        let keys = &self.settings.keys;
        let completed = self.storage.get(&keys.completed).as_deref() == Some("true");
        let skipped = self.storage.get(&keys.skipped).as_deref() == Some("true");
        let risk = self.storage.get(&keys.risk_acknowledged).is_some();

        let mut state = self.state.write().await;
        state.onboarding_completed = completed || skipped;
        state.risk_acknowledged = risk;
        state.onboarding_completed
    }

    /// Schedule the welcome modal for users who have not finished onboarding.
    /// Returns the handle of the scheduled task, if any.
    pub async fn initialize(&self) -> Option<JoinHandle<()>> {
        if self.check_status().await {
            debug!("Onboarding already completed");
            return None;
        }

        let state = self.state.clone();
        let delay = self.settings.welcome_delay;
        Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = state.write().await;
            if state.onboarding_completed {
                debug!("Onboarding finished during the welcome delay");
                return;
            }
            state.show_welcome_modal = true;
            track_event(OnboardingEvent::WelcomeModalShown.as_str(), None);
        }))
    }

    /// Inspect the stored acknowledgment against `now`
    pub fn risk_check_at(&self, now: DateTime<Utc>) -> RiskCheck {
        let Some(raw) = self.storage.get(&self.settings.keys.risk_acknowledged) else {
            return RiskCheck::Missing;
        };

        match serde_json::from_str::<RiskAcknowledgment>(&raw) {
            Ok(record) => {
                let cutoff = (now - self.settings.risk_ack_validity).timestamp_millis();
                if record.timestamp < cutoff {
                    RiskCheck::Expired
                } else {
                    RiskCheck::Valid
                }
            }
            Err(e) => {
                warn!("Unreadable risk acknowledgment ({}); showing disclosure again", e);
                RiskCheck::Corrupt
            }
        }
    }

    pub fn should_show_risk_disclosure(&self) -> bool {
        self.risk_check_at(Utc::now()).requires_disclosure()
    }

    pub async fn trigger_risk_disclosure(&self) {
        self.state.write().await.show_risk_disclosure = true;
        track_event(OnboardingEvent::RiskDisclosureShown.as_str(), None);
    }

    pub async fn complete(&self) -> Result<(), StorageError> {
        self.storage.set(&self.settings.keys.completed, "true")?;
        let mut state = self.state.write().await;
        state.onboarding_completed = true;
        state.show_welcome_modal = false;
        track_event(OnboardingEvent::WelcomeModalCompleted.as_str(), None);
        Ok(())
    }

    pub async fn skip(&self) -> Result<(), StorageError> {
        self.storage.set(&self.settings.keys.skipped, "true")?;
        let mut state = self.state.write().await;
        state.onboarding_completed = true;
        state.show_welcome_modal = false;
        track_event(OnboardingEvent::WelcomeModalSkipped.as_str(), None);
        Ok(())
    }

    pub async fn acknowledge_risk(&self) -> Result<(), StorageError> {
        let record = RiskAcknowledgment {
            timestamp: Utc::now().timestamp_millis(),
            version: RISK_ACK_VERSION.to_string(),
        };
        self.storage
            .set(&self.settings.keys.risk_acknowledged, &serde_json::to_string(&record)?)?;

        let mut state = self.state.write().await;
        state.risk_acknowledged = true;
        state.show_risk_disclosure = false;
        track_event(OnboardingEvent::RiskDisclosureAccepted.as_str(), None);
        Ok(())
    }

    /// Forget everything persisted
    pub async fn reset(&self) -> Result<(), StorageError> {
        let keys = &self.settings.keys;
        self.storage.remove(&keys.completed)?;
        self.storage.remove(&keys.skipped)?;
        self.storage.remove(&keys.risk_acknowledged)?;

        let mut state = self.state.write().await;
        state.onboarding_completed = false;
        state.risk_acknowledged = false;
        Ok(())
    }

    pub async fn state(&self) -> OnboardingState {
        *self.state.read().await
    }
}
