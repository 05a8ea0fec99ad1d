//! Lender data synchronization
//!
//! One container owns the cached offers, positions, pool balance and
//! liquidation proceeds of the active wallet. Each fetch:
//!
//! 1. Returns immediately when its arguments are absent
//! 2. Marks its kind loading and clears the shared error
//! 3. Replaces that kind's snapshot wholesale on success, or records the
//!    error and keeps the old snapshot on failure
//! 4. Clears its loading flag either way
//!
//! Responses superseded by a newer request for the same kind are dropped
//! under `StalePolicy::LatestIssued`.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::aggregates::{self, LenderSummary};
use super::resource::{LoadingFlags, RequestSequencer, ResourceKind, StalePolicy};
use crate::api::{
    LenderBackend, LiquidationProceed, LiquidationSource, Offer, PoolBalance, Position,
    PositionFilter,
};
use crate::constants::{ApiEndpoint, ProcessingStatus};
use crate::error::ApiError;

/// Snapshot of everything the container caches
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LenderState {
    pub offers: Vec<Offer>,
    pub positions: Vec<Position>,
    pub pool_balance: Option<PoolBalance>,
    pub liquidation_proceeds: Vec<LiquidationProceed>,
    pub loading: LoadingFlags,
    pub error: Option<String>,
    /// Liquidation ids changed locally and not yet confirmed by a fetch
    pub pending_status_updates: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct Inner {
    state: LenderState,
    sequencer: RequestSequencer,
}

/// Treat `Some("")` the same as `None`
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub struct LenderStore {
    backend: Arc<dyn LenderBackend>,
    policy: StalePolicy,
    inner: RwLock<Inner>,
}

impl LenderStore {
    pub fn new(backend: Arc<dyn LenderBackend>, policy: StalePolicy) -> Self {
        Self {
            backend,
            policy,
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn stale_policy(&self) -> StalePolicy {
        self.policy
    }

    /// Stub liquidation data is reported here so callers can label it
    pub fn liquidation_source(&self) -> LiquidationSource {
        self.backend.liquidation_source()
    }

    // ============================================
    // FETCH CORE
    // ============================================

    /// Run one fetch of `kind` and fold its outcome into state
    async fn sync_resource<T, Fut, F>(&self, kind: ResourceKind, request: Fut, apply: F)
    where
        Fut: Future<Output = Result<T, ApiError>>,
        F: FnOnce(&mut LenderState, T),
    {
        let token = {
            let mut inner = self.inner.write().await;
            let token = inner.sequencer.issue(kind);
            inner.state.loading.set(kind, true);
            inner.state.error = None;
            token
        };

        // No lock held while the request is in flight
        let result = request.await;

        let mut inner = self.inner.write().await;
        if self.policy == StalePolicy::LatestIssued && !inner.sequencer.is_latest(token) {
            debug!("Discarding stale {} response (request #{})", kind, token.seq);
            return;
        }

        match result {
            Ok(value) => {
                apply(&mut inner.state, value);
                inner.state.error = None;
            }
            Err(e) => {
                error!("Error fetching {}: {}", kind, e);
                inner.state.error = Some(e.to_string());
            }
        }
        inner.state.loading.set(kind, false);
    }

    pub async fn fetch_offers(&self, wallet: Option<&str>) {
        let Some(wallet) = present(wallet) else {
            return;
        };

        self.sync_resource(
            ResourceKind::Offers,
            self.backend.lender_offers(wallet),
            |state, offers: Vec<Offer>| {
                info!("Loaded {} offers", offers.len());
                state.offers = offers;
            },
        )
        .await;
    }

    pub async fn fetch_positions(&self, wallet: Option<&str>, filter: PositionFilter) {
        let Some(wallet) = present(wallet) else {
            return;
        };

        self.sync_resource(
            ResourceKind::Positions,
            self.backend.lender_positions(wallet, filter),
            |state, positions: Vec<Position>| {
                info!("Loaded {} positions (status={})", positions.len(), filter);
                state.positions = positions;
            },
        )
        .await;
    }

    pub async fn fetch_pool_balance(&self, wallet: Option<&str>, quote_token: Option<&str>) {
        let (Some(wallet), Some(quote_token)) = (present(wallet), present(quote_token)) else {
            return;
        };

        self.sync_resource(
            ResourceKind::PoolBalance,
            self.backend.pool_balance(wallet, quote_token),
            |state, balance: PoolBalance| {
                debug!("Pool balance: {:?}", balance.balance);
                state.pool_balance = Some(balance);
            },
        )
        .await;
    }

    pub async fn fetch_liquidation_proceeds(&self, wallet: Option<&str>) {
        let Some(wallet) = present(wallet) else {
            return;
        };

        self.sync_resource(
            ResourceKind::LiquidationProceeds,
            self.backend.liquidation_proceeds(wallet),
            |state, proceeds: Vec<LiquidationProceed>| {
                info!("Loaded {} liquidation proceeds", proceeds.len());
                state.liquidation_proceeds = proceeds;
                // An authoritative snapshot supersedes optimistic edits
                state.pending_status_updates.clear();
            },
        )
        .await;
    }

    /// Fetch every resource for `wallet` concurrently
    pub async fn refresh_all(&self, wallet: Option<&str>, quote_token: Option<&str>) {
        futures::join!(
            self.fetch_offers(wallet),
            self.fetch_positions(wallet, PositionFilter::All),
            self.fetch_pool_balance(wallet, quote_token),
            self.fetch_liquidation_proceeds(wallet),
        );
    }

    // ============================================
    // MUTATIONS
    // ============================================

    async fn submit<P: Serialize + ?Sized>(
        &self,
        endpoint: ApiEndpoint,
        action: &str,
        payload: &P,
    ) -> Result<Value, ApiError> {
        let body = serde_json::to_value(payload).map_err(|e| {
            error!("Error {}: {}", action, e);
            ApiError::Decode(e.to_string())
        })?;

        match self.backend.mutate(endpoint, body).await {
            Ok(reply) => {
                info!("✓ {} succeeded", action);
                Ok(reply)
            }
            Err(e) => {
                error!("Error {}: {}", action, e);
                Err(e)
            }
        }
    }

    pub async fn create_offer<P: Serialize + ?Sized>(&self, payload: &P) -> Result<Value, ApiError> {
        self.submit(ApiEndpoint::CreateOffer, "creating offer", payload).await
    }

    pub async fn update_offer<P: Serialize + ?Sized>(&self, payload: &P) -> Result<Value, ApiError> {
        self.submit(ApiEndpoint::UpdateOffer, "updating offer", payload).await
    }

    pub async fn change_ltv<P: Serialize + ?Sized>(&self, payload: &P) -> Result<Value, ApiError> {
        self.submit(ApiEndpoint::ChangeLtv, "changing LTV", payload).await
    }

    pub async fn create_deposit_transaction<P: Serialize + ?Sized>(
        &self,
        payload: &P,
    ) -> Result<Value, ApiError> {
        self.submit(ApiEndpoint::Deposit, "creating deposit transaction", payload)
            .await
    }

    pub async fn create_withdrawal_transaction<P: Serialize + ?Sized>(
        &self,
        payload: &P,
    ) -> Result<Value, ApiError> {
        self.submit(ApiEndpoint::Withdraw, "creating withdrawal transaction", payload)
            .await
    }

    /// Optimistically set a liquidation record's status in the local cache.
    ///
    /// Nothing is sent to the server. The id stays in
    /// `pending_status_updates` until the next successful
    /// `fetch_liquidation_proceeds` replaces the snapshot. Returns whether a
    /// record matched.
    pub async fn update_liquidation_status(&self, id: &str, status: ProcessingStatus) -> bool {
        let mut inner = self.inner.write().await;
        let state = &mut inner.state;

        let Some(record) = state.liquidation_proceeds.iter_mut().find(|p| p.id == id) else {
            warn!("No liquidation proceed with id {} to update", id);
            return false;
        };

        info!("Optimistic update: liquidation {} -> {} (not persisted)", id, status);
        record.processing_status = status;
        state.pending_status_updates.insert(id.to_string());
        true
    }

    // ============================================
    // READS & DERIVED VIEWS
    // ============================================

    pub async fn snapshot(&self) -> LenderState {
        self.inner.read().await.state.clone()
    }

    pub async fn offers(&self) -> Vec<Offer> {
        self.inner.read().await.state.offers.clone()
    }

    pub async fn positions(&self) -> Vec<Position> {
        self.inner.read().await.state.positions.clone()
    }

    pub async fn pool_balance(&self) -> Option<PoolBalance> {
        self.inner.read().await.state.pool_balance.clone()
    }

    pub async fn liquidation_proceeds(&self) -> Vec<LiquidationProceed> {
        self.inner.read().await.state.liquidation_proceeds.clone()
    }

    pub async fn loading(&self) -> LoadingFlags {
        self.inner.read().await.state.loading
    }

    pub async fn error(&self) -> Option<String> {
        self.inner.read().await.state.error.clone()
    }

    pub async fn total_active_offers(&self) -> usize {
        aggregates::total_active_offers(&self.inner.read().await.state.offers)
    }

    pub async fn total_liquidity(&self) -> f64 {
        aggregates::total_liquidity(&self.inner.read().await.state.offers)
    }

    pub async fn total_utilization(&self) -> f64 {
        aggregates::total_utilization(&self.inner.read().await.state.offers)
    }

    pub async fn active_positions(&self) -> Vec<Position> {
        aggregates::active_positions(&self.inner.read().await.state.positions)
    }

    pub async fn summary(&self) -> LenderSummary {
        let inner = self.inner.read().await;
        let state = &inner.state;

        LenderSummary {
            total_offers: state.offers.len(),
            total_active_offers: aggregates::total_active_offers(&state.offers),
            total_liquidity: aggregates::total_liquidity(&state.offers),
            total_utilization: aggregates::total_utilization(&state.offers),
            utilization_rate: aggregates::overall_utilization_rate(&state.offers),
            total_positions: state.positions.len(),
            active_positions: state.positions.iter().filter(|p| p.is_active()).count(),
            pool_balance: state.pool_balance.clone(),
            liquidation_count: state.liquidation_proceeds.len(),
            loading: state.loading,
            error: state.error.clone(),
        }
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::sample::sample_liquidation_proceeds;
    use crate::constants::PositionStatus;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    /// A reply is either ready or released later by the test
    enum Reply<T> {
        Ready(Result<T, ApiError>),
        Gated(oneshot::Receiver<Result<T, ApiError>>),
    }

    impl<T> Reply<T> {
        async fn resolve(self) -> Result<T, ApiError> {
            match self {
                Reply::Ready(result) => result,
                Reply::Gated(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(ApiError::Transport("gate dropped".into()))),
            }
        }
    }

    struct Script<T> {
        replies: Mutex<VecDeque<Reply<T>>>,
        calls: AtomicUsize,
    }

    impl<T> Default for Script<T> {
        fn default() -> Self {
            Self {
                replies: Mutex::new(VecDeque::new()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl<T> Script<T> {
        fn push(&self, result: Result<T, ApiError>) {
            self.replies.lock().unwrap().push_back(Reply::Ready(result));
        }

        fn gate(&self) -> oneshot::Sender<Result<T, ApiError>> {
            let (tx, rx) = oneshot::channel();
            self.replies.lock().unwrap().push_back(Reply::Gated(rx));
            tx
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn next(&self) -> Result<T, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self.replies.lock().unwrap().pop_front();
            match reply {
                Some(reply) => reply.resolve().await,
                None => Err(ApiError::Transport("no scripted reply".into())),
            }
        }
    }

    #[derive(Default)]
    struct ScriptedBackend {
        offers: Script<Vec<Offer>>,
        positions: Script<Vec<Position>>,
        balance: Script<PoolBalance>,
        liquidations: Script<Vec<LiquidationProceed>>,
        mutations: Script<Value>,
        last_mutation: Mutex<Option<(ApiEndpoint, Value)>>,
    }

    #[async_trait]
    impl LenderBackend for ScriptedBackend {
        async fn lender_offers(&self, _wallet: &str) -> Result<Vec<Offer>, ApiError> {
            self.offers.next().await
        }

        async fn lender_positions(
            &self,
            _wallet: &str,
            _filter: PositionFilter,
        ) -> Result<Vec<Position>, ApiError> {
            self.positions.next().await
        }

        async fn pool_balance(&self, _wallet: &str, _quote: &str) -> Result<PoolBalance, ApiError> {
            self.balance.next().await
        }

        async fn liquidation_proceeds(
            &self,
            _wallet: &str,
        ) -> Result<Vec<LiquidationProceed>, ApiError> {
            self.liquidations.next().await
        }

        async fn mutate(&self, endpoint: ApiEndpoint, body: Value) -> Result<Value, ApiError> {
            *self.last_mutation.lock().unwrap() = Some((endpoint, body));
            self.mutations.next().await
        }
    }

    fn store(policy: StalePolicy) -> (Arc<ScriptedBackend>, Arc<LenderStore>) {
        let backend = Arc::new(ScriptedBackend::default());
        let store = Arc::new(LenderStore::new(backend.clone(), policy));
        (backend, store)
    }

    fn offer(id: &str, active: bool, max: &str) -> Offer {
        Offer {
            id: id.into(),
            active,
            max_exposure: Some(max.into()),
            ..Default::default()
        }
    }

    async fn wait_for_calls<T>(script: &Script<T>, n: usize) {
        for _ in 0..1000 {
            if script.calls() >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("backend never reached {} calls", n);
    }

    #[tokio::test]
    async fn test_absent_wallet_makes_no_request() {
        let (backend, store) = store(StalePolicy::LatestIssued);

        store.fetch_offers(None).await;
        store.fetch_offers(Some("")).await;
        store.fetch_positions(Some("  "), PositionFilter::All).await;
        store.fetch_pool_balance(Some("walletA"), None).await;
        store.fetch_pool_balance(None, Some("SOL")).await;
        store.fetch_liquidation_proceeds(None).await;

        assert_eq!(backend.offers.calls(), 0);
        assert_eq!(backend.positions.calls(), 0);
        assert_eq!(backend.balance.calls(), 0);
        assert_eq!(backend.liquidations.calls(), 0);
        assert_eq!(store.snapshot().await, LenderState::default());
    }

    #[tokio::test]
    async fn test_success_replaces_snapshot_wholesale() {
        let (backend, store) = store(StalePolicy::LatestIssued);
        backend.offers.push(Ok(vec![offer("o1", true, "10"), offer("o2", false, "20")]));
        backend.offers.push(Ok(vec![offer("o3", true, "5")]));

        store.fetch_offers(Some("walletA")).await;
        assert_eq!(store.offers().await.len(), 2);

        store.fetch_offers(Some("walletA")).await;
        let offers = store.offers().await;
        assert_eq!(offers, vec![offer("o3", true, "5")]);
        assert!(!store.loading().await.offers);
        assert_eq!(store.error().await, None);
    }

    #[tokio::test]
    async fn test_http_500_keeps_snapshot_and_records_status() {
        let (backend, store) = store(StalePolicy::LatestIssued);
        backend.offers.push(Err(ApiError::Http { status: 500 }));

        store.fetch_offers(Some("walletA")).await;

        assert!(store.offers().await.is_empty());
        assert!(store.error().await.unwrap().contains("500"));
        assert!(!store.loading().await.offers);
    }

    #[tokio::test]
    async fn test_failure_preserves_previous_snapshot() {
        let (backend, store) = store(StalePolicy::LatestIssued);
        backend.positions.push(Ok(vec![Position::new("p1", PositionStatus::Active)]));
        backend.positions.push(Err(ApiError::Transport("connection reset".into())));

        store.fetch_positions(Some("walletA"), PositionFilter::All).await;
        store.fetch_positions(Some("walletA"), PositionFilter::All).await;

        assert_eq!(store.positions().await.len(), 1);
        assert!(store.error().await.unwrap().contains("connection reset"));
        assert!(!store.loading().await.positions);
    }

    #[tokio::test]
    async fn test_loading_flag_set_only_for_inflight_kind() {
        let (backend, store) = store(StalePolicy::LatestIssued);
        let gate = backend.balance.gate();

        let task = {
            let store = store.clone();
            tokio::spawn(async move { store.fetch_pool_balance(Some("walletA"), Some("SOL")).await })
        };
        wait_for_calls(&backend.balance, 1).await;

        let loading = store.loading().await;
        assert!(loading.pool_balance);
        assert!(!loading.offers && !loading.positions && !loading.liquidation_proceeds);

        gate.send(Ok(PoolBalance {
            balance: Some("42".into()),
            ..Default::default()
        }))
        .unwrap();
        task.await.unwrap();

        assert!(!store.loading().await.pool_balance);
        assert_eq!(store.pool_balance().await.unwrap().balance_value(), 42.0);
    }

    /// Issue two position fetches, then answer the second before the first
    async fn race_positions(policy: StalePolicy) -> (Vec<Position>, LoadingFlags) {
        let (backend, store) = store(policy);
        let first_gate = backend.positions.gate();
        let second_gate = backend.positions.gate();

        let first = {
            let store = store.clone();
            tokio::spawn(async move { store.fetch_positions(Some("walletA"), PositionFilter::All).await })
        };
        wait_for_calls(&backend.positions, 1).await;

        let second = {
            let store = store.clone();
            tokio::spawn(async move { store.fetch_positions(Some("walletA"), PositionFilter::All).await })
        };
        wait_for_calls(&backend.positions, 2).await;

        second_gate
            .send(Ok(vec![Position::new("fresh", PositionStatus::Active)]))
            .unwrap();
        second.await.unwrap();

        first_gate
            .send(Ok(vec![Position::new("stale", PositionStatus::Closed)]))
            .unwrap();
        first.await.unwrap();

        (store.positions().await, store.loading().await)
    }

    #[tokio::test]
    async fn test_last_arrival_policy_lets_late_response_win() {
        let (positions, loading) = race_positions(StalePolicy::LastArrival).await;
        assert_eq!(positions[0].id, "stale");
        assert!(!loading.positions);
    }

    #[tokio::test]
    async fn test_latest_issued_policy_discards_stale_response() {
        let (positions, loading) = race_positions(StalePolicy::LatestIssued).await;
        assert_eq!(positions[0].id, "fresh");
        assert!(!loading.positions);
    }

    #[tokio::test]
    async fn test_new_fetch_clears_previous_error() {
        let (backend, store) = store(StalePolicy::LatestIssued);
        backend.offers.push(Err(ApiError::Http { status: 503 }));
        backend.positions.push(Ok(vec![]));

        store.fetch_offers(Some("walletA")).await;
        assert!(store.error().await.is_some());

        store.fetch_positions(Some("walletA"), PositionFilter::All).await;
        assert_eq!(store.error().await, None);
    }

    #[tokio::test]
    async fn test_derived_views_follow_snapshot() {
        let (backend, store) = store(StalePolicy::LatestIssued);
        backend.offers.push(Ok(vec![
            offer("a", true, "100"),
            offer("b", false, "bad"),
            offer("c", true, "50"),
        ]));
        backend.positions.push(Ok(vec![
            Position::new("p1", PositionStatus::Active),
            Position::new("p2", PositionStatus::Sold),
        ]));

        store.fetch_offers(Some("walletA")).await;
        store.fetch_positions(Some("walletA"), PositionFilter::All).await;

        assert_eq!(store.total_active_offers().await, 2);
        assert_eq!(store.total_liquidity().await, 150.0);
        assert_eq!(store.total_utilization().await, 0.0);
        assert_eq!(store.active_positions().await.len(), 1);

        let summary = store.summary().await;
        assert_eq!(summary.total_offers, 3);
        assert_eq!(summary.total_positions, 2);
        assert_eq!(summary.active_positions, 1);
    }

    #[tokio::test]
    async fn test_mutation_error_propagates_without_touching_state() {
        let (backend, store) = store(StalePolicy::LatestIssued);
        backend.mutations.push(Err(ApiError::Http { status: 400 }));

        let err = store
            .create_offer(&json!({ "maxExposure": "1000" }))
            .await
            .unwrap_err();

        assert_eq!(err, ApiError::Http { status: 400 });
        assert_eq!(store.error().await, None);
        assert!(!store.loading().await.any());

        let (endpoint, body) = backend.last_mutation.lock().unwrap().clone().unwrap();
        assert_eq!(endpoint, ApiEndpoint::CreateOffer);
        assert_eq!(body["maxExposure"], "1000");
    }

    #[tokio::test]
    async fn test_mutations_hit_their_endpoints() {
        let (backend, store) = store(StalePolicy::LatestIssued);
        for _ in 0..4 {
            backend.mutations.push(Ok(json!({ "ok": true })));
        }

        let payload = json!({ "offerId": "o1" });
        store.update_offer(&payload).await.unwrap();
        assert_eq!(backend.last_mutation.lock().unwrap().as_ref().unwrap().0, ApiEndpoint::UpdateOffer);
        store.change_ltv(&payload).await.unwrap();
        assert_eq!(backend.last_mutation.lock().unwrap().as_ref().unwrap().0, ApiEndpoint::ChangeLtv);
        store.create_deposit_transaction(&payload).await.unwrap();
        assert_eq!(backend.last_mutation.lock().unwrap().as_ref().unwrap().0, ApiEndpoint::Deposit);
        let reply = store.create_withdrawal_transaction(&payload).await.unwrap();
        assert_eq!(backend.last_mutation.lock().unwrap().as_ref().unwrap().0, ApiEndpoint::Withdraw);
        assert_eq!(reply["ok"], true);
    }

    #[tokio::test]
    async fn test_optimistic_status_update_reconciled_by_fetch() {
        let (backend, store) = store(StalePolicy::LatestIssued);
        backend.liquidations.push(Ok(sample_liquidation_proceeds()));
        backend.liquidations.push(Ok(sample_liquidation_proceeds()));

        store.fetch_liquidation_proceeds(Some("walletA")).await;
        assert!(store.update_liquidation_status("2", ProcessingStatus::Deposited).await);
        assert!(!store.update_liquidation_status("99", ProcessingStatus::Deposited).await);

        let state = store.snapshot().await;
        assert_eq!(state.liquidation_proceeds[1].processing_status, ProcessingStatus::Deposited);
        assert!(state.pending_status_updates.contains("2"));

        // Server still says processing; the authoritative fetch wins
        store.fetch_liquidation_proceeds(Some("walletA")).await;
        let state = store.snapshot().await;
        assert_eq!(state.liquidation_proceeds[1].processing_status, ProcessingStatus::Processing);
        assert!(state.pending_status_updates.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_all_fetches_every_kind() {
        let (backend, store) = store(StalePolicy::LatestIssued);
        backend.offers.push(Ok(vec![offer("o1", true, "10")]));
        backend.positions.push(Ok(vec![]));
        backend.balance.push(Ok(PoolBalance::default()));
        backend.liquidations.push(Ok(vec![]));

        store.refresh_all(Some("walletA"), Some("SOL")).await;

        assert_eq!(backend.offers.calls(), 1);
        assert_eq!(backend.positions.calls(), 1);
        assert_eq!(backend.balance.calls(), 1);
        assert_eq!(backend.liquidations.calls(), 1);
        assert!(store.pool_balance().await.is_some());
        assert!(!store.loading().await.any());
    }
}
