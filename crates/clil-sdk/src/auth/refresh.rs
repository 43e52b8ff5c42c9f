//! Single-flight credential refresh
//!
//! When a credentialed call is rejected, its caller asks the
//! [`RefreshCoordinator`] for a new access token. The first caller becomes the
//! leader and performs the refresh exchange; callers arriving while it is in
//! flight are queued and released in arrival order once it settles.
//!
//! The `refreshing` flag is checked and set under a synchronous lock with no
//! suspension point in between, so two callers can never both become leader.

use super::session::{SessionEvent, SessionEvents};
use super::token_store::TokenStore;
use super::types::CredentialPair;
use crate::error::{ApiError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Message surfaced when the session cannot be renewed
pub const SESSION_EXPIRED: &str = "Session expired, please log in again";

/// Exchanges a refresh token for a new credential pair
#[async_trait]
pub trait RefreshExchange: Send + Sync {
    async fn exchange(&self, refresh_token: &str) -> Result<CredentialPair>;
}

/// A caller suspended on the in-flight refresh
struct PendingCaller {
    ticket: u64,
    resume: oneshot::Sender<Result<String>>,
}

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    queue: VecDeque<PendingCaller>,
    next_ticket: u64,
}

enum Role {
    Leader,
    Follower(u64, oneshot::Receiver<Result<String>>),
}

/// Owns the refresh flag and the queue of waiting callers
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    token_store: Arc<TokenStore>,
    exchange: Arc<dyn RefreshExchange>,
    session: SessionEvents,
    exchanges_issued: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(
        token_store: Arc<TokenStore>,
        exchange: Arc<dyn RefreshExchange>,
        session: SessionEvents,
    ) -> Self {
        Self {
            state: Mutex::new(RefreshState::default()),
            token_store,
            exchange,
            session,
            exchanges_issued: AtomicU64::new(0),
        }
    }

    /// Obtain a fresh access token, joining an in-flight refresh if there is one
    ///
    /// Every failure is [`ApiError::Unauthenticated`]; by the time it is
    /// returned the token store has been cleared and [`SessionEvent::Expired`]
    /// published exactly once.
    pub async fn refresh(&self) -> Result<String> {
        let role = {
            let mut state = self.state.lock();
            if state.refreshing {
                let (resume, wait) = oneshot::channel();
                let ticket = state.next_ticket;
                state.next_ticket += 1;
                state.queue.push_back(PendingCaller { ticket, resume });
                Role::Follower(ticket, wait)
            } else {
                state.refreshing = true;
                Role::Leader
            }
        };

        match role {
            Role::Follower(ticket, wait) => {
                debug!(ticket, "Waiting on in-flight token refresh");
                wait.await.unwrap_or_else(|_| {
                    Err(ApiError::unauthenticated("Token refresh was abandoned"))
                })
            }
            Role::Leader => {
                let mut guard = SettleGuard {
                    coordinator: self,
                    settled: false,
                };
                let outcome = self.run_exchange().await;
                guard.settle(&outcome);
                outcome
            }
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.state.lock().refreshing
    }

    /// Number of callers queued on the in-flight refresh
    pub fn pending_callers(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Number of refresh exchanges sent to the backend so far
    pub fn exchanges_issued(&self) -> u64 {
        self.exchanges_issued.load(Ordering::SeqCst)
    }

    async fn run_exchange(&self) -> Result<String> {
        let Some(refresh_token) = self.token_store.refresh_token() else {
            warn!("No refresh token available, ending session");
            self.teardown().await;
            return Err(ApiError::unauthenticated(SESSION_EXPIRED));
        };

        self.exchanges_issued.fetch_add(1, Ordering::SeqCst);
        info!("Refreshing access token");

        match self.exchange.exchange(&refresh_token).await {
            Ok(mut pair) => {
                // Backends that do not rotate refresh tokens omit them
                if !pair.can_refresh() {
                    pair.refresh_token = Some(refresh_token);
                }
                if pair.identity.is_none() {
                    pair.identity = self.token_store.identity();
                }
                let access_token = pair.access_token.clone();
                // The new pair is already live in memory; a storage failure only
                // costs the session on next start
                if let Err(e) = self.token_store.set(pair).await {
                    warn!("Failed to persist refreshed session: {}", e);
                }
                info!("Access token refreshed");
                Ok(access_token)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, ending session");
                self.teardown().await;
                Err(ApiError::unauthenticated(SESSION_EXPIRED))
            }
        }
    }

    async fn teardown(&self) {
        if let Err(e) = self.token_store.clear().await {
            warn!("Failed to remove persisted session: {}", e);
        }
        self.session.publish(SessionEvent::Expired);
    }

    /// Reset the flag and release every queued caller in FIFO order
    fn settle(&self, outcome: &Result<String>) {
        let waiters = {
            let mut state = self.state.lock();
            state.refreshing = false;
            std::mem::take(&mut state.queue)
        };

        if !waiters.is_empty() {
            debug!(
                waiters = waiters.len(),
                success = outcome.is_ok(),
                "Releasing callers queued on token refresh"
            );
        }

        for waiter in waiters {
            if waiter.resume.send(outcome.clone()).is_err() {
                debug!(ticket = waiter.ticket, "Queued caller went away before refresh settled");
            }
        }
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &state.refreshing)
            .field("pending_callers", &state.queue.len())
            .field("exchanges_issued", &self.exchanges_issued())
            .finish()
    }
}

/// Settles the refresh even when the leader's future is dropped mid-exchange
struct SettleGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl SettleGuard<'_> {
    fn settle(&mut self, outcome: &Result<String>) {
        self.settled = true;
        self.coordinator.settle(outcome);
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Token refresh interrupted before completion");
            self.coordinator
                .settle(&Err(ApiError::unauthenticated("Token refresh was interrupted")));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::Identity;
    use crate::error::ErrorKind;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    /// Exchange that blocks until released and returns a fixed result
    struct GatedExchange {
        gate: Notify,
        calls: AtomicUsize,
        result: Result<CredentialPair>,
    }

    impl GatedExchange {
        fn new(result: Result<CredentialPair>) -> Arc<Self> {
            Arc::new(Self {
                gate: Notify::new(),
                calls: AtomicUsize::new(0),
                result,
            })
        }

        fn release(&self) {
            self.gate.notify_one();
        }
    }

    #[async_trait]
    impl RefreshExchange for GatedExchange {
        async fn exchange(&self, _refresh_token: &str) -> Result<CredentialPair> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            self.result.clone()
        }
    }

    async fn signed_in_store(refresh: Option<&str>) -> Arc<TokenStore> {
        let store = Arc::new(TokenStore::ephemeral());
        store
            .set(
                CredentialPair::new("expired", refresh.map(str::to_string))
                    .with_identity(Identity::new("anna", "anna@example.org")),
            )
            .await
            .unwrap();
        store
    }

    async fn wait_for_queue(coordinator: &RefreshCoordinator, len: usize) {
        while coordinator.pending_callers() < len {
            tokio::task::yield_now().await;
        }
    }

    async fn wait_for_leader(coordinator: &RefreshCoordinator) {
        while !coordinator.is_refreshing() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_single_flight() {
        let store = signed_in_store(Some("r1")).await;
        let exchange = GatedExchange::new(Ok(CredentialPair::new("fresh", Some("r2".into()))));
        let coordinator = Arc::new(RefreshCoordinator::new(
            store.clone(),
            exchange.clone(),
            SessionEvents::new(),
        ));

        let leader = tokio::spawn({
            let c = coordinator.clone();
            async move { c.refresh().await }
        });
        wait_for_leader(&coordinator).await;

        let followers: Vec<_> = (0..4)
            .map(|_| {
                let c = coordinator.clone();
                tokio::spawn(async move { c.refresh().await })
            })
            .collect();
        wait_for_queue(&coordinator, 4).await;

        exchange.release();

        assert_eq!(leader.await.unwrap().unwrap(), "fresh");
        for follower in followers {
            assert_eq!(follower.await.unwrap().unwrap(), "fresh");
        }

        assert_eq!(exchange.calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.exchanges_issued(), 1);
        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.pending_callers(), 0);

        let stored = store.get().unwrap();
        assert_eq!(stored.access_token, "fresh");
        assert_eq!(stored.refresh_token.as_deref(), Some("r2"));
        // Identity carried over when the exchange does not return one
        assert_eq!(stored.identity.unwrap().username, "anna");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_queued_callers_resume_in_fifo_order() {
        let store = signed_in_store(Some("r1")).await;
        let exchange = GatedExchange::new(Ok(CredentialPair::new("fresh", None)));
        let coordinator = Arc::new(RefreshCoordinator::new(
            store,
            exchange.clone(),
            SessionEvents::new(),
        ));
        let order = Arc::new(Mutex::new(Vec::new()));

        let leader = tokio::spawn({
            let c = coordinator.clone();
            async move { c.refresh().await }
        });
        wait_for_leader(&coordinator).await;

        let mut followers = Vec::new();
        for seq in 0..5u32 {
            let c = coordinator.clone();
            let order = order.clone();
            followers.push(tokio::spawn(async move {
                let outcome = c.refresh().await;
                order.lock().push(seq);
                outcome
            }));
            wait_for_queue(&coordinator, seq as usize + 1).await;
        }

        exchange.release();
        leader.await.unwrap().unwrap();
        for follower in followers {
            follower.await.unwrap().unwrap();
        }

        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_failure_fans_out_and_tears_down_once() {
        let store = signed_in_store(Some("r1")).await;
        let exchange = GatedExchange::new(Err(ApiError::unauthenticated("refresh token revoked")));
        let session = SessionEvents::new();
        let mut events = session.subscribe();
        let coordinator = Arc::new(RefreshCoordinator::new(
            store.clone(),
            exchange.clone(),
            session,
        ));

        let leader = tokio::spawn({
            let c = coordinator.clone();
            async move { c.refresh().await }
        });
        wait_for_leader(&coordinator).await;

        let followers: Vec<_> = (0..3)
            .map(|_| {
                let c = coordinator.clone();
                tokio::spawn(async move { c.refresh().await })
            })
            .collect();
        wait_for_queue(&coordinator, 3).await;

        exchange.release();

        let err = leader.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
        for follower in followers {
            let err = follower.await.unwrap().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Unauthenticated);
        }

        assert!(store.get().is_none());
        assert!(!coordinator.is_refreshing());
        assert_eq!(events.try_recv().unwrap(), SessionEvent::Expired);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_missing_refresh_token_fails_without_exchange() {
        let store = signed_in_store(None).await;
        let exchange = GatedExchange::new(Ok(CredentialPair::new("never", None)));
        let session = SessionEvents::new();
        let mut events = session.subscribe();
        let coordinator = RefreshCoordinator::new(store.clone(), exchange.clone(), session);

        let err = coordinator.refresh().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
        assert_eq!(err.message(), SESSION_EXPIRED);
        assert_eq!(exchange.calls.load(Ordering::SeqCst), 0);
        assert!(store.get().is_none());
        assert!(!coordinator.is_refreshing());
        assert_eq!(events.try_recv().unwrap(), SessionEvent::Expired);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_dropped_leader_releases_waiters() {
        let store = signed_in_store(Some("r1")).await;
        let exchange = GatedExchange::new(Ok(CredentialPair::new("fresh", None)));
        let coordinator = Arc::new(RefreshCoordinator::new(
            store,
            exchange.clone(),
            SessionEvents::new(),
        ));

        let leader = tokio::spawn({
            let c = coordinator.clone();
            async move { c.refresh().await }
        });
        wait_for_leader(&coordinator).await;

        let follower = tokio::spawn({
            let c = coordinator.clone();
            async move { c.refresh().await }
        });
        wait_for_queue(&coordinator, 1).await;

        leader.abort();
        assert!(leader.await.unwrap_err().is_cancelled());

        let err = follower.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_each_waiter_settles_once() {
        let store = signed_in_store(Some("r1")).await;
        let exchange = GatedExchange::new(Ok(CredentialPair::new("fresh", None)));
        let coordinator = Arc::new(RefreshCoordinator::new(
            store,
            exchange.clone(),
            SessionEvents::new(),
        ));

        let leader = tokio::spawn({
            let c = coordinator.clone();
            async move { c.refresh().await }
        });
        wait_for_leader(&coordinator).await;
        let follower = tokio::spawn({
            let c = coordinator.clone();
            async move { c.refresh().await }
        });
        wait_for_queue(&coordinator, 1).await;

        exchange.release();
        leader.await.unwrap().unwrap();
        follower.await.unwrap().unwrap();

        // A settled queue is empty, so a second settlement has no one to reach
        coordinator.settle(&Err(ApiError::unauthenticated("late")));
        assert_eq!(coordinator.pending_callers(), 0);

        // The next refresh starts a new cycle rather than joining the old one
        exchange.release();
        assert_eq!(coordinator.refresh().await.unwrap(), "fresh");
        assert_eq!(exchange.calls.load(Ordering::SeqCst), 2);
    }
}
