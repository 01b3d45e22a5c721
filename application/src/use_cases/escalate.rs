//! Escalation gate
//!
//! Hands deadlocked requests to human review. At most one pending ticket
//! exists per request id; new tickets beyond the rolling rate limit are
//! recorded as `rate_limited` without notifying anyone.
//!
//! The pending index and the rate limiter share one mutex, so the
//! "already pending?" check and the reservation happen atomically. The lock
//! is never held across an await.
//!
//! Notification delivery runs in background tasks so a slow channel never
//! delays the caller. The tasks are tracked, and the process awaits
//! [`EscalationGate::drain_notifications`] before exiting.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use council_domain::core::string::sanitize_free_text;
use council_domain::{
    EscalationTicket, RequestId, SlidingWindowRateLimiter, TicketId, TicketStatus,
};
use thiserror::Error;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::config::EscalationParams;
use crate::ports::metrics::{MetricSignal, MetricsSink, NoMetrics};
use crate::ports::notification::NotificationRouter;
use crate::ports::ticket_repository::{RepositoryError, TicketRepository};

#[derive(Error, Debug)]
pub enum EscalationError {
    /// Persistence gave up after every retry. The ticket is kept in memory
    /// and `retry_unpersisted` will try again.
    #[error("Ticket {id} could not be persisted: {source}", id = .ticket.id)]
    Persistence {
        ticket: Box<EscalationTicket>,
        source: RepositoryError,
    },

    #[error("Ticket not found: {0}")]
    NotFound(TicketId),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

struct PendingEntry {
    ticket: EscalationTicket,
    persisted: bool,
}

struct GateState {
    pending: HashMap<RequestId, PendingEntry>,
    /// Rate-limited tickets whose insert failed
    unpersisted: Vec<EscalationTicket>,
    limiter: SlidingWindowRateLimiter,
}

pub struct EscalationGate {
    repository: Arc<dyn TicketRepository>,
    router: Arc<NotificationRouter>,
    metrics: Arc<dyn MetricsSink>,
    params: EscalationParams,
    state: Mutex<GateState>,
    deliveries: TaskTracker,
}

impl EscalationGate {
    pub fn new(
        repository: Arc<dyn TicketRepository>,
        router: Arc<NotificationRouter>,
        params: EscalationParams,
    ) -> Self {
        let limiter = SlidingWindowRateLimiter::new(params.rate_limit, params.rate_window);
        Self {
            repository,
            router,
            metrics: Arc::new(NoMetrics),
            params,
            state: Mutex::new(GateState {
                pending: HashMap::new(),
                unpersisted: Vec::new(),
                limiter,
            }),
            deliveries: TaskTracker::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Load pending tickets left by a previous process into the index
    pub async fn hydrate(&self) -> Result<usize, EscalationError> {
        let tickets = self.repository.list(Some(TicketStatus::Pending)).await?;
        let loaded = tickets.len();
        {
            let mut state = self.lock();
            for ticket in tickets {
                state
                    .pending
                    .entry(ticket.request_id.clone())
                    .or_insert(PendingEntry {
                        ticket,
                        persisted: true,
                    });
            }
        }
        self.report_depth();
        info!(loaded, "Loaded pending escalation tickets");
        Ok(loaded)
    }

    /// Open a ticket for `request_id`, or return its pending one.
    ///
    /// Beyond the rate limit the ticket is stored as `rate_limited` and no
    /// notification is sent. Notifications are fire-and-forget and go out
    /// only once the ticket is persisted.
    pub async fn escalate(
        &self,
        request_id: &RequestId,
        reason: &str,
    ) -> Result<EscalationTicket, EscalationError> {
        let reason = sanitize_free_text(reason, self.params.max_text_chars);

        let ticket = {
            let mut state = self.lock();
            if let Some(entry) = state.pending.get(request_id) {
                debug!(request_id = %request_id, ticket = %entry.ticket.id, "Escalation already pending");
                return Ok(entry.ticket.clone());
            }
            if state.limiter.try_acquire(Instant::now()) {
                let ticket = EscalationTicket::pending(request_id.clone(), reason);
                state.pending.insert(
                    request_id.clone(),
                    PendingEntry {
                        ticket: ticket.clone(),
                        persisted: false,
                    },
                );
                ticket
            } else {
                warn!(request_id = %request_id, "Escalation rate limit reached");
                EscalationTicket::rate_limited(request_id.clone(), reason)
            }
        };
        self.report_depth();

        let repository = Arc::clone(&self.repository);
        let to_insert = ticket.clone();
        let persisted = self
            .with_retry("insert", || {
                let repository = Arc::clone(&repository);
                let ticket = to_insert.clone();
                async move { repository.insert(&ticket).await }
            })
            .await;

        match persisted {
            Ok(()) => {
                info!(
                    request_id = %request_id,
                    ticket = %ticket.id,
                    status = %ticket.status,
                    "Escalation ticket created"
                );
                if ticket.is_pending() {
                    self.mark_persisted(request_id);
                    self.notify(ticket.clone());
                }
                Ok(ticket)
            }
            Err(source) => {
                error!(
                    request_id = %request_id,
                    ticket = %ticket.id,
                    "Escalation ticket kept in memory only: {}",
                    source
                );
                if !ticket.is_pending() {
                    self.lock().unpersisted.push(ticket.clone());
                }
                Err(EscalationError::Persistence {
                    ticket: Box::new(ticket),
                    source,
                })
            }
        }
    }

    /// Close a ticket. Resolving an already resolved ticket is a no-op that
    /// returns it unchanged.
    pub async fn resolve(
        &self,
        ticket_id: &TicketId,
        reviewer: &str,
        resolution: &str,
    ) -> Result<EscalationTicket, EscalationError> {
        let in_memory = {
            let state = self.lock();
            state
                .pending
                .values()
                .find(|entry| &entry.ticket.id == ticket_id)
                .map(|entry| (entry.ticket.clone(), entry.persisted))
        };

        let (mut ticket, persisted) = match in_memory {
            Some(found) => found,
            None => match self.repository.get(ticket_id).await? {
                Some(ticket) => (ticket, true),
                None => return Err(EscalationError::NotFound(ticket_id.clone())),
            },
        };

        let reviewer = sanitize_free_text(reviewer, self.params.max_text_chars);
        let resolution = sanitize_free_text(resolution, self.params.max_text_chars);
        if !ticket.resolve(reviewer, resolution) {
            debug!(ticket = %ticket_id, "Ticket already resolved");
            return Ok(ticket);
        }

        let repository = Arc::clone(&self.repository);
        let resolved = ticket.clone();
        let result = self
            .with_retry("update", || {
                let repository = Arc::clone(&repository);
                let ticket = resolved.clone();
                async move {
                    if persisted {
                        repository.update(&ticket).await
                    } else {
                        repository.insert(&ticket).await
                    }
                }
            })
            .await;

        if let Err(source) = result {
            error!(ticket = %ticket_id, "Resolution could not be persisted: {}", source);
            return Err(EscalationError::Persistence {
                ticket: Box::new(ticket),
                source,
            });
        }

        self.lock().pending.remove(&ticket.request_id);
        self.report_depth();
        info!(ticket = %ticket_id, request_id = %ticket.request_id, "Escalation resolved");
        Ok(ticket)
    }

    /// Re-attempt persistence of tickets held only in memory, notifying for
    /// pending ones that now made it. Returns how many were persisted.
    pub async fn retry_unpersisted(&self) -> usize {
        let (pending, others) = {
            let mut state = self.lock();
            let pending: Vec<EscalationTicket> = state
                .pending
                .values()
                .filter(|entry| !entry.persisted)
                .map(|entry| entry.ticket.clone())
                .collect();
            (pending, std::mem::take(&mut state.unpersisted))
        };

        let mut persisted = 0;
        for ticket in pending {
            match self.repository.insert(&ticket).await {
                Ok(()) | Err(RepositoryError::AlreadyExists(_)) => {
                    persisted += 1;
                    self.mark_persisted(&ticket.request_id);
                    self.notify(ticket);
                }
                Err(e) => warn!(ticket = %ticket.id, "Retry failed: {}", e),
            }
        }
        for ticket in others {
            match self.repository.insert(&ticket).await {
                Ok(()) | Err(RepositoryError::AlreadyExists(_)) => persisted += 1,
                Err(e) => {
                    warn!(ticket = %ticket.id, "Retry failed: {}", e);
                    self.lock().unpersisted.push(ticket);
                }
            }
        }
        persisted
    }

    /// Number of pending tickets
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Number of tickets held only in memory
    pub fn unpersisted_count(&self) -> usize {
        let state = self.lock();
        state.pending.values().filter(|e| !e.persisted).count() + state.unpersisted.len()
    }

    pub async fn ticket(&self, ticket_id: &TicketId) -> Result<Option<EscalationTicket>, EscalationError> {
        if let Some(ticket) = self.repository.get(ticket_id).await? {
            return Ok(Some(ticket));
        }
        let state = self.lock();
        Ok(state
            .pending
            .values()
            .map(|entry| &entry.ticket)
            .chain(state.unpersisted.iter())
            .find(|ticket| &ticket.id == ticket_id)
            .cloned())
    }

    pub async fn tickets(
        &self,
        status: Option<TicketStatus>,
    ) -> Result<Vec<EscalationTicket>, EscalationError> {
        Ok(self.repository.list(status).await?)
    }

    fn mark_persisted(&self, request_id: &RequestId) {
        if let Some(entry) = self.lock().pending.get_mut(request_id) {
            entry.persisted = true;
        }
    }

    /// Wait for notifications still being delivered, up to `timeout`.
    ///
    /// Returns `false` when some deliveries were still running at the
    /// deadline. The gate keeps accepting work afterwards.
    pub async fn drain_notifications(&self, timeout: Duration) -> bool {
        self.deliveries.close();
        let drained = tokio::time::timeout(timeout, self.deliveries.wait())
            .await
            .is_ok();
        self.deliveries.reopen();
        if !drained {
            warn!(
                in_flight = self.deliveries.len(),
                "Notifications still in flight after {:?}", timeout
            );
        }
        drained
    }

    /// Number of notification deliveries still running
    pub fn notifications_in_flight(&self) -> usize {
        self.deliveries.len()
    }

    fn notify(&self, ticket: EscalationTicket) {
        let router = Arc::clone(&self.router);
        self.deliveries.spawn(async move {
            router.deliver(&ticket).await;
        });
    }

    fn report_depth(&self) {
        let depth = self.pending_count();
        self.metrics
            .record(MetricSignal::escalation_queue_depth(depth));
    }

    /// Run `op` up to `persist_attempts` times with doubling backoff
    async fn with_retry<F, Fut>(&self, what: &str, op: F) -> Result<(), RepositoryError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<(), RepositoryError>>,
    {
        let mut backoff = self.params.persist_backoff;
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= self.params.persist_attempts => return Err(e),
                Err(e) => {
                    warn!(attempt, "Ticket {} failed, retrying in {:?}: {}", what, backoff, e);
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
