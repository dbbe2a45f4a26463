//! # Core Projection Framework
//!
//! This module defines the generic building blocks for the entity projection layer.
//!
//! ## Key Types
//!
//! - [`Projection`]: The trait that every derived entity (order, driver location, stock level) implements.
//! - [`ProjectionActor`]: The generic actor that owns all projections of one kind.
//! - [`ProjectionClient`]: The generic client for communicating with a projection actor.
//! - [`FrameworkError`]: Common errors (e.g., ActorClosed, ActorDropped).

use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

// =============================================================================
// 1. THE ABSTRACTION
// =============================================================================

/// Trait that any derived entity must implement to be managed by a [`ProjectionActor`].
///
/// # Architecture Note
/// Order status, driver positions and stock levels are all "last known value per id"
/// stores fed by a stream of updates. The only thing that differs is *how* an update
/// folds into the stored value, so that is the only thing an entity has to provide.
/// The actor loop, the watcher bookkeeping and garbage collection are written once.
///
/// Entities are reachable only through their own id. Relations between entities
/// (an order's driver) are stored as id fields, never as shared references.
pub trait Projection: Clone + Send + Sync + 'static {
    /// The unique identifier for this entity.
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug + 'static;

    /// An event folded into the projection.
    type Update: Clone + Send + Sync + Debug + 'static;

    /// A blank projection for an entity seen for the first time.
    /// The triggering update is applied to it immediately afterwards.
    fn new(id: Self::Id) -> Self;

    fn id(&self) -> &Self::Id;

    /// Folds an update into the stored state.
    ///
    /// Returning `Err` rejects the update without touching the entity.
    fn apply(&mut self, update: Self::Update) -> Result<Outcome, String>;

    /// Terminal entities are dropped by garbage collection once nobody watches them.
    fn is_terminal(&self) -> bool {
        false
    }

    /// When the entity last heard from its source. Entities returning `Some`
    /// expire once idle longer than the actor's idle limit.
    fn last_seen(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// What an update did to a projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Changed,
    Unchanged,
    /// The update was valid but stale (e.g. a status regression) and was dropped.
    Discarded(String),
}

impl Outcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, Outcome::Changed)
    }
}

// =============================================================================
// 2. THE GENERIC MESSAGES & ERRORS
// =============================================================================

/// Errors that can occur within the projection framework itself.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    #[error("Update rejected: {0}")]
    Rejected(String),
}

/// Type alias for the one-shot response channel used by actors.
pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// Predicate used by [`ProjectionRequest::ApplyWhere`].
pub type Filter<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Internal message type sent to the actor.
///
/// Requests are processed one at a time in arrival order, which is what makes the
/// monotonic rules in each [`Projection::apply`] hold without locks.
pub enum ProjectionRequest<T: Projection> {
    /// Fold an update into one entity, creating it on first sight.
    Apply {
        id: T::Id,
        update: T::Update,
        respond_to: Response<Outcome>,
    },
    /// Fold the same update into every existing entity matching `filter`.
    ApplyWhere {
        filter: Filter<T>,
        update: T::Update,
        respond_to: Response<Vec<T::Id>>,
    },
    Get {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    List {
        respond_to: Response<Vec<T>>,
    },
    /// Insert a hydrated entity unless live updates already created it.
    Seed {
        item: T,
        respond_to: Response<bool>,
    },
    /// Replace the entity with a blank one.
    Reset {
        id: T::Id,
        respond_to: Response<T>,
    },
    Watch {
        id: T::Id,
        respond_to: Response<watch::Receiver<Option<T>>>,
    },
    CollectGarbage {
        respond_to: Response<usize>,
    },
}

impl<T: Projection> Debug for ProjectionRequest<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectionRequest::Apply { id, update, .. } => {
                write!(f, "Apply {{ id: {id}, update: {update:?} }}")
            }
            ProjectionRequest::ApplyWhere { update, .. } => {
                write!(f, "ApplyWhere {{ update: {update:?} }}")
            }
            ProjectionRequest::Get { id, .. } => write!(f, "Get {{ id: {id} }}"),
            ProjectionRequest::List { .. } => f.write_str("List"),
            ProjectionRequest::Seed { item, .. } => write!(f, "Seed {{ id: {} }}", item.id()),
            ProjectionRequest::Reset { id, .. } => write!(f, "Reset {{ id: {id} }}"),
            ProjectionRequest::Watch { id, .. } => write!(f, "Watch {{ id: {id} }}"),
            ProjectionRequest::CollectGarbage { .. } => f.write_str("CollectGarbage"),
        }
    }
}

// =============================================================================
// 3. THE GENERIC ACTOR SERVER
// =============================================================================

/// The generic actor that owns every projection of one kind.
///
/// # Concurrency Model
/// The actor owns `store` and `watchers` exclusively and processes requests
/// sequentially, so no `Mutex` is needed. Consumers never see a shared mutable
/// reference: they get cloned snapshots (`get`) or a `watch` channel per entity.
pub struct ProjectionActor<T: Projection> {
    receiver: mpsc::Receiver<ProjectionRequest<T>>,
    store: HashMap<T::Id, T>,
    watchers: HashMap<T::Id, watch::Sender<Option<T>>>,
    gc_interval: Option<Duration>,
    idle_after: Option<Duration>,
}

impl<T: Projection> ProjectionActor<T> {
    pub fn new(buffer_size: usize, gc_interval: Option<Duration>) -> (Self, ProjectionClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        let actor = Self {
            receiver,
            store: HashMap::new(),
            watchers: HashMap::new(),
            gc_interval,
            idle_after: None,
        };
        (actor, ProjectionClient::new(sender))
    }

    /// Garbage collection also drops entities idle for longer than `idle_after`.
    pub fn with_idle_expiry(mut self, idle_after: Duration) -> Self {
        self.idle_after = Some(idle_after);
        self
    }

    /// Runs the actor's event loop until every client is dropped.
    pub async fn run(mut self) {
        let entity_type = entity_type::<T>();
        info!(entity_type, "Projection actor started");

        let mut gc_tick = self.gc_interval.map(|period| {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            tokio::select! {
                msg = self.receiver.recv() => match msg {
                    Some(msg) => self.handle(msg, entity_type),
                    None => break,
                },
                _ = gc_tick_or_pending(&mut gc_tick) => {
                    let removed = self.collect_garbage();
                    if removed > 0 {
                        debug!(entity_type, removed, "Periodic garbage collection");
                    }
                }
            }
        }

        info!(entity_type, size = self.store.len(), "Shutdown");
    }

    fn handle(&mut self, msg: ProjectionRequest<T>, entity_type: &'static str) {
        match msg {
            ProjectionRequest::Apply { id, update, respond_to } => {
                debug!(entity_type, %id, ?update, "Apply");
                let _ = respond_to.send(self.apply(id, update, entity_type));
            }
            ProjectionRequest::ApplyWhere { filter, update, respond_to } => {
                let ids: Vec<T::Id> = self
                    .store
                    .values()
                    .filter(|item| filter(*item))
                    .map(|item| item.id().clone())
                    .collect();
                let mut changed = Vec::with_capacity(ids.len());
                for id in ids {
                    if let Ok(Outcome::Changed) = self.apply(id.clone(), update.clone(), entity_type) {
                        changed.push(id);
                    }
                }
                debug!(entity_type, ?update, changed = changed.len(), "ApplyWhere");
                let _ = respond_to.send(Ok(changed));
            }
            ProjectionRequest::Get { id, respond_to } => {
                let item = self.store.get(&id).cloned();
                debug!(entity_type, %id, found = item.is_some(), "Get");
                let _ = respond_to.send(Ok(item));
            }
            ProjectionRequest::List { respond_to } => {
                let _ = respond_to.send(Ok(self.store.values().cloned().collect()));
            }
            ProjectionRequest::Seed { item, respond_to } => {
                let id = item.id().clone();
                let inserted = !self.store.contains_key(&id);
                if inserted {
                    self.store.insert(id.clone(), item);
                    self.notify(&id);
                    info!(entity_type, %id, size = self.store.len(), "Seeded");
                } else {
                    debug!(entity_type, %id, "Seed skipped, live state already present");
                }
                let _ = respond_to.send(Ok(inserted));
            }
            ProjectionRequest::Reset { id, respond_to } => {
                let fresh = T::new(id.clone());
                self.store.insert(id.clone(), fresh.clone());
                self.notify(&id);
                info!(entity_type, %id, "Reset");
                let _ = respond_to.send(Ok(fresh));
            }
            ProjectionRequest::Watch { id, respond_to } => {
                let current = self.store.get(&id).cloned();
                let receiver = match self.watchers.get(&id) {
                    Some(sender) => sender.subscribe(),
                    None => {
                        let (sender, receiver) = watch::channel(current);
                        self.watchers.insert(id.clone(), sender);
                        receiver
                    }
                };
                debug!(entity_type, %id, "Watch");
                let _ = respond_to.send(Ok(receiver));
            }
            ProjectionRequest::CollectGarbage { respond_to } => {
                let removed = self.collect_garbage();
                debug!(entity_type, removed, "Garbage collected");
                let _ = respond_to.send(Ok(removed));
            }
        }
    }

    fn apply(&mut self, id: T::Id, update: T::Update, entity_type: &'static str) -> Result<Outcome, FrameworkError> {
        let created = !self.store.contains_key(&id);
        let mut item = self.store.get(&id).cloned().unwrap_or_else(|| T::new(id.clone()));

        match item.apply(update) {
            Ok(outcome) => {
                if created || outcome.is_changed() {
                    self.store.insert(id.clone(), item);
                    self.notify(&id);
                }
                match &outcome {
                    Outcome::Changed => info!(entity_type, %id, created, "Updated"),
                    Outcome::Unchanged => debug!(entity_type, %id, "Unchanged"),
                    Outcome::Discarded(reason) => warn!(entity_type, %id, %reason, "Discarded"),
                }
                Ok(outcome)
            }
            Err(e) => {
                warn!(entity_type, %id, error = %e, "Update rejected");
                Err(FrameworkError::Rejected(e))
            }
        }
    }

    fn notify(&self, id: &T::Id) {
        if let Some(sender) = self.watchers.get(id) {
            sender.send_replace(self.store.get(id).cloned());
        }
    }

    /// Drops watchers nobody listens to, then terminal or idle entities nobody watches.
    fn collect_garbage(&mut self) -> usize {
        self.watchers.retain(|_, sender| sender.receiver_count() > 0);
        let cutoff = self
            .idle_after
            .and_then(|idle| chrono::Duration::from_std(idle).ok())
            .map(|idle| Utc::now() - idle);
        let before = self.store.len();
        let watchers = &self.watchers;
        self.store.retain(|id, item| {
            let idle = matches!((cutoff, item.last_seen()), (Some(cutoff), Some(seen)) if seen < cutoff);
            watchers.contains_key(id) || !(item.is_terminal() || idle)
        });
        before - self.store.len()
    }
}

async fn gc_tick_or_pending(tick: &mut Option<tokio::time::Interval>) {
    match tick {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Extracts just the type name (e.g., "OrderProjection" instead of the full path).
fn entity_type<T>() -> &'static str {
    std::any::type_name::<T>()
        .split("::")
        .last()
        .unwrap_or("Unknown")
}

// =============================================================================
// 4. THE GENERIC CLIENT
// =============================================================================

/// A type-safe client for interacting with a [`ProjectionActor`].
pub struct ProjectionClient<T: Projection> {
    sender: mpsc::Sender<ProjectionRequest<T>>,
}

impl<T: Projection> Clone for ProjectionClient<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T: Projection> ProjectionClient<T> {
    pub fn new(sender: mpsc::Sender<ProjectionRequest<T>>) -> Self {
        Self { sender }
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(Response<R>) -> ProjectionRequest<T>,
    ) -> Result<R, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn apply(&self, id: T::Id, update: T::Update) -> Result<Outcome, FrameworkError> {
        self.request(|respond_to| ProjectionRequest::Apply { id, update, respond_to })
            .await
    }

    pub async fn apply_where(
        &self,
        filter: impl Fn(&T) -> bool + Send + Sync + 'static,
        update: T::Update,
    ) -> Result<Vec<T::Id>, FrameworkError> {
        let filter: Filter<T> = Box::new(filter);
        self.request(|respond_to| ProjectionRequest::ApplyWhere { filter, update, respond_to })
            .await
    }

    pub async fn get(&self, id: T::Id) -> Result<Option<T>, FrameworkError> {
        self.request(|respond_to| ProjectionRequest::Get { id, respond_to }).await
    }

    pub async fn list(&self) -> Result<Vec<T>, FrameworkError> {
        self.request(|respond_to| ProjectionRequest::List { respond_to }).await
    }

    pub async fn seed(&self, item: T) -> Result<bool, FrameworkError> {
        self.request(|respond_to| ProjectionRequest::Seed { item, respond_to }).await
    }

    pub async fn reset(&self, id: T::Id) -> Result<T, FrameworkError> {
        self.request(|respond_to| ProjectionRequest::Reset { id, respond_to }).await
    }

    pub async fn watch(&self, id: T::Id) -> Result<watch::Receiver<Option<T>>, FrameworkError> {
        self.request(|respond_to| ProjectionRequest::Watch { id, respond_to }).await
    }

    pub async fn collect_garbage(&self) -> Result<usize, FrameworkError> {
        self.request(|respond_to| ProjectionRequest::CollectGarbage { respond_to })
            .await
    }
}

// =============================================================================
// 5. EXAMPLE USAGE (Test)
// =============================================================================
