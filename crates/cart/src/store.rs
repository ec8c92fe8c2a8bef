//! Cart store with lifecycle, hydration, and background persistence.
//!
//! [`CartStore`] owns the cart. It is created, hydrated once from the
//! key-value store, handed out to consumers as cloneable [`CartHandle`]s, and
//! finally shut down. Handles used outside that window fail with
//! [`CartError::Misuse`].
//!
//! # Persistence
//!
//! Mutations run against a copy of the cart under a lock. The copy is encoded
//! to JSON first and only then replaces the current cart, so a failed encode
//! leaves the cart untouched. The encoded snapshot is published with a
//! version on a `watch` channel. A single writer task drains that
//! channel and always writes the newest snapshot it sees, so a slow write can
//! never be followed by an older one. Callers that need durability await
//! [`CartHandle::flush`].
//!
//! A [`CartStore`] dereferences to its [`CartHandle`], so the owner can call
//! cart operations directly.

use core::fmt;
use std::ops::Deref;
use std::sync::Arc;

use go_marketplace_core::{LineItem, Product, ProductId};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::cart::{Cart, CartChange, DecrementPolicy};
use crate::config::{CartConfig, DEFAULT_STORAGE_KEY};
use crate::error::{CartError, Result};
use crate::storage::{KvStore, StorageError};

/// Where a store is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Constructed, not yet hydrated.
    Created,
    /// Hydrated and accepting operations.
    Active,
    /// Shut down; no further operations.
    ShutDown,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "not hydrated",
            Self::Active => "active",
            Self::ShutDown => "shut down",
        })
    }
}

/// Settings for a [`CartStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartOptions {
    /// Key the cart is stored under.
    pub storage_key: String,
    /// Behavior of `decrement` at quantity 1.
    pub decrement_policy: DecrementPolicy,
}

impl Default for CartOptions {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            decrement_policy: DecrementPolicy::default(),
        }
    }
}

impl From<&CartConfig> for CartOptions {
    fn from(config: &CartConfig) -> Self {
        Self {
            storage_key: config.storage_key.clone(),
            decrement_policy: config.decrement_policy,
        }
    }
}

#[derive(Debug, Clone)]
struct Snapshot {
    version: u64,
    payload: Arc<str>,
}

#[derive(Debug, Clone, Default)]
struct WriteStatus {
    version: u64,
    error: Option<StorageError>,
}

struct Writer {
    snapshots: watch::Sender<Option<Snapshot>>,
    status: watch::Receiver<WriteStatus>,
    task: JoinHandle<()>,
}

struct State {
    lifecycle: Lifecycle,
    cart: Cart,
    /// Bumped on every mutation; the writer reports which version it stored.
    version: u64,
    writer: Option<Writer>,
}

impl State {
    fn ensure_active(&self, operation: &'static str) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Active => Ok(()),
            lifecycle => Err(CartError::Misuse {
                operation,
                lifecycle,
            }),
        }
    }
}

struct Shared {
    kv: Arc<dyn KvStore>,
    options: CartOptions,
    state: Mutex<State>,
}

/// Owner of the cart and its persistence.
pub struct CartStore {
    handle: CartHandle,
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("options", &self.handle.shared.options)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Create a store over `kv`. It must be hydrated before use.
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>, options: CartOptions) -> Self {
        Self {
            handle: CartHandle {
                shared: Arc::new(Shared {
                    kv,
                    options,
                    state: Mutex::new(State {
                        lifecycle: Lifecycle::Created,
                        cart: Cart::new(),
                        version: 0,
                        writer: None,
                    }),
                }),
            },
        }
    }

    /// Create and hydrate a store.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Persistence`] if the stored value cannot be read.
    pub async fn open(kv: Arc<dyn KvStore>, options: CartOptions) -> Result<Self> {
        let store = Self::new(kv, options);
        store.hydrate().await?;
        Ok(store)
    }

    /// Load the persisted cart and start accepting operations.
    ///
    /// A missing value leaves the cart empty. A value that is not a valid
    /// cart is logged and discarded. On a read error the store stays
    /// un-hydrated and hydration may be retried.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Misuse`] if the store was already hydrated or shut
    /// down, and [`CartError::Persistence`] if the read fails.
    #[instrument(skip(self), fields(key = %self.handle.shared.options.storage_key))]
    pub async fn hydrate(&self) -> Result<()> {
        let shared = &self.handle.shared;
        let mut guard = shared.state.lock().await;
        let state = &mut *guard;

        if state.lifecycle != Lifecycle::Created {
            return Err(CartError::Misuse {
                operation: "hydrate",
                lifecycle: state.lifecycle,
            });
        }

        let raw = shared.kv.get(&shared.options.storage_key).await?;
        state.cart = raw.as_deref().map_or_else(Cart::new, decode_persisted);
        state.writer = Some(spawn_writer(
            Arc::clone(&shared.kv),
            shared.options.storage_key.clone(),
        ));
        state.lifecycle = Lifecycle::Active;

        info!(items = state.cart.len(), "Cart hydrated");
        Ok(())
    }

    /// A handle for consumers. All handles share this store's cart.
    #[must_use]
    pub fn handle(&self) -> CartHandle {
        self.handle.clone()
    }

    /// Current lifecycle state.
    pub async fn lifecycle(&self) -> Lifecycle {
        self.handle.shared.state.lock().await.lifecycle
    }

    /// Flush pending writes, stop the writer, and reject further operations.
    ///
    /// Calling this more than once, or on a store that was never hydrated, is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// Returns the error of the final write, if it failed. The store is shut
    /// down either way.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<()> {
        let (writer, target) = {
            let mut state = self.handle.shared.state.lock().await;
            let previous = std::mem::replace(&mut state.lifecycle, Lifecycle::ShutDown);
            if previous != Lifecycle::Active {
                return Ok(());
            }
            (state.writer.take(), state.version)
        };

        let Some(Writer {
            snapshots,
            status,
            task,
        }) = writer
        else {
            return Ok(());
        };

        let flushed = wait_persisted(status, target).await;
        drop(snapshots);
        if let Err(e) = task.await {
            error!(error = %e, "Cart writer task failed");
        }

        info!("Cart store shut down");
        flushed
    }
}

impl Deref for CartStore {
    type Target = CartHandle;

    fn deref(&self) -> &CartHandle {
        &self.handle
    }
}

/// Capability for reading and mutating the cart.
///
/// Cheap to clone. Every operation fails with [`CartError::Misuse`] unless the
/// owning store is active.
#[derive(Clone)]
pub struct CartHandle {
    shared: Arc<Shared>,
}

impl fmt::Debug for CartHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartHandle")
            .field("options", &self.shared.options)
            .finish_non_exhaustive()
    }
}

impl CartHandle {
    /// Add one unit of `product`, creating its line if needed.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Misuse`] outside the store's active lifecycle.
    #[instrument(skip_all, fields(product_id = %product.id))]
    pub async fn add_to_cart(&self, product: Product) -> Result<CartChange> {
        self.mutate("add_to_cart", |cart, _| cart.add(product))
            .await
    }

    /// Add one unit to the line for `id`. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Misuse`] outside the store's active lifecycle.
    #[instrument(skip_all, fields(product_id = %id))]
    pub async fn increment(&self, id: &ProductId) -> Result<CartChange> {
        self.mutate("increment", |cart, _| cart.increment(id)).await
    }

    /// Remove one unit from the line for `id`. Unknown ids are ignored.
    ///
    /// At quantity 1 the configured [`DecrementPolicy`] decides whether the
    /// line stays or goes.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Misuse`] outside the store's active lifecycle.
    #[instrument(skip_all, fields(product_id = %id))]
    pub async fn decrement(&self, id: &ProductId) -> Result<CartChange> {
        self.mutate("decrement", |cart, policy| cart.decrement(id, policy))
            .await
    }

    /// Snapshot of the cart lines, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Misuse`] outside the store's active lifecycle.
    pub async fn items(&self) -> Result<Vec<LineItem>> {
        self.read("items", |cart| cart.items().to_vec()).await
    }

    /// The line for `id`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Misuse`] outside the store's active lifecycle.
    pub async fn get(&self, id: &ProductId) -> Result<Option<LineItem>> {
        self.read("get", |cart| cart.get(id).cloned()).await
    }

    /// Number of distinct lines.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Misuse`] outside the store's active lifecycle.
    pub async fn len(&self) -> Result<usize> {
        self.read("len", Cart::len).await
    }

    /// Whether the cart has no lines.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Misuse`] outside the store's active lifecycle.
    pub async fn is_empty(&self) -> Result<bool> {
        self.read("is_empty", Cart::is_empty).await
    }

    /// Sum of quantities across all lines.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Misuse`] outside the store's active lifecycle.
    pub async fn total_quantity(&self) -> Result<u64> {
        self.read("total_quantity", Cart::total_quantity).await
    }

    /// Wait until the latest mutation has been persisted.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Persistence`] if the most recent write failed,
    /// [`CartError::WriterStopped`] if the writer exited, and
    /// [`CartError::Misuse`] outside the store's active lifecycle.
    pub async fn flush(&self) -> Result<()> {
        let (target, status) = {
            let state = self.shared.state.lock().await;
            state.ensure_active("flush")?;
            let writer = state.writer.as_ref().ok_or(CartError::WriterStopped)?;
            (state.version, writer.status.clone())
        };
        wait_persisted(status, target).await
    }

    async fn mutate<F>(&self, operation: &'static str, apply: F) -> Result<CartChange>
    where
        F: FnOnce(&mut Cart, DecrementPolicy) -> CartChange,
    {
        let mut guard = self.shared.state.lock().await;
        let state = &mut *guard;
        state.ensure_active(operation)?;

        let mut next = state.cart.clone();
        let change = apply(&mut next, self.shared.options.decrement_policy);
        if change.is_mutation() {
            let payload = serde_json::to_string(&next)?;
            state.cart = next;
            state.version += 1;
            if let Some(writer) = &state.writer {
                writer.snapshots.send_replace(Some(Snapshot {
                    version: state.version,
                    payload: payload.into(),
                }));
            }
        }

        debug!(
            operation,
            ?change,
            version = state.version,
            items = state.cart.len(),
            "Cart operation applied"
        );
        Ok(change)
    }

    async fn read<T>(&self, operation: &'static str, view: impl FnOnce(&Cart) -> T) -> Result<T> {
        let state = self.shared.state.lock().await;
        state.ensure_active(operation)?;
        Ok(view(&state.cart))
    }
}

fn decode_persisted(raw: &str) -> Cart {
    if raw.trim().is_empty() {
        return Cart::new();
    }
    match serde_json::from_str::<Cart>(raw) {
        Ok(cart) => cart,
        Err(e) => {
            warn!(error = %e, "Discarding malformed persisted cart");
            Cart::new()
        }
    }
}

fn spawn_writer(kv: Arc<dyn KvStore>, key: String) -> Writer {
    let (snapshots, snapshot_rx) = watch::channel(None);
    let (status_tx, status) = watch::channel(WriteStatus::default());
    let task = tokio::spawn(run_writer(kv, key, snapshot_rx, status_tx));
    Writer {
        snapshots,
        status,
        task,
    }
}

async fn run_writer(
    kv: Arc<dyn KvStore>,
    key: String,
    mut snapshots: watch::Receiver<Option<Snapshot>>,
    status: watch::Sender<WriteStatus>,
) {
    while snapshots.changed().await.is_ok() {
        let Some(snapshot) = snapshots.borrow_and_update().clone() else {
            continue;
        };

        let error = match kv.set(&key, &snapshot.payload).await {
            Ok(()) => {
                debug!(version = snapshot.version, "Cart persisted");
                None
            }
            Err(e) => {
                error!(version = snapshot.version, error = %e, "Failed to persist cart");
                Some(e)
            }
        };

        status.send_replace(WriteStatus {
            version: snapshot.version,
            error,
        });
    }
    debug!("Cart writer stopped");
}

async fn wait_persisted(mut status: watch::Receiver<WriteStatus>, target: u64) -> Result<()> {
    let error = {
        let current = status
            .wait_for(|s| s.version >= target)
            .await
            .map_err(|_| CartError::WriterStopped)?;
        current.error.clone()
    };
    error.map_or(Ok(()), |e| Err(CartError::Persistence(e)))
}
