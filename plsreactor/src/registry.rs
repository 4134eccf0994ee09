use std::{
    cell::Cell,
    collections::{HashMap, VecDeque},
    fmt,
    hash::Hash,
    rc::Rc,
};

use tracing::{debug, trace};

use crate::error::{RegistryError, Result};

/// Readiness predicate of the watched resources.
///
/// Implemented by the reactor context; the registry only reads it, it never
/// toggles readiness itself.
pub trait Readiness {
    type Key: Clone + Eq + Hash + fmt::Debug;
    type Condition: Copy + Eq + Hash + fmt::Debug;

    fn is_ready(&self, key: &Self::Key, condition: Self::Condition) -> bool;
}

/// One-shot callback. It receives the context and the registry so it can
/// chain a new registration.
pub type Callback<C> = Box<dyn FnOnce(&mut C, &mut ContinuationRegistry<C>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuationState {
    Registered,
    Fired,
    Cancelled,
}

/// Handle on a pending continuation, used to cancel it.
///
/// The state is shared with the registry entry, so a handle kept after the
/// continuation fired still reports `Fired`.
#[derive(Clone)]
pub struct ContinuationHandle {
    id: u64,
    state: Rc<Cell<ContinuationState>>,
}

impl ContinuationHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> ContinuationState {
        self.state.get()
    }
}

impl fmt::Debug for ContinuationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContinuationHandle")
            .field("id", &self.id)
            .field("state", &self.state.get())
            .finish()
    }
}

/// Outcome of [`ContinuationRegistry::register`]
#[derive(Debug)]
pub enum Registration {
    /// The resource was already ready; the callback ran before `register` returned.
    Fired,
    Pending(ContinuationHandle),
}

impl Registration {
    pub fn handle(&self) -> Option<&ContinuationHandle> {
        match self {
            Registration::Fired => None,
            Registration::Pending(handle) => Some(handle),
        }
    }
}

struct Waiter<C: Readiness> {
    handle: ContinuationHandle,
    callback: Callback<C>,
}

/// Per-resource table of one-shot waiters.
///
/// Waiters are keyed by `(resource, condition)` and fire in registration
/// order. Each one fires at most once, and exactly once unless cancelled.
pub struct ContinuationRegistry<C: Readiness> {
    waiters: HashMap<(C::Key, C::Condition), VecDeque<Waiter<C>>>,
    index: HashMap<u64, (C::Key, C::Condition)>,
    next_id: u64,
}

impl<C: Readiness> Default for ContinuationRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Readiness> ContinuationRegistry<C> {
    pub fn new() -> Self {
        Self {
            waiters: HashMap::new(),
            index: HashMap::new(),
            next_id: 1,
        }
    }

    /// Runs `callback` once `key` satisfies `condition`.
    ///
    /// When the resource is already ready the callback runs synchronously
    /// and nothing is stored.
    pub fn register<F>(
        &mut self,
        ctx: &mut C,
        key: C::Key,
        condition: C::Condition,
        callback: F,
    ) -> Registration
    where
        F: FnOnce(&mut C, &mut ContinuationRegistry<C>) + 'static,
    {
        if ctx.is_ready(&key, condition) {
            trace!(?key, ?condition, "resource ready, firing synchronously");
            callback(ctx, self);
            return Registration::Fired;
        }

        let id = self.next_id;
        self.next_id += 1;
        let handle = ContinuationHandle {
            id,
            state: Rc::new(Cell::new(ContinuationState::Registered)),
        };

        debug!(id, ?key, ?condition, "continuation registered");
        self.index.insert(id, (key.clone(), condition));
        self.waiters
            .entry((key, condition))
            .or_default()
            .push_back(Waiter {
                handle: handle.clone(),
                callback: Box::new(callback),
            });

        Registration::Pending(handle)
    }

    /// Fires every continuation waiting on `(key, condition)`.
    ///
    /// All matching waiters are detached before the first callback runs, so
    /// a callback registering the same condition again waits for the next
    /// notification. Returns the number of callbacks invoked.
    pub fn notify(&mut self, ctx: &mut C, key: &C::Key, condition: C::Condition) -> usize {
        let Some(waiters) = self.waiters.remove(&(key.clone(), condition)) else {
            return 0;
        };
        for waiter in &waiters {
            self.index.remove(&waiter.handle.id);
        }

        let fired = waiters.len();
        debug!(?key, ?condition, fired, "dispatching continuations");
        for waiter in waiters {
            debug_assert_eq!(waiter.handle.state(), ContinuationState::Registered);
            waiter.handle.state.set(ContinuationState::Fired);
            (waiter.callback)(ctx, self);
        }
        fired
    }

    /// Removes a pending continuation without running it.
    ///
    /// Cancelling a continuation that already fired or was already cancelled
    /// is an error.
    pub fn cancel(&mut self, handle: &ContinuationHandle) -> Result<()> {
        match handle.state() {
            ContinuationState::Fired => return Err(RegistryError::AlreadyFired(handle.id)),
            ContinuationState::Cancelled => return Err(RegistryError::AlreadyCancelled(handle.id)),
            ContinuationState::Registered => {}
        }

        let slot = self
            .index
            .remove(&handle.id)
            .ok_or(RegistryError::UnknownHandle(handle.id))?;

        if let Some(queue) = self.waiters.get_mut(&slot) {
            queue.retain(|waiter| waiter.handle.id != handle.id);
            if queue.is_empty() {
                self.waiters.remove(&slot);
            }
        }
        handle.state.set(ContinuationState::Cancelled);
        debug!(id = handle.id, key = ?slot.0, "continuation cancelled");
        Ok(())
    }

    /// Cancels every continuation waiting on `key`, whatever the condition.
    pub fn cancel_all(&mut self, key: &C::Key) -> usize {
        let slots: Vec<_> = self
            .waiters
            .keys()
            .filter(|(k, _)| k == key)
            .cloned()
            .collect();

        let mut cancelled = 0;
        for slot in slots {
            if let Some(queue) = self.waiters.remove(&slot) {
                for waiter in queue {
                    self.index.remove(&waiter.handle.id);
                    waiter.handle.state.set(ContinuationState::Cancelled);
                    cancelled += 1;
                }
            }
        }
        cancelled
    }

    /// Cancels every pending continuation.
    pub fn clear(&mut self) -> usize {
        let cancelled = self.index.len();
        for (_, queue) in self.waiters.drain() {
            for waiter in queue {
                waiter.handle.state.set(ContinuationState::Cancelled);
            }
        }
        self.index.clear();
        cancelled
    }

    pub fn pending_count(&self) -> usize {
        self.index.len()
    }

    pub fn pending_for(&self, key: &C::Key) -> usize {
        self.waiters
            .iter()
            .filter(|((k, _), _)| k == key)
            .map(|(_, queue)| queue.len())
            .sum()
    }
}
