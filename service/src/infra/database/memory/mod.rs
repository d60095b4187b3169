//! In-memory [`Database`] implementation.
//!
//! Transactions are serialized: a [`Tx`] holds the whole store locked until
//! it's committed or dropped, and stages its writes in a private copy of the
//! store, so dropping an uncommitted [`Tx`] rolls everything back.

mod impls;

use std::{
    collections::BTreeMap,
    future::Future,
    sync::{Arc, Mutex as StdMutex, PoisonError},
};

use derive_more::{Deref, Display, Error as StdError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracerr::Traced;

use crate::{
    domain::{application, listing, Application, Listing},
    infra::database,
};
#[cfg(doc)]
use crate::infra::Database;

/// In-memory [`Database`] client.
#[derive(Clone, Debug, Default, Deref)]
pub struct Memory<T = NonTx>(T);

impl Memory {
    /// Creates a new empty [`Memory`] store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` operations upon this [`Memory`] store fail
    /// with an [`Error::Unavailable`].
    pub fn fail_next(&self, count: usize) {
        self.0.faults.plan(Plan {
            skip: 0,
            fail: count,
        });
    }

    /// Makes a single operation upon this [`Memory`] store fail with an
    /// [`Error::Unavailable`] once the provided number of operations
    /// succeeds.
    pub fn fail_after(&self, succeeded: usize) {
        self.0.faults.plan(Plan {
            skip: succeeded,
            fail: 1,
        });
    }
}

/// Data kept by a [`Memory`] store.
#[derive(Clone, Debug, Default)]
pub struct State {
    /// Stored [`Listing`]s.
    pub(crate) listings: BTreeMap<listing::Id, Listing>,

    /// Stored [`Application`]s.
    pub(crate) applications: BTreeMap<application::Id, Application>,
}

/// Faults planned to be injected into [`Memory`] operations.
#[derive(Clone, Debug, Default)]
struct Faults(Arc<StdMutex<Plan>>);

/// Plan of [`Faults`].
#[derive(Clone, Copy, Debug, Default)]
struct Plan {
    /// Number of operations to succeed before failing.
    skip: usize,

    /// Number of operations to fail.
    fail: usize,
}

impl Faults {
    /// Replaces the current [`Plan`] with the provided one.
    fn plan(&self, plan: Plan) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = plan;
    }

    /// Advances the [`Plan`] by a single operation, failing it if planned.
    fn check(&self) -> Result<(), Traced<database::Error>> {
        let mut plan = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(skip) = plan.skip.checked_sub(1) {
            plan.skip = skip;
            return Ok(());
        }
        if let Some(fail) = plan.fail.checked_sub(1) {
            plan.fail = fail;
            return Err(tracerr::new!(Error::Unavailable))
                .map_err(tracerr::map_from);
        }
        Ok(())
    }
}

/// Non-transactional [`Memory`] client.
///
/// Every operation is applied to the store right away.
#[derive(Clone, Debug, Default)]
pub struct NonTx {
    /// Shared store.
    state: Arc<Mutex<State>>,

    /// Pending faults of the store.
    faults: Faults,
}

impl NonTx {
    /// Locks the whole store and begins a new [`Tx`] upon it.
    async fn begin(&self) -> Result<Tx, Traced<database::Error>> {
        self.faults.check()?;

        let guard = Arc::clone(&self.state).lock_owned().await;
        let state = guard.clone();
        Ok(Tx {
            staged: Arc::new(Mutex::new(Staged {
                guard: Some(guard),
                state,
            })),
            faults: self.faults.clone(),
        })
    }
}

/// Transactional [`Memory`] client.
#[derive(Clone, Debug)]
pub struct Tx {
    /// Writes staged by this [`Tx`].
    staged: Arc<Mutex<Staged>>,

    /// Pending faults of the store.
    faults: Faults,
}

/// Staged writes of a [`Tx`].
#[derive(Debug)]
struct Staged {
    /// Lock of the whole store.
    ///
    /// [`None`] once committed.
    guard: Option<OwnedMutexGuard<State>>,

    /// Copy of the store the [`Tx`] operates on.
    state: State,
}

impl Tx {
    /// Publishes the staged writes of this [`Tx`] and releases the store.
    async fn commit(&self) -> Result<(), Traced<database::Error>> {
        self.faults.check()?;

        let mut staged = self.staged.lock().await;
        let Some(mut guard) = staged.guard.take() else {
            return Ok(());
        };
        *guard = std::mem::take(&mut staged.state);
        Ok(())
    }
}

/// Access to the [`State`] of a [`Memory`] store.
pub trait Access {
    /// Reads the [`State`] with the provided function.
    ///
    /// # Errors
    ///
    /// If the store is unavailable.
    fn read<R>(
        &self,
        f: impl FnOnce(&State) -> R,
    ) -> impl Future<Output = Result<R, Traced<database::Error>>>;

    /// Modifies the [`State`] with the provided function.
    ///
    /// The function must leave the [`State`] untouched if it fails.
    ///
    /// # Errors
    ///
    /// If the store is unavailable or the provided function fails.
    fn write<R>(
        &self,
        f: impl FnOnce(&mut State) -> Result<R, Traced<database::Error>>,
    ) -> impl Future<Output = Result<R, Traced<database::Error>>>;
}

impl Access for NonTx {
    async fn read<R>(
        &self,
        f: impl FnOnce(&State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        self.faults.check()?;

        Ok(f(&*self.state.lock().await))
    }

    async fn write<R>(
        &self,
        f: impl FnOnce(&mut State) -> Result<R, Traced<database::Error>>,
    ) -> Result<R, Traced<database::Error>> {
        self.faults.check()?;

        f(&mut *self.state.lock().await)
    }
}

impl Access for Tx {
    async fn read<R>(
        &self,
        f: impl FnOnce(&State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        self.faults.check()?;

        let staged = self.staged.lock().await;
        if staged.guard.is_none() {
            return Err(tracerr::new!(Error::Committed))
                .map_err(tracerr::map_from);
        }
        Ok(f(&staged.state))
    }

    async fn write<R>(
        &self,
        f: impl FnOnce(&mut State) -> Result<R, Traced<database::Error>>,
    ) -> Result<R, Traced<database::Error>> {
        self.faults.check()?;

        let mut staged = self.staged.lock().await;
        if staged.guard.is_none() {
            return Err(tracerr::new!(Error::Committed))
                .map_err(tracerr::map_from);
        }
        f(&mut staged.state)
    }
}

/// [`Memory`] database [`Error`].
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Store is temporarily unavailable.
    #[display("Store is temporarily unavailable")]
    Unavailable,

    /// Unique constraint is violated.
    #[display("Unique constraint `{_0}` is violated")]
    UniqueViolation(#[error(not(source))] &'static str),

    /// Operation is executed in an already committed transaction.
    #[display("Transaction is already committed")]
    Committed,
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::UniqueViolation(name) => {
                constraint.map_or(true, |c| c == *name)
            }
            Self::Unavailable | Self::Committed => false,
        }
    }

    /// Checks if the failed operation may succeed once executed again.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable => true,
            Self::UniqueViolation(..) | Self::Committed => false,
        }
    }
}
