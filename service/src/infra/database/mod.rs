//! [`Database`]-related implementations.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

pub use self::memory::Memory;
#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// Name of the constraint allowing only a single active [`Application`] of
/// a [`User`] per [`Listing`].
///
/// [`Application`]: crate::domain::Application
/// [`Listing`]: crate::domain::Listing
/// [`User`]: crate::domain::user::User
pub const APPLICATION_ACTIVE_UNIQUE: &str = "applications_active_uniq";

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),

    /// [`Memory`] error.
    Memory(memory::Error),

    /// Persisted entity was modified since it has been read.
    #[display("`{_0}` was modified concurrently")]
    #[from(ignore)]
    StaleVersion(#[error(not(source))] &'static str),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_unique_violation(constraint),
            Self::Memory(e) => e.is_unique_violation(constraint),
            Self::StaleVersion(..) => false,
        }
    }

    /// Checks if the operation failed with this error may succeed once
    /// executed again.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_transient(),
            Self::Memory(e) => e.is_transient(),
            Self::StaleVersion(..) => true,
        }
    }
}
