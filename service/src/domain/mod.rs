//! Domain definitions.

pub mod application;
pub mod lease;
pub mod listing;
pub mod slot;
pub mod user;

use std::fmt;

use derive_more::{Display, Error};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};

pub use self::{application::Application, listing::Listing};

/// Version of a persisted entity used for optimistic concurrency control.
///
/// Every persisted modification of an entity increments its [`Version`].
#[derive(
    Clone, Copy, Debug, Default, Display, Eq, Hash, Ord, PartialEq, PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Version(i32);

impl Version {
    /// [`Version`] of a freshly created entity.
    pub const INITIAL: Self = Self(0);

    /// Returns the [`Version`] following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Returns the [`Version`] preceding this one.
    #[must_use]
    pub const fn prev(self) -> Self {
        Self(self.0.wrapping_sub(1))
    }
}

/// Error of transitioning an entity's status along an edge its state machine
/// doesn't have.
#[derive(Clone, Copy, Debug, Display, Error, Eq, PartialEq)]
#[display("cannot transition from `{from}` to `{to}`")]
pub struct InvalidTransition<S: fmt::Debug + fmt::Display> {
    /// Current status.
    pub from: S,

    /// Requested status.
    pub to: S,
}
