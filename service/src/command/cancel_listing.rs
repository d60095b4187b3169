//! [`Command`] for cancelling a [`Listing`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::Application;
use crate::{
    domain::{listing, user, InvalidTransition, Listing},
    infra::{database, Database},
    Service,
};

use super::{Command, Transient};

/// [`Command`] for cancelling a [`Listing`].
///
/// [`Application`]s of the cancelled [`Listing`] are left untouched.
#[derive(Clone, Debug)]
pub struct CancelListing {
    /// ID of the [`Listing`] to be cancelled.
    pub listing_id: listing::Id,

    /// ID of the [`user::User`] who cancels the [`Listing`].
    pub requester_id: user::Id,
}

impl<Db> Command<CancelListing> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Listing, listing::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Listing>, listing::Id>>,
            Ok = Option<Listing>,
            Err = Traced<database::Error>,
        > + Database<Update<Listing>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Listing;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CancelListing) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CancelListing {
            listing_id,
            requester_id,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid racing with concurrent finalization.
        tx.execute(Lock(By::new(listing_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut listing = tx
            .execute(Select(By::<Option<Listing>, _>::new(listing_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ListingNotFound(listing_id))
            .map_err(tracerr::wrap!())?;

        if !listing.is_initiated_by(&requester_id) {
            return Err(tracerr::new!(E::Forbidden(requester_id)));
        }

        listing
            .transition(listing::Status::Cancelled)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        tx.execute(Update(listing.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tracing::info!(listing_id = %listing.id, "`Listing` cancelled");

        Ok(listing)
    }
}

/// Error of [`CancelListing`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`user::User`] is not the initiator of the [`Listing`].
    #[display("`User(id: {_0})` is not allowed to cancel the `Listing`")]
    #[from(ignore)]
    Forbidden(#[error(not(source))] user::Id),

    /// [`Listing`] is not active anymore.
    #[display("`Listing` cannot be cancelled: {_0}")]
    InvalidState(InvalidTransition<listing::Status>),

    /// [`Listing`] with the provided ID does not exist.
    #[display("`Listing(id: {_0})` does not exist")]
    #[from(ignore)]
    ListingNotFound(#[error(not(source))] listing::Id),
}

impl Transient for ExecutionError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Db(e) => e.is_transient(),
            Self::Forbidden(_)
            | Self::InvalidState(_)
            | Self::ListingNotFound(_) => false,
        }
    }
}
