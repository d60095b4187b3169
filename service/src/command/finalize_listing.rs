//! [`Command`] for finalizing a [`Listing`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        application, listing, slot, user, Application, InvalidTransition,
        Listing,
    },
    infra::{database, Database},
    read::listing::Finalized,
    Service,
};

use super::{Command, Transient};

/// [`Command`] for finalizing a [`Listing`] once all its slots are filled.
///
/// Signs every [`application::Status::Accepted`] [`Application`] of the
/// [`Listing`] atomically with the [`Listing`] status change. Other
/// [`Application`]s are left untouched.
#[derive(Clone, Debug)]
pub struct FinalizeListing {
    /// ID of the [`Listing`] to be finalized.
    pub listing_id: listing::Id,

    /// ID of the [`user::User`] who finalizes the [`Listing`].
    pub requester_id: user::Id,
}

impl<Db> Command<FinalizeListing> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Listing, listing::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Listing>, listing::Id>>,
            Ok = Option<Listing>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Application>, listing::Id>>,
            Ok = Vec<Application>,
            Err = Traced<database::Error>,
        > + Database<Update<Listing>, Err = Traced<database::Error>>
        + Database<Update<Application>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Finalized;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: FinalizeListing,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let FinalizeListing {
            listing_id,
            requester_id,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent decisions and cancellations.
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
            .transition(listing::Status::Finalized)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let applications = tx
            .execute(Select(By::<Vec<Application>, _>::new(listing_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let occupancy = slot::Occupancy::of(&listing, &applications);
        if !occupancy.is_full() {
            return Err(tracerr::new!(E::InsufficientSlotsFilled {
                filled: occupancy.filled,
                total: occupancy.total,
            }));
        }

        tx.execute(Update(listing.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut signed = 0_u32;
        for mut application in applications {
            if application.status != application::Status::Accepted {
                continue;
            }
            application
                .transition(application::Status::Signed)
                .map_err(tracerr::from_and_wrap!(=> E))?;
            tx.execute(Update(application))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            signed += 1;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tracing::info!(
            listing_id = %listing.id,
            filled = occupancy.filled,
            total = occupancy.total,
            signed_applications = signed,
            "`Listing` finalized",
        );

        Ok(Finalized {
            listing,
            signed_applications: signed,
        })
    }
}

/// Error of [`FinalizeListing`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`user::User`] is not the initiator of the [`Listing`].
    #[display("`User(id: {_0})` is not allowed to finalize the `Listing`")]
    #[from(ignore)]
    Forbidden(#[error(not(source))] user::Id),

    /// Not all the [`Listing`] slots are filled.
    #[display("Only {filled} of {total} `Listing` slots are filled")]
    #[from(ignore)]
    InsufficientSlotsFilled {
        /// Number of filled slots.
        filled: u32,

        /// Total number of slots.
        total: u32,
    },

    /// [`Listing`] is not active anymore.
    #[display("`Listing` cannot be finalized: {_0}")]
    InvalidState(InvalidTransition<listing::Status>),

    /// [`Application`] cannot be signed.
    #[display("`Application` cannot be signed: {_0}")]
    InvalidApplicationState(InvalidTransition<application::Status>),

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
            | Self::InsufficientSlotsFilled { .. }
            | Self::InvalidState(_)
            | Self::InvalidApplicationState(_)
            | Self::ListingNotFound(_) => false,
        }
    }
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{CancelListing, FinalizeListing},
        domain::{application, listing},
        testing, Command as _,
    };

    use super::ExecutionError as E;

    fn finalize(listing_id: listing::Id, requester: &str) -> FinalizeListing {
        FinalizeListing {
            listing_id,
            requester_id: testing::user(requester),
        }
    }

    #[tokio::test]
    async fn signs_accepted_applications_only() {
        let (svc, _) = testing::service();
        let listing = testing::listing(&svc, "tenant").await;
        let accepted = testing::accepted(&svc, listing.id, "alice").await;
        let pending = testing::submit(&svc, listing.id, "bob").await;

        let finalized = svc
            .execute(finalize(listing.id, "tenant"))
            .await
            .unwrap();

        assert_eq!(finalized.listing.status, listing::Status::Finalized);
        assert_eq!(finalized.signed_applications, 1);

        let accepted = testing::stored_application(&svc, accepted.id).await;
        let pending = testing::stored_application(&svc, pending.id).await;
        assert_eq!(accepted.status, application::Status::Signed);
        assert_eq!(pending.status, application::Status::Pending);
    }

    #[tokio::test]
    async fn requires_all_slots_filled() {
        let (svc, _) = testing::service();
        let mut cmd = testing::create_listing("landlord");
        cmd.initiator_role = listing::InitiatorRole::Landlord;
        let listing = svc.execute(cmd).await.unwrap();
        let accepted = testing::accepted(&svc, listing.id, "alice").await;

        let err = svc
            .execute(finalize(listing.id, "landlord"))
            .await
            .unwrap_err();

        assert!(
            matches!(
                err.as_ref(),
                E::InsufficientSlotsFilled {
                    filled: 1,
                    total: 2,
                },
            ),
            "{err}",
        );
        let stored = testing::stored_listing(&svc, listing.id).await;
        let accepted = testing::stored_application(&svc, accepted.id).await;
        assert_eq!(stored.status, listing::Status::Active);
        assert_eq!(accepted.status, application::Status::Accepted);
    }

    #[tokio::test]
    async fn second_finalize_is_invalid_state() {
        let (svc, _) = testing::service();
        let listing = testing::listing(&svc, "tenant").await;
        drop(testing::accepted(&svc, listing.id, "alice").await);

        drop(svc.execute(finalize(listing.id, "tenant")).await.unwrap());
        let err = svc
            .execute(finalize(listing.id, "tenant"))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::InvalidState(_)), "{err}");
    }

    #[tokio::test]
    async fn cannot_finalize_cancelled_listing() {
        let (svc, _) = testing::service();
        let listing = testing::listing(&svc, "tenant").await;
        drop(testing::accepted(&svc, listing.id, "alice").await);
        drop(
            svc.execute(CancelListing {
                listing_id: listing.id,
                requester_id: testing::user("tenant"),
            })
            .await
            .unwrap(),
        );

        let err = svc
            .execute(finalize(listing.id, "tenant"))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::InvalidState(_)), "{err}");
    }

    #[tokio::test]
    async fn only_initiator_finalizes() {
        let (svc, _) = testing::service();
        let listing = testing::listing(&svc, "tenant").await;
        drop(testing::accepted(&svc, listing.id, "alice").await);

        let err = svc
            .execute(finalize(listing.id, "alice"))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::Forbidden(_)), "{err}");
    }

    #[tokio::test]
    async fn rolls_back_on_failed_commit() {
        let (svc, db) = testing::service();
        let listing = testing::listing(&svc, "tenant").await;
        let accepted = testing::accepted(&svc, listing.id, "alice").await;

        // Transaction begin, lock, 2 selects, 2 updates, then the commit.
        db.fail_after(6);
        let err = svc
            .execute(finalize(listing.id, "tenant"))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::Db(_)), "{err}");
        let stored = testing::stored_listing(&svc, listing.id).await;
        let accepted = testing::stored_application(&svc, accepted.id).await;
        assert_eq!(stored.status, listing::Status::Active);
        assert_eq!(stored.version, listing.version);
        assert_eq!(accepted.status, application::Status::Accepted);
    }
}
