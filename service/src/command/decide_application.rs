//! [`Command`] for deciding upon a pending [`Application`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        application::{self, Decision},
        listing, user, Application, InvalidTransition, Listing,
    },
    infra::{database, Database},
    Service,
};

use super::{Command, Transient};

/// [`Command`] for accepting or rejecting a pending [`Application`] by the
/// initiator of its [`Listing`].
///
/// Fails with the first of [`ExecutionError::ApplicationNotFound`],
/// [`ExecutionError::Forbidden`], [`ExecutionError::ListingNotActive`] and
/// [`ExecutionError::InvalidState`] that applies, so deciding upon a signed
/// [`Application`] of a finalized [`Listing`] reports the [`Listing`].
#[derive(Clone, Debug)]
pub struct DecideApplication {
    /// ID of the [`Application`] to decide upon.
    pub application_id: application::Id,

    /// ID of the [`user::User`] making the [`Decision`].
    pub decider_id: user::Id,

    /// [`Decision`] to be made.
    pub decision: Decision,
}

impl<Db> Command<DecideApplication> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Application>, application::Id>>,
            Ok = Option<Application>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Listing, listing::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Listing>, listing::Id>>,
            Ok = Option<Listing>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Application>, application::Id>>,
            Ok = Option<Application>,
            Err = Traced<database::Error>,
        > + Database<Update<Application>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Application;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: DecideApplication,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DecideApplication {
            application_id,
            decider_id,
            decision,
        } = cmd;

        let listing_id = self
            .database()
            .execute(Select(By::<Option<Application>, _>::new(application_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ApplicationNotFound(application_id))
            .map_err(tracerr::wrap!())?
            .listing_id;

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

        let listing = tx
            .execute(Select(By::<Option<Listing>, _>::new(listing_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ApplicationNotFound(application_id))
            .map_err(tracerr::wrap!())?;
        let mut application = tx
            .execute(Select(By::<Option<Application>, _>::new(application_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ApplicationNotFound(application_id))
            .map_err(tracerr::wrap!())?;

        if !listing.is_initiated_by(&decider_id) {
            return Err(tracerr::new!(E::Forbidden(decider_id)));
        }
        if !listing.is_active() {
            return Err(tracerr::new!(E::ListingNotActive(listing.status)));
        }

        application
            .transition(decision.status())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        tx.execute(Update(application.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tracing::info!(
            application_id = %application.id,
            listing_id = %listing.id,
            %decision,
            "`Application` decided",
        );

        Ok(application)
    }
}

/// Error of [`DecideApplication`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Application`] with the provided ID does not exist.
    #[display("`Application(id: {_0})` does not exist")]
    #[from(ignore)]
    ApplicationNotFound(#[error(not(source))] application::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`user::User`] is not the initiator of the [`Listing`].
    #[display("`User(id: {_0})` is not allowed to decide upon the `Application`")]
    #[from(ignore)]
    Forbidden(#[error(not(source))] user::Id),

    /// [`Application`] is not pending anymore.
    #[display("`Application` cannot be decided upon: {_0}")]
    InvalidState(InvalidTransition<application::Status>),

    /// [`Listing`] of the [`Application`] is not active anymore.
    #[display("`Listing` is {_0} and accepts no decisions")]
    #[from(ignore)]
    ListingNotActive(#[error(not(source))] listing::Status),
}

impl Transient for ExecutionError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Db(e) => e.is_transient(),
            Self::ApplicationNotFound(_)
            | Self::Forbidden(_)
            | Self::InvalidState(_)
            | Self::ListingNotActive(_) => false,
        }
    }
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{CancelListing, DecideApplication, FinalizeListing},
        domain::{
            application::{self, Decision},
            listing,
        },
        testing, Command as _,
    };

    use super::ExecutionError as E;

    fn decide(
        application_id: application::Id,
        decider: &str,
        decision: Decision,
    ) -> DecideApplication {
        DecideApplication {
            application_id,
            decider_id: testing::user(decider),
            decision,
        }
    }

    #[tokio::test]
    async fn accepts_and_rejects_pending() {
        let (svc, _) = testing::service();
        let listing = testing::listing(&svc, "tenant").await;
        let alice = testing::submit(&svc, listing.id, "alice").await;
        let bob = testing::submit(&svc, listing.id, "bob").await;

        let alice = svc
            .execute(decide(alice.id, "tenant", Decision::Accept))
            .await
            .unwrap();
        let bob = svc
            .execute(decide(bob.id, "tenant", Decision::Reject))
            .await
            .unwrap();

        assert_eq!(alice.status, application::Status::Accepted);
        assert_eq!(bob.status, application::Status::Rejected);
        let stored = testing::stored_application(&svc, alice.id).await;
        assert_eq!(stored.version, alice.version);
    }

    #[tokio::test]
    async fn accepts_even_when_full() {
        let (svc, _) = testing::service();
        let listing = testing::listing(&svc, "tenant").await;
        drop(testing::accepted(&svc, listing.id, "alice").await);
        let bob = testing::submit(&svc, listing.id, "bob").await;

        let bob = svc
            .execute(decide(bob.id, "tenant", Decision::Accept))
            .await
            .unwrap();

        assert_eq!(bob.status, application::Status::Accepted);
    }

    #[tokio::test]
    async fn accepted_cannot_be_rejected() {
        let (svc, _) = testing::service();
        let listing = testing::listing(&svc, "tenant").await;
        let alice = testing::accepted(&svc, listing.id, "alice").await;

        let err = svc
            .execute(decide(alice.id, "tenant", Decision::Reject))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::InvalidState(_)), "{err}");
    }

    #[tokio::test]
    async fn only_initiator_decides() {
        let (svc, _) = testing::service();
        let listing = testing::listing(&svc, "tenant").await;
        let alice = testing::submit(&svc, listing.id, "alice").await;

        let err = svc
            .execute(decide(alice.id, "alice", Decision::Accept))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::Forbidden(_)), "{err}");
        let stored = testing::stored_application(&svc, alice.id).await;
        assert_eq!(stored.status, application::Status::Pending);
    }

    #[tokio::test]
    async fn rejects_decision_on_closed_listing() {
        let (svc, _) = testing::service();
        let listing = testing::listing(&svc, "tenant").await;
        let alice = testing::submit(&svc, listing.id, "alice").await;
        drop(
            svc.execute(CancelListing {
                listing_id: listing.id,
                requester_id: testing::user("tenant"),
            })
            .await
            .unwrap(),
        );

        let err = svc
            .execute(decide(alice.id, "tenant", Decision::Accept))
            .await
            .unwrap_err();

        assert!(
            matches!(
                err.as_ref(),
                E::ListingNotActive(listing::Status::Cancelled),
            ),
            "{err}",
        );
    }

    #[tokio::test]
    async fn cannot_accept_after_finalize() {
        let (svc, _) = testing::service();
        let listing = testing::listing(&svc, "tenant").await;
        drop(testing::accepted(&svc, listing.id, "alice").await);
        let bob = testing::submit(&svc, listing.id, "bob").await;
        drop(
            svc.execute(FinalizeListing {
                listing_id: listing.id,
                requester_id: testing::user("tenant"),
            })
            .await
            .unwrap(),
        );

        let err = svc
            .execute(decide(bob.id, "tenant", Decision::Accept))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::ListingNotActive(_)), "{err}");
        let stored = testing::stored_application(&svc, bob.id).await;
        assert_eq!(stored.status, application::Status::Pending);
    }

    #[tokio::test]
    async fn unknown_application_is_not_found() {
        let (svc, _) = testing::service();

        let err = svc
            .execute(decide(application::Id::new(), "tenant", Decision::Accept))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::ApplicationNotFound(_)), "{err}");
    }

    #[tokio::test]
    async fn closed_listing_outranks_application_state() {
        let (svc, _) = testing::service();
        let listing = testing::listing(&svc, "tenant").await;
        let alice = testing::accepted(&svc, listing.id, "alice").await;
        drop(
            svc.execute(FinalizeListing {
                listing_id: listing.id,
                requester_id: testing::user("tenant"),
            })
            .await
            .unwrap(),
        );

        let err = svc
            .execute(decide(alice.id, "tenant", Decision::Reject))
            .await
            .unwrap_err();

        assert!(
            matches!(
                err.as_ref(),
                E::ListingNotActive(listing::Status::Finalized),
            ),
            "{err}",
        );
        let stored = testing::stored_application(&svc, alice.id).await;
        assert_eq!(stored.status, application::Status::Signed);
    }
}
