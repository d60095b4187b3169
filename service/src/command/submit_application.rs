//! [`Command`] for submitting an [`Application`] to a [`Listing`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{application, lease, listing, user, Application, Listing, Version},
    infra::{database, Database},
    read::application::Active,
    Service,
};

use super::{Command, Transient};

/// [`Command`] for submitting an [`Application`] to a [`Listing`].
#[derive(Clone, Debug)]
pub struct SubmitApplication {
    /// ID of the [`Listing`] to apply to.
    pub listing_id: listing::Id,

    /// ID of the [`user::User`] applying.
    pub applicant_id: user::Id,

    /// [`application::Message`] to the [`Listing`] initiator.
    pub message: Option<application::Message>,

    /// [`lease::Proposal`] of the applicant.
    ///
    /// Must name a concrete [`lease::Duration`] when the [`Listing`] has a
    /// [`lease::Duration::Negotiable`] one, and is ignored otherwise.
    pub lease_duration: Option<lease::Proposal>,
}

impl<Db> Command<SubmitApplication> for Service<Db>
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
            Select<By<Option<Active<Application>>, (listing::Id, user::Id)>>,
            Ok = Option<Active<Application>>,
            Err = Traced<database::Error>,
        > + Database<Insert<Application>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Application;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: SubmitApplication,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SubmitApplication {
            listing_id,
            applicant_id,
            message,
            lease_duration,
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

        let listing = tx
            .execute(Select(By::<Option<Listing>, _>::new(listing_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ListingNotFound(listing_id))
            .map_err(tracerr::wrap!())?;

        if !listing.is_active() {
            return Err(tracerr::new!(E::ListingNotOpen(listing.status)));
        }
        if listing.is_initiated_by(&applicant_id) {
            return Err(tracerr::new!(E::SelfApplicationForbidden(
                applicant_id
            )));
        }

        let existing = tx
            .execute(Select(By::<Option<Active<Application>>, _>::new((
                listing_id,
                applicant_id.clone(),
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if let Some(Active(existing)) = existing {
            return Err(tracerr::new!(E::DuplicateApplication(existing.id)));
        }

        let lease_duration = if listing.lease_duration.is_negotiable() {
            let proposed = lease_duration
                .as_ref()
                .and_then(lease::Proposal::duration)
                .ok_or(E::InvalidLeaseDuration)
                .map_err(tracerr::wrap!())?;
            Some(proposed)
        } else {
            None
        };

        let created_at = application::CreationDateTime::now();
        let application = Application {
            id: application::Id::new(),
            listing_id,
            applicant_id,
            message,
            lease_duration,
            status: application::Status::Pending,
            version: Version::INITIAL,
            created_at,
            updated_at: created_at.coerce(),
        };

        tx.execute(Insert(application.clone()))
            .await
            .map_err(|e| {
                if e.as_ref().is_unique_violation(Some(
                    database::APPLICATION_ACTIVE_UNIQUE,
                )) {
                    tracerr::new!(E::DuplicateApplication(application.id))
                } else {
                    (tracerr::map_from_and_wrap!(=> E))(e)
                }
            })?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tracing::debug!(
            application_id = %application.id,
            listing_id = %application.listing_id,
            applicant_id = %application.applicant_id,
            "`Application` submitted",
        );

        Ok(application)
    }
}

/// Error of [`SubmitApplication`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Applicant already has an active [`Application`] to the [`Listing`].
    #[display("`Application(id: {_0})` to the `Listing` is still active")]
    DuplicateApplication(#[error(not(source))] application::Id),

    /// [`lease::Duration`] proposed by the applicant is missing or
    /// negotiable itself.
    #[display("Concrete lease duration must be proposed")]
    InvalidLeaseDuration,

    /// [`Listing`] with the provided ID does not exist.
    #[display("`Listing(id: {_0})` does not exist")]
    ListingNotFound(#[error(not(source))] listing::Id),

    /// [`Listing`] doesn't accept [`Application`]s anymore.
    #[display("`Listing` is {_0} and accepts no `Application`s")]
    ListingNotOpen(#[error(not(source))] listing::Status),

    /// [`user::User`] applies to their own [`Listing`].
    #[display("`User(id: {_0})` cannot apply to their own `Listing`")]
    SelfApplicationForbidden(#[error(not(source))] user::Id),
}

impl Transient for ExecutionError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Db(e) => e.is_transient(),
            Self::DuplicateApplication(_)
            | Self::InvalidLeaseDuration
            | Self::ListingNotFound(_)
            | Self::ListingNotOpen(_)
            | Self::SelfApplicationForbidden(_) => false,
        }
    }
}
