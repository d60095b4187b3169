//! [`Command`] for withdrawing a pending [`Application`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        application, listing, user, Application, InvalidTransition, Listing,
    },
    infra::{database, Database},
    Service,
};

use super::{Command, Transient};

/// [`Command`] for withdrawing a pending [`Application`] by its applicant.
#[derive(Clone, Debug)]
pub struct WithdrawApplication {
    /// ID of the [`Application`] to be withdrawn.
    pub application_id: application::Id,

    /// ID of the [`user::User`] who withdraws the [`Application`].
    pub requester_id: user::Id,
}

impl<Db> Command<WithdrawApplication> for Service<Db>
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
        cmd: WithdrawApplication,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let WithdrawApplication {
            application_id,
            requester_id,
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

        // Avoid racing with concurrent decisions.
        tx.execute(Lock(By::new(listing_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut application = tx
            .execute(Select(By::<Option<Application>, _>::new(application_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ApplicationNotFound(application_id))
            .map_err(tracerr::wrap!())?;

        if application.applicant_id != requester_id {
            return Err(tracerr::new!(E::Forbidden(requester_id)));
        }

        application
            .transition(application::Status::Withdrawn)
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
            listing_id = %application.listing_id,
            "`Application` withdrawn",
        );

        Ok(application)
    }
}

/// Error of [`WithdrawApplication`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Application`] with the provided ID does not exist.
    #[display("`Application(id: {_0})` does not exist")]
    #[from(ignore)]
    ApplicationNotFound(#[error(not(source))] application::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`user::User`] is not the applicant.
    #[display("`User(id: {_0})` is not allowed to withdraw the `Application`")]
    #[from(ignore)]
    Forbidden(#[error(not(source))] user::Id),

    /// [`Application`] is not pending anymore.
    #[display("`Application` cannot be withdrawn: {_0}")]
    InvalidState(InvalidTransition<application::Status>),
}

impl Transient for ExecutionError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Db(e) => e.is_transient(),
            Self::ApplicationNotFound(_)
            | Self::Forbidden(_)
            | Self::InvalidState(_) => false,
        }
    }
}
