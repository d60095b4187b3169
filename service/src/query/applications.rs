//! [`Query`] collection related to the multiple [`Application`]s.

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{application, listing, user, Application, Listing},
    infra::{database, Database},
    read, Query, Service,
};

use super::DatabaseQuery;

/// Queries a list of [`Application`]s.
pub type List = DatabaseQuery<
    By<read::application::list::Page, read::application::list::Selector>,
>;

/// Queries total count of [`Application`] list items.
pub type TotalCount = DatabaseQuery<
    By<read::application::list::TotalCount, read::application::list::Filter>,
>;

/// Queries a list of [`Application`]s along with the total count of the
/// matching ones.
#[derive(Clone, Debug)]
pub struct Feed(pub read::application::list::Selector);

/// Output of the [`Feed`] and [`Received`] [`Query`]s.
#[derive(Clone, Debug)]
pub struct Output {
    /// Queried [`Application`]s.
    pub items: Vec<Application>,

    /// Information about the queried page.
    pub page_info: read::application::list::PageInfo,

    /// Total count of the [`Application`]s matching the filter.
    pub total_count: read::application::list::TotalCount,
}

impl<Db> Query<Feed> for Service<Db>
where
    Db: Database<
            Select<
                By<
                    read::application::list::Page,
                    read::application::list::Selector,
                >,
            >,
            Ok = read::application::list::Page,
            Err = Traced<database::Error>,
        > + Database<
            Select<
                By<
                    read::application::list::TotalCount,
                    read::application::list::Filter,
                >,
            >,
            Ok = read::application::list::TotalCount,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Output;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Feed(selector): Feed,
    ) -> Result<Self::Ok, Self::Err> {
        let filter = selector.filter.clone();

        let page = self
            .database()
            .execute(Select(By::<read::application::list::Page, _>::new(
                selector,
            )))
            .await
            .map_err(tracerr::wrap!())?;
        let total_count = self
            .database()
            .execute(Select(
                By::<read::application::list::TotalCount, _>::new(filter),
            ))
            .await
            .map_err(tracerr::wrap!())?;

        Ok(Output {
            page_info: page.page_info(),
            items: page.edges.into_iter().map(|e| e.node).collect(),
            total_count,
        })
    }
}

/// Queries [`Application`]s received by a [`Listing`] on behalf of its
/// initiator.
#[derive(Clone, Debug)]
pub struct Received {
    /// ID of the [`Listing`] to query the [`Application`]s of.
    pub listing_id: listing::Id,

    /// ID of the [`user::User`] querying the [`Application`]s.
    pub requester_id: user::Id,

    /// [`application::Status`] of the [`Application`]s to query.
    ///
    /// [`application::Status::Withdrawn`] ones are excluded when absent.
    pub status: Option<application::Status>,

    /// Pagination arguments.
    pub arguments: read::application::list::Arguments,
}

impl<Db> Query<Received> for Service<Db>
where
    Db: Database<
        Select<By<Option<Listing>, listing::Id>>,
        Ok = Option<Listing>,
        Err = Traced<database::Error>,
    >,
    Self: Query<Feed, Ok = Output, Err = Traced<database::Error>>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        query: Received,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let Received {
            listing_id,
            requester_id,
            status,
            arguments,
        } = query;

        let listing = self
            .database()
            .execute(Select(By::<Option<Listing>, _>::new(listing_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ListingNotFound(listing_id))
            .map_err(tracerr::wrap!())?;
        if !listing.is_initiated_by(&requester_id) {
            return Err(tracerr::new!(E::Forbidden(requester_id)));
        }

        self.execute(Feed(read::application::list::Selector {
            arguments,
            filter: read::application::list::Filter {
                listing_id: Some(listing_id),
                applicant_id: None,
                status,
            },
        }))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`Received`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`user::User`] is not the initiator of the [`Listing`].
    #[display("`User(id: {_0})` is not allowed to view the `Application`s")]
    Forbidden(#[error(not(source))] user::Id),

    /// [`Listing`] with the provided ID does not exist.
    #[display("`Listing(id: {_0})` does not exist")]
    ListingNotFound(#[error(not(source))] listing::Id),
}
