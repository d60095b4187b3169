//! [`Query`] collection related to the multiple [`Listing`]s.

use std::collections::HashMap;

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::{listing, slot, Application, Listing},
    infra::{database, Database},
    read, Query, Service,
};

use super::DatabaseQuery;

/// Queries a list of [`Listing`]s.
pub type List =
    DatabaseQuery<By<read::listing::list::Page, read::listing::list::Selector>>;

/// Queries total count of [`Listing`] list items.
pub type TotalCount = DatabaseQuery<
    By<read::listing::list::TotalCount, read::listing::list::Filter>,
>;

/// Queries a list of [`Listing`]s along with their current
/// [`slot::Occupancy`] and the total count of the matching [`Listing`]s.
#[derive(Clone, Debug)]
pub struct Feed(pub read::listing::list::Selector);

/// Output of the [`Feed`] [`Query`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Queried [`Listing`]s with their [`slot::Occupancy`].
    pub items: Vec<read::listing::WithOccupancy>,

    /// Information about the queried page.
    pub page_info: read::listing::list::PageInfo,

    /// Total count of the [`Listing`]s matching the filter.
    pub total_count: read::listing::list::TotalCount,
}

impl<Db> Query<Feed> for Service<Db>
where
    Db: Database<
            Select<
                By<read::listing::list::Page, read::listing::list::Selector>,
            >,
            Ok = read::listing::list::Page,
            Err = Traced<database::Error>,
        > + Database<
            Select<
                By<
                    read::listing::list::TotalCount,
                    read::listing::list::Filter,
                >,
            >,
            Ok = read::listing::list::TotalCount,
            Err = Traced<database::Error>,
        > + Database<
            Select<
                By<HashMap<listing::Id, Vec<Application>>, Vec<listing::Id>>,
            >,
            Ok = HashMap<listing::Id, Vec<Application>>,
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
            .execute(Select(By::<read::listing::list::Page, _>::new(selector)))
            .await
            .map_err(tracerr::wrap!())?;
        let total_count = self
            .database()
            .execute(Select(By::<read::listing::list::TotalCount, _>::new(
                filter,
            )))
            .await
            .map_err(tracerr::wrap!())?;

        let ids = page.nodes().map(|l| l.id).collect::<Vec<_>>();
        let mut applications = self
            .database()
            .execute(Select(By::<HashMap<_, Vec<Application>>, _>::new(ids)))
            .await
            .map_err(tracerr::wrap!())?;

        let page_info = page.page_info();
        let items = page
            .edges
            .into_iter()
            .map(|e| {
                let listing: Listing = e.node;
                let apps = applications.remove(&listing.id).unwrap_or_default();
                let occupancy = slot::Occupancy::of(&listing, &apps);
                read::listing::WithOccupancy { listing, occupancy }
            })
            .collect();

        Ok(Output {
            items,
            page_info,
            total_count,
        })
    }
}
