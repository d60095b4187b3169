//! [`Query`] collection related to a single [`Listing`].

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::{listing, slot, Application, Listing},
    infra::{database, Database},
    read, Query, Service,
};

use super::DatabaseQuery;

/// Queries a [`Listing`] by its [`listing::Id`].
pub type ById = DatabaseQuery<By<Option<Listing>, listing::Id>>;

/// Queries a [`Listing`] along with its current [`slot::Occupancy`].
#[derive(Clone, Copy, Debug)]
pub struct Occupancy {
    /// ID of the [`Listing`] to query.
    pub listing_id: listing::Id,
}

impl<Db> Query<Occupancy> for Service<Db>
where
    Db: Database<
            Select<By<Option<Listing>, listing::Id>>,
            Ok = Option<Listing>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Application>, listing::Id>>,
            Ok = Vec<Application>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Option<read::listing::WithOccupancy>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Occupancy { listing_id }: Occupancy,
    ) -> Result<Self::Ok, Self::Err> {
        let Some(listing) = self
            .database()
            .execute(Select(By::<Option<Listing>, _>::new(listing_id)))
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };

        let applications = self
            .database()
            .execute(Select(By::<Vec<Application>, _>::new(listing_id)))
            .await
            .map_err(tracerr::wrap!())?;

        let occupancy = slot::Occupancy::of(&listing, &applications);
        Ok(Some(read::listing::WithOccupancy { listing, occupancy }))
    }
}

#[cfg(test)]
mod spec {
    use crate::{domain::listing, testing, Query as _};

    use super::Occupancy;

    #[tokio::test]
    async fn counts_tenant_and_accepted() {
        let (svc, _) = testing::service();
        let mut cmd = testing::create_listing("tenant");
        cmd.total_spots = listing::TotalSpots::new(3);
        let listing = svc.execute(cmd).await.unwrap();
        drop(testing::accepted(&svc, listing.id, "alice").await);
        drop(testing::submit(&svc, listing.id, "bob").await);

        let read = svc
            .execute(Occupancy {
                listing_id: listing.id,
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(read.occupancy.filled, 2);
        assert_eq!(read.occupancy.total, 3);
        assert!(!read.occupancy.is_full());
    }

    #[tokio::test]
    async fn unknown_listing_is_none() {
        let (svc, _) = testing::service();

        let read = svc
            .execute(Occupancy {
                listing_id: listing::Id::new(),
            })
            .await
            .unwrap();

        assert!(read.is_none());
    }
}
