//! [`Command`] for creating a new [`Listing`].

use common::operations::Insert;
use tracerr::Traced;

use crate::{
    domain::{lease, listing, user, Listing, Version},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Listing`].
#[derive(Clone, Debug)]
pub struct CreateListing {
    /// ID of the [`user::User`] creating a new [`Listing`].
    pub initiator_id: user::Id,

    /// [`listing::InitiatorRole`] of the [`user::User`] creating a new
    /// [`Listing`].
    pub initiator_role: listing::InitiatorRole,

    /// Explicit capacity of a new [`Listing`], if any.
    pub total_spots: Option<listing::TotalSpots>,

    /// Number of bedrooms of a new [`Listing`].
    pub bedrooms: listing::Bedrooms,

    /// [`lease::Duration`] of a new [`Listing`].
    pub lease_duration: lease::Duration,

    /// [`listing::Title`] of a new [`Listing`].
    pub title: listing::Title,

    /// [`listing::Description`] of a new [`Listing`].
    pub description: Option<listing::Description>,

    /// [`listing::Address`] of a new [`Listing`].
    pub address: Option<listing::Address>,
}

impl<Db> Command<CreateListing> for Service<Db>
where
    Db: Database<Insert<Listing>, Err = Traced<database::Error>>,
{
    type Ok = Listing;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateListing) -> Result<Self::Ok, Self::Err> {
        let CreateListing {
            initiator_id,
            initiator_role,
            total_spots,
            bedrooms,
            lease_duration,
            title,
            description,
            address,
        } = cmd;

        let created_at = listing::CreationDateTime::now();
        let listing = Listing {
            id: listing::Id::new(),
            initiator_id,
            initiator_role,
            total_spots,
            bedrooms,
            lease_duration,
            title,
            description,
            address,
            status: listing::Status::Active,
            version: Version::INITIAL,
            created_at,
            updated_at: created_at.coerce(),
        };

        self.database()
            .execute(Insert(listing.clone()))
            .await
            .map_err(tracerr::wrap!())
            .map(drop)?;

        tracing::debug!(
            listing_id = %listing.id,
            initiator_id = %listing.initiator_id,
            "`Listing` created",
        );

        Ok(listing)
    }
}

/// Error of [`CreateListing`] [`Command`] execution.
pub type ExecutionError = database::Error;

#[cfg(test)]
mod spec {
    use crate::{
        domain::{listing, slot, Version},
        testing, Command as _,
    };

    #[tokio::test]
    async fn creates_active_listing() {
        let (svc, _) = testing::service();

        let listing = svc
            .execute(testing::create_listing("landlord"))
            .await
            .unwrap();

        assert_eq!(listing.status, listing::Status::Active);
        assert_eq!(listing.version, Version::INITIAL);
        assert_eq!(listing.initiator_id, testing::user("landlord"));

        let stored = testing::stored_listing(&svc, listing.id).await;
        assert_eq!(stored.title, listing.title);
    }

    #[tokio::test]
    async fn capacity_falls_back_to_bedrooms() {
        let (svc, _) = testing::service();

        let mut cmd = testing::create_listing("landlord");
        cmd.initiator_role = listing::InitiatorRole::Landlord;
        cmd.total_spots = None;
        cmd.bedrooms = 0;
        let listing = svc.execute(cmd).await.unwrap();

        let occupancy = slot::Occupancy::of(&listing, []);
        assert_eq!(occupancy.total, 1);
        assert_eq!(occupancy.filled, 0);
    }
}
