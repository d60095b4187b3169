//! Helpers shared by the integration tests.

#![allow(dead_code, reason = "not every test uses every helper")]

use std::time::Duration;

use common::operations::{By, Select};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use service::{
    command::{self, CreateListing, DecideApplication, SubmitApplication},
    domain::{application, lease, listing, user, Application, Listing},
    infra::{Database as _, Memory},
    Command as _, Config, Service,
};

/// Creates a new [`Service`] upon an empty [`Memory`] database, returning the
/// database too.
pub fn service() -> (Service<Memory>, Memory) {
    let db = Memory::new();
    let config = Config {
        jwt_decoding_key: DecodingKey::from_secret(b"secret"),
        jwt_validation: Validation::new(Algorithm::HS256),
        retry: command::retry::Config {
            attempts: 2,
            backoff: Duration::ZERO,
        },
    };
    (Service::new(config, db.clone()), db)
}

/// Parses the provided [`user::Id`].
pub fn user(id: &str) -> user::Id {
    user::Id::new(id).unwrap()
}

/// Builds a [`CreateListing`] with the provided capacity.
pub fn create_listing(
    initiator: &str,
    role: listing::InitiatorRole,
    total_spots: u16,
) -> CreateListing {
    CreateListing {
        initiator_id: user(initiator),
        initiator_role: role,
        total_spots: listing::TotalSpots::new(total_spots),
        bedrooms: total_spots,
        lease_duration: lease::Duration::SixToTwelveMonths,
        title: listing::Title::new("Two rooms near the beach").unwrap(),
        description: listing::Description::new("Quiet street, fast wifi"),
        address: None,
    }
}

/// Builds a [`SubmitApplication`] without any lease proposal.
pub fn submit(listing_id: listing::Id, applicant: &str) -> SubmitApplication {
    SubmitApplication {
        listing_id,
        applicant_id: user(applicant),
        message: None,
        lease_duration: None,
    }
}

/// Submits an [`Application`] and accepts it on behalf of the `initiator`.
pub async fn accepted(
    svc: &Service<Memory>,
    listing_id: listing::Id,
    initiator: &str,
    applicant: &str,
) -> Application {
    let application = svc.execute(submit(listing_id, applicant)).await.unwrap();
    svc.execute(DecideApplication {
        application_id: application.id,
        decider_id: user(initiator),
        decision: application::Decision::Accept,
    })
    .await
    .unwrap()
}

/// Reads the stored [`Listing`].
pub async fn stored_listing(svc: &Service<Memory>, id: listing::Id) -> Listing {
    svc.database()
        .execute(Select(By::<Option<Listing>, _>::new(id)))
        .await
        .unwrap()
        .unwrap()
}

/// Reads all the stored [`Application`]s of a [`Listing`].
pub async fn stored_applications(
    svc: &Service<Memory>,
    id: listing::Id,
) -> Vec<Application> {
    svc.database()
        .execute(Select(By::<Vec<Application>, _>::new(id)))
        .await
        .unwrap()
}
