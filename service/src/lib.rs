//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;

use derive_more::Debug;

#[cfg(doc)]
use infra::Database;

pub use self::{command::Command, query::Query};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [JWT] decoding key of the identity provider.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_decoding_key: jsonwebtoken::DecodingKey,

    /// [JWT] validation rules of the identity provider.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    pub jwt_validation: jsonwebtoken::Validation,

    /// [`command::Retry`] configuration.
    pub retry: command::retry::Config,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,
}

impl<Db> Service<Db> {
    /// Creates a new [`Service`] with the provided parameters.
    #[must_use]
    pub fn new(config: Config, database: Db) -> Self {
        Self { config, database }
    }

    /// Returns [`Config`] of this [`Service`].
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }
}

#[cfg(test)]
mod testing {
    //! Helpers for testing [`Service`] upon an [`infra::Memory`] database.

    use common::operations::{By, Select};
    use jsonwebtoken::{Algorithm, DecodingKey, Validation};

    use crate::{
        command::{self, CreateListing, DecideApplication, SubmitApplication},
        domain::{application, lease, listing, user, Application, Listing},
        infra::{Database as _, Memory},
        Command as _, Config, Service,
    };

    /// Secret signing identity tokens in tests.
    pub(crate) const JWT_SECRET: &[u8] = b"test secret";

    /// Creates a new [`Service`] upon an empty [`Memory`] database, returning
    /// the database too.
    pub(crate) fn service() -> (Service<Memory>, Memory) {
        let db = Memory::new();
        let config = Config {
            jwt_decoding_key: DecodingKey::from_secret(JWT_SECRET),
            jwt_validation: Validation::new(Algorithm::HS256),
            retry: command::retry::Config {
                attempts: 2,
                backoff: std::time::Duration::ZERO,
            },
        };
        (Service::new(config, db.clone()), db)
    }

    /// Parses the provided [`user::Id`].
    pub(crate) fn user(id: &str) -> user::Id {
        user::Id::new(id).unwrap()
    }

    /// Builds a [`CreateListing`] of a tenant looking for a single roommate.
    pub(crate) fn create_listing(initiator: &str) -> CreateListing {
        CreateListing {
            initiator_id: user(initiator),
            initiator_role: listing::InitiatorRole::Tenant,
            total_spots: listing::TotalSpots::new(2),
            bedrooms: 2,
            lease_duration: lease::Duration::SixToTwelveMonths,
            title: listing::Title::new("Room in a shared flat").unwrap(),
            description: None,
            address: None,
        }
    }

    /// Creates a [`Listing`] of a tenant looking for a single roommate.
    pub(crate) async fn listing(
        svc: &Service<Memory>,
        initiator: &str,
    ) -> Listing {
        svc.execute(create_listing(initiator)).await.unwrap()
    }

    /// Submits a pending [`Application`] to the provided [`Listing`].
    pub(crate) async fn submit(
        svc: &Service<Memory>,
        listing_id: listing::Id,
        applicant: &str,
    ) -> Application {
        svc.execute(SubmitApplication {
            listing_id,
            applicant_id: user(applicant),
            message: None,
            lease_duration: None,
        })
        .await
        .unwrap()
    }

    /// Submits an [`Application`] to the provided [`Listing`] and accepts it
    /// on behalf of the [`Listing`] initiator.
    pub(crate) async fn accepted(
        svc: &Service<Memory>,
        listing_id: listing::Id,
        applicant: &str,
    ) -> Application {
        let initiator = stored_listing(svc, listing_id).await.initiator_id;
        let application = submit(svc, listing_id, applicant).await;
        svc.execute(DecideApplication {
            application_id: application.id,
            decider_id: initiator,
            decision: application::Decision::Accept,
        })
        .await
        .unwrap()
    }

    /// Reads the stored [`Listing`].
    pub(crate) async fn stored_listing(
        svc: &Service<Memory>,
        id: listing::Id,
    ) -> Listing {
        svc.database()
            .execute(Select(By::<Option<Listing>, _>::new(id)))
            .await
            .unwrap()
            .unwrap()
    }

    /// Reads the stored [`Application`].
    pub(crate) async fn stored_application(
        svc: &Service<Memory>,
        id: application::Id,
    ) -> Application {
        svc.database()
            .execute(Select(By::<Option<Application>, _>::new(id)))
            .await
            .unwrap()
            .unwrap()
    }
}
