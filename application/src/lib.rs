//! Application provides REST API for interacting with the [`Service`].

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

pub mod api;
pub mod args;
pub mod config;
mod context;
pub mod error;

// Used in binary.
use axum_client_ip as _;
use futures as _;
use refinery as _;
use tokio as _;
use tower_http as _;
use tracing_subscriber as _;

pub use self::{
    args::Args,
    config::Config,
    context::{Caller, Context},
    error::{AsError, Error},
};

/// [`Service`] with filled infrastructure dependencies.
///
/// [`Service`]: service::Service
pub type Service = service::Service<service::infra::Postgres>;

#[cfg(test)]
mod testing {
    //! Helpers for testing the REST API.
    //!
    //! [`Service`] is backed by a lazily connected [`Postgres`] pool, so only
    //! the operations failing before touching the database are testable here.
    //!
    //! [`Postgres`]: service::infra::Postgres

    use common::DateTime;
    use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
    use service::{
        command,
        domain::user,
        infra::{postgres, Postgres},
    };

    use crate::Service;

    /// Secret signing identity tokens in tests.
    pub(crate) const JWT_SECRET: &[u8] = b"test secret";

    /// Creates a new [`Service`] accepting tokens signed with the
    /// [`JWT_SECRET`].
    pub(crate) fn service() -> Service {
        let db = Postgres::new(&postgres::Config {
            host: Some("127.0.0.1".into()),
            dbname: Some("roomshare".into()),
            ..postgres::Config::default()
        })
        .unwrap();

        let mut validation = jsonwebtoken::Validation::new(Algorithm::HS256);
        validation.validate_aud = false;

        Service::new(
            service::Config {
                jwt_decoding_key: DecodingKey::from_secret(JWT_SECRET),
                jwt_validation: validation,
                retry: command::retry::Config {
                    attempts: 1,
                    backoff: std::time::Duration::ZERO,
                },
            },
            db,
        )
    }

    /// Issues a token of the provided user valid for an hour.
    pub(crate) fn token(user: &str) -> String {
        jsonwebtoken::encode(
            &Header::default(),
            &serde_json::json!({
                "sub": user,
                "exp": DateTime::now().unix_timestamp() + 3600,
            }),
            &EncodingKey::from_secret(JWT_SECRET),
        )
        .unwrap()
    }

    /// Parses the provided [`user::Id`].
    pub(crate) fn user(id: &str) -> user::Id {
        user::Id::new(id).unwrap()
    }
}
