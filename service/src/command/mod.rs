//! [`Command`] definition.

pub mod authorize_caller;
pub mod cancel_listing;
pub mod create_listing;
pub mod decide_application;
pub mod finalize_listing;
pub mod retry;
pub mod submit_application;
pub mod withdraw_application;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use common::operations::Retry;

pub use self::{
    authorize_caller::AuthorizeCaller, cancel_listing::CancelListing,
    create_listing::CreateListing, decide_application::DecideApplication,
    finalize_listing::FinalizeListing, retry::Transient,
    submit_application::SubmitApplication,
    withdraw_application::WithdrawApplication,
};
