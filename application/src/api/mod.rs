//! REST API definitions.

pub mod application;
pub mod listing;
pub mod user;

use axum::{
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use common::pagination;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config, define_error, Error};

pub use self::{application::Application, listing::Listing};

/// Name of the [`tracing::Span`] for the REST API operations.
const SPAN_NAME: &str = "REST operation";

/// Creates a new [`Router`] serving the REST API.
///
/// [`Context`] is expected to be provided as an [`axum::Extension`].
///
/// [`Context`]: crate::Context
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/listings", post(listing::create).get(listing::feed))
        .route("/listings/:id", get(listing::get))
        .route("/listings/:id/cancel", patch(listing::cancel))
        .route("/listings/:id/finalize", patch(listing::finalize))
        .route(
            "/listings/:id/applications",
            post(application::submit).get(application::received),
        )
        .route(
            "/applications/:id",
            patch(application::decide).delete(application::withdraw),
        )
        .route("/applications/:id/cancel", patch(application::withdraw))
        .route("/users/me/listings", get(user::listings))
        .route("/users/me/applications", get(user::applications))
}

/// Liveness check.
#[expect(clippy::unused_async, reason = "`async` is required by `axum`")]
async fn health() -> Success<Health> {
    Success(Health { status: "ok" })
}

/// Status of this application.
#[derive(Clone, Copy, Debug, Serialize)]
struct Health {
    /// Always `ok`.
    status: &'static str,
}

/// Envelope of a successful response.
#[derive(Clone, Debug)]
pub struct Success<T>(pub T);

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct Envelope<T> {
            success: bool,
            data: T,
        }

        Json(Envelope {
            success: true,
            data: self.0,
        })
        .into_response()
    }
}

/// Page of items in a paginated feed.
#[derive(Clone, Debug, Serialize)]
pub struct Paginated<T, C> {
    /// Items on this page.
    pub items: Vec<T>,

    /// Information about this page.
    pub pagination: Pagination<C>,
}

/// Information about a [`Paginated`] page.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination<C> {
    /// Cursor to request the next page with.
    pub next_cursor: Option<C>,

    /// Indicator whether there is a next page.
    pub has_next_page: bool,

    /// Total count of the items matching the filter.
    pub total_count: i32,
}

impl<C> Pagination<C> {
    /// Creates a new [`Pagination`] out of the provided
    /// [`pagination::PageInfo`] and total count.
    pub fn new(
        page_info: pagination::PageInfo<C>,
        total_count: impl Into<i32>,
    ) -> Self {
        let pagination::PageInfo {
            end_cursor,
            has_next_page,
        } = page_info;
        Self {
            next_cursor: end_cursor,
            has_next_page,
            total_count: total_count.into(),
        }
    }
}

/// Query parameters of a paginated feed.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedParams<S> {
    /// Status of the items to return.
    pub status: Option<S>,

    /// Maximum number of items to return.
    pub limit: Option<usize>,

    /// Cursor of the item to return the ones after.
    pub start_cursor: Option<Uuid>,
}

impl<S> FeedParams<S> {
    /// Converts these [`FeedParams`] into the [`pagination::Arguments`].
    ///
    /// # Errors
    ///
    /// With [`PaginationError::InvalidLimit`] if the requested limit is zero
    /// or exceeds the configured maximum.
    pub fn arguments<C: From<Uuid>>(
        &self,
        feed: config::Feed,
    ) -> Result<pagination::Arguments<C>, Error> {
        pagination::Arguments::new(
            self.limit,
            self.start_cursor.map(C::from),
            feed.default_page_size,
            feed.max_page_size,
        )
        .ok_or_else(|| PaginationError::InvalidLimit.into())
    }
}

define_error! {
    enum PaginationError {
        #[code = "INVALID_INPUT"]
        #[status = BAD_REQUEST]
        #[message = "`limit` must be positive and not exceed the maximum \
                     page size"]
        InvalidLimit,
    }
}

define_error! {
    enum NotFoundError {
        #[code = "LISTING_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "`Listing` does not exist"]
        Listing,

        #[code = "APPLICATION_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "`Application` does not exist"]
        Application,
    }
}

define_error! {
    enum PrivilegeError {
        #[code = "FORBIDDEN"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` is not allowed to perform this \
                     action"]
        Forbidden,
    }
}

define_error! {
    enum StateError {
        #[code = "INVALID_STATE"]
        #[status = CONFLICT]
        #[message = "Action is not allowed in the current status"]
        InvalidState,

        #[code = "LISTING_NOT_OPEN"]
        #[status = CONFLICT]
        #[message = "`Listing` is not open for `Application`s"]
        ListingNotOpen,

        #[code = "LISTING_NOT_ACTIVE"]
        #[status = CONFLICT]
        #[message = "`Listing` is not active anymore"]
        ListingNotActive,
    }
}

impl StateError {
    /// Converts this [`StateError`] into an [`Error`] with the provided
    /// detailed message.
    fn with_message(self, msg: &impl ToString) -> Error {
        Error {
            message: msg.to_string(),
            ..Error::from(self)
        }
    }
}
