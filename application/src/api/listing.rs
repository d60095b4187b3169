//! [`Listing`]-related definitions.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    Json,
};
use common::DateTime;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, Command as _, Retry},
    domain::{lease, listing, slot, user},
    query::{self, Query as _},
    read,
};
use uuid::Uuid;

use crate::{
    api::{
        self, FeedParams, NotFoundError, Paginated, Pagination,
        PrivilegeError, StateError, Success,
    },
    define_error, AsError, Caller, Context, Error,
};

/// Room-share listing along with its slots occupancy.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    /// Unique ID of this [`Listing`].
    pub id: listing::Id,

    /// ID of the user who created this [`Listing`].
    pub initiator_id: user::Id,

    /// Role of the user who created this [`Listing`].
    pub initiator_role: listing::InitiatorRole,

    /// Explicitly requested number of slots, if any.
    pub total_spots: Option<u16>,

    /// Number of bedrooms.
    pub bedrooms: listing::Bedrooms,

    /// Offered lease duration.
    pub lease_duration: lease::Duration,

    /// Title of this [`Listing`].
    pub title: String,

    /// Description of this [`Listing`].
    pub description: Option<String>,

    /// Address of the offered property.
    pub address: Option<String>,

    /// Current status of this [`Listing`].
    pub status: listing::Status,

    /// Number of occupied slots.
    pub filled_slots: u32,

    /// Total number of slots.
    pub total_slots: u32,

    /// [`DateTime`] when this [`Listing`] was created.
    pub created_at: DateTime,

    /// [`DateTime`] when this [`Listing`] was modified the last time.
    pub updated_at: DateTime,
}

impl From<read::listing::WithOccupancy> for Listing {
    fn from(read: read::listing::WithOccupancy) -> Self {
        let read::listing::WithOccupancy {
            listing,
            occupancy: slot::Occupancy { filled, total },
        } = read;

        Self {
            id: listing.id,
            initiator_id: listing.initiator_id,
            initiator_role: listing.initiator_role,
            total_spots: listing.total_spots.map(Into::into),
            bedrooms: listing.bedrooms,
            lease_duration: listing.lease_duration,
            title: listing.title.to_string(),
            description: listing.description.as_ref().map(ToString::to_string),
            address: listing.address.as_ref().map(ToString::to_string),
            status: listing.status,
            filled_slots: filled,
            total_slots: total,
            created_at: listing.created_at.coerce(),
            updated_at: listing.updated_at.coerce(),
        }
    }
}

/// Body of a [`create()`] request.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    /// Role of the user creating the [`Listing`].
    pub initiator_role: listing::InitiatorRole,

    /// Explicit number of slots, defaults to the number of bedrooms.
    pub total_spots: Option<u16>,

    /// Number of bedrooms.
    pub bedrooms: listing::Bedrooms,

    /// Offered lease duration.
    pub lease_duration: lease::Duration,

    /// Title of the [`Listing`].
    pub title: String,

    /// Description of the [`Listing`].
    pub description: Option<String>,

    /// Address of the offered property.
    pub address: Option<String>,
}

impl CreateRequest {
    /// Validates this [`CreateRequest`] turning it into a
    /// [`command::CreateListing`] on behalf of the provided initiator.
    ///
    /// # Errors
    ///
    /// With [`InputError`] if any of the fields is invalid.
    pub fn into_command(
        self,
        initiator_id: user::Id,
    ) -> Result<command::CreateListing, Error> {
        let Self {
            initiator_role,
            total_spots,
            bedrooms,
            lease_duration,
            title,
            description,
            address,
        } = self;

        Ok(command::CreateListing {
            initiator_id,
            initiator_role,
            total_spots: total_spots
                .map(|n| {
                    listing::TotalSpots::new(n).ok_or(InputError::TotalSpots)
                })
                .transpose()?,
            bedrooms,
            lease_duration,
            title: listing::Title::new(title).ok_or(InputError::Title)?,
            description: description
                .map(|d| {
                    listing::Description::new(d)
                        .ok_or(InputError::Description)
                })
                .transpose()?,
            address: address
                .map(|a| listing::Address::new(a).ok_or(InputError::Address))
                .transpose()?,
        })
    }
}

/// Output of a [`finalize()`] request.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finalized {
    /// Finalized [`Listing`].
    pub listing: Listing,

    /// Number of `Application`s signed by the finalization.
    pub updated_applications_count: u32,
}

/// Creates a new [`Listing`] on behalf of the caller.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_INPUT` - provided body is malformed or invalid.
#[tracing::instrument(
    skip_all,
    fields(
        http.operation = "createListing",
        otel.name = api::SPAN_NAME,
        user.id = %caller.user_id,
    ),
)]
pub async fn create(
    ctx: Context,
    caller: Caller,
    body: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<(http::StatusCode, Success<Listing>), Error> {
    let Json(body) = body.map_err(AsError::into_error)?;
    let cmd = body.into_command(caller.user_id)?;

    let listing = ctx
        .service()
        .execute(Retry(cmd))
        .await
        .map_err(AsError::into_error)?;
    let occupancy = slot::Occupancy::of(&listing, []);

    Ok((
        http::StatusCode::CREATED,
        Success(read::listing::WithOccupancy { listing, occupancy }.into()),
    ))
}

/// Returns the public feed of [`Listing`]s, newest first.
///
/// Only active [`Listing`]s are returned, unless another status is requested.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_INPUT` - provided query parameters are invalid.
#[tracing::instrument(
    skip_all,
    fields(
        http.operation = "listingsFeed",
        otel.name = api::SPAN_NAME,
        user.id = %caller.user_id,
    ),
)]
pub async fn feed(
    ctx: Context,
    caller: Caller,
    params: Result<Query<FeedParams<listing::Status>>, QueryRejection>,
) -> Result<Success<Paginated<Listing, listing::Id>>, Error> {
    let Query(params) = params.map_err(AsError::into_error)?;

    execute_feed(
        &ctx,
        read::listing::list::Filter {
            initiator_id: None,
            status: Some(params.status.unwrap_or(listing::Status::Active)),
        },
        &params,
    )
    .await
    .map(Success)
}

/// Executes the [`query::listings::Feed`] with the provided parameters.
pub(crate) async fn execute_feed<S>(
    ctx: &Context,
    filter: read::listing::list::Filter,
    params: &FeedParams<S>,
) -> Result<Paginated<Listing, listing::Id>, Error> {
    let output = ctx
        .service()
        .execute(query::listings::Feed(read::listing::list::Selector {
            arguments: params.arguments(ctx.feed())?,
            filter,
        }))
        .await
        .map_err(AsError::into_error)?;

    Ok(Paginated {
        items: output.items.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(output.page_info, output.total_count),
    })
}

/// Returns the [`Listing`] with the provided ID.
///
/// # Errors
///
/// Possible error codes:
/// - `LISTING_NOT_FOUND` - [`Listing`] with the provided ID does not exist.
#[tracing::instrument(
    skip_all,
    fields(
        http.operation = "listing",
        listing.id = ?id,
        otel.name = api::SPAN_NAME,
        user.id = %caller.user_id,
    ),
)]
pub async fn get(
    ctx: Context,
    caller: Caller,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Success<Listing>, Error> {
    let Path(id) = id.map_err(AsError::into_error)?;

    with_occupancy(&ctx, id.into()).await.map(Success)
}

/// Queries the [`Listing`] with the provided ID along with its occupancy.
async fn with_occupancy(
    ctx: &Context,
    listing_id: listing::Id,
) -> Result<Listing, Error> {
    ctx.service()
        .execute(query::listing::Occupancy { listing_id })
        .await
        .map_err(AsError::into_error)?
        .map(Into::into)
        .ok_or_else(|| NotFoundError::Listing.into())
}

/// Cancels the [`Listing`] with the provided ID on behalf of its initiator.
///
/// `Application`s of the [`Listing`] are left untouched.
///
/// # Errors
///
/// Possible error codes:
/// - `LISTING_NOT_FOUND` - [`Listing`] with the provided ID does not exist;
/// - `FORBIDDEN` - caller is not the [`Listing`] initiator;
/// - `INVALID_STATE` - [`Listing`] is not active anymore.
#[tracing::instrument(
    skip_all,
    fields(
        http.operation = "cancelListing",
        listing.id = ?id,
        otel.name = api::SPAN_NAME,
        user.id = %caller.user_id,
    ),
)]
pub async fn cancel(
    ctx: Context,
    caller: Caller,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Success<Listing>, Error> {
    let Path(id) = id.map_err(AsError::into_error)?;

    let listing = ctx
        .service()
        .execute(Retry(command::CancelListing {
            listing_id: id.into(),
            requester_id: caller.user_id,
        }))
        .await
        .map_err(AsError::into_error)?;

    with_occupancy(&ctx, listing.id).await.map(Success)
}

/// Finalizes the [`Listing`] with the provided ID on behalf of its
/// initiator, signing all its accepted `Application`s.
///
/// # Errors
///
/// Possible error codes:
/// - `LISTING_NOT_FOUND` - [`Listing`] with the provided ID does not exist;
/// - `FORBIDDEN` - caller is not the [`Listing`] initiator;
/// - `INVALID_STATE` - [`Listing`] is not active anymore;
/// - `INSUFFICIENT_SLOTS_FILLED` - not all the [`Listing`] slots are filled.
#[tracing::instrument(
    skip_all,
    fields(
        http.operation = "finalizeListing",
        listing.id = ?id,
        otel.name = api::SPAN_NAME,
        user.id = %caller.user_id,
    ),
)]
pub async fn finalize(
    ctx: Context,
    caller: Caller,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Success<Finalized>, Error> {
    let Path(id) = id.map_err(AsError::into_error)?;

    let read::listing::Finalized {
        listing,
        signed_applications,
    } = ctx
        .service()
        .execute(Retry(command::FinalizeListing {
            listing_id: id.into(),
            requester_id: caller.user_id,
        }))
        .await
        .map_err(AsError::into_error)?;

    Ok(Success(Finalized {
        listing: with_occupancy(&ctx, listing.id).await?,
        updated_applications_count: signed_applications,
    }))
}

impl AsError for command::cancel_listing::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Forbidden(_) => Some(PrivilegeError::Forbidden.into()),
            Self::InvalidState(e) => {
                Some(StateError::InvalidState.with_message(e))
            }
            Self::ListingNotFound(_) => Some(NotFoundError::Listing.into()),
        }
    }
}

impl AsError for command::finalize_listing::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "INSUFFICIENT_SLOTS_FILLED"]
                #[status = CONFLICT]
                #[message = "Not all the `Listing` slots are filled"]
                InsufficientSlotsFilled,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Forbidden(_) => Some(PrivilegeError::Forbidden.into()),
            Self::InsufficientSlotsFilled { .. } => Some(crate::Error {
                message: self.to_string(),
                ..crate::Error::from(Error::InsufficientSlotsFilled)
            }),
            Self::InvalidState(e) => {
                Some(StateError::InvalidState.with_message(e))
            }
            Self::ListingNotFound(_) => Some(NotFoundError::Listing.into()),
            Self::InvalidApplicationState(_) => None,
        }
    }
}

define_error! {
    enum InputError {
        #[code = "INVALID_INPUT"]
        #[status = BAD_REQUEST]
        #[message = "`title` must be non-empty, trimmed and at most 256 \
                     characters long"]
        Title,

        #[code = "INVALID_INPUT"]
        #[status = BAD_REQUEST]
        #[message = "`description` must be non-blank and at most 4096 \
                     characters long"]
        Description,

        #[code = "INVALID_INPUT"]
        #[status = BAD_REQUEST]
        #[message = "`address` must be non-empty, trimmed and at most 512 \
                     characters long"]
        Address,

        #[code = "INVALID_INPUT"]
        #[status = BAD_REQUEST]
        #[message = "`totalSpots` must be positive"]
        TotalSpots,
    }
}

#[cfg(test)]
mod spec {
    use service::domain::{lease, listing};

    use crate::testing;

    use super::CreateRequest;

    fn request(json: serde_json::Value) -> CreateRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn parses_create_request() {
        let cmd = request(serde_json::json!({
            "initiatorRole": "tenant",
            "bedrooms": 3,
            "leaseDuration": "6-12 months",
            "title": "Room in Canggu",
            "address": "Jl. Pantai Batu Bolong 1",
        }))
        .into_command(testing::user("ann"))
        .unwrap();

        assert_eq!(cmd.initiator_role, listing::InitiatorRole::Tenant);
        assert!(cmd.total_spots.is_none());
        assert_eq!(cmd.bedrooms, 3);
        assert_eq!(cmd.lease_duration, lease::Duration::SixToTwelveMonths);
        assert_eq!(cmd.title.to_string(), "Room in Canggu");
        assert!(cmd.description.is_none());
        assert!(cmd.address.is_some());
    }

    #[test]
    fn rejects_invalid_fields() {
        for json in [
            serde_json::json!({
                "initiatorRole": "landlord",
                "bedrooms": 2,
                "leaseDuration": "Negotiable",
                "title": " padded ",
            }),
            serde_json::json!({
                "initiatorRole": "landlord",
                "totalSpots": 0,
                "bedrooms": 2,
                "leaseDuration": "1 year+",
                "title": "Room",
            }),
            serde_json::json!({
                "initiatorRole": "platform",
                "bedrooms": 2,
                "leaseDuration": "1-3 months",
                "title": "Room",
                "description": "   ",
            }),
        ] {
            let err = request(json)
                .into_command(testing::user("ann"))
                .unwrap_err();

            assert_eq!(err.code, "INVALID_INPUT");
            assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn rejects_unknown_lease_duration() {
        let res = serde_json::from_value::<CreateRequest>(serde_json::json!({
            "initiatorRole": "tenant",
            "bedrooms": 2,
            "leaseDuration": "forever",
            "title": "Room",
        }));

        assert!(res.is_err());
    }
}
