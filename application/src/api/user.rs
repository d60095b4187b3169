//! Feeds of the calling user.

use axum::extract::{rejection::QueryRejection, Query};
use service::{
    domain::{application, listing},
    query::{self, Query as _},
    read,
};

use crate::{
    api::{self, Application, FeedParams, Listing, Paginated, Success},
    AsError, Caller, Context, Error,
};

/// Returns [`Listing`]s created by the caller, newest first.
///
/// [`Listing`]s of any status are returned, unless filtered explicitly.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_INPUT` - provided query parameters are invalid.
#[tracing::instrument(
    skip_all,
    fields(
        http.operation = "myListings",
        otel.name = api::SPAN_NAME,
        user.id = %caller.user_id,
    ),
)]
pub async fn listings(
    ctx: Context,
    caller: Caller,
    params: Result<Query<FeedParams<listing::Status>>, QueryRejection>,
) -> Result<Success<Paginated<Listing, listing::Id>>, Error> {
    let Query(params) = params.map_err(AsError::into_error)?;

    api::listing::execute_feed(
        &ctx,
        read::listing::list::Filter {
            initiator_id: Some(caller.user_id),
            status: params.status,
        },
        &params,
    )
    .await
    .map(Success)
}

/// Returns [`Application`]s submitted by the caller, newest first.
///
/// Withdrawn [`Application`]s are omitted, unless requested explicitly.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_INPUT` - provided query parameters are invalid.
#[tracing::instrument(
    skip_all,
    fields(
        http.operation = "myApplications",
        otel.name = api::SPAN_NAME,
        user.id = %caller.user_id,
    ),
)]
pub async fn applications(
    ctx: Context,
    caller: Caller,
    params: Result<Query<FeedParams<application::Status>>, QueryRejection>,
) -> Result<Success<Paginated<Application, application::Id>>, Error> {
    let Query(params) = params.map_err(AsError::into_error)?;

    let output = ctx
        .service()
        .execute(query::applications::Feed(
            read::application::list::Selector {
                arguments: params.arguments(ctx.feed())?,
                filter: read::application::list::Filter {
                    listing_id: None,
                    applicant_id: Some(caller.user_id),
                    status: params.status,
                },
            },
        ))
        .await
        .map_err(AsError::into_error)?;

    Ok(Success(output.into()))
}
