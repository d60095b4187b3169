//! [`Application`]-related definitions.

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
    domain::{application, lease, listing, user},
    query::{self, Query as _},
};
use uuid::Uuid;

use crate::{
    api::{
        self, FeedParams, NotFoundError, Paginated, Pagination,
        PrivilegeError, StateError, Success,
    },
    define_error, AsError, Caller, Context, Error,
};

/// Request of a user to take a slot of a `Listing`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    /// Unique ID of this [`Application`].
    pub id: application::Id,

    /// ID of the `Listing` this [`Application`] is submitted to.
    pub listing_id: listing::Id,

    /// ID of the user who submitted this [`Application`].
    pub applicant_id: user::Id,

    /// Message to the `Listing` initiator.
    pub message: Option<String>,

    /// Lease duration proposed by the applicant.
    pub lease_duration: Option<lease::Duration>,

    /// Current status of this [`Application`].
    pub status: application::Status,

    /// [`DateTime`] when this [`Application`] was submitted.
    pub created_at: DateTime,

    /// [`DateTime`] when this [`Application`] was modified the last time.
    pub updated_at: DateTime,
}

impl From<service::domain::Application> for Application {
    fn from(application: service::domain::Application) -> Self {
        let service::domain::Application {
            id,
            listing_id,
            applicant_id,
            message,
            lease_duration,
            status,
            version: _,
            created_at,
            updated_at,
        } = application;

        Self {
            id,
            listing_id,
            applicant_id,
            message: message.as_ref().map(ToString::to_string),
            lease_duration,
            status,
            created_at: created_at.coerce(),
            updated_at: updated_at.coerce(),
        }
    }
}

/// Body of a [`submit()`] request.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    /// Message to the `Listing` initiator.
    pub message: Option<String>,

    /// Lease duration proposal, required by `Listing`s with a negotiable
    /// one.
    ///
    /// Kept as provided: an unknown value is rejected with
    /// `INVALID_LEASE_DURATION` only when it matters.
    pub lease_duration: Option<lease::Proposal>,
}

/// Body of a [`decide()`] request.
///
/// Either the decision itself or the desired status is accepted.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(untagged)]
pub enum DecideRequest {
    /// Decision upon the [`Application`].
    Decision {
        /// `accept` or `reject`.
        decision: application::Decision,
    },

    /// Desired status of the [`Application`].
    Status {
        /// `accepted` or `rejected`.
        status: application::Status,
    },
}

impl DecideRequest {
    /// Returns the [`application::Decision`] requested by this
    /// [`DecideRequest`].
    ///
    /// # Errors
    ///
    /// With [`InputError::Decision`] if the requested status cannot be
    /// decided upon.
    pub fn decision(self) -> Result<application::Decision, Error> {
        match self {
            Self::Decision { decision } => Ok(decision),
            Self::Status {
                status: application::Status::Accepted,
            } => Ok(application::Decision::Accept),
            Self::Status {
                status: application::Status::Rejected,
            } => Ok(application::Decision::Reject),
            Self::Status {
                status:
                    application::Status::Pending
                    | application::Status::Signed
                    | application::Status::Withdrawn,
            } => Err(InputError::Decision.into()),
        }
    }
}

/// Submits a new [`Application`] to the `Listing` with the provided ID on
/// behalf of the caller.
///
/// # Errors
///
/// Possible error codes:
/// - `LISTING_NOT_FOUND` - `Listing` with the provided ID does not exist;
/// - `LISTING_NOT_OPEN` - `Listing` is not active anymore;
/// - `SELF_APPLICATION_FORBIDDEN` - caller is the `Listing` initiator;
/// - `DUPLICATE_APPLICATION` - caller already has an active
///                             [`Application`] to the `Listing`;
/// - `INVALID_LEASE_DURATION` - `Listing` lease duration is negotiable, and
///                              no concrete one is proposed;
/// - `INVALID_INPUT` - provided body is malformed or invalid.
#[tracing::instrument(
    skip_all,
    fields(
        http.operation = "submitApplication",
        listing.id = ?id,
        otel.name = api::SPAN_NAME,
        user.id = %caller.user_id,
    ),
)]
pub async fn submit(
    ctx: Context,
    caller: Caller,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<(http::StatusCode, Success<Application>), Error> {
    let Path(id) = id.map_err(AsError::into_error)?;
    let Json(SubmitRequest {
        message,
        lease_duration,
    }) = body.map_err(AsError::into_error)?;

    let application = ctx
        .service()
        .execute(Retry(command::SubmitApplication {
            listing_id: id.into(),
            applicant_id: caller.user_id,
            message: message
                .map(|m| {
                    application::Message::new(m).ok_or(InputError::Message)
                })
                .transpose()?,
            lease_duration,
        }))
        .await
        .map_err(AsError::into_error)?;

    Ok((http::StatusCode::CREATED, Success(application.into())))
}

/// Returns [`Application`]s received by the `Listing` with the provided ID,
/// newest first.
///
/// Withdrawn [`Application`]s are omitted, unless requested explicitly.
///
/// # Errors
///
/// Possible error codes:
/// - `LISTING_NOT_FOUND` - `Listing` with the provided ID does not exist;
/// - `FORBIDDEN` - caller is not the `Listing` initiator;
/// - `INVALID_INPUT` - provided query parameters are invalid.
#[tracing::instrument(
    skip_all,
    fields(
        http.operation = "receivedApplications",
        listing.id = ?id,
        otel.name = api::SPAN_NAME,
        user.id = %caller.user_id,
    ),
)]
pub async fn received(
    ctx: Context,
    caller: Caller,
    id: Result<Path<Uuid>, PathRejection>,
    params: Result<Query<FeedParams<application::Status>>, QueryRejection>,
) -> Result<Success<Paginated<Application, application::Id>>, Error> {
    let Path(id) = id.map_err(AsError::into_error)?;
    let Query(params) = params.map_err(AsError::into_error)?;

    let output = ctx
        .service()
        .execute(query::applications::Received {
            listing_id: id.into(),
            requester_id: caller.user_id,
            status: params.status,
            arguments: params.arguments(ctx.feed())?,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(Success(output.into()))
}

impl From<query::applications::Output>
    for Paginated<Application, application::Id>
{
    fn from(output: query::applications::Output) -> Self {
        Self {
            items: output.items.into_iter().map(Into::into).collect(),
            pagination: Pagination::new(output.page_info, output.total_count),
        }
    }
}

/// Accepts or rejects the pending [`Application`] with the provided ID on
/// behalf of the `Listing` initiator.
///
/// # Errors
///
/// Possible error codes:
/// - `APPLICATION_NOT_FOUND` - [`Application`] with the provided ID does not
///                             exist;
/// - `FORBIDDEN` - caller is not the `Listing` initiator;
/// - `LISTING_NOT_ACTIVE` - `Listing` is not active anymore, whatever the
///                          [`Application`] status is;
/// - `INVALID_STATE` - [`Application`] is not pending, while its `Listing`
///                     is still active;
/// - `INVALID_INPUT` - provided body is malformed or invalid.
///
/// `LISTING_NOT_ACTIVE` takes precedence over `INVALID_STATE`, so deciding
/// upon a signed [`Application`] reports its finalized `Listing`.
#[tracing::instrument(
    skip_all,
    fields(
        application.id = ?id,
        http.operation = "decideApplication",
        otel.name = api::SPAN_NAME,
        user.id = %caller.user_id,
    ),
)]
pub async fn decide(
    ctx: Context,
    caller: Caller,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<DecideRequest>, JsonRejection>,
) -> Result<Success<Application>, Error> {
    let Path(id) = id.map_err(AsError::into_error)?;
    let Json(body) = body.map_err(AsError::into_error)?;

    let application = ctx
        .service()
        .execute(Retry(command::DecideApplication {
            application_id: id.into(),
            decider_id: caller.user_id,
            decision: body.decision()?,
        }))
        .await
        .map_err(AsError::into_error)?;

    Ok(Success(application.into()))
}

/// Withdraws the pending [`Application`] with the provided ID on behalf of
/// its applicant.
///
/// # Errors
///
/// Possible error codes:
/// - `APPLICATION_NOT_FOUND` - [`Application`] with the provided ID does not
///                             exist;
/// - `FORBIDDEN` - caller is not the applicant;
/// - `INVALID_STATE` - [`Application`] is not pending.
#[tracing::instrument(
    skip_all,
    fields(
        application.id = ?id,
        http.operation = "withdrawApplication",
        otel.name = api::SPAN_NAME,
        user.id = %caller.user_id,
    ),
)]
pub async fn withdraw(
    ctx: Context,
    caller: Caller,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Success<Application>, Error> {
    let Path(id) = id.map_err(AsError::into_error)?;

    let application = ctx
        .service()
        .execute(Retry(command::WithdrawApplication {
            application_id: id.into(),
            requester_id: caller.user_id,
        }))
        .await
        .map_err(AsError::into_error)?;

    Ok(Success(application.into()))
}

impl AsError for command::submit_application::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "SELF_APPLICATION_FORBIDDEN"]
                #[status = FORBIDDEN]
                #[message = "Initiator cannot apply to their own `Listing`"]
                SelfApplicationForbidden,

                #[code = "DUPLICATE_APPLICATION"]
                #[status = CONFLICT]
                #[message = "Active `Application` to this `Listing` already \
                             exists"]
                DuplicateApplication,

                #[code = "INVALID_LEASE_DURATION"]
                #[status = BAD_REQUEST]
                #[message = "`Listing` lease duration is negotiable, so a \
                             concrete `leaseDuration` must be proposed"]
                InvalidLeaseDuration,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::DuplicateApplication(_) => {
                Some(Error::DuplicateApplication.into())
            }
            Self::InvalidLeaseDuration => {
                Some(Error::InvalidLeaseDuration.into())
            }
            Self::ListingNotFound(_) => Some(NotFoundError::Listing.into()),
            Self::ListingNotOpen(_) => {
                Some(StateError::ListingNotOpen.with_message(self))
            }
            Self::SelfApplicationForbidden(_) => {
                Some(Error::SelfApplicationForbidden.into())
            }
        }
    }
}

impl AsError for command::decide_application::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::ApplicationNotFound(_) => {
                Some(NotFoundError::Application.into())
            }
            Self::Db(e) => e.try_as_error(),
            Self::Forbidden(_) => Some(PrivilegeError::Forbidden.into()),
            Self::InvalidState(e) => {
                Some(StateError::InvalidState.with_message(e))
            }
            Self::ListingNotActive(_) => {
                Some(StateError::ListingNotActive.with_message(self))
            }
        }
    }
}

impl AsError for command::withdraw_application::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::ApplicationNotFound(_) => {
                Some(NotFoundError::Application.into())
            }
            Self::Db(e) => e.try_as_error(),
            Self::Forbidden(_) => Some(PrivilegeError::Forbidden.into()),
            Self::InvalidState(e) => {
                Some(StateError::InvalidState.with_message(e))
            }
        }
    }
}

impl AsError for query::applications::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Forbidden(_) => Some(PrivilegeError::Forbidden.into()),
            Self::ListingNotFound(_) => Some(NotFoundError::Listing.into()),
        }
    }
}

define_error! {
    enum InputError {
        #[code = "INVALID_INPUT"]
        #[status = BAD_REQUEST]
        #[message = "`message` must be non-blank and at most 2048 characters \
                     long"]
        Message,

        #[code = "INVALID_INPUT"]
        #[status = BAD_REQUEST]
        #[message = "Only `accepted` or `rejected` status can be decided upon"]
        Decision,
    }
}

#[cfg(test)]
mod spec {
    use service::{
        command::{decide_application, submit_application},
        domain::{application, lease, listing},
    };

    use crate::AsError as _;

    use super::{DecideRequest, SubmitRequest};

    fn decide(json: serde_json::Value) -> DecideRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn accepts_decision_or_status() {
        for (json, expected) in [
            (
                serde_json::json!({"decision": "accept"}),
                application::Decision::Accept,
            ),
            (
                serde_json::json!({"decision": "reject"}),
                application::Decision::Reject,
            ),
            (
                serde_json::json!({"status": "accepted"}),
                application::Decision::Accept,
            ),
            (
                serde_json::json!({"status": "rejected"}),
                application::Decision::Reject,
            ),
        ] {
            assert_eq!(decide(json).decision().unwrap(), expected);
        }
    }

    #[test]
    fn rejects_undecidable_status() {
        let err = decide(serde_json::json!({"status": "signed"}))
            .decision()
            .unwrap_err();

        assert_eq!(err.code, "INVALID_INPUT");

        assert!(serde_json::from_value::<DecideRequest>(
            serde_json::json!({"decision": "maybe"}),
        )
        .is_err());
    }

    #[test]
    fn parses_submit_request() {
        let req = serde_json::from_value::<SubmitRequest>(serde_json::json!({
            "message": "Quiet and tidy",
            "leaseDuration": "3-6 months",
        }))
        .unwrap();

        assert_eq!(req.message.as_deref(), Some("Quiet and tidy"));
        assert_eq!(
            req.lease_duration.as_ref().and_then(lease::Proposal::duration),
            Some(lease::Duration::ThreeToSixMonths),
        );

        let empty =
            serde_json::from_value::<SubmitRequest>(serde_json::json!({}))
                .unwrap();
        assert!(empty.message.is_none());
    }

    #[test]
    fn passes_unknown_lease_duration_through() {
        let req = serde_json::from_value::<SubmitRequest>(serde_json::json!({
            "leaseDuration": "2 years",
        }))
        .unwrap();

        let proposal = req.lease_duration.unwrap();
        assert_eq!(proposal.to_string(), "2 years");
        assert_eq!(proposal.duration(), None);
    }

    #[test]
    fn maps_submission_errors() {
        use submit_application::ExecutionError as E;

        for (err, code, status) in [
            (
                E::SelfApplicationForbidden("ann".parse().unwrap()),
                "SELF_APPLICATION_FORBIDDEN",
                http::StatusCode::FORBIDDEN,
            ),
            (
                E::DuplicateApplication(application::Id::new()),
                "DUPLICATE_APPLICATION",
                http::StatusCode::CONFLICT,
            ),
            (
                E::InvalidLeaseDuration,
                "INVALID_LEASE_DURATION",
                http::StatusCode::BAD_REQUEST,
            ),
            (
                E::ListingNotFound(listing::Id::new()),
                "LISTING_NOT_FOUND",
                http::StatusCode::NOT_FOUND,
            ),
            (
                E::ListingNotOpen(listing::Status::Finalized),
                "LISTING_NOT_OPEN",
                http::StatusCode::CONFLICT,
            ),
        ] {
            let err = err.as_error();

            assert_eq!(err.code, code);
            assert_eq!(err.status_code, status);
        }
    }

    #[test]
    fn maps_decision_errors() {
        use decide_application::ExecutionError as E;

        let err = E::InvalidState(service::domain::InvalidTransition {
            from: application::Status::Accepted,
            to: application::Status::Rejected,
        })
        .as_error();
        assert_eq!(err.code, "INVALID_STATE");
        assert_eq!(err.status_code, http::StatusCode::CONFLICT);
        assert!(err.message.contains("accepted"), "{}", err.message);

        let err = E::Forbidden("bob".parse().unwrap()).as_error();
        assert_eq!(err.code, "FORBIDDEN");
        assert_eq!(err.status_code, http::StatusCode::FORBIDDEN);
    }
}
