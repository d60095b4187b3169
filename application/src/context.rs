//! [`Context`]-related definitions.

use axum::{async_trait, extract::FromRequestParts, RequestPartsExt as _};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use service::{
    command::{self, AuthorizeCaller, Command},
    domain::user,
};

use crate::{config, define_error, AsError, Error, Service};

/// Application context of an HTTP request.
#[derive(Clone, Debug)]
pub struct Context {
    /// [`Service`] instance.
    service: Service,

    /// Paginated feeds configuration.
    feed: config::Feed,
}

impl Context {
    /// Creates a new [`Context`] out of the provided parts.
    #[must_use]
    pub fn new(service: Service, feed: config::Feed) -> Self {
        Self { service, feed }
    }

    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Returns paginated feeds configuration of this [`Context`].
    #[must_use]
    pub fn feed(&self) -> config::Feed {
        self.feed
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| Error::internal(&"missing `Context` extension"))
    }
}

/// Authenticated caller of an HTTP request.
///
/// Extracted from the `Authorization: Bearer <token>` header, the token being
/// issued by the identity provider.
#[derive(Clone, Debug)]
pub struct Caller {
    /// ID of the calling [`user::User`].
    pub user_id: user::Id,

    /// [`DateTime`] when the provided token expires.
    ///
    /// [`DateTime`]: common::DateTime
    pub expires_at: user::ExpirationDateTime,
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let ctx = Context::from_request_parts(parts, state).await?;

        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::AuthorizationRequired)?;

        #[expect(unsafe_code, reason = "specified in correct header")]
        let token =
            unsafe { user::Token::new_unchecked(bearer.token().to_owned()) };
        let identity = <Service as Command<AuthorizeCaller>>::execute(
            ctx.service(),
            AuthorizeCaller { token },
        )
        .await
        .map_err(AsError::into_error)?;

        Ok(Self {
            user_id: identity.user_id,
            expires_at: identity.expires_at,
        })
    }
}

impl AsError for command::authorize_caller::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::JsonWebTokenDecodeError(_) => {
                Some(AuthError::AuthorizationRequired.into())
            }
        }
    }
}

define_error! {
    enum AuthError {
        #[code = "AUTHORIZATION_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "Authorization required"]
        AuthorizationRequired,
    }
}

#[cfg(test)]
mod spec {
    use axum::extract::FromRequestParts as _;
    use common::DateTime;
    use jsonwebtoken::{EncodingKey, Header};

    use crate::{config, testing, Error};

    use super::{Caller, Context};

    fn parts(authorization: Option<&str>) -> http::request::Parts {
        let mut req = http::Request::builder().uri("/listings");
        if let Some(value) = authorization {
            req = req.header(http::header::AUTHORIZATION, value);
        }
        let (mut parts, ()) = req.body(()).unwrap().into_parts();
        drop(parts.extensions.insert(Context::new(
            testing::service(),
            config::Feed::default(),
        )));
        parts
    }

    async fn caller(authorization: Option<&str>) -> Result<Caller, Error> {
        Caller::from_request_parts(&mut parts(authorization), &()).await
    }

    #[tokio::test]
    async fn authenticates_bearer_token() {
        let token = testing::token("alice");

        let caller = caller(Some(&format!("Bearer {token}"))).await.unwrap();

        assert_eq!(caller.user_id.to_string(), "alice");
        assert!(caller.expires_at > DateTime::now().coerce());
    }

    #[tokio::test]
    async fn requires_authorization_header() {
        let err = caller(None).await.unwrap_err();

        assert_eq!(err.code, "AUTHORIZATION_REQUIRED");
        assert_eq!(err.status_code, http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_foreign_token() {
        let token = jsonwebtoken::encode(
            &Header::default(),
            &serde_json::json!({
                "sub": "alice",
                "exp": DateTime::now().unix_timestamp() + 3600,
            }),
            &EncodingKey::from_secret(b"another secret"),
        )
        .unwrap();

        let err = caller(Some(&format!("Bearer {token}"))).await.unwrap_err();

        assert_eq!(err.code, "AUTHORIZATION_REQUIRED");
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let token = jsonwebtoken::encode(
            &Header::default(),
            &serde_json::json!({
                "sub": "alice",
                "exp": DateTime::now().unix_timestamp() - 3600,
            }),
            &EncodingKey::from_secret(testing::JWT_SECRET),
        )
        .unwrap();

        let err = caller(Some(&format!("Bearer {token}"))).await.unwrap_err();

        assert_eq!(err.status_code, http::StatusCode::UNAUTHORIZED);
    }
}
