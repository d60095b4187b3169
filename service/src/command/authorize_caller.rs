//! [`Command`] for authorizing a caller by their identity token.

use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{domain::user, Service};

use super::Command;

/// [`Command`] for authorizing a caller by their identity [`user::Token`].
#[derive(Clone, Debug, From)]
pub struct AuthorizeCaller {
    /// [`user::Token`] to authorize.
    pub token: user::Token,
}

impl<Db> Command<AuthorizeCaller> for Service<Db> {
    type Ok = user::Identity;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeCaller,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeCaller { token } = cmd;

        let identity = jsonwebtoken::decode::<user::Identity>(
            token.as_ref(),
            &self.config().jwt_decoding_key,
            &self.config().jwt_validation,
        )
        .map_err(tracerr::from_and_wrap!(=> E))?
        .claims;

        Ok(identity)
    }
}

/// Error of [`AuthorizeCaller`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`jsonwebtoken`] decoding error.
    #[display("Failed to decode a JSON Web Token: {_0}")]
    JsonWebTokenDecodeError(jsonwebtoken::errors::Error),
}
