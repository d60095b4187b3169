//! [`Command`] for executing another [`Command`] again once it fails
//! transiently.

use std::{fmt, time::Duration};

use common::operations::Retry;
use smart_default::SmartDefault;
use tracerr::Traced;

use crate::{infra::database, Service};

use super::Command;

/// [`Retry`] configuration.
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Maximum number of attempts to execute a [`Command`], including the
    /// first one.
    #[default(2)]
    pub attempts: u32,

    /// Delay before the second attempt.
    ///
    /// Doubled before every next attempt.
    #[default(Duration::from_millis(50))]
    pub backoff: Duration,
}

impl Config {
    /// Returns the delay before the provided `attempt` (the second one being
    /// `1`).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff
            .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Error which may disappear once the failed operation is executed again.
pub trait Transient {
    /// Indicates whether this error is transient.
    fn is_transient(&self) -> bool;
}

impl Transient for database::Error {
    fn is_transient(&self) -> bool {
        Self::is_transient(self)
    }
}

impl<Db, C, E> Command<Retry<C>> for Service<Db>
where
    Self: Command<C, Err = Traced<E>>,
    C: Clone,
    E: Transient + fmt::Display,
{
    type Ok = <Self as Command<C>>::Ok;
    type Err = Traced<E>;

    async fn execute(
        &self,
        Retry(cmd): Retry<C>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = self.config().retry;

        let mut attempt = 1;
        loop {
            match self.execute(cmd.clone()).await {
                Err(e)
                    if attempt < config.attempts
                        && e.as_ref().is_transient() =>
                {
                    let delay = config.delay(attempt);
                    tracing::warn!(
                        attempt,
                        delay = ?delay,
                        "`Command` failed transiently, retrying: {e}",
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                res => return res.map_err(tracerr::wrap!()),
            }
        }
    }
}
