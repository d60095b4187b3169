//! Lease definitions.

use common::define_kind;
use derive_more::{Display, From};
use serde::Deserialize;

define_kind! {
    #[doc = "Duration of a lease."]
    enum Duration {
        #[doc = "From one to three months."]
        #[str = "1-3 months"]
        OneToThreeMonths = 1,

        #[doc = "From three to six months."]
        #[str = "3-6 months"]
        ThreeToSixMonths = 2,

        #[doc = "From six to twelve months."]
        #[str = "6-12 months"]
        SixToTwelveMonths = 3,

        #[doc = "A year or longer."]
        #[str = "1 year+"]
        YearOrMore = 4,

        #[doc = "To be agreed with every applicant."]
        #[str = "Negotiable"]
        Negotiable = 5,
    }
}

impl Duration {
    /// Indicates whether this [`Duration`] is left for an applicant to
    /// propose.
    #[must_use]
    pub const fn is_negotiable(self) -> bool {
        matches!(self, Self::Negotiable)
    }

    /// Returns the [`Duration`]s an applicant may propose for a
    /// [`Duration::Negotiable`] lease.
    pub fn proposable() -> impl Iterator<Item = Self> {
        Self::all().filter(|d| !d.is_negotiable())
    }
}

/// Lease [`Duration`] proposal of an applicant, kept as provided.
///
/// Interpreted only when the lease of a `Listing` is
/// [`Duration::Negotiable`], and ignored otherwise.
#[derive(Clone, Debug, Deserialize, Display, Eq, From, PartialEq)]
#[serde(transparent)]
pub struct Proposal(String);

impl Proposal {
    /// Returns the proposed [`Duration`], if it's a [`Duration::proposable()`]
    /// one.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.0.parse::<Duration>().ok().filter(|d| !d.is_negotiable())
    }
}

impl From<Duration> for Proposal {
    fn from(duration: Duration) -> Self {
        Self(duration.to_string())
    }
}
