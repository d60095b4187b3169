//! [`Application`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::Listing;
use crate::domain::{lease, listing, user, InvalidTransition, Version};

/// Request of a [`user::User`] to take a slot in a [`Listing`].
#[derive(Clone, Debug)]
pub struct Application {
    /// ID of this [`Application`].
    pub id: Id,

    /// ID of the [`Listing`] this [`Application`] is submitted to.
    pub listing_id: listing::Id,

    /// ID of the [`user::User`] who submitted this [`Application`].
    pub applicant_id: user::Id,

    /// [`Message`] to the [`Listing`] initiator, if any.
    pub message: Option<Message>,

    /// [`lease::Duration`] proposed by the applicant, if the [`Listing`] has
    /// a negotiable one.
    pub lease_duration: Option<lease::Duration>,

    /// Current [`Status`] of this [`Application`].
    pub status: Status,

    /// [`Version`] of this [`Application`].
    pub version: Version,

    /// [`DateTime`] when this [`Application`] was submitted.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Application`] was modified last time.
    pub updated_at: ModificationDateTime,
}

impl Application {
    /// Indicates whether this [`Application`] still holds or claims a slot.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Moves this [`Application`] into the provided [`Status`].
    ///
    /// # Errors
    ///
    /// If the [`Status`] state machine has no such edge.
    pub fn transition(
        &mut self,
        to: Status,
    ) -> Result<(), InvalidTransition<Status>> {
        if !self.status.can_become(to) {
            return Err(InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.version = self.version.next();
        self.updated_at = ModificationDateTime::now();
        Ok(())
    }
}

/// ID of an [`Application`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new time-ordered [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

define_kind! {
    #[doc = "Status of an [`Application`]."]
    enum Status {
        #[doc = "Waiting for a decision of the [`Listing`] initiator."]
        Pending = 1,

        #[doc = "Accepted by the [`Listing`] initiator, occupies a slot."]
        Accepted = 2,

        #[doc = "Rejected by the [`Listing`] initiator."]
        Rejected = 3,

        #[doc = "Confirmed by the [`Listing`] finalization."]
        Signed = 4,

        #[doc = "Withdrawn by the applicant before any decision."]
        Withdrawn = 5,
    }
}

impl Status {
    /// Indicates whether an [`Application`] in this [`Status`] still holds or
    /// claims a slot.
    ///
    /// At most one active [`Application`] of a [`user::User`] may exist per
    /// [`Listing`].
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Accepted)
    }

    /// Indicates whether an [`Application`] in this [`Status`] occupies a
    /// slot of its [`Listing`].
    #[must_use]
    pub const fn occupies_slot(self) -> bool {
        matches!(self, Self::Accepted | Self::Signed)
    }

    /// Indicates whether this [`Status`] is final.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Signed | Self::Withdrawn)
    }

    /// Indicates whether an [`Application`] may move from this [`Status`]
    /// into the provided one.
    #[must_use]
    pub const fn can_become(self, to: Self) -> bool {
        matches!(
            (self, to),
            (
                Self::Pending,
                Self::Accepted | Self::Rejected | Self::Withdrawn
            ) | (Self::Accepted, Self::Signed),
        )
    }
}

/// Decision of a [`Listing`] initiator upon a pending [`Application`].
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Give the applicant a slot.
    #[display("accept")]
    Accept,

    /// Refuse the applicant.
    #[display("reject")]
    Reject,
}

impl Decision {
    /// Returns the [`Status`] an [`Application`] gets by this [`Decision`].
    #[must_use]
    pub const fn status(self) -> Status {
        match self {
            Self::Accept => Status::Accepted,
            Self::Reject => Status::Rejected,
        }
    }
}

/// Message of an applicant to the [`Listing`] initiator.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct Message(String);

impl Message {
    /// Creates a new [`Message`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        Self::check(&text).then_some(Self(text))
    }

    /// Checks whether the given `text` is a valid [`Message`].
    fn check(text: impl AsRef<str>) -> bool {
        let text = text.as_ref();
        !text.trim().is_empty() && text.chars().count() <= 2048
    }
}

impl FromStr for Message {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Message`")
    }
}

/// [`DateTime`] when an [`Application`] was submitted.
pub type CreationDateTime = DateTimeOf<(Application, unit::Creation)>;

/// [`DateTime`] when an [`Application`] was modified last time.
pub type ModificationDateTime = DateTimeOf<(Application, unit::Modification)>;

#[cfg(test)]
mod spec {
    use super::{Decision, Status};

    #[test]
    fn follows_state_machine_edges() {
        let edges = [
            (Status::Pending, Status::Accepted),
            (Status::Pending, Status::Rejected),
            (Status::Pending, Status::Withdrawn),
            (Status::Accepted, Status::Signed),
        ];
        for from in Status::all() {
            for to in Status::all() {
                assert_eq!(
                    from.can_become(to),
                    edges.contains(&(from, to)),
                    "{from} -> {to}",
                );
            }
        }
    }

    #[test]
    fn terminal_statuses_are_dead_ends() {
        for from in Status::all().filter(|s| s.is_terminal()) {
            assert!(!Status::all().any(|to| from.can_become(to)), "{from}");
        }
    }

    #[test]
    fn accepted_cannot_be_rejected() {
        assert!(!Status::Accepted.can_become(Status::Rejected));
        assert!(!Status::Accepted.can_become(Status::Withdrawn));
    }

    #[test]
    fn decision_maps_to_status() {
        assert_eq!(Decision::Accept.status(), Status::Accepted);
        assert_eq!(Decision::Reject.status(), Status::Rejected);
    }
}
