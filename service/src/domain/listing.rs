//! [`Listing`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::Application;
use crate::domain::{lease, user, InvalidTransition, Version};

/// Rental offer with a limited number of slots for roommates.
#[derive(Clone, Debug)]
pub struct Listing {
    /// ID of this [`Listing`].
    pub id: Id,

    /// ID of the [`user::User`] who created this [`Listing`].
    pub initiator_id: user::Id,

    /// [`InitiatorRole`] of the [`user::User`] who created this [`Listing`].
    pub initiator_role: InitiatorRole,

    /// Explicitly set capacity of this [`Listing`], if any.
    ///
    /// Falls back to the [`Listing::bedrooms`] when absent.
    pub total_spots: Option<TotalSpots>,

    /// Number of bedrooms in the offered property.
    pub bedrooms: Bedrooms,

    /// [`lease::Duration`] offered by this [`Listing`].
    pub lease_duration: lease::Duration,

    /// [`Title`] of this [`Listing`].
    pub title: Title,

    /// [`Description`] of this [`Listing`], if any.
    pub description: Option<Description>,

    /// [`Address`] of the offered property, if any.
    pub address: Option<Address>,

    /// Current [`Status`] of this [`Listing`].
    pub status: Status,

    /// [`Version`] of this [`Listing`].
    pub version: Version,

    /// [`DateTime`] when this [`Listing`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Listing`] was modified last time.
    pub updated_at: ModificationDateTime,
}

impl Listing {
    /// Indicates whether this [`Listing`] still accepts [`Application`]s and
    /// decisions upon them.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    /// Indicates whether the provided [`user::User`] created this [`Listing`].
    #[must_use]
    pub fn is_initiated_by(&self, user_id: &user::Id) -> bool {
        &self.initiator_id == user_id
    }

    /// Moves this [`Listing`] into the provided [`Status`].
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

/// ID of a [`Listing`].
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
    #[doc = "Role of a [`user::User`] creating a [`Listing`]."]
    enum InitiatorRole {
        #[doc = "A tenant looking for roommates, occupying a slot."]
        Tenant = 1,

        #[doc = "A landlord renting out the property."]
        Landlord = 2,

        #[doc = "The platform itself."]
        Platform = 3,
    }
}

impl InitiatorRole {
    /// Returns the number of [`Listing`] slots occupied by the initiator
    /// having this [`InitiatorRole`].
    #[must_use]
    pub const fn occupied_slots(self) -> u32 {
        match self {
            Self::Tenant => 1,
            Self::Landlord | Self::Platform => 0,
        }
    }
}

define_kind! {
    #[doc = "Status of a [`Listing`]."]
    enum Status {
        #[doc = "[`Listing`] is open for [`Application`]s."]
        Active = 1,

        #[doc = "All the slots of [`Listing`] are filled and signed."]
        Finalized = 2,

        #[doc = "[`Listing`] was withdrawn by its initiator."]
        Cancelled = 3,
    }
}

impl Status {
    /// Indicates whether this [`Status`] is final.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::Cancelled)
    }

    /// Indicates whether a [`Listing`] may move from this [`Status`] into the
    /// provided one.
    #[must_use]
    pub const fn can_become(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Active, Self::Finalized | Self::Cancelled),
        )
    }
}

/// Explicit number of slots in a [`Listing`].
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd,
)]
pub struct TotalSpots(u16);

impl TotalSpots {
    /// Creates new [`TotalSpots`] if the given `spots` is positive.
    #[must_use]
    pub const fn new(spots: u16) -> Option<Self> {
        if spots == 0 {
            None
        } else {
            Some(Self(spots))
        }
    }
}

/// Number of bedrooms in a [`Listing`].
pub type Bedrooms = u16;

/// Title of a [`Listing`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct Title(String);

impl Title {
    /// Creates a new [`Title`] if the given `title` is valid.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Option<Self> {
        let title = title.into();
        Self::check(&title).then_some(Self(title))
    }

    /// Checks whether the given `title` is a valid [`Title`].
    fn check(title: impl AsRef<str>) -> bool {
        let title = title.as_ref();
        title.trim() == title
            && !title.is_empty()
            && title.chars().count() <= 256
    }
}

impl FromStr for Title {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Title`")
    }
}

/// Description of a [`Listing`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct Description(String);

impl Description {
    /// Creates a new [`Description`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        Self::check(&text).then_some(Self(text))
    }

    /// Checks whether the given `text` is a valid [`Description`].
    fn check(text: impl AsRef<str>) -> bool {
        let text = text.as_ref();
        !text.trim().is_empty() && text.chars().count() <= 4096
    }
}

impl FromStr for Description {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Description`")
    }
}

/// Address of the property offered by a [`Listing`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct Address(String);

impl Address {
    /// Creates a new [`Address`] if the given `address` is valid.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into();
        Self::check(&address).then_some(Self(address))
    }

    /// Checks whether the given `address` is a valid [`Address`].
    fn check(address: impl AsRef<str>) -> bool {
        let address = address.as_ref();
        address.trim() == address
            && !address.is_empty()
            && address.chars().count() <= 512
    }
}

impl FromStr for Address {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Address`")
    }
}

/// [`DateTime`] when a [`Listing`] was created.
pub type CreationDateTime = DateTimeOf<(Listing, unit::Creation)>;

/// [`DateTime`] when a [`Listing`] was modified last time.
pub type ModificationDateTime = DateTimeOf<(Listing, unit::Modification)>;

#[cfg(test)]
mod spec {
    use super::{Status, Title, TotalSpots};

    #[test]
    fn only_active_status_moves() {
        for from in Status::all() {
            for to in Status::all() {
                let expected = from == Status::Active && to != Status::Active;
                assert_eq!(from.can_become(to), expected, "{from} -> {to}");
            }
        }
        assert_eq!(Status::all().filter(|s| s.is_terminal()).count(), 2);
    }

    #[test]
    fn total_spots_are_positive() {
        assert!(TotalSpots::new(0).is_none());
        assert_eq!(TotalSpots::new(3).map(u16::from), Some(3));
    }

    #[test]
    fn title_is_trimmed_and_non_empty() {
        assert!(Title::new("Sunny room in Canggu").is_some());
        assert!(Title::new(" padded ").is_none());
        assert!(Title::new("").is_none());
        assert!(Title::new("x".repeat(257)).is_none());
    }
}
