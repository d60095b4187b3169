//! [`Listing`] read model definitions.

use crate::domain::{slot::Occupancy, Listing};

/// [`Listing`] along with its current slot [`Occupancy`].
#[derive(Clone, Debug)]
pub struct WithOccupancy {
    /// The [`Listing`] itself.
    pub listing: Listing,

    /// [`Occupancy`] of the [`Listing`] slots.
    pub occupancy: Occupancy,
}

/// Outcome of a [`Listing`] finalization.
#[derive(Clone, Debug)]
pub struct Finalized {
    /// The finalized [`Listing`].
    pub listing: Listing,

    /// Number of accepted applications signed by the finalization.
    pub signed_applications: u32,
}

pub mod list {
    //! [`Listing`]s list definitions.

    use common::define_pagination;
    use derive_more::{From, Into};

    use crate::domain::{listing, user, Listing};

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Page`].
    pub type Node = Listing;

    /// Cursor pointing to a specific [`Listing`] in a list.
    pub type Cursor = listing::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// ID of the [`user::User`] who created the [`Listing`]s, if any.
        pub initiator_id: Option<user::Id>,

        /// [`listing::Status`] of the [`Listing`]s, if any.
        pub status: Option<listing::Status>,
    }

    impl Filter {
        /// Checks whether the provided [`Listing`] passes this [`Filter`].
        #[must_use]
        pub fn matches(&self, listing: &Listing) -> bool {
            self.initiator_id
                .as_ref()
                .map_or(true, |id| listing.is_initiated_by(id))
                && self.status.map_or(true, |s| listing.status == s)
        }
    }

    /// Total count of [`Listing`]s matching a [`Filter`].
    #[derive(Clone, Copy, Debug, Eq, From, Hash, Into, PartialEq)]
    pub struct TotalCount(i32);
}
