//! Slot accounting of a [`Listing`].

use serde::Serialize;

#[cfg(doc)]
use crate::domain::application;
use crate::domain::{listing, Application, Listing};

/// Occupancy of [`Listing`] slots.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Occupancy {
    /// Number of occupied slots.
    ///
    /// Counts [`application::Status::Accepted`] [`Application`]s, plus the
    /// initiator if they are a [`listing::InitiatorRole::Tenant`]. Once the
    /// [`Listing`] is finalized, its [`application::Status::Signed`] ones
    /// keep the slots they've held.
    pub filled: u32,

    /// Total number of slots.
    pub total: u32,
}

impl Occupancy {
    /// Computes the [`Occupancy`] of the provided [`Listing`] out of its
    /// [`Application`]s.
    ///
    /// [`Application`]s of other [`Listing`]s are not counted.
    #[must_use]
    pub fn of<'a>(
        listing: &Listing,
        applications: impl IntoIterator<Item = &'a Application>,
    ) -> Self {
        let accepted = applications
            .into_iter()
            .filter(|a| a.listing_id == listing.id && a.status.occupies_slot())
            .count();
        Self {
            filled: u32::try_from(accepted)
                .unwrap_or(u32::MAX)
                .saturating_add(listing.initiator_role.occupied_slots()),
            total: capacity(listing.total_spots, listing.bedrooms),
        }
    }

    /// Indicates whether all the slots are occupied.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.filled >= self.total
    }

    /// Returns the number of slots still available.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.total.saturating_sub(self.filled)
    }
}

/// Computes the total number of [`Listing`] slots.
///
/// Explicit [`listing::TotalSpots`] take precedence over the number of
/// bedrooms. A [`Listing`] always has at least one slot.
#[must_use]
pub fn capacity(
    total_spots: Option<listing::TotalSpots>,
    bedrooms: listing::Bedrooms,
) -> u32 {
    let total = total_spots.map_or(bedrooms, u16::from);
    u32::from(total).max(1)
}
