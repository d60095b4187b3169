//! [`Application`] read model definitions.

#[cfg(doc)]
use crate::domain::Application;

/// Wrapper around an [`Application`] indicating that it [`is_active()`].
///
/// [`is_active()`]: Application::is_active
#[derive(Clone, Debug)]
pub struct Active<T>(pub T);

pub mod list {
    //! [`Application`]s list definitions.

    use common::define_pagination;
    use derive_more::{From, Into};

    use crate::domain::{application, listing, user, Application};

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Page`].
    pub type Node = Application;

    /// Cursor pointing to a specific [`Application`] in a list.
    pub type Cursor = application::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// ID of the [`listing::Listing`] the [`Application`]s are submitted
        /// to, if any.
        pub listing_id: Option<listing::Id>,

        /// ID of the [`user::User`] who submitted the [`Application`]s, if
        /// any.
        pub applicant_id: Option<user::Id>,

        /// [`application::Status`] of the [`Application`]s.
        ///
        /// [`application::Status::Withdrawn`] ones are excluded when absent.
        pub status: Option<application::Status>,
    }

    impl Filter {
        /// Checks whether the provided [`Application`] passes this [`Filter`].
        #[must_use]
        pub fn matches(&self, application: &Application) -> bool {
            self.listing_id.map_or(true, |id| application.listing_id == id)
                && self
                    .applicant_id
                    .as_ref()
                    .map_or(true, |id| &application.applicant_id == id)
                && self.status.map_or(
                    application.status != application::Status::Withdrawn,
                    |s| application.status == s,
                )
        }
    }

    /// Total count of [`Application`]s matching a [`Filter`].
    #[derive(Clone, Copy, Debug, Eq, From, Hash, Into, PartialEq)]
    pub struct TotalCount(i32);
}
