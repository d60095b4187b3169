//! Abstractions for cursor-based pagination.

/// A page of nodes in a cursor-paginated list.
#[derive(Clone, Debug)]
pub struct Page<C, I> {
    /// [`Edge`]s on this [`Page`].
    pub edges: Vec<Edge<C, I>>,

    /// Indicator whether there are more nodes after this [`Page`].
    pub has_more: bool,
}

impl<C, I> Page<C, I> {
    /// Creates a new [`Page`] from the provided [`Edge`]s.
    #[must_use]
    pub fn new(
        edges: impl IntoIterator<Item = impl Into<Edge<C, I>>>,
        has_more: bool,
    ) -> Self {
        Self {
            edges: edges.into_iter().map(Into::into).collect(),
            has_more,
        }
    }

    /// Creates a new [`Page`] out of the [`Edge`]s fetched with a limit one
    /// greater than the requested one.
    ///
    /// The extra [`Edge`] (if any) is dropped and turned into the
    /// [`Page::has_more`] indicator.
    #[must_use]
    pub fn from_overfetched(
        args: &Arguments<C>,
        edges: impl IntoIterator<Item = impl Into<Edge<C, I>>>,
    ) -> Self {
        let mut edges = edges
            .into_iter()
            .map(Into::into)
            .take(args.limit() + 1)
            .collect::<Vec<_>>();
        let has_more = edges.len() > args.limit();
        edges.truncate(args.limit());
        Self { edges, has_more }
    }

    /// Returns [`PageInfo`] of this [`Page`].
    #[must_use]
    pub fn page_info(&self) -> PageInfo<C>
    where
        C: Clone,
    {
        PageInfo {
            end_cursor: self
                .has_more
                .then(|| self.edges.last().map(|e| e.cursor.clone()))
                .flatten(),
            has_next_page: self.has_more,
        }
    }

    /// Returns an iterator over the nodes of this [`Page`].
    pub fn nodes(&self) -> impl Iterator<Item = &I> {
        self.edges.iter().map(|e| &e.node)
    }
}

/// Information about a [`Page`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PageInfo<C> {
    /// Cursor to continue from, if there is a next [`Page`].
    pub end_cursor: Option<C>,

    /// Indicator whether there is a next [`Page`].
    pub has_next_page: bool,
}

/// An edge in a [`Page`].
#[derive(Clone, Copy, Debug)]
pub struct Edge<C, I> {
    /// Cursor of this [`Edge`].
    pub cursor: C,

    /// Node of this [`Edge`].
    pub node: I,
}

impl<C, I> From<(C, I)> for Edge<C, I> {
    fn from((cursor, node): (C, I)) -> Self {
        Self { cursor, node }
    }
}

/// Forward pagination arguments.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Arguments<C> {
    /// Number of items to return.
    first: usize,

    /// Cursor after which to return items.
    after: Option<C>,
}

impl<C> Arguments<C> {
    /// Creates new [`Arguments`].
    ///
    /// `first` falls back to the `default` when absent. [`None`] is returned
    /// if the requested number of items is zero, negative or exceeds the
    /// `max`imum.
    pub fn new<Num>(
        first: Option<Num>,
        after: Option<C>,
        default: usize,
        max: usize,
    ) -> Option<Self>
    where
        Num: TryInto<usize>,
    {
        let first = match first {
            Some(n) => n.try_into().ok()?,
            None => default,
        };
        (first > 0 && first <= max).then_some(Self { first, after })
    }

    /// Returns cursor requested by these [`Arguments`].
    #[must_use]
    pub fn cursor(&self) -> Option<&C> {
        self.after.as_ref()
    }

    /// Returns limit requested by these [`Arguments`].
    #[must_use]
    pub fn limit(&self) -> usize {
        self.first
    }
}

/// Pagination selector.
#[derive(Clone, Debug)]
pub struct Selector<C, F> {
    /// Pagination [`Arguments`].
    pub arguments: Arguments<C>,

    /// Additional filter being applied to the result.
    pub filter: F,
}

/// Defines pagination types.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_pagination {
    ($cursor:ty, $node:ty, $filter:ty) => {
        #[doc = "Edge of a [`Page`]."]
        pub type Edge = $crate::pagination::Edge<$cursor, $node>;

        #[doc = "A [`Page`] of nodes."]
        pub type Page = $crate::pagination::Page<$cursor, $node>;

        #[doc = "An information about a [`Page`]."]
        pub type PageInfo = $crate::pagination::PageInfo<$cursor>;

        #[doc = "Arguments for selecting a [`Page`]."]
        pub type Arguments = $crate::pagination::Arguments<$cursor>;

        #[doc = "[`Page`] selector."]
        pub type Selector = $crate::pagination::Selector<$cursor, $filter>;
    };
}

#[cfg(test)]
mod spec {
    use super::{Arguments, Page, PageInfo};

    #[test]
    fn arguments_respect_bounds() {
        assert_eq!(
            Arguments::<u8>::new(None::<i32>, None, 10, 50).unwrap().limit(),
            10,
        );
        assert_eq!(
            Arguments::new(Some(3), Some(7_u8), 10, 50).unwrap().cursor(),
            Some(&7),
        );

        assert!(Arguments::<u8>::new(Some(0), None, 10, 50).is_none());
        assert!(Arguments::<u8>::new(Some(-1), None, 10, 50).is_none());
        assert!(Arguments::<u8>::new(Some(51), None, 10, 50).is_none());
    }

    #[test]
    fn overfetched_page_has_more() {
        let args = Arguments::<u8>::new(Some(2), None, 10, 50).unwrap();

        let page = Page::<u8, char>::from_overfetched(
            &args,
            [(1, 'a'), (2, 'b'), (3, 'c')],
        );

        assert_eq!(page.nodes().collect::<String>(), "ab");
        assert_eq!(
            page.page_info(),
            PageInfo {
                end_cursor: Some(2),
                has_next_page: true,
            },
        );
    }

    #[test]
    fn last_page_has_no_cursor() {
        let args = Arguments::<u8>::new(Some(2), None, 10, 50).unwrap();

        let page = Page::<u8, char>::from_overfetched(&args, [(1, 'a')]);

        assert_eq!(
            page.page_info(),
            PageInfo {
                end_cursor: None,
                has_next_page: false,
            },
        );
    }
}
