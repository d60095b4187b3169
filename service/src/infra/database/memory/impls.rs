//! [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Commit, Insert, Lock, Select, Transact, Update};
use tracerr::Traced;

use crate::{
    domain::{application, listing, user, Application, Listing},
    infra::{
        database::{self, APPLICATION_ACTIVE_UNIQUE},
        Database,
    },
    read::{self, application::Active},
};

use super::{Access, Error, Memory, NonTx, State, Tx};

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        self.0.begin().await.map(Memory).map_err(tracerr::wrap!())
    }
}

impl Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.commit().await.map_err(tracerr::wrap!())
    }
}

/// Builds a unique violation error of the provided constraint.
fn unique_violation(constraint: &'static str) -> Traced<database::Error> {
    tracerr::map_from(tracerr::new!(Error::UniqueViolation(constraint)))
}

impl<A: Access> Database<Select<By<Option<Listing>, listing::Id>>>
    for Memory<A>
{
    type Ok = Option<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Listing>, listing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.read(|s| s.listings.get(&id).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<A: Access> Database<Insert<Listing>> for Memory<A> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(listing): Insert<Listing>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| {
            if s.listings.contains_key(&listing.id) {
                return Err(unique_violation("listings_pkey"));
            }
            drop(s.listings.insert(listing.id, listing));
            Ok(())
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<A: Access> Database<Update<Listing>> for Memory<A> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(listing): Update<Listing>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| {
            let Some(stored) = s
                .listings
                .get_mut(&listing.id)
                .filter(|l| l.version == listing.version.prev())
            else {
                return Err(tracerr::new!(database::Error::StaleVersion(
                    "Listing"
                )));
            };
            *stored = listing;
            Ok(())
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<A: Access> Database<Lock<By<Listing, listing::Id>>> for Memory<A> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Listing, listing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Whole store is already locked by the transaction.
        self.read(|_| ()).await.map_err(tracerr::wrap!())
    }
}

impl<A: Access>
    Database<
        Select<By<read::listing::list::Page, read::listing::list::Selector>>,
    > for Memory<A>
{
    type Ok = read::listing::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::listing::list::Page, read::listing::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::listing::list::Selector { arguments, filter } =
            by.into_inner();

        self.read(|s| {
            let upper = arguments.cursor().copied();
            let edges = s
                .listings
                .values()
                .rev()
                .filter(|l| upper.map_or(true, |c| l.id < c))
                .filter(|l| filter.matches(l))
                .map(|l| (l.id, l.clone()));
            read::listing::list::Page::from_overfetched(&arguments, edges)
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<A: Access>
    Database<
        Select<
            By<read::listing::list::TotalCount, read::listing::list::Filter>,
        >,
    > for Memory<A>
{
    type Ok = read::listing::list::TotalCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::listing::list::TotalCount, read::listing::list::Filter>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let filter = by.into_inner();
        self.read(|s| {
            let count = s.listings.values().filter(|l| filter.matches(l));
            i32::try_from(count.count()).unwrap_or(i32::MAX).into()
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<A: Access> Database<Select<By<Option<Application>, application::Id>>>
    for Memory<A>
{
    type Ok = Option<Application>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Application>, application::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.read(|s| s.applications.get(&id).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<A, IDs>
    Database<Select<By<HashMap<listing::Id, Vec<Application>>, IDs>>>
    for Memory<A>
where
    A: Access,
    IDs: AsRef<[listing::Id]>,
{
    type Ok = HashMap<listing::Id, Vec<Application>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<listing::Id, Vec<Application>>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        let ids: &[listing::Id] = ids.as_ref();
        self.read(|s| {
            let mut grouped = HashMap::<_, Vec<_>>::new();
            for a in s.applications.values() {
                if ids.contains(&a.listing_id) {
                    grouped.entry(a.listing_id).or_default().push(a.clone());
                }
            }
            grouped
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<A: Access> Database<Select<By<Vec<Application>, listing::Id>>>
    for Memory<A>
{
    type Ok = Vec<Application>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Application>, listing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.execute(Select(By::<HashMap<_, _>, _>::new([id])))
            .await
            .map_err(tracerr::wrap!())
            .map(|mut apps| apps.remove(&id).unwrap_or_default())
    }
}

impl<A: Access>
    Database<
        Select<By<Option<Active<Application>>, (listing::Id, user::Id)>>,
    > for Memory<A>
{
    type Ok = Option<Active<Application>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Option<Active<Application>>, (listing::Id, user::Id)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let (listing_id, applicant_id) = by.into_inner();
        self.read(|s| {
            s.applications
                .values()
                .find(|a| {
                    a.is_active()
                        && a.listing_id == listing_id
                        && a.applicant_id == applicant_id
                })
                .cloned()
                .map(Active)
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

/// Checks whether the provided [`Application`] may be stored without
/// violating the [`APPLICATION_ACTIVE_UNIQUE`] constraint.
fn check_active_unique(
    state: &State,
    application: &Application,
) -> Result<(), Traced<database::Error>> {
    let conflicts = application.is_active()
        && state.applications.values().any(|a| {
            a.id != application.id
                && a.is_active()
                && a.listing_id == application.listing_id
                && a.applicant_id == application.applicant_id
        });
    if conflicts {
        return Err(unique_violation(APPLICATION_ACTIVE_UNIQUE));
    }
    Ok(())
}

impl<A: Access> Database<Insert<Application>> for Memory<A> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(application): Insert<Application>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| {
            if s.applications.contains_key(&application.id) {
                return Err(unique_violation("applications_pkey"));
            }
            check_active_unique(s, &application)?;
            drop(s.applications.insert(application.id, application));
            Ok(())
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<A: Access> Database<Update<Application>> for Memory<A> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(application): Update<Application>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| {
            let fresh = s
                .applications
                .get(&application.id)
                .is_some_and(|a| a.version == application.version.prev());
            if !fresh {
                return Err(tracerr::new!(database::Error::StaleVersion(
                    "Application"
                )));
            }
            check_active_unique(s, &application)?;
            drop(s.applications.insert(application.id, application));
            Ok(())
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<A: Access>
    Database<
        Select<
            By<
                read::application::list::Page,
                read::application::list::Selector,
            >,
        >,
    > for Memory<A>
{
    type Ok = read::application::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<
                read::application::list::Page,
                read::application::list::Selector,
            >,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::application::list::Selector { arguments, filter } =
            by.into_inner();

        self.read(|s| {
            let upper = arguments.cursor().copied();
            let edges = s
                .applications
                .values()
                .rev()
                .filter(|a| upper.map_or(true, |c| a.id < c))
                .filter(|a| filter.matches(a))
                .map(|a| (a.id, a.clone()));
            read::application::list::Page::from_overfetched(&arguments, edges)
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<A: Access>
    Database<
        Select<
            By<
                read::application::list::TotalCount,
                read::application::list::Filter,
            >,
        >,
    > for Memory<A>
{
    type Ok = read::application::list::TotalCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<
                read::application::list::TotalCount,
                read::application::list::Filter,
            >,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let filter = by.into_inner();
        self.read(|s| {
            let count = s.applications.values().filter(|a| filter.matches(a));
            i32::try_from(count.count()).unwrap_or(i32::MAX).into()
        })
        .await
        .map_err(tracerr::wrap!())
    }
}
