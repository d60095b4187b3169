//! [`Listing`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select, Update};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{listing, Listing},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns of the `listings` table in the order [`from_row()`] expects.
const COLUMNS: &str = "\
    id, initiator_id, initiator_role, \
    total_spots, bedrooms, lease_duration, \
    title, description, address, \
    status, version, \
    created_at, updated_at";

/// Builds a [`Listing`] out of the provided `listings` table [`Row`].
fn from_row(row: &Row) -> Listing {
    Listing {
        id: row.get("id"),
        initiator_id: row.get("initiator_id"),
        initiator_role: row.get("initiator_role"),
        total_spots: row
            .get::<_, Option<i32>>("total_spots")
            .and_then(|n| u16::try_from(n).ok())
            .and_then(listing::TotalSpots::new),
        bedrooms: u16::try_from(row.get::<_, i32>("bedrooms"))
            .unwrap_or_default(),
        lease_duration: row.get("lease_duration"),
        title: row.get("title"),
        description: row.get("description"),
        address: row.get("address"),
        status: row.get("status"),
        version: row.get("version"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl<C> Database<Select<By<Option<Listing>, listing::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Listing>, listing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: listing::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM listings \
             WHERE id = $1::UUID"
        );
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Insert<Listing>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(listing): Insert<Listing>,
    ) -> Result<Self::Ok, Self::Err> {
        let Listing {
            id,
            initiator_id,
            initiator_role,
            total_spots,
            bedrooms,
            lease_duration,
            title,
            description,
            address,
            status,
            version,
            created_at,
            updated_at,
        } = listing;

        let total_spots = total_spots.map(|n| i32::from(u16::from(n)));
        let bedrooms = i32::from(bedrooms);

        const SQL: &str = "\
            INSERT INTO listings (\
                id, initiator_id, initiator_role, \
                total_spots, bedrooms, lease_duration, \
                title, description, address, \
                status, version, \
                created_at, updated_at\
            ) VALUES (\
                $1::UUID, $2::VARCHAR, $3::INT2, \
                $4::INT4, $5::INT4, $6::INT2, \
                $7::VARCHAR, $8::VARCHAR, $9::VARCHAR, \
                $10::INT2, $11::INT4, \
                $12::TIMESTAMPTZ, $13::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &initiator_id,
                &initiator_role,
                &total_spots,
                &bedrooms,
                &lease_duration,
                &title,
                &description,
                &address,
                &status,
                &version,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<Listing>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(listing): Update<Listing>,
    ) -> Result<Self::Ok, Self::Err> {
        let Listing {
            id,
            total_spots,
            bedrooms,
            lease_duration,
            title,
            description,
            address,
            status,
            version,
            updated_at,
            ..
        } = listing;

        let total_spots = total_spots.map(|n| i32::from(u16::from(n)));
        let bedrooms = i32::from(bedrooms);
        let prev_version = version.prev();

        const SQL: &str = "\
            UPDATE listings \
            SET total_spots = $3::INT4, \
                bedrooms = $4::INT4, \
                lease_duration = $5::INT2, \
                title = $6::VARCHAR, \
                description = $7::VARCHAR, \
                address = $8::VARCHAR, \
                status = $9::INT2, \
                version = $10::INT4, \
                updated_at = $11::TIMESTAMPTZ \
            WHERE id = $1::UUID \
              AND version = $2::INT4";
        let updated = self
            .exec(
                SQL,
                &[
                    &id,
                    &prev_version,
                    &total_spots,
                    &bedrooms,
                    &lease_duration,
                    &title,
                    &description,
                    &address,
                    &status,
                    &version,
                    &updated_at,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?;
        if updated == 0 {
            return Err(tracerr::new!(database::Error::StaleVersion(
                "Listing"
            )));
        }
        Ok(())
    }
}

impl<C> Database<Lock<By<Listing, listing::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Listing, listing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: listing::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM listings \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C>
    Database<
        Select<By<read::listing::list::Page, read::listing::list::Selector>>,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = read::listing::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::listing::list::Page, read::listing::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::listing::list::Selector {
            arguments,
            filter:
                read::listing::list::Filter {
                    initiator_id,
                    status,
                },
        } = by.into_inner();

        let limit = i64::try_from(arguments.limit())
            .unwrap_or(i64::MAX)
            .saturating_add(1);

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit];
        let cursor_idx = arguments.cursor().map(|c| {
            ps.push(c);
            ps.len()
        });
        let initiator_idx = initiator_id.as_ref().map(|id| {
            ps.push(id);
            ps.len()
        });
        let status_idx = status.as_ref().map(|s| {
            ps.push(s);
            ps.len()
        });

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM listings \
             WHERE true \
                   {cursor} \
                   {initiator} \
                   {status} \
             ORDER BY id DESC \
             LIMIT $1::INT8",
            cursor = cursor_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND id < ${idx}::UUID"))
            }),
            initiator = initiator_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND initiator_id = ${idx}::VARCHAR"))
            }),
            status = status_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND status = ${idx}::INT2"))
            }),
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;

        Ok(read::listing::list::Page::from_overfetched(
            &arguments,
            rows.iter().map(|row| {
                let listing = from_row(row);
                (listing.id, listing)
            }),
        ))
    }
}

impl<C>
    Database<
        Select<
            By<read::listing::list::TotalCount, read::listing::list::Filter>,
        >,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = read::listing::list::TotalCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::listing::list::TotalCount, read::listing::list::Filter>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::listing::list::Filter {
            initiator_id,
            status,
        } = by.into_inner();

        const SQL: &str = "\
            SELECT COUNT(*)::INT4 \
            FROM listings \
            WHERE ($1::VARCHAR IS NULL OR initiator_id = $1::VARCHAR) \
              AND ($2::INT2 IS NULL OR status = $2::INT2)";
        self.query_opt(SQL, &[&initiator_id, &status])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.map_or(0, |r| r.get::<_, i32>(0)).into())
    }
}
