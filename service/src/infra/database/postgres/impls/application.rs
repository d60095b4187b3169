//! [`Application`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Insert, Select, Update};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{application, listing, user, Application},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::{self, application::Active},
};

/// Columns of the `applications` table in the order [`from_row()`] expects.
const COLUMNS: &str = "\
    id, listing_id, applicant_id, \
    message, lease_duration, \
    status, version, \
    created_at, updated_at";

/// Builds an [`Application`] out of the provided `applications` table
/// [`Row`].
fn from_row(row: &Row) -> Application {
    Application {
        id: row.get("id"),
        listing_id: row.get("listing_id"),
        applicant_id: row.get("applicant_id"),
        message: row.get("message"),
        lease_duration: row.get("lease_duration"),
        status: row.get("status"),
        version: row.get("version"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl<C> Database<Select<By<Option<Application>, application::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Application>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Application>, application::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: application::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM applications \
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

impl<C, IDs>
    Database<Select<By<HashMap<listing::Id, Vec<Application>>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[listing::Id]>,
{
    type Ok = HashMap<listing::Id, Vec<Application>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<listing::Id, Vec<Application>>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[listing::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM applications \
             WHERE listing_id = ANY($1::UUID[]) \
             ORDER BY id ASC"
        );
        Ok(self
            .query(&sql, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .into_group_map_by(|a| a.listing_id))
    }
}

impl<C> Database<Select<By<Vec<Application>, listing::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<listing::Id, Vec<Application>>, [listing::Id; 1]>>,
        Ok = HashMap<listing::Id, Vec<Application>>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Vec<Application>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Application>, listing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id)
            .unwrap_or_default())
    }
}

impl<C>
    Database<
        Select<By<Option<Active<Application>>, (listing::Id, user::Id)>>,
    > for Postgres<C>
where
    C: Connection,
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

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM applications \
             WHERE listing_id = $1::UUID \
               AND applicant_id = $2::VARCHAR \
               AND status IN ($3::INT2, $4::INT2) \
             LIMIT 1"
        );
        Ok(self
            .query_opt(
                &sql,
                &[
                    &listing_id,
                    &applicant_id,
                    &application::Status::Pending,
                    &application::Status::Accepted,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row)
            .map(Active))
    }
}

impl<C> Database<Insert<Application>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(application): Insert<Application>,
    ) -> Result<Self::Ok, Self::Err> {
        let Application {
            id,
            listing_id,
            applicant_id,
            message,
            lease_duration,
            status,
            version,
            created_at,
            updated_at,
        } = application;

        const SQL: &str = "\
            INSERT INTO applications (\
                id, listing_id, applicant_id, \
                message, lease_duration, \
                status, version, \
                created_at, updated_at\
            ) VALUES (\
                $1::UUID, $2::UUID, $3::VARCHAR, \
                $4::VARCHAR, $5::INT2, \
                $6::INT2, $7::INT4, \
                $8::TIMESTAMPTZ, $9::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &listing_id,
                &applicant_id,
                &message,
                &lease_duration,
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

impl<C> Database<Update<Application>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(application): Update<Application>,
    ) -> Result<Self::Ok, Self::Err> {
        let Application {
            id,
            message,
            lease_duration,
            status,
            version,
            updated_at,
            ..
        } = application;

        let prev_version = version.prev();

        const SQL: &str = "\
            UPDATE applications \
            SET message = $3::VARCHAR, \
                lease_duration = $4::INT2, \
                status = $5::INT2, \
                version = $6::INT4, \
                updated_at = $7::TIMESTAMPTZ \
            WHERE id = $1::UUID \
              AND version = $2::INT4";
        let updated = self
            .exec(
                SQL,
                &[
                    &id,
                    &prev_version,
                    &message,
                    &lease_duration,
                    &status,
                    &version,
                    &updated_at,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?;
        if updated == 0 {
            return Err(tracerr::new!(database::Error::StaleVersion(
                "Application"
            )));
        }
        Ok(())
    }
}

impl<C>
    Database<
        Select<
            By<
                read::application::list::Page,
                read::application::list::Selector,
            >,
        >,
    > for Postgres<C>
where
    C: Connection,
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
        let read::application::list::Selector {
            arguments,
            filter:
                read::application::list::Filter {
                    listing_id,
                    applicant_id,
                    status,
                },
        } = by.into_inner();

        let limit = i64::try_from(arguments.limit())
            .unwrap_or(i64::MAX)
            .saturating_add(1);
        let (status_op, status) = status
            .map_or(("<>", application::Status::Withdrawn), |s| ("=", s));

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit];
        let cursor_idx = arguments.cursor().map(|c| {
            ps.push(c);
            ps.len()
        });
        let listing_idx = listing_id.as_ref().map(|id| {
            ps.push(id);
            ps.len()
        });
        let applicant_idx = applicant_id.as_ref().map(|id| {
            ps.push(id);
            ps.len()
        });
        ps.push(&status);
        let status_idx = ps.len();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM applications \
             WHERE status {status_op} ${status_idx}::INT2 \
                   {cursor} \
                   {listing} \
                   {applicant} \
             ORDER BY id DESC \
             LIMIT $1::INT8",
            cursor = cursor_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND id < ${idx}::UUID"))
            }),
            listing = listing_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND listing_id = ${idx}::UUID"))
            }),
            applicant = applicant_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND applicant_id = ${idx}::VARCHAR"))
            }),
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;

        Ok(read::application::list::Page::from_overfetched(
            &arguments,
            rows.iter().map(|row| {
                let application = from_row(row);
                (application.id, application)
            }),
        ))
    }
}

impl<C>
    Database<
        Select<
            By<
                read::application::list::TotalCount,
                read::application::list::Filter,
            >,
        >,
    > for Postgres<C>
where
    C: Connection,
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
        let read::application::list::Filter {
            listing_id,
            applicant_id,
            status,
        } = by.into_inner();

        const SQL: &str = "\
            SELECT COUNT(*)::INT4 \
            FROM applications \
            WHERE ($1::UUID IS NULL OR listing_id = $1::UUID) \
              AND ($2::VARCHAR IS NULL OR applicant_id = $2::VARCHAR) \
              AND (CASE WHEN $3::INT2 IS NULL \
                        THEN status <> $4::INT2 \
                        ELSE status = $3::INT2 END)";
        self.query_opt(
            SQL,
            &[
                &listing_id,
                &applicant_id,
                &status,
                &application::Status::Withdrawn,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(|row| row.map_or(0, |r| r.get::<_, i32>(0)).into())
    }
}
