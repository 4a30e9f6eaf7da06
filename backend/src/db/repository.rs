use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::connection::{PgPool, PgPooledConnection};
use crate::db::models::*;
use crate::db::schema::*;
use crate::error::{Error, ErrorCode};
use crate::services::dates::{clashing_days, expand_range, start_of_day};
use crate::store::{
    stale_status, BookingInsert, BookingStore, CategoryStore, StoreResult, ToolFilter, ToolStore,
    UserStore,
};

const DATE_HOLDING: [BookingStatus; 2] = [BookingStatus::Pending, BookingStatus::Approved];

/// PostgreSQL-backed store. Every call checks a connection out of the pool,
/// so callers should run it off the async executor.
#[derive(Clone)]
pub struct DieselStore {
    pool: PgPool,
}

impl DieselStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> StoreResult<PgPooledConnection> {
        Ok(self.pool.get()?)
    }
}

impl UserStore for DieselStore {
    fn insert_user(&self, new_user: NewUser) -> StoreResult<User> {
        let conn = &mut self.conn()?;
        diesel::insert_into(users::table)
            .values(&new_user)
            .returning(User::as_returning())
            .get_result(conn)
            .map_err(|err| {
                let err = Error::from(err);
                if err.code() == ErrorCode::Conflict {
                    Error::conflict("Email already registered")
                } else {
                    err
                }
            })
    }

    fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let conn = &mut self.conn()?;
        Ok(users::table
            .find(id)
            .select(User::as_select())
            .first(conn)
            .optional()?)
    }

    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let conn = &mut self.conn()?;
        Ok(users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first(conn)
            .optional()?)
    }

    fn users_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let conn = &mut self.conn()?;
        Ok(users::table
            .filter(users::id.eq_any(ids))
            .select(User::as_select())
            .load(conn)?)
    }

    fn list_users(&self) -> StoreResult<Vec<User>> {
        let conn = &mut self.conn()?;
        Ok(users::table
            .order(users::created_at.asc())
            .select(User::as_select())
            .load(conn)?)
    }

    fn count_tools_owned(&self, owner_id: Uuid) -> StoreResult<i64> {
        let conn = &mut self.conn()?;
        Ok(tools::table
            .filter(tools::owner_id.eq(owner_id))
            .count()
            .get_result(conn)?)
    }

    fn count_bookings_received(&self, owner_id: Uuid) -> StoreResult<i64> {
        let conn = &mut self.conn()?;
        Ok(bookings::table
            .filter(bookings::owner_id.eq(owner_id))
            .count()
            .get_result(conn)?)
    }
}

impl CategoryStore for DieselStore {
    fn top_level_categories(&self) -> StoreResult<Vec<Category>> {
        let conn = &mut self.conn()?;
        Ok(categories::table
            .filter(categories::parent_id.is_null())
            .order(categories::name.asc())
            .select(Category::as_select())
            .load(conn)?)
    }

    fn subcategories(&self, parent_id: Uuid) -> StoreResult<Vec<Category>> {
        let conn = &mut self.conn()?;
        Ok(categories::table
            .filter(categories::parent_id.eq(parent_id))
            .order(categories::name.asc())
            .select(Category::as_select())
            .load(conn)?)
    }

    fn find_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        let conn = &mut self.conn()?;
        Ok(categories::table
            .find(id)
            .select(Category::as_select())
            .first(conn)
            .optional()?)
    }

    fn categories_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Category>> {
        let conn = &mut self.conn()?;
        Ok(categories::table
            .filter(categories::id.eq_any(ids))
            .select(Category::as_select())
            .load(conn)?)
    }
}

impl ToolStore for DieselStore {
    fn create_tool(&self, new_tool: NewTool, first: NewToolVersion) -> StoreResult<(Tool, ToolVersion)> {
        let conn = &mut self.conn()?;
        conn.transaction::<_, Error, _>(|conn| {
            diesel::insert_into(tools::table)
                .values(&NewTool {
                    active_version_id: None,
                    ..new_tool
                })
                .execute(conn)?;
            let version = diesel::insert_into(tool_versions::table)
                .values(&first)
                .returning(ToolVersion::as_returning())
                .get_result(conn)?;
            let tool = diesel::update(tools::table.find(version.tool_id))
                .set(tools::active_version_id.eq(Some(version.id)))
                .returning(Tool::as_returning())
                .get_result(conn)?;
            Ok((tool, version))
        })
    }

    fn find_tool(&self, id: Uuid) -> StoreResult<Option<Tool>> {
        let conn = &mut self.conn()?;
        Ok(tools::table
            .find(id)
            .select(Tool::as_select())
            .first(conn)
            .optional()?)
    }

    fn list_tools(&self, filter: ToolFilter) -> StoreResult<Vec<Tool>> {
        let conn = &mut self.conn()?;
        let mut query = tools::table.select(Tool::as_select()).into_boxed();

        match filter {
            ToolFilter::Available { exclude_owner } => {
                query = query.filter(tools::is_available.eq(true));
                if let Some(owner) = exclude_owner {
                    query = query.filter(tools::owner_id.ne(owner));
                }
            }
            ToolFilter::OwnedBy(owner) => {
                query = query.filter(tools::owner_id.eq(owner));
            }
        }

        Ok(query.order(tools::created_at.desc()).load(conn)?)
    }

    fn versions_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<ToolVersion>> {
        let conn = &mut self.conn()?;
        Ok(tool_versions::table
            .filter(tool_versions::id.eq_any(ids))
            .select(ToolVersion::as_select())
            .load(conn)?)
    }

    fn revise_tool(
        &self,
        tool_id: Uuid,
        is_available: Option<bool>,
        next: Option<NewToolVersion>,
    ) -> StoreResult<Tool> {
        let conn = &mut self.conn()?;
        conn.transaction::<_, Error, _>(|conn| {
            if let Some(flag) = is_available {
                diesel::update(tools::table.find(tool_id))
                    .set(tools::is_available.eq(flag))
                    .execute(conn)?;
            }
            if let Some(version) = next {
                diesel::insert_into(tool_versions::table)
                    .values(&version)
                    .execute(conn)?;
                diesel::update(tools::table.find(tool_id))
                    .set(tools::active_version_id.eq(Some(version.id)))
                    .execute(conn)?;
            }
            Ok(tools::table
                .find(tool_id)
                .select(Tool::as_select())
                .first(conn)?)
        })
    }

    fn delete_tool(&self, id: Uuid) -> StoreResult<()> {
        let conn = &mut self.conn()?;
        conn.transaction::<_, Error, _>(|conn| {
            // Versions, blocks, and bookings go with the tool via ON DELETE CASCADE.
            diesel::update(tools::table.find(id))
                .set(tools::active_version_id.eq(None::<Uuid>))
                .execute(conn)?;
            diesel::delete(tools::table.find(id)).execute(conn)?;
            Ok(())
        })
    }

    fn date_blocks_from(&self, tool_id: Uuid, from: NaiveDate) -> StoreResult<Vec<NaiveDate>> {
        let conn = &mut self.conn()?;
        Ok(tool_date_blocks::table
            .filter(tool_date_blocks::tool_id.eq(tool_id))
            .filter(tool_date_blocks::date.ge(from))
            .order(tool_date_blocks::date.asc())
            .select(tool_date_blocks::date)
            .load(conn)?)
    }

    fn replace_date_blocks_from(
        &self,
        tool_id: Uuid,
        from: NaiveDate,
        dates: &[NaiveDate],
    ) -> StoreResult<()> {
        let rows: Vec<NewToolDateBlock> = dates
            .iter()
            .map(|date| NewToolDateBlock {
                id: Uuid::new_v4(),
                tool_id,
                date: *date,
            })
            .collect();

        let conn = &mut self.conn()?;
        conn.transaction::<_, Error, _>(|conn| {
            diesel::delete(
                tool_date_blocks::table
                    .filter(tool_date_blocks::tool_id.eq(tool_id))
                    .filter(tool_date_blocks::date.ge(from)),
            )
            .execute(conn)?;
            if !rows.is_empty() {
                diesel::insert_into(tool_date_blocks::table)
                    .values(&rows)
                    .execute(conn)?;
            }
            Ok(())
        })
    }
}

impl BookingStore for DieselStore {
    fn insert_booking_if_free(&self, booking: NewBooking) -> StoreResult<BookingInsert> {
        let requested = expand_range(booking.start_date, booking.end_date);
        let first = booking.start_date.date_naive();
        let last = booking.end_date.date_naive();

        let conn = &mut self.conn()?;
        conn.transaction::<_, Error, _>(|conn| {
            // Competing requests for this tool queue on the row lock.
            tools::table
                .find(booking.tool_id)
                .select(tools::id)
                .for_update()
                .first::<Uuid>(conn)?;

            let held: Vec<(DateTime<Utc>, DateTime<Utc>)> = bookings::table
                .filter(bookings::tool_id.eq(booking.tool_id))
                .filter(bookings::status.eq_any(DATE_HOLDING))
                .filter(bookings::end_date.ge(start_of_day(first)))
                .select((bookings::start_date, bookings::end_date))
                .load(conn)?;
            let blocked: Vec<NaiveDate> = tool_date_blocks::table
                .filter(tool_date_blocks::tool_id.eq(booking.tool_id))
                .filter(tool_date_blocks::date.between(first, last))
                .select(tool_date_blocks::date)
                .load(conn)?;

            let taken = held
                .iter()
                .flat_map(|(start, end)| expand_range(*start, *end))
                .chain(blocked);
            let clashes = clashing_days(&requested, taken);
            if !clashes.is_empty() {
                return Ok(BookingInsert::Clashes(clashes));
            }

            let row = diesel::insert_into(bookings::table)
                .values(&booking)
                .returning(Booking::as_returning())
                .get_result(conn)?;
            Ok(BookingInsert::Created(row))
        })
    }

    fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let conn = &mut self.conn()?;
        Ok(bookings::table
            .find(id)
            .select(Booking::as_select())
            .first(conn)
            .optional()?)
    }

    fn bookings_for_renter(&self, renter_id: Uuid) -> StoreResult<Vec<Booking>> {
        let conn = &mut self.conn()?;
        Ok(bookings::table
            .filter(bookings::renter_id.eq(renter_id))
            .order(bookings::created_at.desc())
            .select(Booking::as_select())
            .load(conn)?)
    }

    fn bookings_for_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Booking>> {
        let conn = &mut self.conn()?;
        Ok(bookings::table
            .filter(bookings::owner_id.eq(owner_id))
            .order(bookings::created_at.desc())
            .select(Booking::as_select())
            .load(conn)?)
    }

    fn date_holding_bookings(
        &self,
        tool_id: Uuid,
        ending_from: DateTime<Utc>,
    ) -> StoreResult<Vec<Booking>> {
        let conn = &mut self.conn()?;
        Ok(bookings::table
            .filter(bookings::tool_id.eq(tool_id))
            .filter(bookings::status.eq_any(DATE_HOLDING))
            .filter(bookings::end_date.ge(ending_from))
            .select(Booking::as_select())
            .load(conn)?)
    }

    fn set_booking_status(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> StoreResult<Booking> {
        let conn = &mut self.conn()?;
        conn.transaction::<_, Error, _>(|conn| {
            let updated = diesel::update(bookings::table.find(id).filter(bookings::status.eq(from)))
                .set(bookings::status.eq(to))
                .returning(Booking::as_returning())
                .get_result(conn)
                .optional()?;
            match updated {
                Some(booking) => Ok(booking),
                None if bookings::table.find(id).count().get_result::<i64>(conn)? == 0 => {
                    Err(Error::not_found("Record not found"))
                }
                None => Err(stale_status(id, from)),
            }
        })
    }
}
