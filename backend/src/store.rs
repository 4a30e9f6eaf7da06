//! Persistence ports.
//!
//! Services depend on these traits only. [`crate::db::DieselStore`] is the
//! PostgreSQL implementation; tests use the in-memory store.
//!
//! Methods documented as atomic must apply all of their writes or none.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::db::models::{
    Booking, BookingStatus, Category, NewBooking, NewTool, NewToolVersion, NewUser, Tool,
    ToolVersion, User,
};
use crate::error::Error;

pub type StoreResult<T> = Result<T, Error>;

pub trait UserStore {
    /// Fails with a conflict when the email is already registered.
    fn insert_user(&self, user: NewUser) -> StoreResult<User>;
    fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    fn users_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;
    fn list_users(&self) -> StoreResult<Vec<User>>;
    fn count_tools_owned(&self, owner_id: Uuid) -> StoreResult<i64>;
    fn count_bookings_received(&self, owner_id: Uuid) -> StoreResult<i64>;
}

pub trait CategoryStore {
    /// Categories without a parent, ordered by name.
    fn top_level_categories(&self) -> StoreResult<Vec<Category>>;
    /// Direct children of `parent_id`, ordered by name.
    fn subcategories(&self, parent_id: Uuid) -> StoreResult<Vec<Category>>;
    fn find_category(&self, id: Uuid) -> StoreResult<Option<Category>>;
    fn categories_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Category>>;
}

/// Which tools a listing query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolFilter {
    /// Tools marked available, optionally hiding one owner's listings.
    Available { exclude_owner: Option<Uuid> },
    /// Every tool owned by the given user.
    OwnedBy(Uuid),
}

pub trait ToolStore {
    /// Atomically inserts the tool, its first version, and points the tool
    /// at that version.
    fn create_tool(&self, tool: NewTool, first: NewToolVersion) -> StoreResult<(Tool, ToolVersion)>;
    fn find_tool(&self, id: Uuid) -> StoreResult<Option<Tool>>;
    /// Newest first.
    fn list_tools(&self, filter: ToolFilter) -> StoreResult<Vec<Tool>>;
    fn versions_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<ToolVersion>>;
    /// Atomically applies an availability flag change and, when `next` is
    /// given, inserts it and repoints the tool's active version.
    fn revise_tool(
        &self,
        tool_id: Uuid,
        is_available: Option<bool>,
        next: Option<NewToolVersion>,
    ) -> StoreResult<Tool>;
    /// Removes the tool together with its versions, blocks, and bookings.
    fn delete_tool(&self, id: Uuid) -> StoreResult<()>;
    /// Manual blocks dated `from` or later.
    fn date_blocks_from(&self, tool_id: Uuid, from: NaiveDate) -> StoreResult<Vec<NaiveDate>>;
    /// Atomically deletes blocks dated `from` or later and inserts `dates`.
    fn replace_date_blocks_from(
        &self,
        tool_id: Uuid,
        from: NaiveDate,
        dates: &[NaiveDate],
    ) -> StoreResult<()>;
}

/// Outcome of [`BookingStore::insert_booking_if_free`].
#[derive(Debug, Clone, PartialEq)]
pub enum BookingInsert {
    Created(Booking),
    /// Requested days already held by a live booking or blocked by the owner.
    Clashes(BTreeSet<NaiveDate>),
}

/// Conflict raised when a status change finds the booking already moved on.
pub fn stale_status(id: Uuid, expected: BookingStatus) -> Error {
    Error::conflict(format!("Booking {id} is no longer {expected}"))
}

pub trait BookingStore {
    /// Atomically checks the requested days against live bookings and manual
    /// blocks of the tool and inserts the booking only when none clash.
    /// Concurrent calls for the same tool are serialised.
    fn insert_booking_if_free(&self, booking: NewBooking) -> StoreResult<BookingInsert>;
    fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;
    /// Newest first.
    fn bookings_for_renter(&self, renter_id: Uuid) -> StoreResult<Vec<Booking>>;
    /// Newest first.
    fn bookings_for_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Booking>>;
    /// PENDING or APPROVED bookings of the tool whose end is at or after
    /// `ending_from`.
    fn date_holding_bookings(
        &self,
        tool_id: Uuid,
        ending_from: DateTime<Utc>,
    ) -> StoreResult<Vec<Booking>>;
    /// Moves the booking from `from` to `to`. Fails with a conflict, leaving
    /// the row untouched, when its status is no longer `from`.
    fn set_booking_status(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> StoreResult<Booking>;
}

/// Everything the services need from persistence.
pub trait Store: UserStore + CategoryStore + ToolStore + BookingStore + Send + Sync {}

impl<T> Store for T where T: UserStore + CategoryStore + ToolStore + BookingStore + Send + Sync {}
