//! In-memory [`Store`](crate::store::Store) for tests.
//!
//! A single mutex guards all tables, so every method is trivially atomic.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::db::models::*;
use crate::error::Error;
use crate::services::dates::{clashing_days, expand_range};
use crate::store::{
    stale_status, BookingInsert, BookingStore, CategoryStore, StoreResult, ToolFilter, ToolStore,
    UserStore,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    categories: Vec<Category>,
    tools: Vec<Tool>,
    versions: Vec<ToolVersion>,
    blocks: Vec<ToolDateBlock>,
    bookings: Vec<Booking>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with the given categories.
    pub fn with_categories(categories: Vec<Category>) -> Self {
        let store = Self::default();
        if let Ok(mut tables) = store.tables.lock() {
            tables.categories = categories;
        }
        store
    }

    /// Overwrite a user's tier; stands in for the verification workflow.
    pub fn set_verification_tier(&self, user_id: Uuid, tier: VerificationTier) -> StoreResult<()> {
        let mut tables = self.lock()?;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| Error::not_found("User not found"))?;
        user.verification_tier = tier;
        Ok(())
    }

    /// Number of versions ever recorded for a tool.
    pub fn version_count(&self, tool_id: Uuid) -> StoreResult<usize> {
        Ok(self.lock()?.versions.iter().filter(|v| v.tool_id == tool_id).count())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| Error::internal("memory store lock poisoned"))
    }
}

fn sorted_by_name(mut categories: Vec<Category>) -> Vec<Category> {
    categories.sort_by(|a, b| a.name.cmp(&b.name));
    categories
}

fn newest_first<T, F>(mut rows: Vec<T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    rows
}

impl UserStore for MemoryStore {
    fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.lock()?;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(Error::conflict("Email already registered"));
        }
        let row = User {
            id: user.id,
            email: user.email,
            password_hash: user.password_hash,
            display_name: user.display_name,
            verification_tier: user.verification_tier,
            verified_at: None,
            city: user.city,
            phone: user.phone,
            created_at: user.created_at,
        };
        tables.users.push(row.clone());
        Ok(row)
    }

    fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.iter().find(|u| u.id == id).cloned())
    }

    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.iter().find(|u| u.email == email).cloned())
    }

    fn users_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        Ok(self
            .lock()?
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.lock()?.users.clone())
    }

    fn count_tools_owned(&self, owner_id: Uuid) -> StoreResult<i64> {
        let count = self.lock()?.tools.iter().filter(|t| t.owner_id == owner_id).count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    fn count_bookings_received(&self, owner_id: Uuid) -> StoreResult<i64> {
        let count = self
            .lock()?
            .bookings
            .iter()
            .filter(|b| b.owner_id == owner_id)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}

impl CategoryStore for MemoryStore {
    fn top_level_categories(&self) -> StoreResult<Vec<Category>> {
        let rows = self
            .lock()?
            .categories
            .iter()
            .filter(|c| c.parent_id.is_none())
            .cloned()
            .collect();
        Ok(sorted_by_name(rows))
    }

    fn subcategories(&self, parent_id: Uuid) -> StoreResult<Vec<Category>> {
        let rows = self
            .lock()?
            .categories
            .iter()
            .filter(|c| c.parent_id == Some(parent_id))
            .cloned()
            .collect();
        Ok(sorted_by_name(rows))
    }

    fn find_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        Ok(self.lock()?.categories.iter().find(|c| c.id == id).cloned())
    }

    fn categories_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Category>> {
        Ok(self
            .lock()?
            .categories
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }
}

impl ToolStore for MemoryStore {
    fn create_tool(&self, tool: NewTool, first: NewToolVersion) -> StoreResult<(Tool, ToolVersion)> {
        let mut tables = self.lock()?;
        let version = first.into_version();
        let row = Tool {
            id: tool.id,
            owner_id: tool.owner_id,
            is_available: tool.is_available,
            active_version_id: Some(version.id),
            created_at: tool.created_at,
        };
        tables.tools.push(row.clone());
        tables.versions.push(version.clone());
        Ok((row, version))
    }

    fn find_tool(&self, id: Uuid) -> StoreResult<Option<Tool>> {
        Ok(self.lock()?.tools.iter().find(|t| t.id == id).cloned())
    }

    fn list_tools(&self, filter: ToolFilter) -> StoreResult<Vec<Tool>> {
        let rows = self
            .lock()?
            .tools
            .iter()
            .filter(|t| match filter {
                ToolFilter::Available { exclude_owner } => {
                    t.is_available && exclude_owner != Some(t.owner_id)
                }
                ToolFilter::OwnedBy(owner) => t.owner_id == owner,
            })
            .cloned()
            .collect();
        Ok(newest_first(rows, |t: &Tool| t.created_at))
    }

    fn versions_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<ToolVersion>> {
        Ok(self
            .lock()?
            .versions
            .iter()
            .filter(|v| ids.contains(&v.id))
            .cloned()
            .collect())
    }

    fn revise_tool(
        &self,
        tool_id: Uuid,
        is_available: Option<bool>,
        next: Option<NewToolVersion>,
    ) -> StoreResult<Tool> {
        let mut tables = self.lock()?;
        let index = tables
            .tools
            .iter()
            .position(|t| t.id == tool_id)
            .ok_or_else(|| Error::not_found("Record not found"))?;
        if let Some(version) = next {
            let version = version.into_version();
            tables.tools[index].active_version_id = Some(version.id);
            tables.versions.push(version);
        }
        if let Some(flag) = is_available {
            tables.tools[index].is_available = flag;
        }
        Ok(tables.tools[index].clone())
    }

    fn delete_tool(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.lock()?;
        tables.tools.retain(|t| t.id != id);
        tables.versions.retain(|v| v.tool_id != id);
        tables.blocks.retain(|b| b.tool_id != id);
        tables.bookings.retain(|b| b.tool_id != id);
        Ok(())
    }

    fn date_blocks_from(&self, tool_id: Uuid, from: NaiveDate) -> StoreResult<Vec<NaiveDate>> {
        let mut dates: Vec<NaiveDate> = self
            .lock()?
            .blocks
            .iter()
            .filter(|b| b.tool_id == tool_id && b.date >= from)
            .map(|b| b.date)
            .collect();
        dates.sort();
        Ok(dates)
    }

    fn replace_date_blocks_from(
        &self,
        tool_id: Uuid,
        from: NaiveDate,
        dates: &[NaiveDate],
    ) -> StoreResult<()> {
        let mut tables = self.lock()?;
        tables
            .blocks
            .retain(|b| !(b.tool_id == tool_id && b.date >= from));
        tables.blocks.extend(dates.iter().map(|date| ToolDateBlock {
            id: Uuid::new_v4(),
            tool_id,
            date: *date,
        }));
        Ok(())
    }
}

impl BookingStore for MemoryStore {
    fn insert_booking_if_free(&self, booking: NewBooking) -> StoreResult<BookingInsert> {
        let requested = expand_range(booking.start_date, booking.end_date);
        let mut tables = self.lock()?;
        if !tables.tools.iter().any(|t| t.id == booking.tool_id) {
            return Err(Error::not_found("Record not found"));
        }

        let held = tables
            .bookings
            .iter()
            .filter(|b| b.tool_id == booking.tool_id && b.status.holds_dates())
            .flat_map(|b| expand_range(b.start_date, b.end_date));
        let blocked = tables
            .blocks
            .iter()
            .filter(|b| b.tool_id == booking.tool_id)
            .map(|b| b.date);
        let clashes = clashing_days(&requested, held.chain(blocked));
        if !clashes.is_empty() {
            return Ok(BookingInsert::Clashes(clashes));
        }

        let row = booking.into_booking();
        tables.bookings.push(row.clone());
        Ok(BookingInsert::Created(row))
    }

    fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.lock()?.bookings.iter().find(|b| b.id == id).cloned())
    }

    fn bookings_for_renter(&self, renter_id: Uuid) -> StoreResult<Vec<Booking>> {
        let rows = self
            .lock()?
            .bookings
            .iter()
            .filter(|b| b.renter_id == renter_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |b: &Booking| b.created_at))
    }

    fn bookings_for_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Booking>> {
        let rows = self
            .lock()?
            .bookings
            .iter()
            .filter(|b| b.owner_id == owner_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |b: &Booking| b.created_at))
    }

    fn date_holding_bookings(
        &self,
        tool_id: Uuid,
        ending_from: DateTime<Utc>,
    ) -> StoreResult<Vec<Booking>> {
        Ok(self
            .lock()?
            .bookings
            .iter()
            .filter(|b| b.tool_id == tool_id && b.status.holds_dates() && b.end_date >= ending_from)
            .cloned()
            .collect())
    }

    fn set_booking_status(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> StoreResult<Booking> {
        let mut tables = self.lock()?;
        let booking = tables
            .bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| Error::not_found("Record not found"))?;
        if booking.status != from {
            return Err(stale_status(id, from));
        }
        booking.status = to;
        Ok(booking.clone())
    }
}
