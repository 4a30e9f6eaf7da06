//! Rental requests and their lifecycle.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::db::models::{Booking, BookingStatus, NewBooking, User, VerificationTier};
use crate::error::{ApiResult, Error};
use crate::models::{BookingView, Contact, CreateBookingRequest, StatusChange, ToolVersionView};
use crate::services::tools::tool_not_found;
use crate::services::SharedClock;
use crate::store::{BookingInsert, Store};

/// The party a booking list is built for; decides which contact is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Perspective {
    Renter,
    Owner,
}

/// Who may move a booking into `target`.
fn may_set(booking: &Booking, actor: Uuid, target: BookingStatus) -> bool {
    let is_owner = booking.owner_id == actor;
    let is_renter = booking.renter_id == actor;
    match target {
        BookingStatus::Approved | BookingStatus::Rejected => is_owner,
        BookingStatus::Cancelled | BookingStatus::Completed => is_owner || is_renter,
        BookingStatus::Pending => false,
    }
}

/// Legal lifecycle edges.
pub fn can_transition(from: BookingStatus, to: BookingStatus) -> bool {
    use BookingStatus::*;
    matches!(
        (from, to),
        (Pending, Approved) | (Pending, Rejected) | (Pending, Cancelled) | (Approved, Completed)
    )
}

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn Store>,
    clock: SharedClock,
    min_renter_tier: VerificationTier,
}

impl BookingService {
    pub fn new(store: Arc<dyn Store>, clock: SharedClock, min_renter_tier: VerificationTier) -> Self {
        Self {
            store,
            clock,
            min_renter_tier,
        }
    }

    /// Records a PENDING request against the tool's current version.
    pub fn create(&self, renter_id: Uuid, request: CreateBookingRequest) -> ApiResult<BookingView> {
        if request.end_date < request.start_date {
            return Err(Error::invalid_request("endDate must not be before startDate"));
        }
        if request.start_date.date_naive() < self.clock.utc().date_naive() {
            return Err(Error::invalid_request("startDate must not be in the past"));
        }
        if !request.total_price.is_finite() || request.total_price < 0.0 {
            return Err(Error::invalid_request("totalPrice must be a non-negative number"));
        }

        let tool = self
            .store
            .find_tool(request.tool_id)?
            .ok_or_else(|| tool_not_found(request.tool_id))?;
        if tool.owner_id == renter_id {
            return Err(Error::invalid_request("You cannot rent your own tool"));
        }
        let version_id = tool
            .active_version_id
            .ok_or_else(|| Error::invalid_request("Tool has no active version"))?;

        let renter = self
            .store
            .find_user(renter_id)?
            .ok_or_else(|| Error::unauthorized("Invalid or expired token"))?;
        if !renter.verification_tier.satisfies(self.min_renter_tier) {
            return Err(Error::forbidden(format!(
                "Renting requires verification tier {} or higher",
                self.min_renter_tier
            ))
            .with_details(json!({
                "requiredTier": self.min_renter_tier,
                "currentTier": renter.verification_tier,
            })));
        }

        let outcome = self.store.insert_booking_if_free(NewBooking {
            id: Uuid::new_v4(),
            tool_id: tool.id,
            tool_version_id: version_id,
            renter_id,
            owner_id: tool.owner_id,
            start_date: request.start_date,
            end_date: request.end_date,
            total_price: request.total_price,
            status: BookingStatus::Pending,
            created_at: self.clock.utc(),
        })?;

        match outcome {
            BookingInsert::Created(booking) => {
                info!(booking_id = %booking.id, tool_id = %tool.id, %renter_id, "booking requested");
                Ok(booking.into())
            }
            BookingInsert::Clashes(days) => {
                let dates: Vec<String> = days.iter().map(NaiveDate::to_string).collect();
                Err(Error::conflict("Tool is not available for the requested dates")
                    .with_details(json!({ "conflictingDates": dates })))
            }
        }
    }

    /// Bookings the user made, each with the rented version and owner contact.
    pub fn list_for_renter(&self, renter_id: Uuid) -> ApiResult<Vec<BookingView>> {
        let bookings = self.store.bookings_for_renter(renter_id)?;
        self.compose(bookings, Perspective::Renter)
    }

    /// Bookings on the user's tools, each with the version and renter contact.
    pub fn list_for_owner(&self, owner_id: Uuid) -> ApiResult<Vec<BookingView>> {
        let bookings = self.store.bookings_for_owner(owner_id)?;
        self.compose(bookings, Perspective::Owner)
    }

    pub fn update_status(&self, id: Uuid, actor: Uuid, change: StatusChange) -> ApiResult<BookingView> {
        let booking = self
            .store
            .find_booking(id)?
            .ok_or_else(|| Error::not_found(format!("Booking with ID {id} not found")))?;
        let target = BookingStatus::from(change);

        if !may_set(&booking, actor, target) {
            return Err(Error::forbidden(format!(
                "You are not allowed to mark this booking {target}"
            )));
        }
        if !can_transition(booking.status, target) {
            return Err(Error::conflict(format!(
                "Cannot change booking status from {} to {target}",
                booking.status
            ))
            .with_details(json!({ "from": booking.status, "to": target })));
        }

        let updated = self.store.set_booking_status(id, booking.status, target)?;
        info!(booking_id = %id, from = %booking.status, to = %target, %actor, "booking status changed");
        Ok(updated.into())
    }

    fn compose(&self, bookings: Vec<Booking>, perspective: Perspective) -> ApiResult<Vec<BookingView>> {
        let version_ids: Vec<Uuid> = bookings.iter().map(|b| b.tool_version_id).collect();
        let versions: HashMap<Uuid, ToolVersionView> = self
            .store
            .versions_by_ids(&version_ids)?
            .iter()
            .map(|v| (v.id, ToolVersionView::from(v)))
            .collect();

        let counterparty = |b: &Booking| match perspective {
            Perspective::Renter => b.owner_id,
            Perspective::Owner => b.renter_id,
        };
        let party_ids: Vec<Uuid> = bookings.iter().map(counterparty).collect();
        let contacts: HashMap<Uuid, Contact> = self
            .store
            .users_by_ids(&party_ids)?
            .iter()
            .map(|u: &User| (u.id, Contact::from(u)))
            .collect();

        Ok(bookings
            .into_iter()
            .map(|booking| {
                let tool = versions.get(&booking.tool_version_id).cloned();
                let contact = contacts.get(&counterparty(&booking)).cloned();
                let mut view = BookingView::from(booking);
                view.tool = tool;
                match perspective {
                    Perspective::Renter => view.owner = contact,
                    Perspective::Owner => view.renter = contact,
                }
                view
            })
            .collect())
    }
}
