//! Per-day availability of a tool: days held by live bookings plus days the
//! owner blocked by hand.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiResult, Error};
use crate::models::{Availability, UpdateAvailabilityRequest};
use crate::services::dates::{expand_range, start_of_day};
use crate::services::tools::{tool_not_found, Ownership};
use crate::services::SharedClock;
use crate::store::Store;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Every day of each live booking that ends on or after `from`, plus the
/// manual blocks dated `from` or later.
fn unavailable_from(store: &dyn Store, tool_id: Uuid, from: NaiveDate) -> ApiResult<Availability> {
    let booked_dates = store
        .date_holding_bookings(tool_id, start_of_day(from))?
        .iter()
        .flat_map(|b| expand_range(b.start_date, b.end_date))
        .collect();
    let manual_blocked_dates = store.date_blocks_from(tool_id, from)?.into_iter().collect();
    Ok(Availability {
        booked_dates,
        manual_blocked_dates,
    })
}

#[derive(Clone)]
pub struct AvailabilityService {
    store: Arc<dyn Store>,
    clock: SharedClock,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn Store>, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    fn today(&self) -> NaiveDate {
        self.clock.utc().date_naive()
    }

    pub fn get(&self, tool_id: Uuid) -> ApiResult<Availability> {
        if self.store.find_tool(tool_id)?.is_none() {
            return Err(tool_not_found(tool_id));
        }
        unavailable_from(self.store.as_ref(), tool_id, self.today())
    }

    /// Replaces every manual block from today onward. Past blocks are kept
    /// as history and cannot be submitted.
    pub fn update(
        &self,
        tool_id: Uuid,
        actor: Uuid,
        request: UpdateAvailabilityRequest,
    ) -> ApiResult<Availability> {
        Ownership::check(self.store.find_tool(tool_id)?, actor).into_result(tool_id)?;

        let requested = parse_dates(&request.manual_blocked_dates)?;
        let today = self.today();

        let past: Vec<String> = requested
            .iter()
            .filter(|day| **day < today)
            .map(NaiveDate::to_string)
            .collect();
        if !past.is_empty() {
            return Err(Error::invalid_request("Cannot block dates in the past")
                .with_details(json!({ "pastDates": past })));
        }

        let current = unavailable_from(self.store.as_ref(), tool_id, today)?;
        let conflicting: Vec<String> = requested
            .intersection(&current.booked_dates)
            .map(NaiveDate::to_string)
            .collect();
        if !conflicting.is_empty() {
            return Err(Error::conflict("Some dates are already booked")
                .with_details(json!({ "conflictingDates": conflicting })));
        }

        let dates: Vec<NaiveDate> = requested.into_iter().collect();
        self.store.replace_date_blocks_from(tool_id, today, &dates)?;
        info!(%tool_id, blocked = dates.len(), "manual blocks replaced");

        unavailable_from(self.store.as_ref(), tool_id, today)
    }
}

/// Parses and deduplicates `YYYY-MM-DD` strings, naming every bad entry.
fn parse_dates(raw: &[String]) -> ApiResult<BTreeSet<NaiveDate>> {
    let mut dates = BTreeSet::new();
    let mut invalid = Vec::new();
    for value in raw {
        match NaiveDate::parse_from_str(value.trim(), DATE_FORMAT) {
            Ok(day) => {
                dates.insert(day);
            }
            Err(_) => invalid.push(value.clone()),
        }
    }
    if invalid.is_empty() {
        Ok(dates)
    } else {
        Err(Error::invalid_request("Dates must use the YYYY-MM-DD format")
            .with_details(json!({ "invalidDates": invalid })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{
        BookingStatus, NewBooking, NewTool, NewToolVersion, NewUser, VerificationTier,
    };
    use crate::error::ErrorCode;
    use crate::memory::MemoryStore;
    use crate::store::{BookingInsert, BookingStore, ToolStore, UserStore};
    use crate::test_support::{fixed_clock, sample_categories};
    use chrono::{DateTime, Utc};

    struct Fixture {
        store: Arc<MemoryStore>,
        service: AvailabilityService,
        tool_id: Uuid,
        version_id: Uuid,
        owner: Uuid,
        renter: Uuid,
    }

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().expect("timestamp")
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().expect("date")
    }

    fn add_user(store: &MemoryStore, email: &str) -> Uuid {
        store
            .insert_user(NewUser {
                id: Uuid::new_v4(),
                email: email.to_owned(),
                password_hash: "x".to_owned(),
                display_name: email.to_owned(),
                verification_tier: VerificationTier::Unverified,
                city: None,
                phone: None,
                created_at: ts("2023-12-01T00:00:00Z"),
            })
            .expect("user")
            .id
    }

    fn fixture() -> Fixture {
        let categories = sample_categories();
        let category_id = categories[0].id;
        let store = Arc::new(MemoryStore::with_categories(categories));
        let owner = add_user(&store, "owner@example.com");
        let renter = add_user(&store, "renter@example.com");
        let tool_id = Uuid::new_v4();
        let (_, version) = store
            .create_tool(
                NewTool {
                    id: tool_id,
                    owner_id: owner,
                    is_available: true,
                    active_version_id: None,
                    created_at: ts("2023-12-01T00:00:00Z"),
                },
                NewToolVersion {
                    id: Uuid::new_v4(),
                    tool_id,
                    name: "Ladder".to_owned(),
                    description: "3m aluminium".to_owned(),
                    category_id,
                    price_per_day: 10.0,
                    replacement_value: None,
                    condition: None,
                    latitude: None,
                    longitude: None,
                    images: Vec::new(),
                    created_at: ts("2023-12-01T00:00:00Z"),
                },
            )
            .expect("tool");
        let service = AvailabilityService::new(store.clone(), fixed_clock("2024-01-01T12:00:00Z"));
        Fixture {
            store,
            service,
            tool_id,
            version_id: version.id,
            owner,
            renter,
        }
    }

    fn book(fx: &Fixture, start: &str, end: &str, status: BookingStatus) {
        let outcome = fx
            .store
            .insert_booking_if_free(NewBooking {
                id: Uuid::new_v4(),
                tool_id: fx.tool_id,
                tool_version_id: fx.version_id,
                renter_id: fx.renter,
                owner_id: fx.owner,
                start_date: ts(start),
                end_date: ts(end),
                total_price: 30.0,
                status,
                created_at: ts("2023-12-20T00:00:00Z"),
            })
            .expect("booking");
        assert!(matches!(outcome, BookingInsert::Created(_)), "{start}..{end} clashed");
    }

    fn request(dates: &[&str]) -> UpdateAvailabilityRequest {
        UpdateAvailabilityRequest {
            manual_blocked_dates: dates.iter().map(|d| (*d).to_owned()).collect(),
        }
    }

    #[test]
    fn booked_dates_cover_pending_and_approved_only() {
        let fx = fixture();
        book(&fx, "2024-01-10T00:00:00Z", "2024-01-12T00:00:00Z", BookingStatus::Approved);
        book(&fx, "2024-01-15T00:00:00Z", "2024-01-15T00:00:00Z", BookingStatus::Pending);
        book(&fx, "2024-01-20T00:00:00Z", "2024-01-22T00:00:00Z", BookingStatus::Rejected);
        book(&fx, "2024-01-25T00:00:00Z", "2024-01-26T00:00:00Z", BookingStatus::Cancelled);

        let availability = fx.service.get(fx.tool_id).expect("availability");
        let expected: BTreeSet<NaiveDate> = ["2024-01-10", "2024-01-11", "2024-01-12", "2024-01-15"]
            .iter()
            .map(|d| day(d))
            .collect();
        assert_eq!(availability.booked_dates, expected);
        assert!(availability.manual_blocked_dates.is_empty());
    }

    #[test]
    fn running_bookings_report_every_day_and_finished_ones_none() {
        let fx = fixture();
        book(&fx, "2023-12-20T00:00:00Z", "2023-12-22T00:00:00Z", BookingStatus::Approved);
        book(&fx, "2023-12-30T00:00:00Z", "2024-01-02T00:00:00Z", BookingStatus::Approved);

        let availability = fx.service.get(fx.tool_id).expect("availability");
        let booked: Vec<String> = availability.booked_dates.iter().map(|d| d.to_string()).collect();
        assert_eq!(booked, ["2023-12-30", "2023-12-31", "2024-01-01", "2024-01-02"]);
    }

    #[test]
    fn update_replaces_future_blocks_and_dedupes() {
        let fx = fixture();
        fx.service
            .update(fx.tool_id, fx.owner, request(&["2024-01-05", "2024-01-06"]))
            .expect("first");
        let availability = fx
            .service
            .update(fx.tool_id, fx.owner, request(&["2024-01-07", "2024-01-07"]))
            .expect("second");

        let blocked: Vec<String> = availability
            .manual_blocked_dates
            .iter()
            .map(|d| d.to_string())
            .collect();
        assert_eq!(blocked, ["2024-01-07"]);
    }

    #[test]
    fn blocking_a_booked_day_is_a_conflict() {
        let fx = fixture();
        book(&fx, "2024-01-10T00:00:00Z", "2024-01-12T00:00:00Z", BookingStatus::Approved);

        let err = fx
            .service
            .update(fx.tool_id, fx.owner, request(&["2024-01-11", "2024-01-20"]))
            .expect_err("conflict");

        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(
            err.details().expect("details")["conflictingDates"],
            json!(["2024-01-11"])
        );
        assert!(fx.service.get(fx.tool_id).expect("get").manual_blocked_dates.is_empty());
    }

    #[test]
    fn past_and_malformed_dates_are_rejected() {
        let fx = fixture();

        let past = fx
            .service
            .update(fx.tool_id, fx.owner, request(&["2023-12-31", "2024-01-03"]))
            .expect_err("past");
        assert_eq!(past.code(), ErrorCode::InvalidRequest);
        assert_eq!(past.details().expect("details")["pastDates"], json!(["2023-12-31"]));

        let malformed = fx
            .service
            .update(fx.tool_id, fx.owner, request(&["01/05/2024"]))
            .expect_err("malformed");
        assert_eq!(malformed.code(), ErrorCode::InvalidRequest);
        assert_eq!(
            malformed.details().expect("details")["invalidDates"],
            json!(["01/05/2024"])
        );
    }

    #[test]
    fn only_the_owner_may_block_dates() {
        let fx = fixture();
        let err = fx
            .service
            .update(fx.tool_id, fx.renter, request(&["2024-01-05"]))
            .expect_err("foreign");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn unknown_tool_is_not_found() {
        let fx = fixture();
        let err = fx.service.get(Uuid::new_v4()).expect_err("missing");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
