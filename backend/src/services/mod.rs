//! Business rules. Services are synchronous and talk to persistence only
//! through [`Store`]; handlers run them on the blocking pool.

pub mod auth;
pub mod availability;
pub mod bookings;
pub mod categories;
pub mod dates;
pub mod tools;
pub mod users;

use std::sync::Arc;

use mockable::{Clock, DefaultClock};

use crate::config::Settings;
use crate::store::Store;

pub use auth::{AuthService, TokenIssuer};
pub use availability::AvailabilityService;
pub use bookings::BookingService;
pub use categories::CategoryService;
pub use tools::ToolService;
pub use users::UserService;

/// Source of "now" shared by every service.
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

pub fn system_clock() -> SharedClock {
    Arc::new(DefaultClock)
}

/// Every service, wired to one store and one clock.
#[derive(Clone)]
pub struct Services {
    pub auth: AuthService,
    pub users: UserService,
    pub categories: CategoryService,
    pub tools: ToolService,
    pub availability: AvailabilityService,
    pub bookings: BookingService,
}

impl Services {
    pub fn new(store: Arc<dyn Store>, clock: SharedClock, settings: &Settings) -> Self {
        Self {
            auth: AuthService::new(store.clone(), &settings.auth, clock.clone()),
            users: UserService::new(store.clone()),
            categories: CategoryService::new(store.clone()),
            tools: ToolService::new(store.clone(), clock.clone()),
            availability: AvailabilityService::new(store.clone(), clock.clone()),
            bookings: BookingService::new(store, clock, settings.bookings.min_renter_tier),
        }
    }
}
