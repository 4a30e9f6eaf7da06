//! Helpers shared by unit tests and the integration tests in `tests/`.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use mockable::Clock;
use uuid::Uuid;

use crate::config::{
    AuthSettings, BookingSettings, DatabaseSettings, LogSettings, ServerSettings, Settings,
};
use crate::db::models::{Category, VerificationTier};
use crate::services::SharedClock;

/// Clock frozen at a given instant.
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn at(rfc3339: &str) -> Arc<Self> {
        let now = DateTime::parse_from_rfc3339(rfc3339)
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or_else(|err| panic!("invalid fixture timestamp {rfc3339}: {err}"));
        Arc::new(Self { now })
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.now
    }
}

/// A frozen clock as the shared trait object services take.
pub fn fixed_clock(rfc3339: &str) -> SharedClock {
    FixedClock::at(rfc3339)
}

/// Settings suitable for tests: cheap bcrypt cost, fixed secret.
pub fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".to_owned(),
            port: 0,
        },
        database: DatabaseSettings {
            url: "postgres://unused".to_owned(),
            pool_size: 1,
            timeout_seconds: 1,
        },
        auth: AuthSettings {
            jwt_secret: "integration-test-secret".to_owned(),
            token_ttl_days: 7,
            bcrypt_cost: 4,
        },
        bookings: BookingSettings {
            min_renter_tier: VerificationTier::Unverified,
        },
        log: LogSettings {
            filter: "warn".to_owned(),
        },
    }
}

/// Two top-level categories and one child of the first.
pub fn sample_categories() -> Vec<Category> {
    let power = Uuid::new_v4();
    vec![
        Category {
            id: power,
            name: "Power Tools".to_owned(),
            slug: "power-tools".to_owned(),
            icon: Some("power-plug".to_owned()),
            parent_id: None,
        },
        Category {
            id: Uuid::new_v4(),
            name: "Garden & Outdoor".to_owned(),
            slug: "garden-outdoor".to_owned(),
            icon: Some("flower".to_owned()),
            parent_id: None,
        },
        Category {
            id: Uuid::new_v4(),
            name: "Drills".to_owned(),
            slug: "drills".to_owned(),
            icon: None,
            parent_id: Some(power),
        },
    ]
}
