use std::fmt;
use std::io::Write;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::schema::{bookings, categories, tool_date_blocks, tool_versions, tools, users};

/// Ordered trust level. Variants are declared lowest first so the derived
/// `Ord` matches the tier order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    diesel::AsExpression,
    diesel::FromSqlRow,
)]
#[diesel(sql_type = Text)]
pub enum VerificationTier {
    #[serde(rename = "UNVERIFIED")]
    Unverified,
    #[serde(rename = "TIER_1")]
    Tier1,
    #[serde(rename = "TIER_2")]
    Tier2,
    #[serde(rename = "TIER_3")]
    Tier3,
}

impl VerificationTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unverified => "UNVERIFIED",
            Self::Tier1 => "TIER_1",
            Self::Tier2 => "TIER_2",
            Self::Tier3 => "TIER_3",
        }
    }

    /// True when this tier is at least `required`.
    pub fn satisfies(self, required: VerificationTier) -> bool {
        self >= required
    }
}

/// Rental request lifecycle state.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    diesel::AsExpression,
    diesel::FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
            Self::Completed => "COMPLETED",
        }
    }

    /// Bookings in these states hold their dates.
    pub fn holds_dates(self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value `{value}`")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl FromStr for VerificationTier {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNVERIFIED" => Ok(Self::Unverified),
            "TIER_1" => Ok(Self::Tier1),
            "TIER_2" => Ok(Self::Tier2),
            "TIER_3" => Ok(Self::Tier3),
            other => Err(UnknownVariant {
                kind: "verification tier",
                value: other.to_owned(),
            }),
        }
    }
}

impl FromStr for BookingStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "CANCELLED" => Ok(Self::Cancelled),
            "COMPLETED" => Ok(Self::Completed),
            other => Err(UnknownVariant {
                kind: "booking status",
                value: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for VerificationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! text_enum_sql {
    ($ty:ty) => {
        impl ToSql<Text, Pg> for $ty {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $ty {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let raw = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
                Ok(raw.parse::<$ty>()?)
            }
        }
    };
}

text_enum_sql!(VerificationTier);
text_enum_sql!(BookingStatus);

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub verification_tier: VerificationTier,
    pub verified_at: Option<DateTime<Utc>>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub verification_tier: VerificationTier,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq)]
#[diesel(table_name = categories)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub icon: Option<String>,
    pub parent_id: Option<Uuid>,
}

/// Identity row of a listing. Everything a renter sees lives on the
/// active [`ToolVersion`].
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = tools)]
pub struct Tool {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub is_available: bool,
    pub active_version_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = tools)]
pub struct NewTool {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub is_available: bool,
    pub active_version_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Immutable snapshot of listing terms. Rows are only ever inserted;
/// edits produce a successor through [`ToolVersion::revise`].
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = tool_versions)]
pub struct ToolVersion {
    pub id: Uuid,
    pub tool_id: Uuid,
    pub name: String,
    pub description: String,
    pub category_id: Uuid,
    pub price_per_day: f64,
    pub replacement_value: Option<f64>,
    pub condition: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = tool_versions)]
pub struct NewToolVersion {
    pub id: Uuid,
    pub tool_id: Uuid,
    pub name: String,
    pub description: String,
    pub category_id: Uuid,
    pub price_per_day: f64,
    pub replacement_value: Option<f64>,
    pub condition: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Field overrides applied when revising a version. `None` keeps the
/// predecessor's value; for optional terms `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub price_per_day: Option<f64>,
    pub replacement_value: Option<Option<f64>>,
    pub condition: Option<Option<String>>,
    pub latitude: Option<Option<f64>>,
    pub longitude: Option<Option<f64>>,
    pub images: Option<Vec<String>>,
}

impl ToolChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl ToolVersion {
    /// Successor seeded from this version with `changes` laid over it.
    pub fn revise(&self, changes: ToolChanges, now: DateTime<Utc>) -> NewToolVersion {
        NewToolVersion {
            id: Uuid::new_v4(),
            tool_id: self.tool_id,
            name: changes.name.unwrap_or_else(|| self.name.clone()),
            description: changes
                .description
                .unwrap_or_else(|| self.description.clone()),
            category_id: changes.category_id.unwrap_or(self.category_id),
            price_per_day: changes.price_per_day.unwrap_or(self.price_per_day),
            replacement_value: changes.replacement_value.unwrap_or(self.replacement_value),
            condition: changes
                .condition
                .unwrap_or_else(|| self.condition.clone()),
            latitude: changes.latitude.unwrap_or(self.latitude),
            longitude: changes.longitude.unwrap_or(self.longitude),
            images: changes.images.unwrap_or_else(|| self.images.clone()),
            created_at: now,
        }
    }
}

impl NewToolVersion {
    /// The stored row this insert produces.
    pub fn into_version(self) -> ToolVersion {
        ToolVersion {
            id: self.id,
            tool_id: self.tool_id,
            name: self.name,
            description: self.description,
            category_id: self.category_id,
            price_per_day: self.price_per_day,
            replacement_value: self.replacement_value,
            condition: self.condition,
            latitude: self.latitude,
            longitude: self.longitude,
            images: self.images,
            created_at: self.created_at,
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = tool_date_blocks)]
pub struct ToolDateBlock {
    pub id: Uuid,
    pub tool_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = tool_date_blocks)]
pub struct NewToolDateBlock {
    pub id: Uuid,
    pub tool_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = bookings)]
pub struct Booking {
    pub id: Uuid,
    pub tool_id: Uuid,
    pub tool_version_id: Uuid,
    pub renter_id: Uuid,
    pub owner_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_price: f64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = bookings)]
pub struct NewBooking {
    pub id: Uuid,
    pub tool_id: Uuid,
    pub tool_version_id: Uuid,
    pub renter_id: Uuid,
    pub owner_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_price: f64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl NewBooking {
    pub fn into_booking(self) -> Booking {
        Booking {
            id: self.id,
            tool_id: self.tool_id,
            tool_version_id: self.tool_version_id,
            renter_id: self.renter_id,
            owner_id: self.owner_id,
            start_date: self.start_date,
            end_date: self.end_date,
            total_price: self.total_price,
            status: self.status,
            created_at: self.created_at,
        }
    }
}
