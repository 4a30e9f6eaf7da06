//! JSON request and response bodies. Wire names are camelCase to match the
//! mobile client.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::db::models::{
    Booking, BookingStatus, Category, ToolVersion, User, VerificationTier,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub city: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub user: PublicUser,
}

/// A user as shown to clients; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub verification_tier: VerificationTier,
    pub verified_at: Option<DateTime<Utc>>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            verification_tier: user.verification_tier,
            verified_at: user.verified_at,
            city: user.city,
            phone: user.phone,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub listed_count: i64,
    pub rental_count: i64,
    /// No reviews exist yet, so this is always null.
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: Uuid,
    pub display_name: String,
    pub verification_tier: VerificationTier,
}

impl From<&User> for OwnerSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name.clone(),
            verification_tier: user.verification_tier,
        }
    }
}

/// Counterparty details shown on a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub display_name: String,
    pub email: String,
}

impl From<&User> for Contact {
    fn from(user: &User) -> Self {
        Self {
            display_name: user.display_name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateToolRequest {
    pub name: String,
    pub description: String,
    pub category_id: Uuid,
    pub price_per_day: f64,
    pub replacement_value: Option<f64>,
    pub condition: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub images: Vec<String>,
    pub is_available: Option<bool>,
}

/// Partial update. `isAvailable` patches the tool row; every other field
/// produces a new version.
///
/// Optional terms are tri-state: an absent key keeps the current value and an
/// explicit `null` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateToolRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub price_per_day: Option<f64>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub replacement_value: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub condition: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub latitude: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub longitude: Option<Option<f64>>,
    pub images: Option<Vec<String>>,
    pub is_available: Option<bool>,
}

/// A present key becomes `Some`, so `null` reads as `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolsQuery {
    pub exclude: Option<Uuid>,
}

/// Listing terms carried by a version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDetails {
    pub name: String,
    pub description: String,
    pub category_id: Uuid,
    pub price_per_day: f64,
    pub replacement_value: Option<f64>,
    pub condition: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub images: Vec<String>,
}

impl From<&ToolVersion> for ToolDetails {
    fn from(version: &ToolVersion) -> Self {
        Self {
            name: version.name.clone(),
            description: version.description.clone(),
            category_id: version.category_id,
            price_per_day: version.price_per_day,
            replacement_value: version.replacement_value,
            condition: version.condition.clone(),
            latitude: version.latitude,
            longitude: version.longitude,
            images: version.images.clone(),
        }
    }
}

/// A tool flattened with its active version. `id` is always the tool's
/// stable id; the version's own id is exposed as `activeVersionId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolView {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub is_available: bool,
    pub active_version_id: Option<Uuid>,
    #[serde(flatten)]
    pub details: Option<ToolDetails>,
    pub category: Option<CategoryView>,
    pub owner: Option<OwnerSummary>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub icon: Option<String>,
}

impl From<&Category> for CategoryView {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            slug: category.slug.clone(),
            icon: category.icon.clone(),
        }
    }
}

/// The version a booking was made under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolVersionView {
    pub id: Uuid,
    pub tool_id: Uuid,
    #[serde(flatten)]
    pub details: ToolDetails,
    pub created_at: DateTime<Utc>,
}

impl From<&ToolVersion> for ToolVersionView {
    fn from(version: &ToolVersion) -> Self {
        Self {
            id: version.id,
            tool_id: version.tool_id,
            details: ToolDetails::from(version),
            created_at: version.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub booked_dates: BTreeSet<NaiveDate>,
    pub manual_blocked_dates: BTreeSet<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAvailabilityRequest {
    /// `YYYY-MM-DD` strings; replaces every future manual block.
    pub manual_blocked_dates: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub tool_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_price: f64,
}

/// Target states a client may request. PENDING is only ever set on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusChange {
    Approved,
    Rejected,
    Cancelled,
    Completed,
}

impl From<StatusChange> for BookingStatus {
    fn from(change: StatusChange) -> Self {
        match change {
            StatusChange::Approved => BookingStatus::Approved,
            StatusChange::Rejected => BookingStatus::Rejected,
            StatusChange::Cancelled => BookingStatus::Cancelled,
            StatusChange::Completed => BookingStatus::Completed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: StatusChange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolVersionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Contact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renter: Option<Contact>,
}

impl From<Booking> for BookingView {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            tool_id: booking.tool_id,
            tool_version_id: booking.tool_version_id,
            renter_id: booking.renter_id,
            owner_id: booking.owner_id,
            start_date: booking.start_date,
            end_date: booking.end_date,
            total_price: booking.total_price,
            status: booking.status,
            created_at: booking.created_at,
            tool: None,
            owner: None,
            renter: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_request_tells_null_from_absent() {
        let request: UpdateToolRequest =
            serde_json::from_value(json!({ "condition": null, "latitude": 12.5 }))
                .expect("parse");

        assert_eq!(request.condition, Some(None));
        assert_eq!(request.latitude, Some(Some(12.5)));
        assert_eq!(request.longitude, None);
        assert_eq!(request.replacement_value, None);
    }
}
