use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: i64 = 86_400;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub i64);
    };
}

id_newtype!(UserId);
id_newtype!(RoomId);
id_newtype!(BookingId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Booked,
    Completed,
    Cancelled,
}

/// A room record as served by the hotel service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub room_number: String,
    #[serde(rename = "type")]
    pub room_type: String,
    pub price: f64,
    pub available: bool,
}

/// Denormalized room subset carried on a booking record. The service does
/// not guarantee any of these fields, so every one is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedRoom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RoomId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_number: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub room_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// Denormalized owner subset carried on a booking record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<BookedRoom>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<BookedUser>,
    pub check_in_date: DateTime<Utc>,
    pub check_out_date: DateTime<Utc>,
    pub status: BookingStatus,
}

impl Booking {
    /// Billable nights between check-in and check-out, rounding partial
    /// days up. Negative when the recorded check-out precedes check-in.
    pub fn nights(&self) -> i64 {
        let seconds = self
            .check_out_date
            .signed_duration_since(self.check_in_date)
            .num_seconds();
        // Equivalent to `i64::div_ceil(seconds, SECONDS_PER_DAY)`, which is
        // still unstable (`int_roundings`). Divisor is always positive.
        let quotient = seconds / SECONDS_PER_DAY;
        let remainder = seconds % SECONDS_PER_DAY;
        if remainder > 0 {
            quotient + 1
        } else {
            quotient
        }
    }

    /// Nightly price of the booked room, 0 when the room reference or its
    /// price is absent.
    pub fn room_price(&self) -> f64 {
        self.room.as_ref().and_then(|room| room.price).unwrap_or(0.0)
    }

    /// Display label for activity feeds; `#` stands in when the booking
    /// lost its room reference.
    pub fn room_label(&self) -> &str {
        self.room
            .as_ref()
            .and_then(|room| room.room_number.as_deref())
            .unwrap_or("#")
    }

    pub fn guest_name(&self) -> Option<&str> {
        self.user.as_ref().and_then(|user| user.username.as_deref())
    }
}
