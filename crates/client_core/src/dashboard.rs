use shared::{
    domain::{Booking, BookingStatus, Room},
    error::DataAnomaly,
};
use tracing::warn;

/// How many bookings the activity feed keeps.
pub const RECENT_ACTIVITY_LIMIT: usize = 5;

/// Derived dashboard figures. Recomputed from fresh snapshots on every
/// load; nothing here accumulates across calls.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub total_rooms: usize,
    pub available_rooms: usize,
    pub total_bookings: usize,
    pub active_bookings: usize,
    pub total_revenue: f64,
    /// Percentage of rooms not currently available, one decimal place.
    pub occupancy_rate: f64,
    /// The bookings with the largest ids, newest first. Ids stand in for
    /// recency since booking records carry no creation timestamp.
    pub recent_activity: Vec<Booking>,
    /// Echo of the caller's privilege so a renderer can decide which
    /// figures to show without recomputing.
    pub privileged: bool,
    /// Malformed records encountered while aggregating.
    pub anomalies: Vec<DataAnomaly>,
}

/// Aggregates room and booking snapshots into [`DashboardStats`].
///
/// Pure and total: empty snapshots yield all-zero figures and malformed
/// records degrade instead of failing. `privileged` gates nothing; every
/// field is always computed, and restricting the booking list for
/// non-privileged viewers is the caller's job.
pub fn compute_stats(rooms: &[Room], bookings: &[Booking], privileged: bool) -> DashboardStats {
    let total_rooms = rooms.len();
    let available_rooms = rooms.iter().filter(|room| room.available).count();
    let total_bookings = bookings.len();
    let active_bookings = bookings
        .iter()
        .filter(|booking| booking.status == BookingStatus::Booked)
        .count();

    let mut anomalies = Vec::new();
    let mut total_revenue = 0.0;
    for booking in bookings {
        if booking.room.is_none() {
            anomalies.push(DataAnomaly::MissingRoom {
                booking_id: booking.id.0,
            });
        }
        let nights = booking.nights();
        if nights < 0 {
            warn!(
                booking_id = booking.id.0,
                nights, "dashboard: check-out precedes check-in, clamping to zero nights"
            );
            anomalies.push(DataAnomaly::InvertedStay {
                booking_id: booking.id.0,
            });
        }
        if booking.status == BookingStatus::Completed {
            total_revenue += nights.max(0) as f64 * booking.room_price();
        }
    }

    let occupancy_rate = if total_rooms == 0 {
        0.0
    } else {
        let occupied = (total_rooms - available_rooms) as f64;
        round_one_decimal(occupied / total_rooms as f64 * 100.0)
    };

    let mut recent_activity = bookings.to_vec();
    recent_activity.sort_by(|a, b| b.id.cmp(&a.id));
    recent_activity.truncate(RECENT_ACTIVITY_LIMIT);

    DashboardStats {
        total_rooms,
        available_rooms,
        total_bookings,
        active_bookings,
        total_revenue,
        occupancy_rate,
        recent_activity,
        privileged,
        anomalies,
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
#[path = "tests/dashboard_tests.rs"]
mod tests;
