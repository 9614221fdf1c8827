//! Ghat slot bookings.
//!
//! One booking at a time is kept under `{namespace}_current_booking`, the
//! same way the portal keeps the last confirmation on hand for the receipt.

use std::fmt::Write as _;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::records::required;
use crate::storage::{LoadSource, PersistentStore};

const CURRENT_BOOKING_KEY: &str = "current_booking";

/// A bookable option and whether it can be picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
    /// Value stored on the booking.
    pub label: &'static str,
    /// `false` if the option is closed to new bookings.
    pub available: bool,
}

/// Ghats that take bookings.
pub const GHATS: [Choice; 6] = [
    Choice { label: "Ram Ghat", available: true },
    Choice { label: "Triveni Ghat", available: true },
    Choice { label: "Mangalnath Ghat", available: false },
    Choice { label: "Kal Bhairav Ghat", available: true },
    Choice { label: "Dada Nagar Ghat", available: true },
    Choice { label: "Shipra Ghat", available: true },
];

/// Two-hour bathing slots.
pub const TIME_SLOTS: [Choice; 6] = [
    Choice { label: "06:00 AM - 08:00 AM", available: true },
    Choice { label: "08:00 AM - 10:00 AM", available: true },
    Choice { label: "10:00 AM - 12:00 PM", available: false },
    Choice { label: "12:00 PM - 02:00 PM", available: true },
    Choice { label: "02:00 PM - 04:00 PM", available: true },
    Choice { label: "04:00 PM - 06:00 PM", available: true },
];

/// Accepted values for [`BookingRequest::gender`].
pub const GENDERS: [&str; 3] = ["male", "female", "other"];

/// What a pilgrim fills in to book a slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    /// Full name.
    pub name: String,
    /// Age as entered.
    pub age: String,
    /// One of [`GENDERS`].
    pub gender: String,
    /// One of the available [`GHATS`].
    pub ghat: String,
    /// Requested date.
    pub date: String,
    /// One of the available [`TIME_SLOTS`].
    pub time_slot: String,
}

impl BookingRequest {
    /// Trim every field and check it against the booking rules.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first bad field.
    pub fn validate(&self) -> Result<Self> {
        let request = Self {
            name: required("name", &self.name)?,
            age: required("age", &self.age)?,
            gender: required("gender", &self.gender)?.to_lowercase(),
            ghat: required("ghat", &self.ghat)?,
            date: required("date", &self.date)?,
            time_slot: required("timeSlot", &self.time_slot)?,
        };

        if !request.age.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::validation("age", "must be a whole number"));
        }
        if !GENDERS.contains(&request.gender.as_str()) {
            return Err(Error::validation("gender", "must be male, female or other"));
        }
        check_choice("ghat", &GHATS, &request.ghat)?;
        check_choice("timeSlot", &TIME_SLOTS, &request.time_slot)?;

        Ok(request)
    }
}

fn check_choice(field: &'static str, choices: &[Choice], value: &str) -> Result<()> {
    match choices.iter().find(|c| c.label == value) {
        Some(choice) if choice.available => Ok(()),
        Some(_) => Err(Error::validation(field, format!("'{value}' is not available"))),
        None => Err(Error::validation(field, format!("unknown option '{value}'"))),
    }
}

/// A confirmed booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// The request as booked.
    #[serde(flatten)]
    pub request: BookingRequest,
    /// `GH` followed by six digits.
    pub token_id: String,
    /// When the booking was made (RFC 3339).
    pub booking_time: String,
}

impl Booking {
    /// The downloadable receipt.
    #[must_use]
    pub fn confirmation_text(&self) -> String {
        let r = &self.request;
        let mut text = String::new();
        let _ = writeln!(text, "ShipraSetu - Simhastha 2028");
        let _ = writeln!(text, "Booking Confirmation");
        let _ = writeln!(text);
        let _ = writeln!(text, "Token ID: {}", self.token_id);
        let _ = writeln!(text, "Name: {}", r.name);
        let _ = writeln!(text, "Age: {}", r.age);
        let _ = writeln!(text, "Gender: {}", r.gender);
        let _ = writeln!(text, "Ghat: {}", r.ghat);
        let _ = writeln!(text, "Date: {}", r.date);
        let _ = writeln!(text, "Time: {}", r.time_slot);
        let _ = writeln!(text);
        let _ = writeln!(text, "Please arrive 15 minutes before your scheduled time.");
        text
    }

    /// Suggested file name for the receipt.
    #[must_use]
    pub fn receipt_file_name(&self) -> String {
        format!("ShipraSetu-Token-{}.txt", self.token_id)
    }
}

/// Token for a booking made at `millis` since the Unix epoch.
#[must_use]
pub fn token_for(millis: i64) -> String {
    format!("GH{:06}", millis.rem_euclid(1_000_000))
}

/// Books slots and remembers the latest one.
#[derive(Debug, Clone)]
pub struct BookingDesk {
    store: PersistentStore,
}

impl BookingDesk {
    /// Create a desk over `store`.
    #[must_use]
    pub fn new(store: PersistentStore) -> Self {
        Self { store }
    }

    /// Validate `request`, issue a token and store the booking.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad request, or a storage error if
    /// the booking cannot be saved.
    pub fn book(&self, request: &BookingRequest) -> Result<Booking> {
        let request = request.validate()?;
        let now = Utc::now();
        let booking = Booking {
            request,
            token_id: token_for(now.timestamp_millis()),
            booking_time: now.to_rfc3339(),
        };

        self.store.save(CURRENT_BOOKING_KEY, &booking)?;
        info!(token = %booking.token_id, ghat = %booking.request.ghat, "Slot booked");
        Ok(booking)
    }

    /// The stored booking, if there is a readable one.
    ///
    /// An entry that cannot be decoded is removed.
    #[must_use]
    pub fn current(&self) -> Option<Booking> {
        let (booking, source) = self.store.load_with_source(CURRENT_BOOKING_KEY, None);
        if source == LoadSource::Corrupt {
            warn!("Discarding unreadable booking");
            if let Err(e) = self.store.remove(CURRENT_BOOKING_KEY) {
                warn!(error = %e, "Failed to remove unreadable booking");
            }
        }
        booking
    }

    /// Forget the stored booking. Returns `true` if there was one.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub fn clear(&self) -> Result<bool> {
        self.store.remove(CURRENT_BOOKING_KEY)
    }
}
