use crate::model::Ms;

pub const MINUTE_MS: Ms = 60_000;
pub const HOUR_MS: Ms = 60 * MINUTE_MS;
pub const DAY_MS: Ms = 24 * HOUR_MS;

/// Stored bookings without a usable duration occupy this many minutes.
pub const DEFAULT_BOOKING_MINUTES: u32 = 60;

pub const MAX_BOOKING_MINUTES: u32 = 24 * 60;
/// The conflict scan always reaches back at least this far, so a booking
/// of maximum length that started earlier is still seen.
pub const MIN_LOOKBACK_MINUTES: u32 = MAX_BOOKING_MINUTES + 2 * 60;
pub const MAX_LOOKBACK_MINUTES: u32 = 7 * 24 * 60;
pub const MAX_STARTS_PER_DAY: usize = 96;
pub const MAX_STUDENTS_PER_BOOKING: usize = 500;
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// 2000-01-01T00:00:00Z
pub const MIN_VALID_TIMESTAMP_MS: Ms = 946_684_800_000;
/// 2100-01-01T00:00:00Z
pub const MAX_VALID_TIMESTAMP_MS: Ms = 4_102_444_800_000;
