//! Pluggable time source for JWT `iat`/`exp` claims and token-record expiry checks, plus the
//! fixed-width ISO-8601 timestamp format used by the `Server-Time` response header.

// self
use crate::_prelude::*;

const TIMESTAMP_LENGTH: usize = 24;
const TIMESTAMP_CHECK_CHARS: [(usize, u8); 7] =
	[(4, b'-'), (7, b'-'), (10, b'T'), (13, b':'), (16, b':'), (19, b'.'), (23, b'Z')];
const TIMESTAMP_FIELD_MAX: [u16; 7] = [2999, 12, 31, 23, 59, 59, 999];
const TIMESTAMP_DATE_FIELD_COUNT: usize = 3;
const TIMESTAMP_FIELD_RANGES: [(usize, usize); 7] =
	[(0, 4), (5, 7), (8, 10), (11, 13), (14, 16), (17, 19), (20, 23)];

const ISO8601_FORMAT_DESCRIPTION: &[time::format_description::FormatItem<'_>] =
	time::macros::format_description!(
		"[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
	);

/// Validates the fixed 24-character `yyyy-MM-ddTHH:mm:ss.SSSZ` timestamp format: exact length,
/// the 7 literal characters at their fixed offsets, and each numeric field's range (date fields
/// must be non-zero).
pub fn validate_iso8601_timestamp(timestamp: &str) -> bool {
	if timestamp.len() != TIMESTAMP_LENGTH || !timestamp.is_ascii() {
		return false;
	}

	let bytes = timestamp.as_bytes();

	if TIMESTAMP_CHECK_CHARS.iter().any(|&(index, ch)| bytes[index] != ch) {
		return false;
	}

	for (field_index, &(start, end)) in TIMESTAMP_FIELD_RANGES.iter().enumerate() {
		let Ok(value) = timestamp[start..end].parse::<u16>() else { return false };

		if value > TIMESTAMP_FIELD_MAX[field_index] {
			return false;
		}
		if field_index < TIMESTAMP_DATE_FIELD_COUNT && value == 0 {
			return false;
		}
	}

	true
}

/// Parses a `Server-Time`-style timestamp, validating it per [`validate_iso8601_timestamp`]
/// first so malformed input never reaches the underlying parser.
pub fn parse_iso8601_timestamp(timestamp: &str) -> Option<OffsetDateTime> {
	if !validate_iso8601_timestamp(timestamp) {
		return None;
	}

	time::PrimitiveDateTime::parse(timestamp, ISO8601_FORMAT_DESCRIPTION)
		.ok()
		.map(time::PrimitiveDateTime::assume_utc)
}

/// Supplies the current UTC instant to components that must stamp or check expiry.
///
/// Implementors must be `Send + Sync` so a single instance can be shared behind an
/// `Arc` by a [`Core`](crate::core::Core) and its borrowed [`DataLake`](crate::datalake::DataLake).
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current UTC instant.
	fn now(&self) -> OffsetDateTime;
}

/// [`Clock`] backed by the operating system's wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// [`Clock`] returning a fixed instant, for deterministic tests.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub OffsetDateTime);
impl Clock for FixedClock {
	fn now(&self) -> OffsetDateTime {
		self.0
	}
}
