// crates.io
use time::{
	Date,
	format_description::BorrowedFormatItem,
	macros::format_description,
};

/// Marker the vendor stores for "no birthday set".
const UNSET_SENTINEL: &str = "0001-01-01";

// Tried in order; the first layout that consumes the whole value wins.
const LAYOUTS: [&[BorrowedFormatItem<'static>]; 4] = [
	format_description!("[year]-[month]-[day]"),
	format_description!("[year]-[month padding:none]-[day]"),
	format_description!("[year]-[month]-[day padding:none]"),
	format_description!("[year]-[month padding:none]-[day padding:none]"),
];

/// Parses a member birthday.
///
/// Values containing the unset sentinel map to `today`. Returns `None` when no known
/// layout matches.
pub fn parse_birthday(raw: &str, today: Date) -> Option<Date> {
	let raw = raw.trim();

	if raw.contains(UNSET_SENTINEL) {
		return Some(today);
	}

	LAYOUTS.iter().find_map(|layout| Date::parse(raw, *layout).ok())
}
