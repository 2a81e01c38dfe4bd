use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;

/// Date/time formats used in generated file names
pub mod formats {
    /// Format for filename suffixes: "20240120_153000"
    pub const FILENAME_WITH_SEPARATOR: &str = "%Y%m%d_%H%M%S";
}

/// Format a datetime for use in filenames with separator.
///
/// The wall-clock time of `datetime`'s own zone is used, so pass a local
/// time to get the machine's clock in the name.
pub fn format_for_filename<Tz: TimeZone>(datetime: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    datetime.format(formats::FILENAME_WITH_SEPARATOR).to_string()
}

/// Get the current time in the machine's local zone
pub fn now_local() -> DateTime<Local> {
    Local::now()
}

/// Convert Unix timestamp to a UTC DateTime
#[cfg(test)]
pub(crate) fn from_unix_timestamp(timestamp: i64) -> DateTime<chrono::Utc> {
    DateTime::from_timestamp(timestamp, 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn test_format_for_filename() {
        let dt = from_unix_timestamp(1705764600); // 2024-01-20 15:30:00 UTC
        assert_eq!(format_for_filename(&dt), "20240120_153000");
    }

    #[test]
    fn test_format_for_filename_uses_wall_clock_of_zone() {
        let dt = from_unix_timestamp(1705764600);

        let plus_five = FixedOffset::east_opt(5 * 3600).unwrap();
        assert_eq!(
            format_for_filename(&dt.with_timezone(&plus_five)),
            "20240120_203000"
        );

        // Date rolls over east of UTC+8:30
        let plus_ten = FixedOffset::east_opt(10 * 3600).unwrap();
        assert_eq!(
            format_for_filename(&dt.with_timezone(&plus_ten)),
            "20240121_013000"
        );

        let minus_three = FixedOffset::west_opt(3 * 3600).unwrap();
        assert_eq!(
            format_for_filename(&dt.with_timezone(&minus_three)),
            "20240120_123000"
        );
    }

    #[test]
    fn test_from_unix_timestamp() {
        let timestamp = 1705764600;
        let dt = from_unix_timestamp(timestamp);
        assert_eq!(dt.timestamp(), timestamp);

        let dt_zero = from_unix_timestamp(0);
        assert_eq!(dt_zero.timestamp(), 0);
    }

    #[test]
    fn test_now_local_matches_local_wall_clock() {
        let now = now_local();
        assert!(now.timestamp() > 0);
        assert_eq!(
            format_for_filename(&now),
            now.naive_local().format(formats::FILENAME_WITH_SEPARATOR).to_string()
        );
    }
}
