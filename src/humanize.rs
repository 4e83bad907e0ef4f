use chrono::{DateTime, Utc};

const BYTE_UNITS: [(u64, &str); 5] = [
    (1 << 50, "PB"),
    (1 << 40, "TB"),
    (1 << 30, "GB"),
    (1 << 20, "MB"),
    (1 << 10, "kB"),
];

#[derive(Debug, Clone, Copy)]
enum AgeUnit {
    Now,
    Seconds,
    Minutes,
    Hours,
    Days,
    Months,
}

// (upper bound in seconds, unit, phrase suffix); the first bound that is not
// below the elapsed time wins, the last row also covers anything older.
const AGE_THRESHOLDS: [(i64, AgeUnit, &str); 17] = [
    (1, AgeUnit::Now, "now"),
    (2, AgeUnit::Seconds, "seconds ago"),
    (59, AgeUnit::Seconds, "seconds ago"),
    (60, AgeUnit::Minutes, "minute ago"),
    (119, AgeUnit::Minutes, "minute ago"),
    (120, AgeUnit::Minutes, "minutes ago"),
    (3_599, AgeUnit::Minutes, "minutes ago"),
    (3_600, AgeUnit::Hours, "hour ago"),
    (7_199, AgeUnit::Hours, "hour ago"),
    (86_399, AgeUnit::Hours, "hours ago"),
    (86_400, AgeUnit::Days, "day ago"),
    (172_799, AgeUnit::Days, "day ago"),
    (172_800, AgeUnit::Days, "days ago"),
    (2_591_999, AgeUnit::Days, "days ago"),
    (2_592_000, AgeUnit::Months, "month ago"),
    (5_183_999, AgeUnit::Months, "month ago"),
    (5_184_000, AgeUnit::Months, "months ago"),
];

pub fn humanize_bytes(size: u64) -> String {
    if size == 1 {
        return "1 byte".to_string();
    }

    for (factor, suffix) in BYTE_UNITS {
        if size >= factor {
            return format!("{:.2} {suffix}", size as f64 / factor as f64);
        }
    }

    format!("{size} bytes")
}

pub fn humanize_time_at(value: DateTime<Utc>, now: DateTime<Utc>) -> String {
    humanize_elapsed((now - value).num_seconds())
}

pub fn humanize_elapsed(elapsed_seconds: i64) -> String {
    let elapsed = elapsed_seconds.max(0);
    let (unit, suffix) = AGE_THRESHOLDS
        .iter()
        .find(|(bound, _, _)| *bound >= elapsed)
        .map(|(_, unit, suffix)| (*unit, *suffix))
        .unwrap_or((AgeUnit::Months, "months ago"));

    let within_day = elapsed % 86_400;
    let days = elapsed / 86_400;
    let amount = match unit {
        AgeUnit::Now => return suffix.to_string(),
        AgeUnit::Seconds => within_day,
        AgeUnit::Minutes => within_day / 60,
        AgeUnit::Hours => within_day / 3_600,
        AgeUnit::Days => days,
        AgeUnit::Months => days / 30,
    };

    format!("{amount} {suffix}")
}

#[cfg(test)]
mod tests {
    use super::{humanize_bytes, humanize_elapsed, humanize_time_at};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn bytes_pick_largest_reached_unit() {
        assert_eq!(humanize_bytes(0), "0 bytes");
        assert_eq!(humanize_bytes(1), "1 byte");
        assert_eq!(humanize_bytes(512), "512 bytes");
        assert_eq!(humanize_bytes(1024), "1.00 kB");
        assert_eq!(humanize_bytes(1536), "1.50 kB");
        assert_eq!(humanize_bytes(246_136_632), "234.73 MB");
        assert_eq!(humanize_bytes(3 << 30), "3.00 GB");
        assert_eq!(humanize_bytes(1 << 50), "1.00 PB");
    }

    #[test]
    fn elapsed_seconds_use_threshold_phrases() {
        assert_eq!(humanize_elapsed(0), "now");
        assert_eq!(humanize_elapsed(1), "now");
        assert_eq!(humanize_elapsed(2), "2 seconds ago");
        assert_eq!(humanize_elapsed(45), "45 seconds ago");
        assert_eq!(humanize_elapsed(60), "1 minute ago");
        assert_eq!(humanize_elapsed(119), "1 minute ago");
        assert_eq!(humanize_elapsed(120), "2 minutes ago");
        assert_eq!(humanize_elapsed(3_599), "59 minutes ago");
        assert_eq!(humanize_elapsed(3_700), "1 hour ago");
        assert_eq!(humanize_elapsed(7_200), "2 hours ago");
        assert_eq!(humanize_elapsed(90_000), "1 day ago");
        assert_eq!(humanize_elapsed(172_800), "2 days ago");
        assert_eq!(humanize_elapsed(2_592_000), "1 month ago");
        assert_eq!(humanize_elapsed(5_184_000), "2 months ago");
    }

    #[test]
    fn elapsed_beyond_table_keeps_last_phrase() {
        assert_eq!(humanize_elapsed(400 * 86_400), "13 months ago");
    }

    #[test]
    fn future_timestamps_render_as_now() {
        assert_eq!(humanize_elapsed(-30), "now");
    }

    #[test]
    fn time_is_relative_to_given_now() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(
            humanize_time_at(now - Duration::seconds(45), now),
            "45 seconds ago"
        );
        assert_eq!(
            humanize_time_at(now - Duration::days(3), now),
            "3 days ago"
        );
    }
}
