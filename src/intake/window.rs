use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::AppError;

pub fn parse_time_zone(name: &str) -> Result<Tz, AppError> {
    name.parse::<Tz>()
        .map_err(|_| AppError::InvalidTimezone(name.to_string()))
}

/// Half-open UTC window `[start, end)` covering the caller's current local
/// day: from today's local midnight up to, but not including, tomorrow's.
pub fn today_window(tz: Tz, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.with_timezone(&tz).date_naive();
    let start = local_midnight(tz, today);
    let end = local_midnight(tz, today + Duration::days(1));
    (start.with_timezone(&Utc), end.with_timezone(&Utc))
}

/// Closed UTC window `[start, end]` covering one local calendar date, ending
/// at 23:59:59.999 local time.
pub fn date_window(tz: Tz, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_midnight(tz, date);
    let end = local_midnight(tz, date + Duration::days(1)) - Duration::milliseconds(1);
    (start.with_timezone(&Utc), end.with_timezone(&Utc))
}

/// First valid instant of a local calendar date.
///
/// Midnight can be ambiguous (clocks fell back across it) or missing (clocks
/// sprang forward over it). Ambiguity resolves to the earlier instant; a gap
/// is bridged by walking the clock forward until it becomes representable.
fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let mut probe = midnight;
            for _ in 0..48 {
                probe += Duration::minutes(30);
                match tz.from_local_datetime(&probe) {
                    LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => return dt,
                    LocalResult::None => continue,
                }
            }
            // No zone in the tz database leaves a whole day unrepresentable.
            tz.from_utc_datetime(&midnight)
        }
    }
}
