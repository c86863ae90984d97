use chrono::{DateTime, Duration, TimeZone, Utc};

/// A named closed-form holiday: year in, UTC midnight of the computed
/// date out.
pub type FeastFn = fn(i32) -> DateTime<Utc>;

/// Easter Sunday for a given year, per Butcher's algorithm.
pub fn easter_sunday(year: i32) -> DateTime<Utc> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31; // 3=March, 4=April
    let day = ((h + l - 7 * m + 114) % 31) + 1;

    match Utc.with_ymd_and_hms(year, month as u32, day as u32, 0, 0, 0) {
        chrono::LocalResult::Single(t) => t,
        _ => Default::default(),
    }
}

pub fn good_friday(year: i32) -> DateTime<Utc> {
    easter_sunday(year) - Duration::days(2)
}

pub fn easter_monday(year: i32) -> DateTime<Utc> {
    easter_sunday(year) + Duration::days(1)
}

pub fn ascension_day(year: i32) -> DateTime<Utc> {
    easter_sunday(year) + Duration::days(39)
}

pub fn whit_sunday(year: i32) -> DateTime<Utc> {
    easter_sunday(year) + Duration::days(49)
}

pub fn whit_monday(year: i32) -> DateTime<Utc> {
    easter_sunday(year) + Duration::days(50)
}

/// Look up a movable feast by its case-insensitive name.
pub fn feast_fn(name: &str) -> Option<FeastFn> {
    match name.to_uppercase().as_str() {
        "GOODFRIDAY" => Some(good_friday),
        "EASTERSUNDAY" => Some(easter_sunday),
        "EASTERMONDAY" => Some(easter_monday),
        "ASCENSIONDAY" => Some(ascension_day),
        "WHITSUNDAY" => Some(whit_sunday),
        "WHITMONDAY" => Some(whit_monday),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn computes_easter_sunday() {
        assert_eq!(easter_sunday(1999), date(1999, 4, 4));
        assert_eq!(easter_sunday(2000), date(2000, 4, 23));
        assert_eq!(easter_sunday(2008), date(2008, 3, 23));
        assert_eq!(easter_sunday(2024), date(2024, 3, 31));
        assert_eq!(easter_sunday(2025), date(2025, 4, 20));
        assert_eq!(easter_sunday(2026), date(2026, 4, 5));
    }

    #[test]
    fn derives_the_easter_family() {
        assert_eq!(good_friday(2024), date(2024, 3, 29));
        assert_eq!(easter_monday(2024), date(2024, 4, 1));
        assert_eq!(ascension_day(2024), date(2024, 5, 9));
        assert_eq!(whit_sunday(2024), date(2024, 5, 19));
        assert_eq!(whit_monday(2024), date(2024, 5, 20));
    }

    #[test]
    fn looks_up_feasts_case_insensitively() {
        let f = feast_fn("goodFRIDAY").unwrap();
        assert_eq!(f(2024), date(2024, 3, 29));
        assert!(feast_fn("GOODFRIDAY").is_some());
        assert!(feast_fn("Christmas").is_none());
    }
}
