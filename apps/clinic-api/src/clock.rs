//! Conversão entre UTC (como tudo é gravado) e o horário local da clínica

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use common_calendar::{month_bounds, week_days, week_start};
use common_db::repo::dashboard::StatsWindow;

/// Minutos em um dia; offsets fora de ±24h caem em UTC
const MINUTES_PER_DAY: i32 = 24 * 60;

/// Desloca `at` por `by`, saturando nos limites de `NaiveDateTime`
fn shift(at: NaiveDateTime, by: Duration) -> NaiveDateTime {
    at.checked_add_signed(by).unwrap_or(if by < Duration::zero() {
        NaiveDateTime::MIN
    } else {
        NaiveDateTime::MAX
    })
}

#[derive(Debug, Clone, Copy)]
pub struct Clock {
    offset: Duration,
}

impl Clock {
    pub fn new(utc_offset_minutes: i32) -> Self {
        let minutes = if utc_offset_minutes.abs() < MINUTES_PER_DAY {
            utc_offset_minutes
        } else {
            0
        };
        Self { offset: Duration::minutes(minutes as i64) }
    }

    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    pub fn today(&self) -> NaiveDate {
        self.to_local(self.now()).date()
    }

    pub fn to_local(&self, at: DateTime<Utc>) -> NaiveDateTime {
        shift(at.naive_utc(), self.offset)
    }

    pub fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        DateTime::<Utc>::from_naive_utc_and_offset(shift(local, -self.offset), Utc)
    }

    /// `[00:00 de from, 00:00 do dia seguinte a to)` em UTC
    pub fn range(&self, from: NaiveDate, to_inclusive: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.to_utc(from.and_time(NaiveTime::MIN));
        let end = match to_inclusive.succ_opt() {
            Some(next) => self.to_utc(next.and_time(NaiveTime::MIN)),
            None => self.to_utc(NaiveDateTime::MAX),
        };
        (start, end)
    }

    pub fn day(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        self.range(date, date)
    }

    /// Janelas de hoje, desta semana e deste mês para o painel
    pub fn stats_window(&self) -> StatsWindow {
        let now = self.now();
        let today = self.to_local(now).date();
        let monday = week_start(today);
        let (first, last) = month_bounds(today);

        StatsWindow {
            now,
            day: self.day(today),
            week: self.range(monday, week_days(today)[6]),
            month: self.range(first, last),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};

    #[test]
    fn test_local_round_trip() {
        let clock = Clock::new(-180);
        let utc = Utc.with_ymd_and_hms(2024, 5, 14, 12, 0, 0).unwrap();
        let local = clock.to_local(utc);
        assert_eq!(local.time(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(clock.to_utc(local), utc);
    }

    #[test]
    fn test_day_bounds_follow_offset() {
        let clock = Clock::new(-180);
        let date = NaiveDate::from_ymd_opt(2024, 5, 14).unwrap();
        let (start, end) = clock.day(date);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 5, 14, 3, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 5, 15, 3, 0, 0).unwrap());
    }

    #[test]
    fn test_invalid_offset_falls_back_to_utc() {
        let clock = Clock::new(100_000);
        let utc = Utc.with_ymd_and_hms(2024, 5, 14, 12, 0, 0).unwrap();
        assert_eq!(clock.to_local(utc), utc.naive_utc());
    }

    #[test]
    fn test_extreme_dates_saturate_instead_of_panicking() {
        let clock = Clock::new(-180);
        let (start, end) = clock.day(NaiveDate::MAX);
        assert!(start < end);
        assert_eq!(end.naive_utc(), NaiveDateTime::MAX);

        let (start, _) = clock.day(NaiveDate::MIN);
        assert!(start.naive_utc() >= NaiveDateTime::MIN);
    }
}
