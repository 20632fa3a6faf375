//! Visão mensal

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::week::{add_days, week_start};
use crate::TimeSpan;

/// Primeiro e último dia do mês de `date`
pub fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let last = (28..=31).rev().find_map(|day| first.with_day(day)).unwrap_or(first);
    (first, last)
}

#[derive(Debug, Clone, Serialize)]
pub struct DayCell<T> {
    pub date: NaiveDate,
    /// Falso para os dias do mês anterior/seguinte que completam a semana
    pub in_month: bool,
    pub events: Vec<T>,
}

/// Semanas completas (segunda a domingo) que cobrem o mês
#[derive(Debug, Clone, Serialize)]
pub struct MonthGrid<T> {
    pub year: i32,
    pub month: u32,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    pub weeks: Vec<Vec<DayCell<T>>>,
}

impl<T: TimeSpan> MonthGrid<T> {
    /// Monta o mês de `reference`, distribuindo os eventos pelo dia de início
    pub fn build<I>(reference: NaiveDate, events: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let (first, last) = month_bounds(reference);
        let grid_start = week_start(first);
        let grid_end = add_days(week_start(last), 6);

        let mut weeks: Vec<Vec<DayCell<T>>> = Vec::new();
        let mut next = Some(grid_start);
        while let Some(start) = next.filter(|d| *d <= grid_end) {
            let mut week = Vec::with_capacity(7);
            let mut day = Some(start);
            while let Some(date) = day.filter(|_| week.len() < 7) {
                week.push(DayCell {
                    date,
                    in_month: date.month() == first.month() && date.year() == first.year(),
                    events: Vec::new(),
                });
                day = date.succ_opt();
            }
            next = day;
            weeks.push(week);
        }

        for event in events {
            let offset = (event.start().date() - grid_start).num_days();
            if offset < 0 {
                continue;
            }
            let (row, col) = ((offset / 7) as usize, (offset % 7) as usize);
            if let Some(cell) = weeks.get_mut(row).and_then(|w| w.get_mut(col)) {
                cell.events.push(event);
            }
        }

        for cell in weeks.iter_mut().flatten() {
            cell.events.sort_by_key(|e| e.start());
        }

        Self {
            year: first.year(),
            month: first.month(),
            first_day: first,
            last_day: last,
            weeks,
        }
    }

    /// Intervalo coberto pela grade, incluindo os dias de meses vizinhos
    pub fn visible_range(&self) -> (NaiveDate, NaiveDate) {
        let start = self.weeks.first().and_then(|w| w.first()).map(|c| c.date);
        let end = self.weeks.last().and_then(|w| w.last()).map(|c| c.date);
        (start.unwrap_or(self.first_day), end.unwrap_or(self.last_day))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn span(d: NaiveDate, h: u32) -> (NaiveDateTime, NaiveDateTime) {
        (d.and_hms_opt(h, 0, 0).unwrap(), d.and_hms_opt(h + 1, 0, 0).unwrap())
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(month_bounds(date(2024, 2, 10)), (date(2024, 2, 1), date(2024, 2, 29)));
        assert_eq!(month_bounds(date(2023, 12, 31)), (date(2023, 12, 1), date(2023, 12, 31)));
    }

    #[test]
    fn test_grid_covers_whole_weeks() {
        // Maio de 2024 começa numa quarta e termina numa sexta
        let grid: MonthGrid<(NaiveDateTime, NaiveDateTime)> =
            MonthGrid::build(date(2024, 5, 20), Vec::new());
        assert_eq!(grid.weeks.len(), 5);
        assert_eq!(grid.visible_range(), (date(2024, 4, 29), date(2024, 6, 2)));
        assert!(!grid.weeks[0][0].in_month);
        assert!(grid.weeks[0][2].in_month);
        assert!(grid.weeks.iter().all(|w| w.len() == 7));
    }

    #[test]
    fn test_grid_with_six_rows() {
        // Setembro de 2024 começa num domingo
        let grid: MonthGrid<(NaiveDateTime, NaiveDateTime)> =
            MonthGrid::build(date(2024, 9, 1), Vec::new());
        assert_eq!(grid.weeks.len(), 6);
        assert_eq!(grid.weeks[0][6].date, date(2024, 9, 1));
    }

    #[test]
    fn test_events_land_on_their_day() {
        let events = vec![
            span(date(2024, 5, 31), 15),
            span(date(2024, 5, 31), 9),
            span(date(2024, 4, 29), 10),
            // Fora da grade
            span(date(2024, 6, 3), 10),
            span(date(2024, 4, 28), 10),
        ];
        let grid = MonthGrid::build(date(2024, 5, 1), events);

        let may_31 = &grid.weeks[4][4];
        assert_eq!(may_31.date, date(2024, 5, 31));
        assert_eq!(may_31.events.len(), 2);
        assert!(may_31.events[0].start() < may_31.events[1].start());
        assert_eq!(grid.weeks[0][0].events.len(), 1);

        let total: usize = grid.weeks.iter().flatten().map(|c| c.events.len()).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_last_representable_month_does_not_overflow() {
        let grid: MonthGrid<(NaiveDateTime, NaiveDateTime)> = MonthGrid::build(NaiveDate::MAX, Vec::new());
        assert_eq!(grid.last_day, NaiveDate::MAX);
        let last_week = grid.weeks.last().unwrap();
        assert_eq!(last_week.last().unwrap().date, NaiveDate::MAX);
    }
}
