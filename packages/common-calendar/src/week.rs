//! Visão semanal

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::{GridConfig, TimeSpan};

/// Eventos sobrepostos se alternam entre estas posições horizontais
const STAGGER_CYCLE: usize = 3;

/// Segunda-feira da semana de `date`, independente de localidade.
///
/// Nos extremos do calendário satura em [`NaiveDate::MIN`].
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date.checked_sub_signed(Duration::days(date.weekday().num_days_from_monday() as i64))
        .unwrap_or(NaiveDate::MIN)
}

/// Os sete dias da semana de `date`, de segunda a domingo
pub fn week_days(date: NaiveDate) -> [NaiveDate; 7] {
    let monday = week_start(date);
    let mut days = [monday; 7];
    for (i, day) in days.iter_mut().enumerate() {
        *day = add_days(monday, i as i64);
    }
    days
}

/// `date + days`, saturando em [`NaiveDate::MAX`]
pub(crate) fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days)).unwrap_or(NaiveDate::MAX)
}

/// Calcula `(top, height)` em pixels em relação à âncora do dia.
///
/// Eventos que começam antes da âncora ficam com `top = 0` e altura apenas
/// da parte visível; se terminam antes da âncora a altura é zero.
pub fn place_event(start: NaiveDateTime, end: NaiveDateTime, config: &GridConfig) -> (f64, f64) {
    let anchor = start.date().and_time(config.day_start);
    let visible_start = start.max(anchor);

    let top = (visible_start - anchor).num_minutes() as f64 * config.pixels_per_minute;
    let height = (end - visible_start).num_minutes().max(0) as f64 * config.pixels_per_minute;
    (top, height)
}

/// Evento com a posição calculada na coluna do dia
#[derive(Debug, Clone, Serialize)]
pub struct PlacedEvent<T> {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub top: f64,
    pub height: f64,
    pub left: f64,
    pub event: T,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayColumn<T> {
    pub date: NaiveDate,
    /// 0 = segunda-feira
    pub weekday: u32,
    pub events: Vec<PlacedEvent<T>>,
}

/// Grade de 7 dias por linhas de horário
#[derive(Debug, Clone, Serialize)]
pub struct WeekGrid<T> {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub time_slots: Vec<chrono::NaiveTime>,
    pub pixels_per_minute: f64,
    pub column_height: f64,
    pub days: Vec<DayColumn<T>>,
}

impl<T: TimeSpan> WeekGrid<T> {
    /// Monta a semana que contém `reference` e posiciona os eventos dela.
    ///
    /// Eventos fora da semana são descartados. Dentro de um dia, um evento
    /// que sobrepõe algum anterior recebe `left = (índice % 3) * stagger_px`;
    /// isso não é um layout sem colisões.
    pub fn build<I>(reference: NaiveDate, events: I, config: &GridConfig) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let days_of_week = week_days(reference);
        let monday = days_of_week[0];

        let mut days: Vec<DayColumn<T>> = days_of_week
            .iter()
            .map(|date| DayColumn {
                date: *date,
                weekday: date.weekday().num_days_from_monday(),
                events: Vec::new(),
            })
            .collect();

        for event in events {
            let (start, end) = (event.start(), event.end());
            let index = (start.date() - monday).num_days();
            if !(0..7).contains(&index) {
                continue;
            }

            let (top, height) = place_event(start, end, config);
            days[index as usize].events.push(PlacedEvent {
                start,
                end,
                top,
                height,
                left: 0.0,
                event,
            });
        }

        for day in days.iter_mut() {
            day.events.sort_by_key(|e| (e.start, e.end));
            for i in 1..day.events.len() {
                let (earlier, rest) = day.events.split_at_mut(i);
                let current = &mut rest[0];
                let span = (current.start, current.end);
                if earlier.iter().any(|e| (e.start, e.end).overlaps(&span)) {
                    current.left = (i % STAGGER_CYCLE) as f64 * config.stagger_px;
                }
            }
        }

        Self {
            week_start: monday,
            week_end: days_of_week[6],
            time_slots: config.time_slots(),
            pixels_per_minute: config.pixels_per_minute,
            column_height: config.column_height(),
            days,
        }
    }

    pub fn event_count(&self) -> usize {
        self.days.iter().map(|d| d.events.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, 0).unwrap()
    }

    fn date(y: i32, mo: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap()
    }

    #[test]
    fn test_week_starts_on_monday() {
        // 2024-05-15 é uma quarta-feira
        assert_eq!(week_start(date(2024, 5, 15)), date(2024, 5, 13));
        assert_eq!(week_start(date(2024, 5, 13)), date(2024, 5, 13));
        // Domingo pertence à semana que começou na segunda anterior
        assert_eq!(week_start(date(2024, 5, 19)), date(2024, 5, 13));
        // Virada de ano
        assert_eq!(week_start(date(2025, 1, 1)), date(2024, 12, 30));
    }

    #[test]
    fn test_week_days() {
        let days = week_days(date(2024, 2, 29));
        assert_eq!(days[0], date(2024, 2, 26));
        assert_eq!(days[6], date(2024, 3, 3));
    }

    #[test]
    fn test_place_event_offset_and_height() {
        let config = GridConfig::default();
        let (top, height) = place_event(at(2024, 5, 15, 9, 0), at(2024, 5, 15, 9, 30), &config);
        assert_eq!(top, 120.0);
        assert_eq!(height, 60.0);
    }

    #[test]
    fn test_place_event_before_anchor_clamps() {
        let config = GridConfig::default();
        let (top, height) = place_event(at(2024, 5, 15, 7, 30), at(2024, 5, 15, 8, 30), &config);
        assert_eq!(top, 0.0);
        assert_eq!(height, 60.0);

        let (top, height) = place_event(at(2024, 5, 15, 6, 0), at(2024, 5, 15, 7, 0), &config);
        assert_eq!(top, 0.0);
        assert_eq!(height, 0.0);
    }

    #[test]
    fn test_build_groups_events_by_day() {
        let config = GridConfig::default();
        let events = vec![
            (at(2024, 5, 13, 9, 0), at(2024, 5, 13, 9, 30)),
            (at(2024, 5, 19, 14, 0), at(2024, 5, 19, 15, 0)),
            // Semana seguinte, descartado
            (at(2024, 5, 20, 9, 0), at(2024, 5, 20, 9, 30)),
            // Semana anterior, descartado
            (at(2024, 5, 12, 9, 0), at(2024, 5, 12, 9, 30)),
        ];

        let grid = WeekGrid::build(date(2024, 5, 15), events, &config);
        assert_eq!(grid.week_start, date(2024, 5, 13));
        assert_eq!(grid.week_end, date(2024, 5, 19));
        assert_eq!(grid.days.len(), 7);
        assert_eq!(grid.event_count(), 2);
        assert_eq!(grid.days[0].events.len(), 1);
        assert_eq!(grid.days[6].events.len(), 1);
        assert_eq!(grid.days[6].weekday, 6);
        assert_eq!(grid.days[6].events[0].top, 720.0);
    }

    #[test]
    fn test_overlapping_events_are_staggered() {
        let config = GridConfig::default();
        let events = vec![
            (at(2024, 5, 14, 10, 0), at(2024, 5, 14, 11, 0)),
            (at(2024, 5, 14, 9, 0), at(2024, 5, 14, 10, 30)),
            (at(2024, 5, 14, 10, 15), at(2024, 5, 14, 10, 45)),
            (at(2024, 5, 14, 10, 20), at(2024, 5, 14, 10, 40)),
            // Não sobrepõe ninguém
            (at(2024, 5, 14, 12, 0), at(2024, 5, 14, 12, 30)),
        ];

        let grid = WeekGrid::build(date(2024, 5, 14), events, &config);
        let lefts: Vec<f64> = grid.days[1].events.iter().map(|e| e.left).collect();
        // Ordenados por início: 09:00, 10:00, 10:15, 10:20, 12:00
        assert_eq!(lefts, vec![0.0, 8.0, 16.0, 0.0, 0.0]);
    }

    #[test]
    fn test_adjacent_events_do_not_overlap() {
        let config = GridConfig::default();
        let events = vec![
            (at(2024, 5, 14, 9, 0), at(2024, 5, 14, 9, 30)),
            (at(2024, 5, 14, 9, 30), at(2024, 5, 14, 10, 0)),
        ];
        let grid = WeekGrid::build(date(2024, 5, 14), events, &config);
        assert!(grid.days[1].events.iter().all(|e| e.left == 0.0));
    }

    #[test]
    fn test_week_math_saturates_at_calendar_edges() {
        assert_eq!(week_start(NaiveDate::MIN), NaiveDate::MIN);
        let days = week_days(NaiveDate::MAX);
        assert_eq!(days[6], NaiveDate::MAX);
        assert!(days.windows(2).all(|w| w[0] <= w[1]));
    }
}
