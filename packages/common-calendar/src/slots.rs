//! Horários livres na agenda de um profissional

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{GridConfig, TimeSpan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeSpan for Slot {
    fn start(&self) -> NaiveDateTime {
        self.start
    }

    fn end(&self) -> NaiveDateTime {
        self.end
    }
}

/// Horários de `duration_minutes` entre `day_start` e `day_end` que não
/// colidem com nenhum intervalo ocupado.
///
/// Apenas consulta: a criação de agendamentos não rejeita sobreposições.
pub fn free_slots<B: TimeSpan>(
    date: NaiveDate,
    busy: &[B],
    duration_minutes: u32,
    config: &GridConfig,
) -> Vec<Slot> {
    let mut slots = Vec::new();
    if duration_minutes == 0 {
        return slots;
    }

    let step = Duration::minutes(duration_minutes as i64);
    let day_end = date.and_time(config.day_end);
    let mut start = date.and_time(config.day_start);

    while let Some(end) = start.checked_add_signed(step).filter(|end| *end <= day_end) {
        let candidate = Slot { start, end };
        if !busy.iter().any(|b| b.overlaps(&candidate)) {
            slots.push(candidate);
        }
        start = end;
    }

    slots
}
