//! Common Calendar - grades da agenda
//!
//! Esta biblioteca fornece:
//! - Enumeração dos dias da semana (segunda-feira como dia 0) e do mês
//! - Linhas de horário da grade diária
//! - Posicionamento vertical dos eventos em pixels
//! - Cálculo de horários livres de um profissional
//!
//! Tudo aqui trabalha com horário local ingênuo (`NaiveDateTime`); a
//! conversão de fuso fica a cargo de quem chama.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

pub mod month;
pub mod slots;
pub mod week;

pub use month::{month_bounds, DayCell, MonthGrid};
pub use slots::{free_slots, Slot};
pub use week::{place_event, week_days, week_start, DayColumn, PlacedEvent, WeekGrid};

/// Qualquer coisa com início e fim que possa ser desenhada na agenda
pub trait TimeSpan {
    fn start(&self) -> NaiveDateTime;
    fn end(&self) -> NaiveDateTime;

    fn overlaps<O: TimeSpan + ?Sized>(&self, other: &O) -> bool {
        self.start() < other.end() && other.start() < self.end()
    }
}

impl TimeSpan for (NaiveDateTime, NaiveDateTime) {
    fn start(&self) -> NaiveDateTime {
        self.0
    }

    fn end(&self) -> NaiveDateTime {
        self.1
    }
}

/// Parâmetros da grade diária
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Âncora do topo da grade (ex.: 08:00)
    pub day_start: NaiveTime,
    /// Fim da última linha (exclusivo)
    pub day_end: NaiveTime,
    /// Duração de cada linha da grade em minutos
    pub slot_minutes: u32,
    /// Escala vertical
    pub pixels_per_minute: f64,
    /// Deslocamento horizontal aplicado a eventos sobrepostos
    pub stagger_px: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            day_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            day_end: NaiveTime::from_hms_opt(20, 0, 0).unwrap_or(NaiveTime::MIN),
            slot_minutes: 30,
            pixels_per_minute: 2.0,
            stagger_px: 8.0,
        }
    }
}

impl GridConfig {
    /// Rótulos das linhas da grade, de `day_start` até `day_end`
    pub fn time_slots(&self) -> Vec<NaiveTime> {
        let mut rows = Vec::new();
        if self.slot_minutes == 0 {
            return rows;
        }

        let step = Duration::minutes(self.slot_minutes as i64);
        let mut current = self.day_start;
        while current < self.day_end {
            rows.push(current);
            let (next, wrapped) = current.overflowing_add_signed(step);
            if wrapped != 0 {
                break;
            }
            current = next;
        }
        rows
    }

    /// Altura total da coluna de um dia em pixels
    pub fn column_height(&self) -> f64 {
        let minutes = (self.day_end - self.day_start).num_minutes().max(0);
        minutes as f64 * self.pixels_per_minute
    }
}
