//! Tabelas de relatório e sua serialização em CSV ou JSON

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use common_db::models::{AppointmentStatus, Report, ReportFormat, ReportType};
use common_db::repo::{appointments, appointments::AppointmentFilter, medical_records, patients};
use common_validation::format_cpf;
use serde_json::{Map, Value};

use crate::clock::Clock;
use crate::state::AppState;

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Cabeçalhos e linhas já formatadas
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportTable {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn new(headers: Vec<&'static str>) -> Self {
        Self { headers, rows: Vec::new() }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn render(&self, format: ReportFormat) -> Result<Vec<u8>> {
        match format {
            ReportFormat::Csv => Ok(self.to_csv().into_bytes()),
            ReportFormat::Json => Ok(serde_json::to_vec_pretty(&self.to_json())?),
        }
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        push_csv_line(&mut out, self.headers.iter().copied());
        for row in &self.rows {
            push_csv_line(&mut out, row.iter().map(String::as_str));
        }
        out
    }

    /// Lista de objetos `{cabeçalho: valor}`
    pub fn to_json(&self) -> Value {
        let items = self
            .rows
            .iter()
            .map(|row| {
                let object: Map<String, Value> = self
                    .headers
                    .iter()
                    .zip(row.iter())
                    .map(|(header, value)| (header.to_string(), Value::String(value.clone())))
                    .collect();
                Value::Object(object)
            })
            .collect();
        Value::Array(items)
    }
}

fn push_csv_line<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    let line: Vec<String> = fields.map(escape_csv).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

fn escape_csv(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn optional(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

fn money(value: f64) -> String {
    format!("{:.2}", value)
}

/// Período do relatório em UTC; limites ausentes ficam abertos
fn period(clock: &Clock, start: Option<NaiveDate>, end: Option<NaiveDate>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    (start.map(|d| clock.day(d).0), end.map(|d| clock.day(d).1))
}

fn within(at: DateTime<Utc>, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> bool {
    from.map_or(true, |f| at >= f) && to.map_or(true, |t| at < t)
}

/// Coleta os dados do relatório conforme o tipo pedido
pub async fn build_table(state: &AppState, report: &Report) -> Result<ReportTable> {
    let clock = &state.clock;
    let (from, to) = period(clock, report.period_start, report.period_end);
    let local = |at: DateTime<Utc>| clock.to_local(at).format(DATE_TIME_FORMAT).to_string();

    let table = match report.report_type {
        ReportType::Patients => {
            let mut table = ReportTable::new(vec![
                "id",
                "nome",
                "cpf",
                "data_nascimento",
                "telefone",
                "email",
                "cadastrado_em",
            ]);
            for patient in patients::all(state.pool()).await? {
                if !within(patient.created_at, from, to) {
                    continue;
                }
                table.push(vec![
                    patient.id.to_string(),
                    patient.name,
                    format_cpf(&patient.cpf),
                    patient.birth_date.format(DATE_FORMAT).to_string(),
                    optional(patient.phone.as_deref()),
                    optional(patient.email.as_deref()),
                    local(patient.created_at),
                ]);
            }
            table
        }
        ReportType::Appointments => {
            let filter = AppointmentFilter { from, to, ..Default::default() };
            let mut table = ReportTable::new(vec![
                "id",
                "inicio",
                "fim",
                "paciente",
                "profissional",
                "status",
                "tipo",
                "valor",
            ]);
            for appointment in appointments::list_all(state.pool(), &filter).await? {
                table.push(vec![
                    appointment.id.to_string(),
                    local(appointment.starts_at),
                    local(appointment.ends_at),
                    appointment.patient_name,
                    appointment.doctor_name,
                    appointment.status.as_str().to_string(),
                    appointment.appointment_type.as_str().to_string(),
                    appointment.fee.map(money).unwrap_or_default(),
                ]);
            }
            table
        }
        ReportType::MedicalRecords => {
            // Apenas metadados: o conteúdo clínico não sai do banco em claro
            let mut table = ReportTable::new(vec![
                "id",
                "paciente",
                "profissional",
                "status",
                "criado_em",
                "finalizado_em",
                "assinado_em",
            ]);
            for row in medical_records::rows_between(state.pool(), from, to).await? {
                table.push(vec![
                    row.id.to_string(),
                    row.patient_name,
                    row.doctor_name,
                    row.status.as_str().to_string(),
                    local(row.created_at),
                    row.finalized_at.map(local).unwrap_or_default(),
                    row.signed_at.map(local).unwrap_or_default(),
                ]);
            }
            table
        }
        ReportType::Financial => {
            let filter = AppointmentFilter {
                from,
                to,
                status: Some(AppointmentStatus::Done),
                ..Default::default()
            };
            let mut table = ReportTable::new(vec!["data", "paciente", "profissional", "tipo", "valor"]);
            let mut total = 0.0;
            for appointment in appointments::list_all(state.pool(), &filter).await? {
                let fee = appointment.fee.unwrap_or(0.0);
                total += fee;
                table.push(vec![
                    local(appointment.starts_at),
                    appointment.patient_name,
                    appointment.doctor_name,
                    appointment.appointment_type.as_str().to_string(),
                    money(fee),
                ]);
            }
            table.push(vec![
                "TOTAL".to_string(),
                String::new(),
                String::new(),
                String::new(),
                money(total),
            ]);
            table
        }
    };

    Ok(table)
}
