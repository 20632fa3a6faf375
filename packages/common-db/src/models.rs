//! Modelos de dados compartilhados entre aplicações
//!
//! Este módulo define as estruturas de dados principais usadas pela clínica:
//! as entidades persistidas, os enums de status e as entradas validadas
//! recebidas pela API.

use chrono::{DateTime, NaiveDate, Utc};
use common_auth::Role;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Status possíveis de um agendamento
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Agendamento inicial, pendente de confirmação
    Scheduled,
    /// Confirmado pelo paciente
    Confirmed,
    /// Consulta realizada
    Done,
    /// Cancelado
    Cancelled,
    /// Paciente não compareceu
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 5] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Done,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Done => "done",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }

    /// Ocupa o horário do profissional na agenda
    pub fn blocks_slot(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed | AppointmentStatus::Done)
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tipo de atendimento
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AppointmentType {
    Consultation,
    FollowUp,
    Exam,
    Procedure,
    Emergency,
}

impl AppointmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentType::Consultation => "consultation",
            AppointmentType::FollowUp => "follow_up",
            AppointmentType::Exam => "exam",
            AppointmentType::Procedure => "procedure",
            AppointmentType::Emergency => "emergency",
        }
    }
}

/// Progressão do prontuário: rascunho → finalizado → assinado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RecordStatus {
    Draft,
    Finalized,
    Signed,
}

impl RecordStatus {
    /// Próximo status permitido; a progressão nunca volta nem pula etapas
    pub fn next(&self) -> Option<RecordStatus> {
        match self {
            RecordStatus::Draft => Some(RecordStatus::Finalized),
            RecordStatus::Finalized => Some(RecordStatus::Signed),
            RecordStatus::Signed => None,
        }
    }

    pub fn can_transition_to(&self, target: RecordStatus) -> bool {
        self.next() == Some(target)
    }

    /// Conteúdo e registros filhos só podem ser alterados em rascunho
    pub fn is_editable(&self) -> bool {
        matches!(self, RecordStatus::Draft)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Draft => "draft",
            RecordStatus::Finalized => "finalized",
            RecordStatus::Signed => "signed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DiagnosisType {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DiagnosisStatus {
    Suspected,
    Confirmed,
    RuledOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    Active,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AttachmentStatus {
    Pending,
    Processed,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ReportType {
    Patients,
    Appointments,
    MedicalRecords,
    Financial,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Patients => "patients",
            ReportType::Appointments => "appointments",
            ReportType::MedicalRecords => "medical_records",
            ReportType::Financial => "financial",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ReportFormat {
    Csv,
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "text/csv; charset=utf-8",
            ReportFormat::Json => "application/json",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ReportStatus {
    Generating,
    Completed,
    Failed,
    Scheduled,
}

/// Usuário do sistema (administrador, médico ou recepcionista)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Hash PHC Argon2id, nunca serializado
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Dados para criação de usuário
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 3, max = 255, message = "Nome deve ter entre 3 e 255 caracteres"))]
    pub name: String,
    #[validate(email(message = "E-mail inválido"))]
    pub email: String,
    #[validate(length(min = 8, message = "Senha deve ter ao menos 8 caracteres"))]
    pub password: String,
    pub role: Role,
}

/// Paciente. O CPF é armazenado apenas com dígitos.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub birth_date: NaiveDate,
    pub cpf: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Entrada de criação/edição de paciente
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PatientInput {
    #[validate(length(min = 3, max = 255, message = "Nome deve ter entre 3 e 255 caracteres"))]
    pub name: String,
    #[validate(custom = "common_validation::validate_birth_date")]
    pub birth_date: NaiveDate,
    #[validate(custom = "common_validation::validate_cpf")]
    pub cpf: String,
    #[validate(custom = "common_validation::validate_phone")]
    pub phone: Option<String>,
    #[validate(email(message = "E-mail inválido"))]
    pub email: Option<String>,
    #[validate(length(max = 500, message = "Endereço muito longo"))]
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl PatientInput {
    /// Normaliza campos opcionais vazios e o CPF para apenas dígitos
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.cpf = common_validation::strip_non_digits(&self.cpf);
        self.phone = non_empty(self.phone);
        self.email = non_empty(self.email);
        self.address = non_empty(self.address);
        self.notes = non_empty(self.notes);
        self
    }
}

/// Agendamento com os nomes de paciente e profissional
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub appointment_type: AppointmentType,
    pub fee: Option<f64>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub patient_name: String,
    pub doctor_name: String,
}

/// Entrada de criação/edição de agendamento
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_appointment_window"))]
pub struct AppointmentInput {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub appointment_type: AppointmentType,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
    #[validate(range(min = 0.0, message = "Valor não pode ser negativo"))]
    pub fee: Option<f64>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

fn validate_appointment_window(input: &AppointmentInput) -> Result<(), ValidationError> {
    if input.ends_at <= input.starts_at {
        let mut error = ValidationError::new("ends_at");
        error.message = Some("Término deve ser posterior ao início".into());
        return Err(error);
    }
    if input.ends_at - input.starts_at > chrono::Duration::hours(12) {
        let mut error = ValidationError::new("ends_at");
        error.message = Some("Duração máxima de 12 horas".into());
        return Err(error);
    }
    Ok(())
}

/// Mudança de status de agendamento
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppointmentStatusChange {
    pub status: AppointmentStatus,
    /// Motivo da mudança (opcional)
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// Sinais vitais estruturados, persistidos como JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct VitalSigns {
    #[validate(range(min = 40, max = 300))]
    pub systolic_pressure: Option<u16>,
    #[validate(range(min = 20, max = 200))]
    pub diastolic_pressure: Option<u16>,
    #[validate(range(min = 20, max = 250))]
    pub heart_rate: Option<u16>,
    #[validate(range(min = 5, max = 80))]
    pub respiratory_rate: Option<u16>,
    #[validate(range(min = 30.0, max = 45.0))]
    pub temperature_celsius: Option<f32>,
    #[validate(range(min = 0.5, max = 500.0))]
    pub weight_kg: Option<f32>,
    #[validate(range(min = 20.0, max = 260.0))]
    pub height_cm: Option<f32>,
    #[validate(range(min = 50, max = 100))]
    pub oxygen_saturation: Option<u8>,
}

/// Campos clínicos em texto livre; criptografados em repouso
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ClinicalContent {
    #[validate(length(min = 1, message = "Queixa principal é obrigatória"))]
    pub chief_complaint: String,
    pub history_present_illness: Option<String>,
    pub physical_examination: Option<String>,
    pub assessment: Option<String>,
    pub plan: Option<String>,
    pub notes: Option<String>,
}

/// Linha de prontuário como está no banco (conteúdo criptografado)
#[derive(Debug, Clone, FromRow)]
pub struct MedicalRecordRow {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub content_ciphertext: Vec<u8>,
    pub content_nonce: Vec<u8>,
    pub vital_signs: Option<Json<VitalSigns>>,
    pub status: RecordStatus,
    pub finalized_at: Option<DateTime<Utc>>,
    pub signed_at: Option<DateTime<Utc>>,
    pub signed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub patient_name: String,
    pub doctor_name: String,
}

/// Prontuário com o conteúdo clínico já descriptografado
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_id: Option<Uuid>,
    #[serde(flatten)]
    pub content: ClinicalContent,
    pub vital_signs: Option<VitalSigns>,
    pub status: RecordStatus,
    pub finalized_at: Option<DateTime<Utc>>,
    pub signed_at: Option<DateTime<Utc>>,
    pub signed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub patient_name: String,
    pub doctor_name: String,
}

/// Entrada de criação/edição de prontuário
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MedicalRecordInput {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_id: Option<Uuid>,
    #[serde(flatten)]
    #[validate]
    pub content: ClinicalContent,
    #[validate]
    pub vital_signs: Option<VitalSigns>,
}

/// Prontuário com seus registros filhos
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecordDetail {
    #[serde(flatten)]
    pub record: MedicalRecord,
    pub diagnoses: Vec<Diagnosis>,
    pub prescriptions: Vec<Prescription>,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Diagnosis {
    pub id: Uuid,
    pub medical_record_id: Uuid,
    pub icd_code: String,
    pub description: String,
    pub diagnosis_type: DiagnosisType,
    pub status: DiagnosisStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DiagnosisInput {
    #[validate(custom = "validate_icd10")]
    pub icd_code: String,
    #[validate(length(min = 3, max = 500))]
    pub description: String,
    pub diagnosis_type: DiagnosisType,
    pub status: DiagnosisStatus,
}

/// Código CID-10: letra, dois dígitos e subcategoria opcional (`J45`, `E11.9`)
pub fn validate_icd10(code: &str) -> Result<(), ValidationError> {
    let bytes = code.as_bytes();
    let head_ok = bytes.len() >= 3
        && bytes[0].is_ascii_uppercase()
        && bytes[1].is_ascii_digit()
        && bytes[2].is_ascii_alphanumeric();
    let tail_ok = match code.get(3..) {
        Some("") | None => true,
        Some(rest) => {
            rest.starts_with('.')
                && (2..=5).contains(&rest.len())
                && rest[1..].bytes().all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
        }
    };

    if head_ok && tail_ok {
        Ok(())
    } else {
        let mut error = ValidationError::new("icd_code");
        error.message = Some("Código CID-10 inválido".into());
        Err(error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Prescription {
    pub id: Uuid,
    pub medical_record_id: Uuid,
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: Option<String>,
    pub instructions: Option<String>,
    pub status: PrescriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PrescriptionInput {
    #[validate(length(min = 2, max = 255))]
    pub medication: String,
    #[validate(length(min = 1, max = 255))]
    pub dosage: String,
    #[validate(length(min = 1, max = 255))]
    pub frequency: String,
    #[validate(length(max = 255))]
    pub duration: Option<String>,
    #[validate(length(max = 2000))]
    pub instructions: Option<String>,
    pub status: PrescriptionStatus,
}

/// Metadados de anexo; o arquivo em si fica fora do banco
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attachment {
    pub id: Uuid,
    pub medical_record_id: Uuid,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub storage_path: String,
    pub description: Option<String>,
    pub status: AttachmentStatus,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AttachmentInput {
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[validate(length(min = 3, max = 127))]
    pub mime_type: String,
    #[validate(custom = "validate_attachment_size")]
    pub size_bytes: i64,
    #[validate(length(min = 1, max = 1024))]
    pub storage_path: String,
    pub description: Option<String>,
    pub status: AttachmentStatus,
}

/// Anexos vão até 50 MB
pub const MAX_ATTACHMENT_BYTES: i64 = 50 * 1024 * 1024;

fn validate_attachment_size(size: i64) -> Result<(), ValidationError> {
    if (0..=MAX_ATTACHMENT_BYTES).contains(&size) {
        Ok(())
    } else {
        let mut error = ValidationError::new("size_bytes");
        error.message = Some("Arquivo excede 50 MB".into());
        Err(error)
    }
}

/// Relatório exportado
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Report {
    pub id: Uuid,
    pub report_type: ReportType,
    pub format: ReportFormat,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub status: ReportStatus,
    pub file_path: Option<String>,
    pub file_size: Option<i64>,
    pub error_message: Option<String>,
    pub requested_by: Uuid,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_report_period"))]
pub struct ReportRequest {
    pub report_type: ReportType,
    pub format: ReportFormat,
    #[validate(custom = "common_validation::validate_supported_date")]
    pub period_start: Option<NaiveDate>,
    #[validate(custom = "common_validation::validate_supported_date")]
    pub period_end: Option<NaiveDate>,
    /// Geração agendada; ausente ou no passado gera imediatamente
    pub scheduled_for: Option<DateTime<Utc>>,
}

fn validate_report_period(input: &ReportRequest) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (input.period_start, input.period_end) {
        if end < start {
            let mut error = ValidationError::new("period_end");
            error.message = Some("Fim do período anterior ao início".into());
            return Err(error);
        }
    }
    Ok(())
}

/// Contagem por status de agendamento
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StatusCount {
    pub status: AppointmentStatus,
    pub total: i64,
}

/// Indicadores do painel inicial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_patients: i64,
    pub new_patients_this_month: i64,
    pub appointments_today: i64,
    pub appointments_this_week: i64,
    pub pending_records: i64,
    pub revenue_this_month: f64,
    pub appointments_by_status: Vec<StatusCount>,
    pub upcoming_appointments: Vec<Appointment>,
}

/// Registro da chave mestra criptografada
#[derive(Debug, Clone, FromRow)]
pub struct MasterKey {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub active: bool,
    /// Chave mestra criptografada com a chave derivada da senha
    pub wrapped_key_ciphertext: Vec<u8>,
    pub wrapped_key_nonce: Vec<u8>,
    /// Salt do Argon2id usado na derivação
    pub kdf_salt: Vec<u8>,
    pub key_version: i64,
}

/// Paginação no estilo `?page=1&per_page=15`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageRequest {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

pub const MAX_PER_PAGE: u32 = 100;

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    15
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: default_page(), per_page: default_per_page() }
    }
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }

    pub fn page(&self) -> u32 {
        self.page.max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() as i64 - 1) * self.per_page() as i64
    }
}

/// Uma página de resultados com o total geral
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    pub fn last_page(&self) -> u32 {
        if self.total <= 0 {
            return 1;
        }
        ((self.total as u64 + self.per_page as u64 - 1) / self.per_page as u64) as u32
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_status_progression() {
        assert!(RecordStatus::Draft.can_transition_to(RecordStatus::Finalized));
        assert!(RecordStatus::Finalized.can_transition_to(RecordStatus::Signed));
        assert!(!RecordStatus::Draft.can_transition_to(RecordStatus::Signed));
        assert!(!RecordStatus::Signed.can_transition_to(RecordStatus::Draft));
        assert!(!RecordStatus::Finalized.can_transition_to(RecordStatus::Draft));
        assert!(RecordStatus::Draft.is_editable());
        assert!(!RecordStatus::Finalized.is_editable());
    }

    #[test]
    fn test_patient_input_validation() {
        let input = PatientInput {
            name: "Maria da Silva".into(),
            birth_date: NaiveDate::from_ymd_opt(1980, 4, 2).unwrap(),
            cpf: "529.982.247-25".into(),
            phone: Some("(11) 99876-5432".into()),
            email: Some("maria@example.com".into()),
            address: None,
            notes: None,
        };
        assert!(input.validate().is_ok());

        let bad = PatientInput {
            cpf: "111.111.111-11".into(),
            phone: Some("11998765432".into()),
            ..input.clone()
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("cpf"));
        assert!(fields.contains_key("phone"));

        let normalized = input.normalized();
        assert_eq!(normalized.cpf, "52998224725");
    }

    #[test]
    fn test_normalized_drops_blank_optionals() {
        let input = PatientInput {
            name: "  João  ".into(),
            birth_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            cpf: "11144477735".into(),
            phone: Some("".into()),
            email: Some("  ".into()),
            address: None,
            notes: Some("ok".into()),
        }
        .normalized();
        assert_eq!(input.name, "João");
        assert!(input.phone.is_none());
        assert!(input.email.is_none());
        assert_eq!(input.notes.as_deref(), Some("ok"));
    }

    #[test]
    fn test_appointment_window_validation() {
        let start = Utc::now();
        let mut input = AppointmentInput {
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            starts_at: start,
            ends_at: start + chrono::Duration::minutes(30),
            appointment_type: AppointmentType::Consultation,
            status: None,
            fee: Some(150.0),
            notes: None,
        };
        assert!(input.validate().is_ok());

        input.ends_at = start;
        assert!(input.validate().is_err());

        input.ends_at = start + chrono::Duration::minutes(30);
        input.fee = Some(-1.0);
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_icd10() {
        for ok in ["J45", "E11.9", "Z00.00", "S72.0X1A"] {
            assert!(validate_icd10(ok).is_ok(), "{}", ok);
        }
        for bad in ["", "j45", "45", "J4", "J45.", "J45-9", "E11.123456"] {
            assert!(validate_icd10(bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_pagination() {
        let req = PageRequest::new(0, 1000);
        assert_eq!(req.page(), 1);
        assert_eq!(req.per_page(), MAX_PER_PAGE);
        assert_eq!(PageRequest::new(3, 10).offset(), 20);

        let page = Page { items: vec![1, 2], total: 31, page: 1, per_page: 15 };
        assert_eq!(page.last_page(), 3);
        let empty: Page<i32> = Page { items: vec![], total: 0, page: 1, per_page: 15 };
        assert_eq!(empty.last_page(), 1);
    }

    #[test]
    fn test_attachment_size_limit() {
        let mut input = AttachmentInput {
            file_name: "exame.pdf".into(),
            mime_type: "application/pdf".into(),
            size_bytes: MAX_ATTACHMENT_BYTES,
            storage_path: "attachments/exame.pdf".into(),
            description: None,
            status: AttachmentStatus::Pending,
        };
        assert!(input.validate().is_ok());

        input.size_bytes = MAX_ATTACHMENT_BYTES + 1;
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("size_bytes"));

        input.size_bytes = -1;
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_report_period_must_be_supported() {
        let request = ReportRequest {
            report_type: ReportType::Patients,
            format: ReportFormat::Csv,
            period_start: NaiveDate::from_ymd_opt(2024, 1, 1),
            period_end: NaiveDate::from_ymd_opt(2024, 1, 31),
            scheduled_for: None,
        };
        assert!(request.validate().is_ok());

        let far = ReportRequest { period_end: Some(NaiveDate::MAX), ..request };
        let errors = far.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("period_end"));
    }
}
