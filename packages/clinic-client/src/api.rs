//! Cliente tipado da API REST

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use common_calendar::Slot;
use common_db::models::{
    Appointment, AppointmentInput, AppointmentStatus, AppointmentStatusChange, DashboardStats,
    MedicalRecord, MedicalRecordDetail, MedicalRecordInput, Patient, PatientInput, Report,
    ReportRequest, User,
};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ClientError, ClientResult, LOGIN_ROUTE};
use crate::store::TokenStore;

/// Envelope `{success, data, meta?}` de todas as respostas JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(default)]
    pub meta: Option<PageMeta>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub per_page: u32,
    pub total: i64,
    pub last_page: u32,
}

/// Lista paginada já desembrulhada
#[derive(Debug, Clone)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Option<BTreeMap<String, Vec<String>>>,
}

/// Filtros de `GET /api/appointments`
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppointmentQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotQuery {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct PatientQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<&'a str>,
    page: u32,
    per_page: u32,
}

#[derive(Serialize)]
struct PageQuery {
    page: u32,
    per_page: u32,
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, store: Arc<dyn TokenStore>) -> ClientResult<Self> {
        let http = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self::with_http(http, base_url, store))
    }

    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> ClientResult<Option<String>> {
        self.store.load()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Monta a requisição com o token salvo, quando houver
    fn request(&self, method: Method, path: &str) -> ClientResult<RequestBuilder> {
        let mut builder = self
            .http
            .request(method, self.url(path))
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = self.store.load()? {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    /// Envia e trata os códigos de erro da API
    async fn send(&self, builder: RequestBuilder) -> ClientResult<Response> {
        self.dispatch(builder, true).await
    }

    /// `authenticated = false` para o login: um 401 ali são credenciais
    /// recusadas e não derruba a sessão salva
    async fn dispatch(&self, builder: RequestBuilder, authenticated: bool) -> ClientResult<Response> {
        let response = builder.send().await?;
        let status = response.status();
        debug!("{} {}", status.as_u16(), response.url().path());

        if status.is_success() {
            return Ok(response);
        }

        let body: Option<ErrorBody> = response.json().await.ok();
        let (message, errors) = match body {
            Some(body) => (body.message, body.errors),
            None => (None, None),
        };
        let message = message.unwrap_or_else(|| {
            status.canonical_reason().unwrap_or("Erro desconhecido").to_string()
        });

        Err(match status {
            StatusCode::UNAUTHORIZED if !authenticated => ClientError::InvalidCredentials(message),
            StatusCode::UNAUTHORIZED => {
                warn!("Sessão rejeitada pela API, limpando token");
                self.store.clear()?;
                ClientError::Unauthorized { redirect_to: LOGIN_ROUTE.to_string() }
            }
            StatusCode::UNPROCESSABLE_ENTITY => ClientError::Validation {
                message,
                errors: errors.unwrap_or_default(),
            },
            StatusCode::FORBIDDEN => ClientError::Forbidden(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::GONE => ClientError::Gone(message),
            other => ClientError::Api { status: other.as_u16(), message },
        })
    }

    async fn envelope<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<ApiResponse<T>> {
        let response = self.send(builder).await?;
        response
            .json::<ApiResponse<T>>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn data<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        Ok(self.envelope(builder).await?.data)
    }

    async fn paginated<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<Paginated<T>> {
        let envelope = self.envelope::<Vec<T>>(builder).await?;
        let meta = envelope
            .meta
            .ok_or_else(|| ClientError::Decode("lista sem meta de paginação".to_string()))?;
        Ok(Paginated { data: envelope.data, meta })
    }

    // Verbos genéricos

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.data(self.request(Method::GET, path)?).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> ClientResult<T> {
        self.data(self.request(Method::POST, path)?.json(body)).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> ClientResult<T> {
        self.data(self.request(Method::PUT, path)?.json(body)).await
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> ClientResult<T> {
        self.data(self.request(Method::PATCH, path)?.json(body)).await
    }

    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        self.send(self.request(Method::DELETE, path)?).await?;
        Ok(())
    }

    // Sessão

    /// Autentica e guarda o token no `TokenStore`.
    ///
    /// Credenciais recusadas viram [`ClientError::InvalidCredentials`] com a
    /// mensagem da API; o token salvo não é tocado.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<LoginData> {
        let builder = self
            .http
            .post(self.url("/api/login"))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&Credentials { email, password });
        let login = self
            .dispatch(builder, false)
            .await?
            .json::<ApiResponse<LoginData>>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?
            .data;
        self.store.save(&login.token)?;
        Ok(login)
    }

    /// Revoga o token na API e apaga o token local
    pub async fn logout(&self) -> ClientResult<()> {
        let result = self.send(self.request(Method::POST, "/api/logout")?).await;
        self.store.clear()?;
        result.map(|_| ())
    }

    pub async fn me(&self) -> ClientResult<User> {
        self.get("/api/me").await
    }

    // Pacientes

    pub async fn list_patients(&self, search: Option<&str>, page: u32, per_page: u32) -> ClientResult<Paginated<Patient>> {
        let query = PatientQuery { search, page, per_page };
        self.paginated(self.request(Method::GET, "/api/patients")?.query(&query)).await
    }

    pub async fn get_patient(&self, id: Uuid) -> ClientResult<Patient> {
        self.get(&format!("/api/patients/{}", id)).await
    }

    pub async fn create_patient(&self, input: &PatientInput) -> ClientResult<Patient> {
        self.post("/api/patients", input).await
    }

    pub async fn update_patient(&self, id: Uuid, input: &PatientInput) -> ClientResult<Patient> {
        self.put(&format!("/api/patients/{}", id), input).await
    }

    pub async fn delete_patient(&self, id: Uuid) -> ClientResult<()> {
        self.delete(&format!("/api/patients/{}", id)).await
    }

    pub async fn patient_medical_records(&self, id: Uuid) -> ClientResult<Vec<MedicalRecord>> {
        self.get(&format!("/api/patients/{}/medical-records", id)).await
    }

    // Agendamentos

    pub async fn list_appointments(&self, query: &AppointmentQuery) -> ClientResult<Paginated<Appointment>> {
        self.paginated(self.request(Method::GET, "/api/appointments")?.query(query)).await
    }

    pub async fn get_appointment(&self, id: Uuid) -> ClientResult<Appointment> {
        self.get(&format!("/api/appointments/{}", id)).await
    }

    pub async fn create_appointment(&self, input: &AppointmentInput) -> ClientResult<Appointment> {
        self.post("/api/appointments", input).await
    }

    pub async fn update_appointment(&self, id: Uuid, input: &AppointmentInput) -> ClientResult<Appointment> {
        self.put(&format!("/api/appointments/{}", id), input).await
    }

    pub async fn update_appointment_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
        reason: Option<String>,
    ) -> ClientResult<Appointment> {
        let change = AppointmentStatusChange { status, reason };
        self.patch(&format!("/api/appointments/{}/status", id), &change).await
    }

    pub async fn delete_appointment(&self, id: Uuid) -> ClientResult<()> {
        self.delete(&format!("/api/appointments/{}", id)).await
    }

    pub async fn available_slots(&self, query: &SlotQuery) -> ClientResult<Vec<Slot>> {
        self.data(self.request(Method::GET, "/api/appointments/available-slots")?.query(query))
            .await
    }

    // Painel

    pub async fn dashboard_statistics(&self) -> ClientResult<DashboardStats> {
        self.get("/api/dashboard/statistics").await
    }

    // Prontuários

    pub async fn list_medical_records(&self, page: u32, per_page: u32) -> ClientResult<Paginated<MedicalRecord>> {
        let query = PageQuery { page, per_page };
        self.paginated(self.request(Method::GET, "/api/medical-records")?.query(&query)).await
    }

    pub async fn get_medical_record(&self, id: Uuid) -> ClientResult<MedicalRecordDetail> {
        self.get(&format!("/api/medical-records/{}", id)).await
    }

    pub async fn create_medical_record(&self, input: &MedicalRecordInput) -> ClientResult<MedicalRecord> {
        self.post("/api/medical-records", input).await
    }

    pub async fn update_medical_record(&self, id: Uuid, input: &MedicalRecordInput) -> ClientResult<MedicalRecord> {
        self.put(&format!("/api/medical-records/{}", id), input).await
    }

    pub async fn finalize_medical_record(&self, id: Uuid) -> ClientResult<MedicalRecord> {
        self.post(&format!("/api/medical-records/{}/finalize", id), &serde_json::json!({}))
            .await
    }

    pub async fn sign_medical_record(&self, id: Uuid) -> ClientResult<MedicalRecord> {
        self.post(&format!("/api/medical-records/{}/sign", id), &serde_json::json!({}))
            .await
    }

    // Relatórios

    pub async fn list_reports(&self, page: u32, per_page: u32) -> ClientResult<Paginated<Report>> {
        let query = PageQuery { page, per_page };
        self.paginated(self.request(Method::GET, "/api/reports")?.query(&query)).await
    }

    pub async fn request_report(&self, request: &ReportRequest) -> ClientResult<Report> {
        self.post("/api/reports", request).await
    }

    pub async fn get_report(&self, id: Uuid) -> ClientResult<Report> {
        self.get(&format!("/api/reports/{}", id)).await
    }

    /// Conteúdo bruto do arquivo gerado
    pub async fn download_report(&self, id: Uuid) -> ClientResult<Vec<u8>> {
        let response = self
            .send(self.request(Method::GET, &format!("/api/reports/{}/download", id))?)
            .await?;
        Ok(response.bytes().await?.to_vec())
    }
}
