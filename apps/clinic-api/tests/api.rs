mod common;

use std::time::Duration;

use axum::http::{Method, StatusCode};
use common::TestApp;
use common_auth::Role;
use common_db::models::ReportStatus;
use common_db::repo::reports;
use serde_json::{json, Value};

fn patient_body(name: &str, cpf: &str) -> Value {
    json!({
        "name": name,
        "birth_date": "1985-03-20",
        "cpf": cpf,
        "phone": "(11) 99876-5432",
        "email": "",
    })
}

#[tokio::test]
async fn health_needs_no_token() {
    let app = TestApp::new().await;
    let (status, body) = app.request(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], "ok");
}

#[tokio::test]
async fn protected_routes_reject_missing_token() {
    let app = TestApp::new().await;
    let (status, body) = app.request(Method::GET, "/api/patients", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn login_returns_bearer_token_and_me_works() {
    let app = TestApp::new().await;
    let user = app.db.doctor("Dra. Ana Lima").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/login",
            None,
            Some(json!({"email": user.email, "password": "senha-de-teste"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["token_type"], "Bearer");
    assert!(body["data"]["user"].get("password_hash").is_none());

    let token = body["data"]["token"].as_str().unwrap();
    let (status, me) = app.get("/api/me", token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["id"], user.id.to_string());
    assert_eq!(me["data"]["role"], "doctor");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new().await;
    let user = app.db.doctor("Dra. Ana Lima").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/login",
            None,
            Some(json!({"email": user.email, "password": "errada"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Credenciais inválidas");
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let app = TestApp::new().await;
    let (_, token) = app.login_as("Recepção", Role::Receptionist).await;

    let (status, _) = app.post("/api/logout", &token, json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/me", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Sessão encerrada");
}

#[tokio::test]
async fn only_admins_manage_patients() {
    let app = TestApp::new().await;
    let (_, reception) = app.login_as("Recepção", Role::Receptionist).await;
    let (_, admin) = app.login_as("Admin", Role::Admin).await;

    let (status, _) = app.post("/api/patients", &reception, patient_body("Maria Souza", "529.982.247-25")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.post("/api/patients", &admin, patient_body("Maria Souza", "529.982.247-25")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["cpf"], "52998224725");
    assert!(body["data"]["email"].is_null());

    // Leitura é livre para todos os papéis
    let (status, list) = app.get("/api/patients?search=maria", &reception).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["meta"]["total"], 1);
    assert_eq!(list["meta"]["current_page"], 1);
}

#[tokio::test]
async fn duplicate_or_invalid_cpf_is_a_field_error() {
    let app = TestApp::new().await;
    let (_, admin) = app.login_as("Admin", Role::Admin).await;
    app.db.patient("Maria Souza", "52998224725").await;

    let (status, body) = app.post("/api/patients", &admin, patient_body("Outra Maria", "529.982.247-25")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["cpf"][0], "CPF já cadastrado");

    let (status, body) = app.post("/api/patients", &admin, patient_body("João Silva", "111.111.111-11")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["cpf"].is_array());
}

#[tokio::test]
async fn available_slots_skip_booked_intervals() {
    let app = TestApp::new().await;
    let (_, token) = app.login_as("Recepção", Role::Receptionist).await;
    let doctor = app.db.doctor("Dr. Paulo").await;
    let patient = app.db.patient("Maria Souza", "52998224725").await;

    // 09:00-09:30 em Brasília
    let (status, _) = app
        .post(
            "/api/appointments",
            &token,
            json!({
                "patient_id": patient.id,
                "doctor_id": doctor.id,
                "starts_at": "2030-06-12T12:00:00Z",
                "ends_at": "2030-06-12T12:30:00Z",
                "appointment_type": "consultation",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/appointments/available-slots?doctor_id={}&date=2030-06-12&duration=30", doctor.id);
    let (status, body) = app.get(&uri, &token).await;
    assert_eq!(status, StatusCode::OK);

    let starts: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|slot| slot["start"].as_str().unwrap())
        .collect();
    assert_eq!(starts[0], "2030-06-12T08:00:00");
    assert!(starts.contains(&"2030-06-12T08:30:00"));
    assert!(!starts.contains(&"2030-06-12T09:00:00"));
    assert!(starts.contains(&"2030-06-12T09:30:00"));
    assert_eq!(starts.len(), 23);
}

#[tokio::test]
async fn appointment_with_unknown_doctor_is_rejected() {
    let app = TestApp::new().await;
    let (_, token) = app.login_as("Recepção", Role::Receptionist).await;
    let patient = app.db.patient("Maria Souza", "52998224725").await;
    let not_a_doctor = app.db.user("Recepção 2", Role::Receptionist).await;

    let (status, body) = app
        .post(
            "/api/appointments",
            &token,
            json!({
                "patient_id": patient.id,
                "doctor_id": not_a_doctor.id,
                "starts_at": "2030-06-12T12:00:00Z",
                "ends_at": "2030-06-12T12:30:00Z",
                "appointment_type": "consultation",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["doctor_id"][0], "Profissional não encontrado");
}

#[tokio::test]
async fn week_calendar_places_events_in_local_time() {
    let app = TestApp::new().await;
    let (_, token) = app.login_as("Recepção", Role::Receptionist).await;
    let doctor = app.db.doctor("Dr. Paulo").await;
    let patient = app.db.patient("Maria Souza", "52998224725").await;

    app.post(
        "/api/appointments",
        &token,
        json!({
            "patient_id": patient.id,
            "doctor_id": doctor.id,
            "starts_at": "2030-06-12T13:00:00Z",
            "ends_at": "2030-06-12T14:00:00Z",
            "appointment_type": "follow_up",
        }),
    )
    .await;

    let (status, body) = app.get("/api/calendar/week?date=2030-06-12", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["week_start"], "2030-06-10");

    let wednesday = &body["data"]["days"][2];
    assert_eq!(wednesday["date"], "2030-06-12");
    let event = &wednesday["events"][0];
    // 10:00 local, duas horas após a âncora de 08:00 a 2 px/min
    assert_eq!(event["top"], 240.0);
    assert_eq!(event["height"], 120.0);
    assert_eq!(event["event"]["patient_name"], "Maria Souza");
}

#[tokio::test]
async fn out_of_range_dates_are_validation_errors() {
    let app = TestApp::new().await;
    let (_, token) = app.login_as("Admin", Role::Admin).await;
    let doctor = app.db.doctor("Dr. Paulo").await;

    // Maior data que o chrono aceita; a aritmética da semana transbordaria
    for uri in [
        "/api/calendar/week?date=%2B262142-12-31".to_string(),
        "/api/calendar/month?date=%2B262142-12-31".to_string(),
        "/api/appointments?date=%2B262142-12-31".to_string(),
    ] {
        let (status, body) = app.get(&uri, &token).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", uri);
        assert_eq!(body["success"], false);
    }

    for (uri, field) in [
        ("/api/calendar/week?date=%2B10000-01-01".to_string(), "date"),
        ("/api/calendar/month?date=1899-12-31".to_string(), "date"),
        ("/api/appointments?from=2030-01-01&to=%2B10000-01-01".to_string(), "to"),
        (
            format!("/api/appointments/available-slots?doctor_id={}&date=%2B10000-01-01", doctor.id),
            "date",
        ),
        (
            format!("/api/appointments/doctor-schedule?doctor_id={}&date=1800-01-01", doctor.id),
            "date",
        ),
    ] {
        let (status, body) = app.get(&uri, &token).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", uri);
        assert!(body["errors"][field].is_array(), "{}: {}", uri, body);
    }

    let (status, body) = app
        .post(
            "/api/reports",
            &token,
            json!({"report_type": "appointments", "format": "csv", "period_end": "+10000-01-01"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["period_end"].is_array());
}

#[tokio::test]
async fn finalized_records_are_read_only_and_signing_needs_a_doctor() {
    let app = TestApp::new().await;
    let (doctor, doctor_token) = app.login_as("Dra. Ana Lima", Role::Doctor).await;
    let (_, reception) = app.login_as("Recepção", Role::Receptionist).await;
    let patient = app.db.patient("Maria Souza", "52998224725").await;

    let record = json!({
        "patient_id": patient.id,
        "doctor_id": doctor.id,
        "chief_complaint": "Cefaleia há 3 dias",
        "vital_signs": {"heart_rate": 80},
    });
    let (status, created) = app.post("/api/medical-records", &doctor_token, record.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["status"], "draft");
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .post(
            &format!("/api/medical-records/{}/diagnoses", id),
            &doctor_token,
            json!({"icd_code": "R51", "description": "Cefaleia", "diagnosis_type": "primary", "status": "confirmed"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // Recepção não vê prontuários
    let (status, _) = app.get(&format!("/api/medical-records/{}", id), &reception).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Assinar sem finalizar não pula etapas
    let (status, _) = app.post(&format!("/api/medical-records/{}/sign", id), &doctor_token, json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app.post(&format!("/api/medical-records/{}/finalize", id), &doctor_token, json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.put(&format!("/api/medical-records/{}", id), &doctor_token, record).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .post(
            &format!("/api/medical-records/{}/prescriptions", id),
            &doctor_token,
            json!({"medication": "Dipirona", "dosage": "500 mg", "frequency": "6/6h", "status": "active"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, signed) = app.post(&format!("/api/medical-records/{}/sign", id), &doctor_token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(signed["data"]["status"], "signed");
    assert_eq!(signed["data"]["signed_by"], doctor.id.to_string());

    let (status, detail) = app.get(&format!("/api/medical-records/{}", id), &doctor_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["data"]["chief_complaint"], "Cefaleia há 3 dias");
    assert_eq!(detail["data"]["diagnoses"][0]["icd_code"], "R51");
}

#[tokio::test]
async fn dashboard_reports_totals() {
    let app = TestApp::new().await;
    let (_, token) = app.login_as("Admin", Role::Admin).await;
    app.db.patient("Maria Souza", "52998224725").await;
    app.db.patient("João Silva", "11144477735").await;

    let (status, body) = app.get("/api/dashboard/statistics", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_patients"], 2);
    assert_eq!(body["data"]["appointments_by_status"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn report_download_lifecycle() {
    let app = TestApp::new().await;
    let (admin, token) = app.login_as("Admin", Role::Admin).await;
    let (_, doctor_token) = app.login_as("Dra. Ana Lima", Role::Doctor).await;
    app.db.patient("Maria Souza", "52998224725").await;

    let (status, _) = app.post("/api/reports", &doctor_token, json!({"report_type": "patients", "format": "csv"})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.post("/api/reports", &token, json!({"report_type": "patients", "format": "csv"})).await;
    assert_eq!(status, StatusCode::CREATED);
    let id: uuid::Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();

    let mut report = reports::get(app.state.pool(), id).await.unwrap();
    for _ in 0..50 {
        if report.status != ReportStatus::Generating {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        report = reports::get(app.state.pool(), id).await.unwrap();
    }
    assert_eq!(report.status, ReportStatus::Completed);
    assert_eq!(report.requested_by, admin.id);

    let (status, body) = app.get(&format!("/api/reports/{}/download", id), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("Maria Souza"));

    let past = chrono::Utc::now() - chrono::Duration::hours(1);
    reports::mark_completed(app.state.pool(), id, report.file_path.as_deref().unwrap(), 1, past, past)
        .await
        .unwrap();
    let (status, body) = app.get(&format!("/api/reports/{}/download", id), &token).await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["message"], "Relatório expirado");
}
