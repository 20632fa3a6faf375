use std::sync::Arc;

use clinic_client::{ApiClient, ClientError, MemoryTokenStore, TokenStore};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_json() -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "name": "Ana Admin",
        "email": "admin@clinica.com",
        "role": "admin",
        "active": true,
        "created_at": "2024-05-01T12:00:00Z",
        "updated_at": "2024-05-01T12:00:00Z"
    })
}

fn patient_json(name: &str) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "name": name,
        "birth_date": "1985-03-20",
        "cpf": "52998224725",
        "phone": "(11) 99876-5432",
        "email": null,
        "address": null,
        "notes": null,
        "created_at": "2024-05-01T12:00:00Z",
        "updated_at": "2024-05-01T12:00:00Z"
    })
}

#[tokio::test]
async fn login_stores_token_and_injects_bearer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(json!({"email": "admin@clinica.com", "password": "segredo-123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "token": "jwt-abc",
                "token_type": "Bearer",
                "expires_in": 3600,
                "user": user_json()
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/patients"))
        .and(header("authorization", "Bearer jwt-abc"))
        .and(query_param("search", "maria"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [patient_json("Maria Souza")],
            "meta": {"current_page": 1, "per_page": 15, "total": 1, "last_page": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let client = ApiClient::new(server.uri(), store.clone()).unwrap();

    let login = client.login("admin@clinica.com", "segredo-123").await.unwrap();
    assert_eq!(login.token_type, "Bearer");
    assert_eq!(store.load().unwrap().as_deref(), Some("jwt-abc"));

    let page = client.list_patients(Some("maria"), 1, 15).await.unwrap();
    assert_eq!(page.meta.total, 1);
    assert_eq!(page.data[0].name, "Maria Souza");
}

#[tokio::test]
async fn unauthorized_clears_token_and_redirects_to_login() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "message": "Token expirado"
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_token("velho"));
    let client = ApiClient::new(server.uri(), store.clone()).unwrap();

    let err = client.me().await.unwrap_err();
    match err {
        ClientError::Unauthorized { redirect_to } => assert_eq!(redirect_to, "/login"),
        other => panic!("esperava Unauthorized, veio {:?}", other),
    }
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn validation_errors_are_collected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/patients"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "success": false,
            "message": "Dados inválidos",
            "errors": {
                "cpf": ["CPF inválido"],
                "phone": ["Telefone inválido"]
            }
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri(), Arc::new(MemoryTokenStore::with_token("t"))).unwrap();
    let input = common_db::models::PatientInput {
        name: "Maria".into(),
        birth_date: chrono::NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
        cpf: "111.111.111-11".into(),
        phone: Some("123".into()),
        email: None,
        address: None,
        notes: None,
    };

    let err = client.create_patient(&input).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation { .. }));
    assert_eq!(err.display_message(), "CPF inválido Telefone inválido");
}

#[tokio::test]
async fn other_errors_surface_api_message() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path_regex(r"^/api/patients/.+$"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "success": false,
            "message": "Apenas administradores podem alterar pacientes"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/dashboard/statistics"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "success": false,
            "message": "Erro interno do servidor"
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_token("t"));
    let client = ApiClient::new(server.uri(), store.clone()).unwrap();

    let err = client.delete_patient(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ClientError::Forbidden(_)));
    assert_eq!(err.display_message(), "Apenas administradores podem alterar pacientes");

    let err = client.dashboard_statistics().await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 500, .. }));

    // Só o 401 apaga o token
    assert_eq!(store.load().unwrap().as_deref(), Some("t"));
}

#[tokio::test]
async fn download_returns_raw_bytes_and_gone_when_expired() {
    let server = MockServer::start().await;
    let ok_id = Uuid::new_v4();
    let expired_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(format!("/api/reports/{}/download", ok_id)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"id,name\n1,Maria\n".to_vec()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/api/reports/{}/download", expired_id)))
        .respond_with(ResponseTemplate::new(410).set_body_json(json!({
            "success": false,
            "message": "Relatório expirado"
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri(), Arc::new(MemoryTokenStore::with_token("t"))).unwrap();
    assert_eq!(client.download_report(ok_id).await.unwrap(), b"id,name\n1,Maria\n");
    assert!(matches!(client.download_report(expired_id).await, Err(ClientError::Gone(_))));
}
