//! Clinic API - backend REST da clínica
//!
//! Pacientes, agenda, prontuários criptografados, painel e relatórios
//! exportáveis sobre SQLite. Todas as rotas em `/api` exigem um JWT, exceto
//! o login.

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod reports;
pub mod response;
pub mod routes;
pub mod state;

pub use config::AppConfig;
pub use routes::build_router;
pub use state::AppState;

/// Metadados de build gerados pelo `built`
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
