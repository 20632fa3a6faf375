//! Clinic Client - cliente HTTP da API da clínica
//!
//! Faz o papel da camada de API do frontend: injeta o token bearer em cada
//! requisição, guarda o token num `TokenStore` e, ao receber 401, limpa o
//! token e sinaliza o redirecionamento para `/login`.

pub mod api;
pub mod error;
pub mod store;

pub use api::{
    ApiClient, AppointmentQuery, ApiResponse, LoginData, PageMeta, Paginated, SlotQuery,
};
pub use error::{ClientError, ClientResult, LOGIN_ROUTE};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
