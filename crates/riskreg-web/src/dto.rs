use serde::Serialize;

pub use riskreg_core::LoginForm as LoginRequest;

#[derive(Debug, Serialize)]
#[serde(tag = "status")]
pub enum LoginResponse {
    #[serde(rename = "authenticated")]
    Authenticated {
        identity: String,
        token: String,
        expires_at: u64,
    },
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub identity: String,
}
