use secrecy::SecretString;

pub mod server;

/// Everything the server action needs, resolved from CLI/env.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub port: u16,
    /// Postgres DSN; the in-memory store is used when absent.
    pub dsn: Option<String>,
    pub client_url: String,
    pub access_token_secret: SecretString,
    pub refresh_token_secret: SecretString,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    pub verification_ttl_seconds: i64,
    pub hash_cost: u32,
    pub google: Option<GoogleSettings>,
}

#[derive(Debug, Clone)]
pub struct GoogleSettings {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_url: String,
}

#[derive(Debug)]
pub enum Action {
    Server { settings: Box<ServerSettings> },
}
