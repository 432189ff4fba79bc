use envconfig::Envconfig;

/// Secret used when `JWT_SECRET` is not set. Only fit for local development.
pub const DEV_JWT_SECRET: &str = "pharmabid-dev-secret-change-me";

#[derive(Envconfig, Debug, Clone)]
pub struct Config {
    #[envconfig(from = "DATABASE_URL", default = "sqlite://pharmabid.db")]
    pub database_url: String,

    #[envconfig(from = "DB_MAX_CONNECTIONS", default = "5")]
    pub db_max_connections: u32,

    #[envconfig(from = "BIND_ADDR", default = "0.0.0.0:5000")]
    pub bind_addr: String,

    #[envconfig(from = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    #[envconfig(from = "TOKEN_TTL_HOURS", default = "24")]
    pub token_ttl_hours: i64,
}

impl Config {
    /// The signing secret, falling back to [`DEV_JWT_SECRET`] with a warning.
    pub fn jwt_secret(&self) -> String {
        match self.jwt_secret.as_deref().map(str::trim) {
            Some(secret) if !secret.is_empty() => secret.to_string(),
            _ => {
                log::warn!("JWT_SECRET is not set, falling back to the insecure development secret");
                DEV_JWT_SECRET.to_string()
            }
        }
    }
}
