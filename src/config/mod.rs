use std::env;

/// Runtime configuration, loaded from environment variables
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// JWT signing secret (required in production)
    pub jwt_secret: String,

    /// Allowed CORS origins (comma separated)
    pub allowed_origins: Vec<String>,

    /// SMTP relay host; notifications are logged only when unset
    pub smtp_host: Option<String>,

    /// SMTP port (default: 587)
    pub smtp_port: u16,

    /// SMTP credentials (optional)
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,

    /// Sender address for outbound notifications
    pub smtp_from: String,

    /// MinIO/S3 endpoint for media blobs
    pub minio_endpoint: String,

    /// MinIO/S3 credentials
    pub minio_access_key: String,
    pub minio_secret_key: String,

    /// Bucket holding all post media
    pub minio_bucket: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "secret".to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: "Marketplace <noreply@marketplace.local>".to_string(),
            minio_endpoint: "http://127.0.0.1:9000".to_string(),
            minio_access_key: "minioadmin".to_string(),
            minio_secret_key: "minioadmin".to_string(),
            minio_bucket: "marketplace-media".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            jwt_secret: env::var("JWT_SECRET").unwrap_or(default.jwt_secret),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(default.allowed_origins),

            smtp_host: env::var("SMTP_HOST").ok().filter(|v| !v.trim().is_empty()),

            smtp_port: env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.smtp_port),

            smtp_username: env::var("SMTP_USERNAME").ok(),
            smtp_password: env::var("SMTP_PASSWORD").ok(),

            smtp_from: env::var("SMTP_FROM").unwrap_or(default.smtp_from),

            minio_endpoint: env::var("MINIO_ENDPOINT").unwrap_or(default.minio_endpoint),
            minio_access_key: env::var("MINIO_ACCESS_KEY").unwrap_or(default.minio_access_key),
            minio_secret_key: env::var("MINIO_SECRET_KEY").unwrap_or(default.minio_secret_key),
            minio_bucket: env::var("MINIO_BUCKET").unwrap_or(default.minio_bucket),
        }
    }
}
