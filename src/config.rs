use clap::{Args, Parser, ValueEnum};

#[derive(Clone, Debug, Default, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub forge: ForgeConfig,

    #[command(flatten)]
    pub session: SessionConfig,

    #[command(flatten)]
    pub health: HealthConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "VIEWHUB_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "VIEWHUB_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Port for the management server (health probes)
    #[arg(long, env = "VIEWHUB_MGMT_PORT", default_value_t = 9090)]
    pub mgmt_port: u16,

    /// Seconds to wait for in-flight work during shutdown
    #[arg(long, env = "VIEWHUB_SHUTDOWN_TIMEOUT_SECS", default_value_t = 5)]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 3000, mgmt_port: 9090, shutdown_timeout_secs: 5 }
    }
}

/// Where the Forge client credentials come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum CredentialSourceKind {
    /// The configured values are the credentials themselves.
    #[default]
    Env,
    /// The configured values name AWS SSM parameters holding the credentials.
    Ssm,
}

#[derive(Clone, Debug, Args)]
pub struct ForgeConfig {
    /// Forge application client id (or SSM parameter name)
    #[arg(long = "forge-client-id", env = "FORGE_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Forge application client secret (or SSM parameter name)
    #[arg(long = "forge-client-secret", env = "FORGE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// OAuth callback URL registered with the Forge application (or SSM parameter name)
    #[arg(long = "forge-callback-url", env = "FORGE_CALLBACK_URL")]
    pub callback_url: Option<String>,

    /// How to interpret the three values above
    #[arg(long, env = "VIEWHUB_CREDENTIAL_SOURCE", value_enum, default_value_t = CredentialSourceKind::Env)]
    pub credential_source: CredentialSourceKind,

    /// AWS region for SSM lookups (falls back to the default provider chain)
    #[arg(long, env = "AWS_REGION")]
    pub aws_region: Option<String>,

    /// Base URL of the Forge authentication service
    #[arg(long = "forge-base-url", env = "FORGE_BASE_URL", default_value = "https://developer.api.autodesk.com")]
    pub base_url: String,

    /// Scopes requested for the internal (server-side) token
    #[arg(
        long,
        env = "FORGE_SCOPE_INTERNAL",
        default_value = "data:read,data:create,data:write,viewables:read",
        value_delimiter = ','
    )]
    pub scope_internal: Vec<String>,

    /// Scopes requested for the public (browser) token
    #[arg(long, env = "FORGE_SCOPE_PUBLIC", default_value = "viewables:read", value_delimiter = ',')]
    pub scope_public: Vec<String>,

    /// Timeout for calls to the Forge authentication service
    #[arg(long = "forge-timeout-secs", env = "FORGE_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            callback_url: None,
            credential_source: CredentialSourceKind::Env,
            aws_region: None,
            base_url: "https://developer.api.autodesk.com".to_string(),
            scope_internal: ["data:read", "data:create", "data:write", "viewables:read"]
                .into_iter()
                .map(String::from)
                .collect(),
            scope_public: vec!["viewables:read".to_string()],
            timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct SessionConfig {
    /// Redis/Valkey URL for the session store; sessions stay in memory when unset
    #[arg(long = "session-redis-url", env = "VIEWHUB_SESSION_REDIS_URL")]
    pub redis_url: Option<String>,

    /// Key prefix for stored sessions
    #[arg(long = "session-key-prefix", env = "VIEWHUB_SESSION_KEY_PREFIX", default_value = "viewhub:session:")]
    pub key_prefix: String,

    /// Session time-to-live in seconds
    #[arg(long = "session-ttl-secs", env = "VIEWHUB_SESSION_TTL_SECS", default_value_t = 1_209_600)]
    pub ttl_secs: u64,

    /// Name of the cookie carrying the session id
    #[arg(long = "session-cookie-name", env = "VIEWHUB_SESSION_COOKIE_NAME", default_value = "ForgeApp")]
    pub cookie_name: String,

    /// Mark the session cookie as Secure
    #[arg(long = "session-cookie-secure", env = "VIEWHUB_SESSION_COOKIE_SECURE", default_value_t = false)]
    pub cookie_secure: bool,

    /// Minimum backoff when connecting to the session store at boot
    #[arg(long = "session-min-backoff-secs", env = "VIEWHUB_SESSION_MIN_BACKOFF_SECS", default_value_t = 1)]
    pub min_backoff_secs: u64,

    /// Maximum backoff when connecting to the session store at boot
    #[arg(long = "session-max-backoff-secs", env = "VIEWHUB_SESSION_MAX_BACKOFF_SECS", default_value_t = 10)]
    pub max_backoff_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            key_prefix: "viewhub:session:".to_string(),
            ttl_secs: 1_209_600,
            cookie_name: "ForgeApp".to_string(),
            cookie_secure: false,
            min_backoff_secs: 1,
            max_backoff_secs: 10,
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct HealthConfig {
    /// Timeout for the session store readiness check
    #[arg(long, env = "VIEWHUB_HEALTH_SESSION_STORE_TIMEOUT_MS", default_value_t = 2000)]
    pub session_store_timeout_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self { session_store_timeout_ms: 2000 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Default, Args)]
pub struct TelemetryConfig {
    /// OTLP collector endpoint; OpenTelemetry export is disabled when unset
    #[arg(long, env = "VIEWHUB_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Log output format
    #[arg(long, env = "VIEWHUB_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}
