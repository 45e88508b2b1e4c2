use clap::Parser;

/// Runtime configuration, resolved once at startup from flags, environment and `.env`
#[derive(Parser, Debug, Clone)]
#[clap(about = "Live chart server: named datasets pushed to browsers over WebSocket", version)]
pub struct Config {
    #[clap(long, env = "CHARTS_DB", default_value = "charts", help = "Database name; stored as <name>.db")]
    pub charts_db: String,

    #[clap(long, env = "DATABASE_URL", help = "Full sqlx database url, overrides --charts-db")]
    pub database_url: Option<String>,

    #[clap(long, env = "HOST", default_value = "0.0.0.0", help = "Address to listen on.")]
    pub host: String,

    #[clap(long, env = "PORT", default_value_t = 8220, help = "Port to listen on.")]
    pub port: u16,

    #[clap(long, env = "CHART_PREFIX", default_value = "/chart", help = "Path prefix of the HTTP chart routes.")]
    pub chart_prefix: String,

    #[clap(
        long,
        env = "RPC_SECRET",
        default_value = "easycharts",
        hide_env_values = true,
        help = "Token browsers present when opening the chart WebSocket."
    )]
    pub rpc_secret: String,

    #[clap(long, env = "DB_MAX_CONNECTIONS", default_value_t = 5, help = "Database pool size.")]
    pub max_connections: u32,
}

impl Config {
    pub fn database_url(&self) -> String {
        match &self.database_url {
            Some(url) => url.clone(),
            None => format!("sqlite://{}.db", self.charts_db),
        }
    }

    /// Chart prefix with exactly one leading slash and no trailing slash
    pub fn chart_prefix(&self) -> String {
        let trimmed = self.chart_prefix.trim_matches('/');
        if trimmed.is_empty() {
            "/chart".to_string()
        } else {
            format!("/{}", trimmed)
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
