#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Database")]
#[group(id = "database")]
pub struct Database {
    #[arg(id = "db-user", long, env = "DB_USER", default_value = "errata")]
    pub username: String,
    #[arg(
        id = "db-password",
        long,
        env = "DB_PASSWORD",
        default_value = "errata"
    )]
    pub password: String,
    #[arg(id = "db-host", long, env = "DB_HOST", default_value = "localhost")]
    pub host: String,
    #[arg(id = "db-port", long, env = "DB_PORT", default_value_t = 5432)]
    pub port: u16,
    #[arg(id = "db-name", long, env = "DB_NAME", default_value = "errata")]
    pub name: String,
    #[arg(id = "db-max-conn", long, env = "DB_MAX_CONN", default_value_t = 75)]
    pub max_conn: u32,
    #[arg(id = "db-min-conn", long, env = "DB_MIN_CONN", default_value_t = 16)]
    pub min_conn: u32,
}

impl Database {
    pub fn to_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.name
        )
    }
}

#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Vendor")]
#[group(id = "vendor")]
pub struct Vendor {
    /// Vendor name substituted into mirrored advisory text.
    #[arg(long, env = "VENDOR", default_value = "Errata Project")]
    pub vendor: String,
    /// Public homepage used for advisory and RSS links.
    #[arg(long, env = "HOMEPAGE", default_value = "https://errata.example.org")]
    pub homepage: String,
}
