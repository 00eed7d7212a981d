use clap::Parser;
use errata_common::{config, db::Database};
use errata_publisher::Scanner;
use errata_store::PgStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Publish advisories into the repositories of a compose.
#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "errata-publisher", long_about = None)]
struct Cli {
    /// Directory with composes
    #[arg(long, env = "REPO_DIR", default_value = "/mnt/repos-staging/pub")]
    repo_dir: PathBuf,

    /// Email address of the publisher
    #[arg(long, env = "FROM", default_value = "releng@example.org")]
    from: String,

    /// Compose to use
    #[arg(long, required = true)]
    compose_name: String,

    /// Product name
    #[arg(long, required = true)]
    product_name: String,

    /// Product name (short)
    #[arg(long, required = true)]
    product_short: String,

    /// Product id
    #[arg(long, required = true)]
    product_id: i64,

    /// Only scan and report what would be published
    #[arg(long)]
    scan_and_stop: bool,

    #[command(flatten)]
    database: config::Database,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let db = Database::new(&cli.database).await?;
    let store = Arc::new(PgStore::new(db));

    let scanner = Scanner::new(
        store,
        &cli.repo_dir,
        &cli.from,
        cli.product_id,
        &cli.product_name,
        &cli.product_short,
    );

    scanner
        .scan_and_publish(&cli.compose_name, cli.scan_and_stop)
        .await?;

    Ok(())
}
