use clap::Parser;
use errata_common::config::{Database, Vendor};
use errata_common::db;
use errata_module_redhat::{HttpErrataApi, HttpSecurityApi};
use errata_module_workflow::{server::worker, Controller};
use errata_server::HttpConfig;
use errata_store::PgStore;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(clap::Parser, Debug)]
#[command(
    author,
    version = env!("CARGO_PKG_VERSION"),
    about = "erratad",
    long_about = None
)]
struct Erratad {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Serve the read API
    Api {
        #[command(flatten)]
        database: Database,
        #[command(flatten)]
        http: HttpConfig,
        #[command(flatten)]
        vendor: Vendor,
    },
    /// Run the periodic mirror and advisory tasks
    Worker {
        #[command(flatten)]
        database: Database,
        #[command(flatten)]
        vendor: Vendor,
    },
    /// One-shot: backfill missing CVE content
    Collect {
        #[command(flatten)]
        database: Database,
        #[command(flatten)]
        vendor: Vendor,
    },
    /// Apply database migrations
    Migrate {
        #[command(flatten)]
        database: Database,
        /// Drop and re-create the database first
        #[arg(long)]
        bootstrap: bool,
    },
}

impl Erratad {
    async fn run(self) -> ExitCode {
        match self.run_command().await {
            Ok(code) => code,
            Err(err) => {
                log::error!("Error: {err}");
                for (n, err) in err.chain().skip(1).enumerate() {
                    if n == 0 {
                        log::error!("Caused by:");
                    }
                    log::error!("\t{err}");
                }

                ExitCode::FAILURE
            }
        }
    }

    async fn run_command(self) -> anyhow::Result<ExitCode> {
        match self.command {
            Command::Api {
                database,
                http,
                vendor,
            } => {
                let db = db::Database::new(&database).await?;
                let store = Arc::new(PgStore::new(db));
                errata_server::run(store, http, vendor).await?;
            }
            Command::Worker { database, vendor } => {
                let controller = controller(&database, &vendor).await?;
                worker(Arc::new(controller)).await?;
            }
            Command::Collect { database, vendor } => {
                let controller = controller(&database, &vendor).await?;
                controller.collect_cve_content().await?;
            }
            Command::Migrate {
                database,
                bootstrap,
            } => {
                if bootstrap {
                    db::Database::bootstrap(&database).await?;
                } else {
                    db::Database::new(&database).await?.migrate().await?;
                }
            }
        }

        Ok(ExitCode::SUCCESS)
    }
}

async fn controller(database: &Database, vendor: &Vendor) -> anyhow::Result<Controller> {
    let db = db::Database::new(database).await?;
    let store = Arc::new(PgStore::new(db));

    Ok(Controller::new(
        store,
        Arc::new(HttpSecurityApi::new()?),
        Arc::new(HttpErrataApi::new()?),
        &vendor.vendor,
    ))
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    Erratad::parse().run().await
}
