//! HTTP bootstrap for the read API.

use actix_web::{get, middleware, web, App, HttpResponse, HttpServer, Responder};
use errata_common::config::Vendor;
use errata_store::Store;
use std::sync::Arc;
use utoipa::OpenApi;

#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "HTTP")]
#[group(id = "http")]
pub struct HttpConfig {
    #[arg(id = "http-bind", long, env = "HTTP_BIND", default_value = "0.0.0.0")]
    pub bind: String,
    #[arg(id = "http-port", long, env = "HTTP_PORT", default_value_t = 8080)]
    pub port: u16,
}

#[get("/openapi.json")]
async fn openapi() -> impl Responder {
    HttpResponse::Ok().json(errata_module_advisory::endpoints::ApiDoc::openapi())
}

/// Run the API server until shutdown.
pub async fn run(
    store: Arc<dyn Store>,
    http: HttpConfig,
    vendor: Vendor,
) -> Result<(), anyhow::Error> {
    log::info!("listening on {}:{}", http.bind, http.port);

    HttpServer::new(move || {
        let store = store.clone();
        let vendor = vendor.clone();
        App::new()
            .wrap(middleware::Logger::default())
            .service(web::scope("/api").configure(move |config| {
                errata_module_advisory::endpoints::configure(
                    config,
                    store,
                    vendor.homepage,
                    vendor.vendor,
                )
            }))
            .service(openapi)
    })
    .bind((http.bind.clone(), http.port))?
    .run()
    .await?;

    Ok(())
}
