use crate::model::{AdvisoryQuery, AdvisorySummary, ListAdvisoriesResponse};
use crate::service::AdvisoryService;
use actix_web::{get, http::header, web, HttpResponse, Responder};
use errata_common::model::Paginated;
use errata_store::Store;
use std::sync::Arc;
use utoipa::OpenApi;

pub fn configure(
    config: &mut web::ServiceConfig,
    store: Arc<dyn Store>,
    homepage: impl Into<String>,
    vendor: impl Into<String>,
) {
    let advisory_service = AdvisoryService::new(store, homepage, vendor);

    config
        .app_data(web::Data::new(advisory_service))
        // registered before `get` so that `rss` does not match as a name
        .service(all)
        .service(rss)
        .service(get);
}

#[derive(OpenApi)]
#[openapi(
    paths(all, get, rss),
    components(schemas(
        crate::model::AdvisorySummary,
        crate::model::AdvisoryCve,
        crate::model::AdvisoryFix,
        crate::model::ListAdvisoriesResponse,
        errata_entity::advisory::AdvisorySeverity,
        errata_entity::advisory::AdvisoryType,
    )),
    tags()
)]
pub struct ApiDoc;

#[utoipa::path(
    tag = "advisory",
    operation_id = "listAdvisories",
    context_path = "/api",
    params(
        AdvisoryQuery,
        Paginated,
    ),
    responses(
        (status = 200, description = "Matching advisories", body = ListAdvisoriesResponse),
    ),
)]
#[get("/v2/advisories")]
/// List published advisories
pub async fn all(
    state: web::Data<AdvisoryService>,
    web::Query(query): web::Query<AdvisoryQuery>,
    web::Query(paginated): web::Query<Paginated>,
) -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(state.list_advisories(query, paginated).await?))
}

#[utoipa::path(
    tag = "advisory",
    operation_id = "listAdvisoriesRSS",
    context_path = "/api",
    responses(
        (status = 200, description = "Latest advisories as RSS", content_type = "application/rss+xml"),
    ),
)]
#[get("/v2/advisories/rss")]
/// Latest 25 published advisories as an RSS feed
pub async fn rss(state: web::Data<AdvisoryService>) -> actix_web::Result<impl Responder> {
    let feed = state.list_advisories_rss().await?;

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "application/rss+xml"))
        .body(feed))
}

#[utoipa::path(
    tag = "advisory",
    operation_id = "getAdvisory",
    context_path = "/api",
    params(
        ("id" = String, Path, description = "Derived advisory name, e.g. RLSA-2021:2595"),
    ),
    responses(
        (status = 200, description = "Matching advisory", body = AdvisorySummary),
        (status = 400, description = "Malformed advisory name"),
        (status = 404, description = "Matching advisory not found"),
    ),
)]
#[get("/v2/advisories/{id}")]
/// Get a published advisory by name
pub async fn get(
    state: web::Data<AdvisoryService>,
    id: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let fetched = state.get_advisory(&id).await?;

    if let Some(fetched) = fetched {
        Ok(HttpResponse::Ok().json(fetched))
    } else {
        Ok(HttpResponse::NotFound().finish())
    }
}
