//! handlers/campaign_handler.rs
//! Endpoints para lanzar, consultar y cortar campañas.

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::models::request_model::RunCampaignRequest;
use crate::services::campaign_service::CampaignService;

fn not_found_or_internal(e: &anyhow::Error) -> actix_web::http::StatusCode {
    if e.to_string().contains("not found") {
        actix_web::http::StatusCode::NOT_FOUND
    } else {
        actix_web::http::StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// POST /api/campaigns/run
pub async fn run_campaign_endpoint(
    campaign_service: web::Data<CampaignService>,
    body: web::Json<RunCampaignRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    log::info!(
        "(run_campaign_endpoint) contactos={}, async={}",
        req.contacts.len(),
        req.async_run
    );

    match campaign_service.run_campaign(req).await {
        Ok(resp) if resp.success => HttpResponse::Ok().json(resp),
        // Campaña rechazada por validación: el cuerpo lleva `{error}` por corrida
        Ok(resp) => HttpResponse::BadRequest().json(resp),
        Err(e) => {
            log::error!("Campaign run error: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "success": false,
                "error": e.to_string()
            }))
        }
    }
}

/// GET /api/campaigns/{id}/log.csv
pub async fn campaign_log_csv_endpoint(
    campaign_service: web::Data<CampaignService>,
    path: web::Path<String>,
) -> HttpResponse {
    let op_id = path.into_inner();

    match campaign_service.export_log_csv(&op_id).await {
        Ok(csv) => HttpResponse::Ok()
            .append_header(("Content-Type", "text/csv; charset=utf-8"))
            .append_header((
                "Content-Disposition",
                format!("attachment; filename=\"campaign_{}.csv\"", op_id),
            ))
            .body(csv),
        Err(e) => HttpResponse::build(not_found_or_internal(&e)).json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}

/// GET /api/campaigns/{id}/summary
pub async fn campaign_summary_endpoint(
    campaign_service: web::Data<CampaignService>,
    path: web::Path<String>,
) -> HttpResponse {
    let op_id = path.into_inner();

    match campaign_service.get_summary(&op_id).await {
        Ok(summary) => HttpResponse::Ok().json(summary),
        Err(e) => {
            let status = if e.to_string().contains("not finished") {
                actix_web::http::StatusCode::CONFLICT
            } else {
                not_found_or_internal(&e)
            };
            HttpResponse::build(status).json(json!({
                "success": false,
                "error": e.to_string()
            }))
        }
    }
}

/// POST /api/campaigns/{id}/abort
pub async fn abort_campaign_endpoint(
    campaign_service: web::Data<CampaignService>,
    path: web::Path<String>,
) -> HttpResponse {
    let op_id = path.into_inner();

    if campaign_service.abort(&op_id) {
        HttpResponse::Accepted().json(json!({
            "success": true,
            "operation_id": op_id,
            "message": "Abort requested"
        }))
    } else {
        HttpResponse::NotFound().json(json!({
            "success": false,
            "error": format!("No running campaign with id {}", op_id)
        }))
    }
}
