//! handlers/operation_handler.rs
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::services::campaign_service::CampaignService;

#[derive(Deserialize)]
pub struct PaginationQuery {
    page: Option<u64>,
    page_size: Option<u64>,
}

/// GET /api/campaigns
pub async fn list_operations_endpoint(
    campaign_service: web::Data<CampaignService>,
    query: web::Query<PaginationQuery>,
) -> HttpResponse {
    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(10);

    match campaign_service
        .operations()
        .list_operations(page, page_size)
        .await
    {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({
            "error": "Internal server error",
            "details": format!("{:?}", e)
        })),
    }
}

/// GET /api/campaigns/{id}
pub async fn get_operation_endpoint(
    campaign_service: web::Data<CampaignService>,
    path: web::Path<String>,
) -> HttpResponse {
    let op_id = path.into_inner();

    match campaign_service.operations().get_operation(&op_id).await {
        Ok(op_record) => HttpResponse::Ok().json(op_record),
        Err(e) => HttpResponse::NotFound().json(serde_json::json!({
            "error": "Operation not found",
            "details": format!("{:?}", e)
        })),
    }
}
