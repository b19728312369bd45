//! handlers/template_handler.rs
//! Endpoints de plantillas, vista previa y contactos de ejemplo.

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::errors::CampaignError;
use crate::models::request_model::PreviewRequest;
use crate::models::template_model::UpdateLanguageTemplateRequest;
use crate::services::campaign_service::CampaignService;

fn campaign_error_response(e: CampaignError) -> HttpResponse {
    log::warn!("Template request rejected: {}", e);
    let mut builder = match e {
        CampaignError::MalformedTemplateData(_) => HttpResponse::BadRequest(),
        ref other if other.is_validation() => HttpResponse::BadRequest(),
        _ => HttpResponse::InternalServerError(),
    };
    builder.json(json!({
        "success": false,
        "error": e.to_string()
    }))
}

/// GET /api/templates
pub async fn export_templates_endpoint(
    campaign_service: web::Data<CampaignService>,
) -> HttpResponse {
    HttpResponse::Ok().json(campaign_service.export_templates().await)
}

/// PUT /api/templates
/// Reemplaza todas las plantillas con el JSON `{campaign_type, templates, subjects}`.
pub async fn import_templates_endpoint(
    campaign_service: web::Data<CampaignService>,
    body: web::Json<serde_json::Value>,
) -> HttpResponse {
    match campaign_service.import_templates(body.into_inner()).await {
        Ok(languages) => HttpResponse::Ok().json(json!({
            "success": true,
            "languages": languages
        })),
        Err(e) => campaign_error_response(e),
    }
}

/// PUT /api/templates/{lang}
pub async fn update_language_template_endpoint(
    campaign_service: web::Data<CampaignService>,
    path: web::Path<String>,
    body: web::Json<UpdateLanguageTemplateRequest>,
) -> HttpResponse {
    let language = path.into_inner().trim().to_lowercase();
    let languages = campaign_service
        .set_language_template(&language, body.into_inner())
        .await;

    HttpResponse::Ok().json(json!({
        "success": true,
        "language": language,
        "languages": languages
    }))
}

/// POST /api/templates/defaults/{campaign_type}
pub async fn load_default_templates_endpoint(
    campaign_service: web::Data<CampaignService>,
    path: web::Path<String>,
) -> HttpResponse {
    let campaign_type = path.into_inner();

    match campaign_service.load_default_templates(&campaign_type).await {
        Ok(languages) => HttpResponse::Ok().json(json!({
            "success": true,
            "campaign_type": campaign_type,
            "languages": languages
        })),
        Err(e) => campaign_error_response(e),
    }
}

/// POST /api/templates/preview
pub async fn preview_endpoint(
    campaign_service: web::Data<CampaignService>,
    body: web::Json<PreviewRequest>,
) -> HttpResponse {
    match campaign_service.preview(body.into_inner()).await {
        Ok(preview) => HttpResponse::Ok().json(preview),
        Err(e) => campaign_error_response(e),
    }
}

/// GET /api/contacts/sample
pub async fn sample_contacts_endpoint(
    campaign_service: web::Data<CampaignService>,
) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "contacts": campaign_service.sample_recipients()
    }))
}
