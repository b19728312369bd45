//! app.rs
use crate::handlers::{campaign_handler, operation_handler, template_handler};
use actix_web::web;

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/campaigns")
                    .route(
                        "",
                        web::get().to(operation_handler::list_operations_endpoint),
                    )
                    .route(
                        "/run",
                        web::post().to(campaign_handler::run_campaign_endpoint),
                    )
                    .route(
                        "/{id}",
                        web::get().to(operation_handler::get_operation_endpoint),
                    )
                    .route(
                        "/{id}/log.csv",
                        web::get().to(campaign_handler::campaign_log_csv_endpoint),
                    )
                    .route(
                        "/{id}/summary",
                        web::get().to(campaign_handler::campaign_summary_endpoint),
                    )
                    .route(
                        "/{id}/abort",
                        web::post().to(campaign_handler::abort_campaign_endpoint),
                    ),
            )
            .service(
                web::scope("/templates")
                    .route(
                        "",
                        web::get().to(template_handler::export_templates_endpoint),
                    )
                    .route(
                        "",
                        web::put().to(template_handler::import_templates_endpoint),
                    )
                    .route(
                        "/preview",
                        web::post().to(template_handler::preview_endpoint),
                    )
                    .route(
                        "/defaults/{campaign_type}",
                        web::post().to(template_handler::load_default_templates_endpoint),
                    )
                    .route(
                        "/{lang}",
                        web::put().to(template_handler::update_language_template_endpoint),
                    ),
            )
            .service(
                web::scope("/contacts").route(
                    "/sample",
                    web::get().to(template_handler::sample_contacts_endpoint),
                ),
            ),
    );
}
