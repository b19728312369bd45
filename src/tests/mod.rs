//! tests/mod.rs
//! Pruebas unitarias del motor de campañas.

mod campaign_service_tests;
mod dispatcher_tests;
mod personalizer_tests;
mod support;
