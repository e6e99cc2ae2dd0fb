pub mod crud_service;
pub mod form_schema;
pub mod import_service;
pub mod inference;
pub mod pages;
pub mod press_release_service;
pub mod record_service;
pub mod render;
pub mod stats_service;
pub mod table_controller;
