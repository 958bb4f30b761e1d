// src/handlers/mod.rs
use actix_cors::Cors;
use actix_web::web;

pub mod servers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/servers", web::get().to(servers::get_servers));
}

/// Any origin may call the proxy.
pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .send_wildcard()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600)
}
