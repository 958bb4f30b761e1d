// src/main.rs
mod config;
mod models;
mod handlers;
mod storage;
mod opencloud;
mod rate_limit;
mod utils;

use actix_web::{ middleware::{ from_fn, Logger }, web, App, HttpServer };
use env_logger::Env;
use log::{ error, info };
use crate::config::Config;
use crate::opencloud::OpenCloudClient;
use crate::rate_limit::ClientRateLimiter;
use crate::storage::memory::ServerListCache;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    // Initialize logger only once at the start
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    // Load configuration, refusing to start without credentials
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    info!("Loaded configuration: {:?}", config);

    let bind = format!("{}:{}", config.bind_address, config.port);

    let cache = web::Data::new(ServerListCache::new(config.cache_ttl()));
    let upstream = web::Data::new(OpenCloudClient::new(&config));
    let rate_limiter = web::Data::new(ClientRateLimiter::from_config(&config));

    // Periodically forget clients that have gone quiet
    let pruned_limiter = rate_limiter.clone();
    let prune_every = config.rate_limit_window();
    actix_web::rt::spawn(async move {
        let mut ticker = tokio::time::interval(prune_every);
        loop {
            ticker.tick().await;
            pruned_limiter.prune();
        }
    });

    let config = web::Data::new(config);

    info!("Server proxy running on {}", bind);
    HttpServer::new(move || {
        App::new()
            .wrap(from_fn(rate_limit::limit_requests))
            .wrap(handlers::cors_policy())
            .wrap(Logger::default())
            .app_data(config.clone())
            .app_data(cache.clone())
            .app_data(upstream.clone())
            .app_data(rate_limiter.clone())
            .configure(handlers::configure)
    })
        .bind(&bind)?
        .run().await
}
