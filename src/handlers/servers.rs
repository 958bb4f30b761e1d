// src/handlers/servers.rs
use actix_web::{ web, HttpResponse };
use log::{ debug, error, warn };
use crate::models::server::ServerListResponse;
use crate::opencloud::{ FetchError, OpenCloudClient };
use crate::storage::memory::ServerListCache;
use crate::utils::RequestError;

/// Requests reach this handler only after `rate_limit::limit_requests` has
/// admitted them.
pub async fn get_servers(
    cache: web::Data<ServerListCache>,
    upstream: web::Data<OpenCloudClient>,
) -> Result<HttpResponse, RequestError> {
    let (servers, source) = cache
        .get_or_fetch(|| upstream.fetch_servers())
        .await
        .map_err(|e| {
            match &e {
                FetchError::Status { status, .. } => {
                    warn!("OpenCloud rejected instance listing with {}", status)
                }
                _ => error!("Failed to fetch server list: {}", e),
            }
            RequestError::from(e)
        })?;

    debug!("Serving {} servers from {:?}", servers.len(), source);

    Ok(HttpResponse::Ok().json(ServerListResponse::new(source, &servers)))
}
