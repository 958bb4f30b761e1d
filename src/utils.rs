// src/utils.rs
use actix_web::{ HttpRequest, HttpResponse, ResponseError };
use actix_web::http::{ header, StatusCode };
use std::net::IpAddr;
use std::fmt;
use log::debug;
use crate::models::server::ErrorResponse;
use crate::opencloud::FetchError;

#[derive(Debug)]
pub enum RequestError {
    MissingPeerIP,
    RateLimitExceeded { retry_after_secs: u64 },
    Upstream(String),
    Internal(String),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPeerIP => write!(f, "Failed to extract client IP"),
            Self::RateLimitExceeded { .. } => write!(f, "Too many requests, please try again later."),
            Self::Upstream(_) => write!(f, "OpenCloud error"),
            Self::Internal(message) => write!(f, "{}", message),
        }
    }
}

impl From<FetchError> for RequestError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Status { body, .. } => Self::Upstream(body),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl ResponseError for RequestError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingPeerIP => StatusCode::BAD_REQUEST,
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::RateLimitExceeded { retry_after_secs } => {
                HttpResponse::TooManyRequests()
                    .insert_header((header::RETRY_AFTER, retry_after_secs.to_string()))
                    .body(self.to_string())
            }
            Self::Upstream(details) => {
                HttpResponse::build(self.status_code())
                    .json(ErrorResponse::new(self.to_string(), Some(details.clone())))
            }
            _ => HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.to_string(), None)),
        }
    }
}

/// Resolves the identity a client is rate limited under.
///
/// The socket peer is used unless `trust_proxy` is set, in which case the
/// first parseable `X-Forwarded-For` entry wins.
pub fn extract_client_ip(req: &HttpRequest, trust_proxy: bool) -> Result<IpAddr, RequestError> {
    if trust_proxy {
        if let Some(forwarded_for) = req.headers().get("X-Forwarded-For") {
            if let Ok(ip_str) = forwarded_for.to_str() {
                if let Some(first_ip) = ip_str.split(',').next() {
                    if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                        debug!("Using forwarded client IP: {}", ip);
                        return Ok(ip);
                    }
                }
            }
        }
    }

    match req.peer_addr() {
        Some(addr) => Ok(addr.ip()),
        None => Err(RequestError::MissingPeerIP),
    }
}
