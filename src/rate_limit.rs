// src/rate_limit.rs
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::time::Duration;
use actix_web::body::MessageBody;
use actix_web::dev::{ ServiceRequest, ServiceResponse };
use actix_web::middleware::Next;
use actix_web::web;
use dashmap::DashMap;
use governor::clock::{ Clock, DefaultClock, Reference };
use governor::nanos::Nanos;
use log::{ debug, warn };
use crate::config::Config;
use crate::utils::{ extract_client_ip, RequestError };

struct WindowEntry<I> {
    count: u32,
    window_start: I,
}

/// Fixed-window request counter per client IP over an injectable clock.
pub struct ClientRateLimiter<C: Clock = DefaultClock> {
    windows: DashMap<IpAddr, WindowEntry<C::Instant>>,
    window: Nanos,
    max_requests: NonZeroU32,
    clock: C,
}

impl ClientRateLimiter {
    pub fn new(window: Duration, max_requests: NonZeroU32) -> Self {
        Self::with_clock(window, max_requests, DefaultClock::default())
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.rate_limit_window(), config.rate_limit_max)
    }
}

impl<C: Clock> ClientRateLimiter<C> {
    pub fn with_clock(window: Duration, max_requests: NonZeroU32, clock: C) -> Self {
        Self {
            windows: DashMap::new(),
            window: Nanos::from(window),
            max_requests,
            clock,
        }
    }

    /// Counts one request for `ip`. The window opens on the first request and
    /// the count resets once it has fully elapsed.
    pub fn check(&self, ip: IpAddr) -> Result<(), RequestError> {
        let now = self.clock.now();
        let mut entry = self.windows.entry(ip).or_insert(WindowEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) >= self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= self.max_requests.get() {
            let reset_at = entry.window_start + self.window;
            let wait = Duration::from(reset_at.duration_since(now));
            return Err(RequestError::RateLimitExceeded {
                retry_after_secs: whole_seconds(wait),
            });
        }

        entry.count += 1;
        Ok(())
    }

    /// Forgets clients whose window has elapsed.
    pub fn prune(&self) {
        let now = self.clock.now();
        self.windows
            .retain(|_, entry| now.duration_since(entry.window_start) < self.window);
        self.windows.shrink_to_fit();
        debug!("Rate limiter tracking {} clients after prune", self.tracked_clients());
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

// Rounded up, never below one second.
fn whole_seconds(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

/// App-wide limiter: every request counts against its client, whatever the
/// route.
pub async fn limit_requests(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let trust_proxy = req
        .app_data::<web::Data<Config>>()
        .map(|config| config.trust_proxy)
        .unwrap_or(false);

    if let Some(limiter) = req.app_data::<web::Data<ClientRateLimiter>>().cloned() {
        let admitted = extract_client_ip(req.request(), trust_proxy).and_then(|ip| {
            limiter.check(ip).map_err(|e| {
                warn!("Rate limit exceeded for ip: {}", ip);
                e
            })
        });

        if let Err(e) = admitted {
            return Ok(req.error_response(e).map_into_right_body());
        }
    }

    next.call(req).await.map(ServiceResponse::map_into_left_body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use governor::clock::FakeRelativeClock;

    fn production_limiter(clock: &FakeRelativeClock) -> ClientRateLimiter<FakeRelativeClock> {
        let config = Config::from_lookup(|name| match name {
            "ROBLOX_API_KEY" => Some("secret".to_string()),
            "UNIVERSE_ID" => Some("123".to_string()),
            _ => None,
        })
        .unwrap();
        ClientRateLimiter::with_clock(config.rate_limit_window(), config.rate_limit_max, clock.clone())
    }

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([10, 0, 0, last])
    }

    #[test]
    fn thirty_first_request_is_rejected() {
        let clock = FakeRelativeClock::default();
        let limiter = production_limiter(&clock);

        for _ in 0..30 {
            assert!(limiter.check(ip(1)).is_ok());
        }
        match limiter.check(ip(1)) {
            Err(RequestError::RateLimitExceeded { retry_after_secs }) => assert_eq!(retry_after_secs, 30),
            other => panic!("expected rate limit, got {:?}", other),
        }
    }

    #[test]
    fn no_requests_trickle_in_mid_window() {
        let clock = FakeRelativeClock::default();
        let limiter = production_limiter(&clock);

        for _ in 0..30 {
            limiter.check(ip(1)).unwrap();
        }

        clock.advance(Duration::from_secs(1));
        match limiter.check(ip(1)) {
            Err(RequestError::RateLimitExceeded { retry_after_secs }) => assert_eq!(retry_after_secs, 29),
            other => panic!("expected rate limit, got {:?}", other),
        }

        for _ in 0..28 {
            clock.advance(Duration::from_secs(1));
            assert!(limiter.check(ip(1)).is_err());
        }

        clock.advance(Duration::from_millis(999));
        assert!(limiter.check(ip(1)).is_err());
    }

    #[test]
    fn spread_requests_share_one_window() {
        let clock = FakeRelativeClock::default();
        let limiter = production_limiter(&clock);

        for _ in 0..30 {
            limiter.check(ip(1)).unwrap();
            clock.advance(Duration::from_millis(900));
        }

        // 27s into the window.
        assert!(limiter.check(ip(1)).is_err());
    }

    #[test]
    fn clients_are_limited_independently() {
        let clock = FakeRelativeClock::default();
        let limiter = production_limiter(&clock);

        for _ in 0..30 {
            limiter.check(ip(1)).unwrap();
        }
        assert!(limiter.check(ip(1)).is_err());
        assert!(limiter.check(ip(2)).is_ok());
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn budget_returns_after_window() {
        let clock = FakeRelativeClock::default();
        let limiter = production_limiter(&clock);

        for _ in 0..30 {
            limiter.check(ip(1)).unwrap();
        }
        assert!(limiter.check(ip(1)).is_err());

        clock.advance(Duration::from_secs(30));
        for _ in 0..30 {
            assert!(limiter.check(ip(1)).is_ok());
        }
        assert!(limiter.check(ip(1)).is_err());
    }

    #[test]
    fn prune_drops_idle_clients() {
        let clock = FakeRelativeClock::default();
        let limiter = production_limiter(&clock);

        limiter.check(ip(1)).unwrap();
        clock.advance(Duration::from_secs(20));
        limiter.check(ip(2)).unwrap();
        clock.advance(Duration::from_secs(15));
        limiter.prune();

        assert_eq!(limiter.tracked_clients(), 1);
        clock.advance(Duration::from_secs(30));
        limiter.prune();
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn wait_rounds_up() {
        assert_eq!(whole_seconds(Duration::ZERO), 1);
        assert_eq!(whole_seconds(Duration::from_millis(1500)), 2);
        assert_eq!(whole_seconds(Duration::from_secs(3)), 3);
    }
}
