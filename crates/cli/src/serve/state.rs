//! Shared request state: the engine handle, the rate limiter, and the
//! optional API key.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Instant;

use tokio::sync::Mutex;

use signet_engine::DocumentEngine;
use signet_storage::MemoryStore;

use super::RATE_LIMIT_WINDOW_SECS;

/// Fixed-window per-IP rate limiter. One counter per source address,
/// reset when its window elapses; stale addresses are pruned on the way
/// through so the map does not grow without bound.
pub(crate) struct RateLimiter {
    windows: Mutex<HashMap<IpAddr, Window>>,
    pub(crate) max_requests: u64,
}

struct Window {
    count: u64,
    started: Instant,
}

impl RateLimiter {
    pub(crate) fn new(max_requests: u64) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_requests,
        }
    }

    /// Count one request from `ip`. `Err(secs)` means over the limit;
    /// the value is how long until the window resets.
    pub(crate) async fn check(&self, ip: IpAddr) -> Result<(), u64> {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        windows.retain(|addr, w| {
            *addr == ip || now.duration_since(w.started).as_secs() < RATE_LIMIT_WINDOW_SECS
        });

        let window = windows.entry(ip).or_insert(Window {
            count: 0,
            started: now,
        });
        let elapsed = now.duration_since(window.started).as_secs();
        if elapsed >= RATE_LIMIT_WINDOW_SECS {
            window.count = 0;
            window.started = now;
        }

        window.count += 1;
        if window.count > self.max_requests {
            Err(RATE_LIMIT_WINDOW_SECS.saturating_sub(elapsed))
        } else {
            Ok(())
        }
    }
}

pub(crate) struct AppState {
    /// Engine over the in-memory store; the whole document universe for
    /// this server process.
    pub(crate) engine: DocumentEngine<MemoryStore>,
    pub(crate) rate_limiter: RateLimiter,
    /// When set, every endpoint except /health requires this key.
    pub(crate) api_key: Option<String>,
}
