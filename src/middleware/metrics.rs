use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashMap;

use super::Middleware;
use crate::dispatcher::HandlerResponse;
use crate::gate::InboundRequest;

/// Middleware for collecting Prometheus-compatible metrics
///
/// Attached to every app. Counters are atomics and the per-status breakdown is a
/// `DashMap`, so recording never takes a global lock.
///
/// Metrics collected:
/// - Total request count
/// - Average latency
/// - Responses per HTTP status
/// - Coroutine stack size
/// - Top-level request count (`/health`, `/metrics`)
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    stack_size: AtomicUsize,
    top_level_requests: AtomicUsize,
    status_counts: DashMap<u16, AtomicU64>,
}

impl Default for MetricsMiddleware {
    fn default() -> Self {
        Self {
            request_count: AtomicUsize::new(0),
            total_latency_ns: AtomicU64::new(0),
            stack_size: AtomicUsize::new(0),
            top_level_requests: AtomicUsize::new(0),
            status_counts: DashMap::new(),
        }
    }
}

impl MetricsMiddleware {
    /// Create a new metrics middleware with all counters initialized to zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the total number of requests processed
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Mean processing time across all requests; zero before the first one.
    #[must_use]
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    /// Number of responses sent with `status`.
    #[must_use]
    pub fn status_count(&self, status: u16) -> u64 {
        self.status_counts
            .get(&status)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Count an infrastructure endpoint served outside the dispatcher.
    pub fn inc_top_level_request(&self) {
        self.top_level_requests.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn top_level_request_count(&self) -> usize {
        self.top_level_requests.load(Ordering::Relaxed)
    }

    /// Prometheus text exposition of every counter.
    #[must_use]
    pub fn render_prometheus(&self) -> String {
        let mut body = format!(
            "# HELP routegate_requests_total Total number of handled requests\n\
             # TYPE routegate_requests_total counter\n\
             routegate_requests_total {}\n\
             # HELP routegate_request_latency_seconds Average request latency in seconds\n\
             # TYPE routegate_request_latency_seconds gauge\n\
             routegate_request_latency_seconds {}\n\
             # HELP routegate_top_level_requests_total Requests served by built-in endpoints\n\
             # TYPE routegate_top_level_requests_total counter\n\
             routegate_top_level_requests_total {}\n\
             # HELP routegate_coroutine_stack_bytes Configured coroutine stack size\n\
             # TYPE routegate_coroutine_stack_bytes gauge\n\
             routegate_coroutine_stack_bytes {}\n\
             # HELP routegate_responses_total Responses by HTTP status\n\
             # TYPE routegate_responses_total counter\n",
            self.request_count(),
            self.average_latency().as_secs_f64(),
            self.top_level_request_count(),
            self.stack_size.load(Ordering::Relaxed),
        );
        let mut statuses: Vec<(u16, u64)> = self
            .status_counts
            .iter()
            .map(|e| (*e.key(), e.value().load(Ordering::Relaxed)))
            .collect();
        statuses.sort_unstable();
        for (status, count) in statuses {
            let _ = writeln!(body, "routegate_responses_total{{status=\"{status}\"}} {count}");
        }
        body
    }
}

impl Middleware for MetricsMiddleware {
    fn before(&self, _req: &InboundRequest) -> Option<HandlerResponse> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn after(&self, _req: &InboundRequest, res: &mut HandlerResponse, latency: Duration) {
        self.total_latency_ns
            .fetch_add(latency.as_nanos() as u64, Ordering::Relaxed);
        self.status_counts
            .entry(res.status)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
        let size = if may::coroutine::is_coroutine() {
            may::coroutine::current().stack_size()
        } else {
            may::config().get_stack_size()
        };
        self.stack_size.store(size, Ordering::Relaxed);
    }
}
