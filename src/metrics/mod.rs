//! Prometheus metrics for the index.
//!
//! Counters and histograms for searches, builds and embedding generation,
//! plus gauges describing the currently published index.

use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // Search metrics
    // ============================================================================

    /// Total number of search requests (semantic and symbol)
    pub static ref SEARCH_REQUESTS: Counter = Counter::with_opts(
        Opts::new(
            "codeindex_search_requests_total",
            "Total number of search requests"
        )
    ).expect("Failed to create SEARCH_REQUESTS counter");

    /// Search request latency in seconds
    pub static ref SEARCH_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "codeindex_search_latency_seconds",
            "Search request latency in seconds"
        ).buckets(vec![0.001, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0])
    ).expect("Failed to create SEARCH_LATENCY histogram");

    /// Number of results returned per search
    pub static ref SEARCH_RESULTS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "codeindex_search_results_count",
            "Number of search results returned per request"
        ).buckets(vec![0.0, 1.0, 5.0, 10.0, 20.0, 50.0])
    ).expect("Failed to create SEARCH_RESULTS histogram");

    // ============================================================================
    // Index metrics
    // ============================================================================

    pub static ref INDEXED_FILES: Gauge = Gauge::with_opts(
        Opts::new(
            "codeindex_indexed_files_total",
            "Files present in the published index"
        )
    ).expect("Failed to create INDEXED_FILES gauge");

    pub static ref INDEXED_SYMBOLS: Gauge = Gauge::with_opts(
        Opts::new(
            "codeindex_indexed_symbols_total",
            "Symbols present in the published index"
        )
    ).expect("Failed to create INDEXED_SYMBOLS gauge");

    pub static ref SKIPPED_FILES: Counter = Counter::with_opts(
        Opts::new(
            "codeindex_skipped_files_total",
            "Files skipped because they could not be read or parsed"
        )
    ).expect("Failed to create SKIPPED_FILES counter");

    /// Full or incremental build duration in seconds
    pub static ref INDEX_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "codeindex_indexing_duration_seconds",
            "Time to build or update the index in seconds"
        ).buckets(vec![0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0])
    ).expect("Failed to create INDEX_LATENCY histogram");

    // ============================================================================
    // Embedding metrics
    // ============================================================================

    pub static ref EMBEDDING_REQUESTS: Counter = Counter::with_opts(
        Opts::new(
            "codeindex_embedding_requests_total",
            "Total embedding generation requests"
        )
    ).expect("Failed to create EMBEDDING_REQUESTS counter");

    pub static ref EMBEDDING_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "codeindex_embedding_latency_seconds",
            "Embedding generation latency in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0])
    ).expect("Failed to create EMBEDDING_LATENCY histogram");

    /// Symbols evicted together with their embeddings
    pub static ref EVICTED_SYMBOLS: Counter = Counter::with_opts(
        Opts::new(
            "codeindex_evicted_symbols_total",
            "Symbols evicted under the memory budget"
        )
    ).expect("Failed to create EVICTED_SYMBOLS counter");
}

/// Register all metrics with the global registry.
///
/// Call once at startup. A second call logs the duplicate registration and
/// leaves the registry as it was.
pub fn register_metrics() {
    let collectors: Vec<(&str, Box<dyn prometheus::core::Collector>)> = vec![
        ("SEARCH_REQUESTS", Box::new(SEARCH_REQUESTS.clone())),
        ("SEARCH_LATENCY", Box::new(SEARCH_LATENCY.clone())),
        ("SEARCH_RESULTS", Box::new(SEARCH_RESULTS.clone())),
        ("INDEXED_FILES", Box::new(INDEXED_FILES.clone())),
        ("INDEXED_SYMBOLS", Box::new(INDEXED_SYMBOLS.clone())),
        ("SKIPPED_FILES", Box::new(SKIPPED_FILES.clone())),
        ("INDEX_LATENCY", Box::new(INDEX_LATENCY.clone())),
        ("EMBEDDING_REQUESTS", Box::new(EMBEDDING_REQUESTS.clone())),
        ("EMBEDDING_LATENCY", Box::new(EMBEDDING_LATENCY.clone())),
        ("EVICTED_SYMBOLS", Box::new(EVICTED_SYMBOLS.clone())),
    ];

    for (name, collector) in collectors {
        if let Err(e) = REGISTRY.register(collector) {
            tracing::debug!("Metric {} not registered: {}", name, e);
        }
    }
}

/// Gather all metrics in the Prometheus text exposition format.
///
/// Returns an empty string if encoding fails.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Metrics contained invalid UTF-8: {}", e);
        String::new()
    })
}

/// Point-in-time metric values for the `status` command.
pub struct MetricSnapshot {
    pub search_requests_total: f64,
    pub search_latency_avg: f64,
    pub search_results_avg: f64,
    pub indexed_files: f64,
    pub indexed_symbols: f64,
    pub skipped_files_total: f64,
    pub embedding_requests_total: f64,
    pub embedding_latency_avg: f64,
    pub evicted_symbols_total: f64,
}

impl MetricSnapshot {
    pub fn capture() -> Self {
        Self {
            search_requests_total: SEARCH_REQUESTS.get(),
            search_latency_avg: histogram_avg(&SEARCH_LATENCY),
            search_results_avg: histogram_avg(&SEARCH_RESULTS),
            indexed_files: INDEXED_FILES.get(),
            indexed_symbols: INDEXED_SYMBOLS.get(),
            skipped_files_total: SKIPPED_FILES.get(),
            embedding_requests_total: EMBEDDING_REQUESTS.get(),
            embedding_latency_avg: histogram_avg(&EMBEDDING_LATENCY),
            evicted_symbols_total: EVICTED_SYMBOLS.get(),
        }
    }
}

fn histogram_avg(histogram: &Histogram) -> f64 {
    let count = histogram.get_sample_count();
    if count == 0 {
        return 0.0;
    }
    histogram.get_sample_sum() / count as f64
}
