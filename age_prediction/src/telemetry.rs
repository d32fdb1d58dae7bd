use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

/// `(start, end, step)` in milliseconds. A single decode plus one CNN pass
/// lands in the first segment; a cold hybrid run on CPU reaches the tail.
const LATENCY_SEGMENTS: &[(u64, u64, u64)] = &[
    (5, 100, 5),
    (100, 500, 25),
    (500, 2000, 100),
    (2000, 10000, 1000),
];

pub struct Metrics {
    request_counter: IntCounterVec,
    prediction_counter: IntCounterVec,
    prediction_duration: HistogramVec,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let request_counter = IntCounterVec::new(
            Opts::new("requests_total", "Total number of requests"),
            &["route"],
        )?;

        let prediction_counter = IntCounterVec::new(
            Opts::new("predictions_total", "Total number of prediction requests"),
            &["model_choice", "outcome"],
        )?;

        let boundaries = latency_buckets(LATENCY_SEGMENTS);

        let prediction_duration = HistogramVec::new(
            HistogramOpts::new(
                "prediction_duration_ms",
                "Duration of prediction operations in milliseconds",
            )
            .buckets(boundaries),
            &["model_choice"],
        )?;

        registry.register(Box::new(request_counter.clone()))?;
        registry.register(Box::new(prediction_counter.clone()))?;
        registry.register(Box::new(prediction_duration.clone()))?;

        Ok(Metrics {
            request_counter,
            prediction_counter,
            prediction_duration,
            registry,
        })
    }

    pub fn record_request(&self, route: &str) {
        self.request_counter.with_label_values(&[route]).inc();
    }

    pub fn record_prediction(&self, model_choice: &str, outcome: &str) {
        self.prediction_counter
            .with_label_values(&[model_choice, outcome])
            .inc();
    }

    pub fn record_prediction_duration(&self, duration_ms: f64, model_choice: &str) {
        self.prediction_duration
            .with_label_values(&[model_choice])
            .observe(duration_ms);
    }
}

/// Expands segments into strictly increasing bucket bounds. Segment ends are
/// inclusive and shared boundaries are emitted once.
fn latency_buckets(segments: &[(u64, u64, u64)]) -> Vec<f64> {
    let mut bounds: Vec<u64> = Vec::new();
    for &(start, end, step) in segments {
        let step = usize::try_from(step.max(1)).unwrap_or(usize::MAX);
        for bound in (start..=end).step_by(step) {
            if bounds.last().is_none_or(|&last| bound > last) {
                bounds.push(bound);
            }
        }
    }
    bounds.into_iter().map(|b| b as f64).collect()
}
