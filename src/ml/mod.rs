pub mod scaler;
pub mod ridge;
pub mod logistic;
pub mod metrics;
pub mod evaluator;

pub use metrics::MetricSummary;
pub use evaluator::BaselineEvaluator;
