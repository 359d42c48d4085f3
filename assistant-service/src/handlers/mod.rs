pub mod flows;
pub mod health;
pub mod metrics;

pub use flows::{analyze_image, chat, summarize_article};
pub use health::health_check;
pub use metrics::metrics_endpoint;
