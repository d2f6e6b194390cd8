pub mod health;
pub mod latency;
pub mod routes;

pub use health::HealthState;
pub use latency::TierLatency;
pub use routes::{router, ApiState};
