//! Composite rate limiting and per-provider circuit breaking (spec §4.7).

mod circuit;
mod composite;
mod operation;
mod sliding_window;
mod token_bucket;

pub use circuit::{CircuitBreaker, CircuitState, FailureKind};
pub use composite::{CompositeLimiter, RateLimitDenied};
pub use operation::Operation;
pub use sliding_window::SlidingWindow;
pub use token_bucket::TokenBucket;
