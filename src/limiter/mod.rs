//! Rate limiting for upstream requests
//!
//! This module provides:
//! - `SlidingWindow`: request instants within one trailing span
//! - `RateLimiter`: a pair of windows (1 s and 120 s) per scope key
//!
//! Platform-scoped and routing-scoped endpoints use separate key namespaces,
//! see [`RateLimiter::platform_key`] and [`RateLimiter::routing_key`].

#[allow(clippy::module_inception)]
mod limiter;
mod window;

pub use limiter::RateLimiter;
pub use window::SlidingWindow;
