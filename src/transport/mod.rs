//! The dispatch stack: per-endpoint breaker-gated transports, the
//! cross-endpoint retry transport, and the hot-swapping updating
//! transport that binds them to a live resolved endpoint set.

mod allowing;
mod base;
mod bundle;
mod retry;
mod updating;

pub use allowing::AllowingTransport;
pub use base::{BaseTransport, HyperBaseTransport, TimeoutTransport};
pub use bundle::{Bundle, BundleFactory};
pub use retry::{
    PoolSuccess, ResponseValidator, RetryConfig, RetryTransport, simple_pool_success,
    simple_response_validator,
};
pub use updating::UpdatingTransport;
