//! Name resolution: turning a symbolic service name into a set of
//! [`Endpoint`](crate::endpoint::Endpoint)s plus a refresh interval.

mod resolve;
#[cfg(feature = "hickory-dns")]
mod srv;

pub use resolve::{Resolve, Resolving};
#[cfg(feature = "hickory-dns")]
pub use srv::DnsSrvResolver;

#[cfg(test)]
pub(crate) use resolve::test_support;
