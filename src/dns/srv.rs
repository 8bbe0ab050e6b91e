use std::sync::Arc;
use std::time::Duration;

use hickory_resolver::TokioResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;

use super::resolve::{Resolve, Resolving};
use crate::endpoint::Endpoint;

/// Default [`Resolve`] implementation: looks up SRV records for `name`
/// against the system's configured DNS servers.
pub struct DnsSrvResolver {
    inner: Arc<TokioResolver>,
}

impl DnsSrvResolver {
    /// Builds a resolver from the system's resolv.conf (or platform
    /// equivalent), falling back to a generic default configuration if
    /// the system configuration can't be read.
    pub fn from_system_conf() -> Result<Self, crate::error::BoxError> {
        let builder = match TokioResolver::builder_tokio() {
            Ok(builder) => builder,
            Err(_) => TokioResolver::builder_with_config(
                ResolverConfig::default(),
                TokioConnectionProvider::default(),
            ),
        };
        Ok(DnsSrvResolver {
            inner: Arc::new(builder.build()),
        })
    }

    pub fn new(config: ResolverConfig, opts: ResolverOpts) -> Self {
        let mut builder =
            TokioResolver::builder_with_config(config, TokioConnectionProvider::default());
        *builder.options_mut() = opts;
        DnsSrvResolver {
            inner: Arc::new(builder.build()),
        }
    }
}

impl Resolve for DnsSrvResolver {
    fn resolve(&self, name: &str) -> Resolving {
        let name = name.to_owned();
        let inner = self.inner.clone();
        Box::pin(async move {
            let lookup = inner.srv_lookup(name.as_str()).await?;
            let mut min_ttl: Option<Duration> = None;
            let mut endpoints = Vec::new();
            for record in lookup.as_lookup().record_iter() {
                min_ttl = Some(match min_ttl {
                    Some(cur) => cur.min(Duration::from_secs(record.ttl() as u64)),
                    None => Duration::from_secs(record.ttl() as u64),
                });
            }
            for srv in lookup.iter() {
                let target = srv.target().to_utf8();
                let target = target.trim_end_matches('.').to_owned();
                endpoints.push(Endpoint::new(target, srv.port()));
            }
            Ok((endpoints, min_ttl))
        })
    }
}
