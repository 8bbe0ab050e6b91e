use std::collections::BTreeSet;
use std::fmt;

/// A single backend endpoint, as yielded by name resolution.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Endpoint {
            host: host.into(),
            port,
        }
    }

    /// The `host:port` form used as both the pool's key and the outbound
    /// authority.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.authority())
    }
}

/// An unordered collection of endpoints, compared by element equality
/// rather than by insertion order.
///
/// Two host sets resolved at different times are considered the same set
/// as long as they contain the same endpoints; the streaming resolver uses
/// this to suppress spurious downstream updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostSet(BTreeSet<Endpoint>);

impl HostSet {
    pub fn new(endpoints: impl IntoIterator<Item = Endpoint>) -> Self {
        HostSet(endpoints.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<Endpoint> {
        self.0.into_iter().collect()
    }

    pub fn as_vec(&self) -> Vec<Endpoint> {
        self.0.iter().cloned().collect()
    }
}

impl FromIterator<Endpoint> for HostSet {
    fn from_iter<T: IntoIterator<Item = Endpoint>>(iter: T) -> Self {
        HostSet(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_sets_compare_by_element_not_order() {
        let a = HostSet::new([Endpoint::new("a", 1), Endpoint::new("b", 2)]);
        let b = HostSet::new([Endpoint::new("b", 2), Endpoint::new("a", 1)]);
        assert_eq!(a, b);
    }

    #[test]
    fn host_sets_differ_on_element_change() {
        let a = HostSet::new([Endpoint::new("a", 1)]);
        let b = HostSet::new([Endpoint::new("a", 2)]);
        assert_ne!(a, b);
    }
}
