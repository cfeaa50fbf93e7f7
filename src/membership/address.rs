use std::collections::BTreeSet;
use std::fmt;
use std::iter::FromIterator;

/// ReplicaAddress is the network address a replica serves its RPCs on, e.g. `127.0.0.1:5001`.
/// It doubles as the replica's identity within a service.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ReplicaAddress(String);

impl ReplicaAddress {
    pub fn new(address: impl Into<String>) -> Self {
        ReplicaAddress(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ReplicaAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReplicaAddress {
    fn from(address: &str) -> Self {
        ReplicaAddress::new(address)
    }
}

/// ReplicaSet is a snapshot of live replicas. Order carries no meaning.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReplicaSet {
    members: BTreeSet<ReplicaAddress>,
}

impl ReplicaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the address was not already present.
    pub fn insert(&mut self, address: ReplicaAddress) -> bool {
        self.members.insert(address)
    }

    pub fn contains(&self, address: &ReplicaAddress) -> bool {
        self.members.contains(address)
    }

    /// Number of replicas, self included. This is the denominator for quorum.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReplicaAddress> {
        self.members.iter()
    }

    /// Every member except `me`.
    pub fn peers_of<'a>(&'a self, me: &'a ReplicaAddress) -> impl Iterator<Item = &'a ReplicaAddress> + 'a {
        self.members.iter().filter(move |address| *address != me)
    }
}

impl FromIterator<ReplicaAddress> for ReplicaSet {
    fn from_iter<I: IntoIterator<Item = ReplicaAddress>>(iter: I) -> Self {
        ReplicaSet {
            members: iter.into_iter().collect(),
        }
    }
}
