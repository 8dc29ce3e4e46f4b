use crate::error::{SetupError, SetupResult};
use std::collections::HashMap;
use std::hash::Hash;
use std::net::SocketAddr;

/// A finite, bijective mapping between peer names and the socket address each
/// peer binds for datagram traffic. Static for the lifetime of the process
/// (§3 "Cluster Map").
#[derive(Debug, Clone)]
pub struct ClusterMap<Name> {
    by_name: HashMap<Name, SocketAddr>,
    by_addr: HashMap<SocketAddr, Name>,
}

impl<Name> ClusterMap<Name>
where
    Name: Eq + Hash + Clone + std::fmt::Debug,
{
    /// Builds the map, checking bijectivity: two names must never resolve to
    /// the same address, and (by construction of a `HashMap` key) no name is
    /// repeated.
    pub fn new(entries: Vec<(Name, SocketAddr)>) -> SetupResult<Self> {
        let mut by_name = HashMap::with_capacity(entries.len());
        let mut by_addr = HashMap::with_capacity(entries.len());
        for (name, addr) in entries {
            if let Some(existing) = by_addr.insert(addr, name.clone()) {
                return Err(SetupError::NotBijective(format!(
                    "{addr} is claimed by both {existing:?} and {name:?}"
                )));
            }
            by_name.insert(name, addr);
        }
        Ok(Self { by_name, by_addr })
    }

    pub fn addr_of(&self, name: &Name) -> Option<SocketAddr> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, addr: &SocketAddr) -> Option<&Name> {
        self.by_addr.get(addr)
    }

    pub fn contains(&self, name: &Name) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
