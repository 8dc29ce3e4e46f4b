//! Peer datagram handling (§4.4). The datagram socket is a fixed branch of
//! the reactor's select loop rather than a map entry (§9), since there is
//! exactly one of it for the life of the process; this module only holds the
//! constants and the small amount of logic around resolving a sender.

use crate::arrangement::Arrangement;
use crate::cluster::ClusterMap;
use std::net::SocketAddr;

/// Maximum UDP datagram payload this shim will read (§4.4, §6.2).
pub const MAX_DATAGRAM_SIZE: usize = 65536;

/// Resolves a datagram's source address to a configured peer name. Unknown
/// senders resolve to `None` and the datagram is dropped (§6.2, §7).
pub fn resolve_sender<A: Arrangement>(
    cluster: &ClusterMap<A::Name>,
    from: SocketAddr,
) -> Option<A::Name> {
    cluster.name_of(&from).cloned()
}
