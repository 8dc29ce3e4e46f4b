//! The process-wide runtime context (§3 "Environment") plus the dynamic
//! client task map it owns. Client connections are keyed by `ConnId`, this
//! shim's process-local substitute for a raw file descriptor — see
//! SPEC_FULL.md §9 for why that substitution is faithful to the spec's
//! invariants without needing real descriptors.

use crate::arrangement::Arrangement;
use crate::cluster::ClusterMap;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// This shim's process-local substitute for a raw file descriptor (§9).
pub type ConnId = u64;

/// A live client connection's bookkeeping: the channel the dispatcher writes
/// encoded outputs to, and the reader task's handle (aborted on retire).
struct ClientTask<A: Arrangement> {
    client_id: A::ClientId,
    writer: mpsc::UnboundedSender<Bytes>,
    reader_handle: JoinHandle<()>,
}

pub struct Environment<A: Arrangement> {
    pub cluster: ClusterMap<A::Name>,
    pub peer_sock: UdpSocket,
    pub listen_sock: TcpListener,

    /// `conn_id -> ClientId`, the reverse direction of reads (§3).
    client_in: HashMap<ConnId, A::ClientId>,
    /// `ClientId -> conn_id`, the forward direction of writes (§3).
    client_out: HashMap<A::ClientId, ConnId>,
    /// `conn_id -> Task`, scoped to live client connections (§3).
    tasks: HashMap<ConnId, ClientTask<A>>,

    next_conn_id: ConnId,
    to_retire: Vec<ConnId>,
}

impl<A: Arrangement> Environment<A> {
    pub fn new(cluster: ClusterMap<A::Name>, peer_sock: UdpSocket, listen_sock: TcpListener) -> Self {
        Self {
            cluster,
            peer_sock,
            listen_sock,
            client_in: HashMap::new(),
            client_out: HashMap::new(),
            tasks: HashMap::new(),
            next_conn_id: 0,
            to_retire: Vec::new(),
        }
    }

    pub fn alloc_conn_id(&mut self) -> ConnId {
        let id = self.next_conn_id;
        self.next_conn_id += 1;
        id
    }

    /// Installs a freshly-accepted client task (§4.3).
    pub fn register_client(
        &mut self,
        conn_id: ConnId,
        client_id: A::ClientId,
        writer: mpsc::UnboundedSender<Bytes>,
        reader_handle: JoinHandle<()>,
    ) {
        self.client_in.insert(conn_id, client_id.clone());
        self.client_out.insert(client_id.clone(), conn_id);
        self.tasks.insert(
            conn_id,
            ClientTask {
                client_id,
                writer,
                reader_handle,
            },
        );
    }

    pub fn client_id_of(&self, conn_id: ConnId) -> Option<&A::ClientId> {
        self.client_in.get(&conn_id)
    }

    /// Looks up the write-side channel for a `ClientId`, for the response
    /// dispatcher (§4.7 step 1).
    pub fn writer_for(&self, client_id: &A::ClientId) -> Option<&mpsc::UnboundedSender<Bytes>> {
        let conn_id = self.client_out.get(client_id)?;
        self.tasks.get(conn_id).map(|t| &t.writer)
    }

    /// Marks a client task for retirement; actually finalized at the top of
    /// the next loop iteration via `drain_retirements` (§4.7, §9).
    pub fn retire(&mut self, conn_id: ConnId) {
        if self.tasks.contains_key(&conn_id) {
            self.to_retire.push(conn_id);
        }
    }

    pub fn retire_client(&mut self, client_id: &A::ClientId) {
        if let Some(&conn_id) = self.client_out.get(client_id) {
            self.retire(conn_id);
        }
    }

    /// Drains the to-retire set, removing each task from every map and
    /// aborting its reader. Returns the `ClientId`s that were torn down, for
    /// logging at the call site.
    pub fn drain_retirements(&mut self) -> Vec<A::ClientId> {
        let mut retired = Vec::with_capacity(self.to_retire.len());
        for conn_id in self.to_retire.drain(..) {
            if let Some(task) = self.tasks.remove(&conn_id) {
                self.client_in.remove(&conn_id);
                self.client_out.remove(&task.client_id);
                task.reader_handle.abort();
                retired.push(task.client_id);
            }
        }
        retired
    }

    pub fn has_pending_retirements(&self) -> bool {
        !self.to_retire.is_empty()
    }

    #[cfg(test)]
    pub fn contains_conn(&self, conn_id: ConnId) -> bool {
        self.tasks.contains_key(&conn_id) || self.client_in.contains_key(&conn_id)
    }

    #[cfg(test)]
    pub fn contains_client(&self, client_id: &A::ClientId) -> bool {
        self.client_out.contains_key(client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shim_stub::Stub;

    fn dummy_writer() -> mpsc::UnboundedSender<Bytes> {
        mpsc::unbounded_channel().0
    }

    #[tokio::test]
    async fn register_then_retire_clears_both_maps_and_the_task() {
        let cluster = ClusterMap::new(vec![(
            "A".to_string(),
            "127.0.0.1:9001".parse().unwrap(),
        )])
        .unwrap();
        let peer_sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let listen_sock = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut env: Environment<Stub> = Environment::new(cluster, peer_sock, listen_sock);

        let stub = Stub::new();
        let client_id = stub.create_client_id();
        let conn_id = env.alloc_conn_id();
        let reader_handle = tokio::spawn(async {});
        env.register_client(conn_id, client_id.clone(), dummy_writer(), reader_handle);

        // §8 invariant 1: client_in and client_out are mutual inverses.
        assert!(env.contains_conn(conn_id));
        assert!(env.contains_client(&client_id));
        assert_eq!(env.client_id_of(conn_id), Some(&client_id));
        assert_eq!(env.client_out.get(&client_id), Some(&conn_id));

        env.retire(conn_id);
        // retirement is deferred until drained (§4.7, §9): still present.
        assert!(env.has_pending_retirements());
        assert!(env.contains_conn(conn_id));
        assert!(env.contains_client(&client_id));

        let retired = env.drain_retirements();

        // §8 invariant 3: after finalize, the conn/client appear nowhere.
        assert_eq!(retired, vec![client_id.clone()]);
        assert!(!env.contains_conn(conn_id));
        assert!(!env.contains_client(&client_id));
        assert!(!env.has_pending_retirements());
    }

    #[tokio::test]
    async fn retiring_an_unknown_conn_is_a_no_op() {
        let cluster = ClusterMap::new(vec![(
            "A".to_string(),
            "127.0.0.1:9001".parse().unwrap(),
        )])
        .unwrap();
        let peer_sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let listen_sock = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut env: Environment<Stub> = Environment::new(cluster, peer_sock, listen_sock);

        env.retire(42);
        assert!(!env.has_pending_retirements());
        assert!(env.drain_retirements().is_empty());
    }
}
