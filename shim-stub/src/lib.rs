//! A minimal arrangement used to exercise the shim's own test suite: state
//! is a counter, `Incr` bumps it and acks the new value back to whichever
//! client sent it, `Ping` is an inert peer message. An optional timer mode
//! adds a periodic peer send, for testing the timer task in isolation.

use serde::{Deserialize, Serialize};
use shim::{Arrangement, HandlerResult, TimeoutTask};
use std::sync::atomic::{AtomicU64, Ordering};

/// Wire tag for the sole input variant; any other byte is malformed input.
pub const INCR_TAG: u8 = 1;

/// Encodes the wire form of an `Incr` request, for callers driving the
/// client link directly (e.g. integration tests).
pub fn encode_incr() -> Vec<u8> {
    bincode::serialize(&INCR_TAG).expect("u8 is always serializable")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(u64);

/// Increment the counter; `client` is stamped on by `deserialize_input` so
/// `on_input` can thread it through to the `Ack`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incr {
    pub client: ClientId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub client: ClientId,
    pub value: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Ping;

pub struct Stub {
    next_client_id: AtomicU64,
    debug: bool,
    ping_timer: bool,
}

impl Stub {
    pub fn new() -> Self {
        Self {
            next_client_id: AtomicU64::new(0),
            debug: false,
            ping_timer: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Arms a 0.1s periodic send of `Ping` to peer "B" (§8 scenario S5).
    pub fn with_ping_timer(mut self) -> Self {
        self.ping_timer = true;
        self
    }
}

impl Default for Stub {
    fn default() -> Self {
        Self::new()
    }
}

impl Arrangement for Stub {
    type Name = String;
    type State = i64;
    type Input = Incr;
    type Output = Ack;
    type Msg = Ping;
    type ClientId = ClientId;

    fn init(&self, _me: &Self::Name) -> Self::State {
        0
    }

    fn on_input(&self, _me: &Self::Name, input: Self::Input, state: Self::State) -> HandlerResult<Self> {
        let value = state + 1;
        HandlerResult::new(value).with_outputs(vec![Ack {
            client: input.client,
            value,
        }])
    }

    fn on_peer(&self, _me: &Self::Name, _src: Self::Name, _msg: Self::Msg, state: Self::State) -> HandlerResult<Self> {
        HandlerResult::new(state)
    }

    fn serialize_msg(&self, msg: &Self::Msg) -> Vec<u8> {
        bincode::serialize(msg).expect("Ping is always serializable")
    }

    fn deserialize_msg(&self, bytes: &[u8]) -> Self::Msg {
        // peer datagrams come from cooperating cluster members; a malformed
        // one here means a peer and this node disagree on the wire format.
        bincode::deserialize(bytes).expect("peer message did not match the expected wire format")
    }

    fn deserialize_input(&self, bytes: &[u8], client_id: &Self::ClientId) -> Option<Self::Input> {
        // the only input variant is tagged 1; anything else is malformed.
        match bincode::deserialize::<u8>(bytes) {
            Ok(INCR_TAG) => Some(Incr {
                client: client_id.clone(),
            }),
            _ => None,
        }
    }

    fn serialize_output(&self, output: Self::Output) -> (Self::ClientId, Vec<u8>) {
        let bytes = bincode::serialize(&output.value).expect("i64 is always serializable");
        (output.client, bytes)
    }

    fn serialize_name(&self, name: &Self::Name) -> String {
        name.clone()
    }

    fn deserialize_name(&self, s: &str) -> Option<Self::Name> {
        Some(s.to_string())
    }

    fn create_client_id(&self) -> Self::ClientId {
        ClientId(self.next_client_id.fetch_add(1, Ordering::Relaxed))
    }

    fn serialize_client_id(&self, id: &Self::ClientId) -> String {
        id.0.to_string()
    }

    fn timeout_tasks(&self) -> Vec<TimeoutTask<Self>> {
        if self.ping_timer {
            vec![TimeoutTask {
                name: "ping_b",
                handler: ping_b,
                interval: every_tenth_second,
            }]
        } else {
            Vec::new()
        }
    }

    fn debug(&self) -> bool {
        self.debug
    }

    fn debug_input(&self, input: &Self::Input) {
        tracing::debug!(client = ?input.client, "received input");
    }

    fn debug_recv(&self, src: &Self::Name, _msg: &Self::Msg) {
        tracing::debug!(%src, "received ping");
    }

    fn debug_send(&self, dest: &Self::Name, _msg: &Self::Msg) {
        tracing::debug!(%dest, "sending ping");
    }
}

fn ping_b(_me: &String, state: i64) -> HandlerResult<Stub> {
    HandlerResult::new(state).with_sends(vec![("B".to_string(), Ping)])
}

fn every_tenth_second(_me: &String, _state: &i64) -> f64 {
    0.1
}
