//! The arrangement contract (§6.1): the opaque, verified handler that the
//! rest of this crate hosts. Everything in this module is a pure
//! input-to-output transition signature; none of it knows about sockets.

use std::fmt::Debug;
use std::hash::Hash;

/// One handler invocation's output: a batch of client outputs, the
/// handler's new state, and a batch of messages to forward to peers.
#[derive(Debug)]
pub struct HandlerResult<A: Arrangement> {
    pub outputs: Vec<A::Output>,
    pub state: A::State,
    pub sends: Vec<(A::Name, A::Msg)>,
}

impl<A: Arrangement> HandlerResult<A> {
    pub fn new(state: A::State) -> Self {
        Self {
            outputs: Vec::new(),
            state,
            sends: Vec::new(),
        }
    }

    pub fn with_outputs(mut self, outputs: Vec<A::Output>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_sends(mut self, sends: Vec<(A::Name, A::Msg)>) -> Self {
        self.sends = sends;
        self
    }
}

/// A periodic callback pair (§4.6): `handler` produces the next state (and
/// any outputs/sends) and `interval` says, given the *post*-dispatch state,
/// how long to wait before firing again. Plain function pointers, since the
/// arrangement's `State` is assumed to carry everything the callback needs —
/// there is no closure environment to capture.
pub struct TimeoutTask<A: Arrangement> {
    pub name: &'static str,
    pub handler: fn(&A::Name, A::State) -> HandlerResult<A>,
    pub interval: fn(&A::Name, &A::State) -> f64,
}

/// The contract a verified handler must satisfy to be hosted by this shim.
/// One implementor is a complete distributed node; see `shim-stub` for a
/// minimal one used by this crate's own tests.
pub trait Arrangement: Sized {
    type Name: Eq + Hash + Clone + Debug + Send + Sync + 'static;
    type State: Send + 'static;
    type Input: Send + 'static;
    type Output: Send + 'static;
    type Msg: Send + 'static;
    type ClientId: Eq + Hash + Clone + Debug + Send + Sync + 'static;

    fn init(&self, me: &Self::Name) -> Self::State;

    #[must_use]
    fn on_input(
        &self,
        me: &Self::Name,
        input: Self::Input,
        state: Self::State,
    ) -> HandlerResult<Self>;

    #[must_use]
    fn on_peer(
        &self,
        me: &Self::Name,
        src: Self::Name,
        msg: Self::Msg,
        state: Self::State,
    ) -> HandlerResult<Self>;

    fn serialize_msg(&self, msg: &Self::Msg) -> Vec<u8>;
    fn deserialize_msg(&self, bytes: &[u8]) -> Self::Msg;

    fn deserialize_input(
        &self,
        bytes: &[u8],
        client_id: &Self::ClientId,
    ) -> Option<Self::Input>;
    fn serialize_output(&self, output: Self::Output) -> (Self::ClientId, Vec<u8>);

    fn serialize_name(&self, name: &Self::Name) -> String;
    fn deserialize_name(&self, s: &str) -> Option<Self::Name>;

    fn create_client_id(&self) -> Self::ClientId;
    fn serialize_client_id(&self, id: &Self::ClientId) -> String;

    /// Periodic tasks to install at startup (§4.6). Empty for handlers that
    /// don't need timers.
    fn timeout_tasks(&self) -> Vec<TimeoutTask<Self>> {
        Vec::new()
    }

    /// Whether the arrangement's debug hooks below should be consulted.
    /// Defaults to off.
    fn debug(&self) -> bool {
        false
    }

    /// Pure observer, invoked when `debug()` is true, just before an input is
    /// handed to `on_input`.
    fn debug_input(&self, _input: &Self::Input) {}

    /// Pure observer, invoked when `debug()` is true, just before a peer
    /// message is handed to `on_peer`.
    fn debug_recv(&self, _src: &Self::Name, _msg: &Self::Msg) {}

    /// Pure observer, invoked when `debug()` is true, just before a message
    /// is sent to a peer.
    fn debug_send(&self, _dest: &Self::Name, _msg: &Self::Msg) {}
}
