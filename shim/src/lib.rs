//! Runtime shim that hosts an opaque, verified distributed-system handler
//! (an "arrangement") on real sockets: peer-to-peer datagrams, framed client
//! request/response streams, and periodic timers, all driven by a single-
//! threaded reactor (§2, §5).

pub mod arrangement;
pub mod cluster;
mod dispatch;
mod env;
pub mod error;
pub mod framing;
#[macro_use]
pub mod log;
pub mod reactor;
mod task;

pub use arrangement::{Arrangement, HandlerResult, TimeoutTask};
pub use cluster::ClusterMap;
pub use env::{ConnId, Environment};
pub use error::{Disconnect, SetupError, SetupResult};
pub use reactor::run;
pub use task::client::ReaderEvent;
