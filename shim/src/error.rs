/// Errors raised while exercising the framing codec (§4.1) or while decoding
/// what came off the wire. These are the only errors that the event loop
/// turns into a task retirement rather than a log line.
#[derive(Debug, thiserror::Error)]
pub enum Disconnect {
    #[error("closed connection")]
    ClosedConnection,
    #[error("did not arrive all at once")]
    PartialFrame,
    #[error("could not deserialize input")]
    BadInput,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Disconnect {
    pub fn is_clean_close(&self) -> bool {
        matches!(self, Disconnect::ClosedConnection)
    }
}

/// Errors that can only happen during process setup (bind/listen) and that
/// therefore propagate and abort startup, per the "fatal" row of §7's error
/// taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("failed to bind peer datagram socket on {addr}: {source}")]
    PeerBind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to bind client listener on {addr}: {source}")]
    ClientListenerBind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("cluster map is not bijective: {0}")]
    NotBijective(String),
    #[error("local name {0} is not present in the cluster map")]
    MissingSelf(String),
}

pub type SetupResult<T> = Result<T, SetupError>;
