/// Error types
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown local class `{0}`")]
    UnknownClass(String),
    #[error("`{class}` does not expose `{name}`")]
    Wiring { class: String, name: String },
    #[error("construction of `{class}` failed on rank {rank}: {reason}")]
    Construction {
        class: String,
        rank: usize,
        reason: String,
    },
    #[error("`{method}` failed on rank {rank}: {reason}")]
    Dispatch {
        method: String,
        rank: usize,
        reason: String,
    },
    #[error("object is not live on rank {rank}")]
    Membership { rank: usize },
    #[error("proxy disabled by an earlier dispatch failure")]
    PoisonedProxy,
    #[error("cannot reduce mismatched value types")]
    ReduceMismatch,
    #[error("bad argument: {0}")]
    BadArgument(String),
    #[error("worker group disconnected")]
    Disconnect,
}

impl Error {
    pub fn wiring(class: impl Into<String>, name: impl Into<String>) -> Self {
        Error::Wiring {
            class: class.into(),
            name: name.into(),
        }
    }
    pub fn bad_argument(reason: impl Into<String>) -> Self {
        Error::BadArgument(reason.into())
    }
}
