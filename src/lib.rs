pub mod descriptor;
pub mod engine;
pub mod error;
pub mod group;
pub mod pmi;
pub mod proxy;
pub mod registry;
pub mod value;

mod worker;

pub use descriptor::{Descriptor, ObjectId, Op};
pub use error::Error;
pub use group::{Members, WorkerCtx};
pub use pmi::Pmi;
pub use proxy::{Controller, Proxy};
pub use registry::{CallSpec, LocalClass, LocalObject, ProxyDef, Registry};
pub use value::{Reduce, Value};
