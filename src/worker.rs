use std::{collections::HashMap, sync::mpsc, sync::Arc};

use log::{debug, warn};

use crate::{
    descriptor::{Descriptor, ObjectId, Op},
    group::{WorkerCtx, C2W, W2C},
    registry::{LocalObject, Registry},
    Error, Value,
};

/// Live local objects held by one rank, indexed by object id.
/// A missing entry is the explicit "not present on this rank" marker.
pub(crate) struct WorkerState {
    ctx: WorkerCtx,
    registry: Arc<Registry>,
    arena: HashMap<ObjectId, Box<dyn LocalObject>>,
}
impl WorkerState {
    pub fn new(ctx: WorkerCtx, registry: Arc<Registry>) -> Self {
        Self {
            ctx,
            registry,
            arena: HashMap::new(),
        }
    }
    pub fn rank(&self) -> usize {
        self.ctx.rank
    }

    /// Execute one descriptor against this rank's arena
    pub fn execute(&mut self, descriptor: &Descriptor) -> Result<Value, Error> {
        let ctx = self.ctx;
        match &descriptor.op {
            Op::Create { class, args } => {
                let spec = self
                    .registry
                    .spec(class)
                    .ok_or_else(|| Error::UnknownClass(class.clone()))?;
                let object = (spec.factory)(&ctx, args)?;
                self.arena.insert(descriptor.object, object);
                Ok(Value::None)
            }
            Op::Call { method, args } => self.object(descriptor.object)?.call(method, args, &ctx),
            Op::Get { prop } => self.object(descriptor.object)?.get(prop),
            Op::Set { prop, value } => {
                self.object(descriptor.object)?.set(prop, value)?;
                Ok(Value::None)
            }
            // Idempotent, so a construction rollback can never fail here
            Op::Destroy => {
                self.arena.remove(&descriptor.object);
                Ok(Value::None)
            }
        }
    }

    fn object(&mut self, id: ObjectId) -> Result<&mut Box<dyn LocalObject>, Error> {
        let rank = self.ctx.rank;
        self.arena.get_mut(&id).ok_or(Error::Membership { rank })
    }
}

/// Channels for communication between one spawned worker and the controller
pub(crate) struct Worker {
    rx: mpsc::Receiver<C2W>,
    tx: mpsc::Sender<W2C>,
    state: WorkerState,
}
impl Worker {
    pub fn new(rx: mpsc::Receiver<C2W>, tx: mpsc::Sender<W2C>, state: WorkerState) -> Self {
        Self { rx, tx, state }
    }

    /// Serve dispatch rounds until shutdown. Every received descriptor is
    /// answered with exactly one result, so the controller's rendezvous
    /// never blocks on this rank.
    pub fn run(&mut self) {
        let rank = self.state.rank();
        debug!("worker {} up", rank);
        loop {
            match self.rx.recv() {
                Ok(C2W::Invoke(descriptor)) => {
                    let result = self.state.execute(&descriptor);
                    if self.tx.send(W2C::Result(rank, result)).is_err() {
                        warn!("worker {} lost the controller, exiting", rank);
                        break;
                    }
                }
                Ok(C2W::Shutdown) | Err(_) => break,
            }
        }
        debug!("worker {} down", rank);
    }
}
