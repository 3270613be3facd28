use std::sync::mpsc;

use log::debug;

use crate::{descriptor::Descriptor, worker::WorkerState, Error, Value};

/// Identity of one worker within the group
#[derive(Clone, Copy, Debug)]
pub struct WorkerCtx {
    pub rank: usize,
    pub size: usize,
}

/// Subset of ranks participating in one object's lifetime
#[derive(Clone, Debug, PartialEq)]
pub struct Members {
    ranks: Vec<usize>,
}
impl Members {
    pub(crate) fn from_predicate(size: usize, pred: impl Fn(usize) -> bool) -> Self {
        Self {
            ranks: (0..size).filter(|&r| pred(r)).collect(),
        }
    }
    pub(crate) fn from_ranks(mut ranks: Vec<usize>) -> Self {
        ranks.sort_unstable();
        Self { ranks }
    }
    pub fn contains(&self, rank: usize) -> bool {
        self.ranks.contains(&rank)
    }
    pub fn len(&self) -> usize {
        self.ranks.len()
    }
    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
    pub(crate) fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.ranks.iter().copied()
    }
}

/// Controller-to-worker messages
pub(crate) enum C2W {
    Invoke(Descriptor),
    Shutdown,
}
/// Worker-to-controller messages
pub(crate) enum W2C {
    Result(usize, Result<Value, Error>),
}

/// The group communicator: one sender per spawned worker plus a shared
/// return channel. Rank 0 is the controller itself and executes each
/// descriptor inline, so a 1-worker group spawns no threads at all.
pub(crate) struct WorkerGroup {
    rank0: WorkerState,
    senders: Vec<mpsc::Sender<C2W>>,
    receiver: mpsc::Receiver<W2C>,
    size: usize,
    dead: bool,
}
impl WorkerGroup {
    pub fn new(
        rank0: WorkerState,
        senders: Vec<mpsc::Sender<C2W>>,
        receiver: mpsc::Receiver<W2C>,
    ) -> Self {
        let size = senders.len() + 1;
        Self {
            rank0,
            senders,
            receiver,
            size,
            dead: false,
        }
    }
    pub fn size(&self) -> usize {
        self.size
    }

    /// One synchronous dispatch round. The identical descriptor reaches
    /// every remote member before any result is collected, then the call
    /// blocks until one result per member has arrived. `&mut self` keeps
    /// rounds single-flight: no two descriptors on the wire at once.
    ///
    /// A disconnect kills the whole group: an aborted round may leave
    /// replies from ranks that did receive the descriptor sitting in the
    /// return channel, and a later round must never collect those as its
    /// own. Every round checks the flag on entry.
    pub fn broadcast(
        &mut self,
        descriptor: Descriptor,
        members: &Members,
    ) -> Result<Vec<(usize, Result<Value, Error>)>, Error> {
        if self.dead {
            return Err(Error::Disconnect);
        }
        debug!(
            "dispatch `{}` on object {} across {} ranks",
            descriptor.op.label(),
            descriptor.object,
            members.len()
        );

        let mut remote = 0;
        for rank in members.iter().filter(|&r| r != 0) {
            if self.senders[rank - 1]
                .send(C2W::Invoke(descriptor.clone()))
                .is_err()
            {
                self.dead = true;
                return Err(Error::Disconnect);
            }
            remote += 1;
        }

        let mut results = Vec::with_capacity(members.len());
        if members.contains(0) {
            results.push((0, self.rank0.execute(&descriptor)));
        }
        for _ in 0..remote {
            match self.receiver.recv() {
                Ok(W2C::Result(rank, result)) => results.push((rank, result)),
                Err(_) => {
                    self.dead = true;
                    return Err(Error::Disconnect);
                }
            }
        }
        results.sort_by_key(|(rank, _)| *rank);
        Ok(results)
    }

    pub fn shutdown(&mut self) {
        for sender in &self.senders {
            let _ = sender.send(C2W::Shutdown);
        }
    }
}
