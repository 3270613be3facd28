use std::{cell::Cell, cell::RefCell, rc::Rc, sync::Arc};

use log::warn;

use crate::{
    descriptor::{Descriptor, ObjectId, Op},
    group::{Members, WorkerGroup},
    registry::{ProxyDef, Registry},
    value, Error, Reduce, Value,
};

/// Controller-side handle on the worker group. Issues every dispatch
/// round and owns the object id space.
pub struct Controller {
    group: Rc<RefCell<WorkerGroup>>,
    registry: Arc<Registry>,
    size: usize,
    next_id: usize,
}
impl Controller {
    pub(crate) fn new(group: WorkerGroup, registry: Arc<Registry>) -> Self {
        let size = group.size();
        Self {
            group: Rc::new(RefCell::new(group)),
            registry,
            size,
            next_id: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }
    /// Declare a proxy class, validated eagerly against the registry
    pub fn define(
        &self,
        class: &str,
        calls: &[&str],
        properties: &[&str],
    ) -> Result<ProxyDef, Error> {
        self.registry.define(class, calls, properties)
    }
    /// All ranks of the group
    pub fn all(&self) -> Members {
        self.members(|_| true)
    }
    /// The ranks satisfying `pred`, evaluated once at this call
    pub fn members(&self, pred: impl Fn(usize) -> bool) -> Members {
        Members::from_predicate(self.size, pred)
    }

    /// Construct one local object per member rank in a single broadcast
    /// round. All-or-nothing: if any rank fails, instances already built
    /// elsewhere are torn down before the error is returned.
    pub fn create(
        &mut self,
        def: &ProxyDef,
        args: Vec<Value>,
        members: Members,
    ) -> Result<Proxy, Error> {
        assert!(
            !members.is_empty(),
            "An object should live on at least one rank"
        );
        let id = ObjectId(self.next_id);
        self.next_id += 1;

        let descriptor = Descriptor {
            object: id,
            op: Op::Create {
                class: def.class.into(),
                args,
            },
        };
        let results = self.group.borrow_mut().broadcast(descriptor, &members)?;

        let mut created = Vec::with_capacity(results.len());
        let mut failed: Option<(usize, Error)> = None;
        for (rank, result) in results {
            match result {
                Ok(_) => created.push(rank),
                Err(e) => {
                    if failed.is_none() {
                        failed = Some((rank, e));
                    }
                }
            }
        }

        if let Some((rank, reason)) = failed {
            let rollback = Members::from_ranks(created);
            if !rollback.is_empty() {
                let destroy = Descriptor {
                    object: id,
                    op: Op::Destroy,
                };
                if self.group.borrow_mut().broadcast(destroy, &rollback).is_err() {
                    warn!("rollback of object {} did not reach all ranks", id);
                }
            }
            return Err(Error::Construction {
                class: def.class.into(),
                rank,
                reason: reason.to_string(),
            });
        }

        Ok(Proxy {
            group: Rc::clone(&self.group),
            id,
            def: def.clone(),
            members,
            poisoned: Cell::new(false),
        })
    }

    pub(crate) fn shutdown(&mut self) {
        self.group.borrow_mut().shutdown();
    }
}

/// Controller-side mirror of one local object per member rank. Never
/// computes anything itself; every declared call or property access is
/// one synchronized round over the member ranks.
pub struct Proxy {
    group: Rc<RefCell<WorkerGroup>>,
    id: ObjectId,
    def: ProxyDef,
    members: Members,
    poisoned: Cell<bool>,
}
impl Proxy {
    pub fn members(&self) -> &Members {
        &self.members
    }

    /// Invoke a declared call on every member rank and reduce the results
    /// under the call's declared policy
    pub fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, Error> {
        let spec = *self
            .def
            .call_spec(method)
            .ok_or_else(|| Error::wiring(self.def.class, method))?;
        let descriptor = Descriptor {
            object: self.id,
            op: Op::Call {
                method: method.into(),
                args,
            },
        };
        let results = self.dispatch(descriptor, method)?;
        value::reduce(results, spec.reduce)
    }

    /// Read a declared property; the lowest member rank is authoritative
    pub fn get(&self, prop: &str) -> Result<Value, Error> {
        self.check_property(prop)?;
        let descriptor = Descriptor {
            object: self.id,
            op: Op::Get { prop: prop.into() },
        };
        let results = self.dispatch(descriptor, prop)?;
        value::reduce(results, Reduce::RankZero)
    }

    /// Write a declared property. The new value reaches every member rank
    /// so local state stays in lockstep everywhere.
    pub fn set(&self, prop: &str, value: Value) -> Result<(), Error> {
        self.check_property(prop)?;
        let descriptor = Descriptor {
            object: self.id,
            op: Op::Set {
                prop: prop.into(),
                value,
            },
        };
        self.dispatch(descriptor, prop)?;
        Ok(())
    }

    fn check_property(&self, prop: &str) -> Result<(), Error> {
        if self.def.has_property(prop) {
            Ok(())
        } else {
            Err(Error::wiring(self.def.class, prop))
        }
    }

    /// One blocking round over the member ranks. Any per-rank failure
    /// poisons the proxy; worker replicas may have diverged, so further
    /// rounds on this object are refused.
    fn dispatch(&self, descriptor: Descriptor, what: &str) -> Result<Vec<(usize, Value)>, Error> {
        if self.poisoned.get() {
            return Err(Error::PoisonedProxy);
        }
        let results = match self.group.borrow_mut().broadcast(descriptor, &self.members) {
            Ok(results) => results,
            Err(e) => {
                self.poisoned.set(true);
                return Err(e);
            }
        };
        let mut values = Vec::with_capacity(results.len());
        for (rank, result) in results {
            match result {
                Ok(v) => values.push((rank, v)),
                Err(reason) => {
                    self.poisoned.set(true);
                    return Err(Error::Dispatch {
                        method: what.into(),
                        rank,
                        reason: reason.to_string(),
                    });
                }
            }
        }
        Ok(values)
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        // Local objects of one proxy go away together. Teardown is
        // best-effort; a group that is already gone only gets a warning.
        let destroy = Descriptor {
            object: self.id,
            op: Op::Destroy,
        };
        match self.group.try_borrow_mut() {
            Ok(mut group) => {
                if group.broadcast(destroy, &self.members).is_err() {
                    warn!("destroy of object {} did not reach all ranks", self.id);
                }
            }
            Err(_) => warn!("destroy of object {} skipped, group is busy", self.id),
        }
    }
}
