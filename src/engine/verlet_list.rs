use crate::{
    group::WorkerCtx,
    registry::{CallSpec, LocalClass, LocalObject},
    Error, Reduce, Value,
};

use super::distance_sq;

/// Naive cutoff pair list over a rank-striped slice of atoms.
///
/// Rank `r` of a group of size `s` owns the atoms whose index is congruent
/// to `r` mod `s` and holds the pairs `(i, j)`, `i < j`, whose first atom
/// it owns. `total_size` sum-reduces the per-rank counts into the global
/// number of pairs within the cutoff; `max_local_size` and
/// `min_local_size` report the load balance of the striping.
pub struct VerletList {
    positions: Vec<[f64; 3]>,
    cutoff: f64,
    rank: usize,
    size: usize,
    pairs: Vec<[usize; 2]>,
}
impl VerletList {
    fn count(&mut self) {
        let cutoff_sq = self.cutoff * self.cutoff;
        self.pairs.clear();
        for i in (self.rank..self.positions.len()).step_by(self.size) {
            for j in (i + 1)..self.positions.len() {
                if distance_sq(&self.positions[i], &self.positions[j]) < cutoff_sq {
                    self.pairs.push([i, j]);
                }
            }
        }
    }
}

impl LocalClass for VerletList {
    const NAME: &'static str = "VerletList";
    const CALLS: &'static [CallSpec] = &[
        CallSpec {
            name: "total_size",
            reduce: Reduce::Sum,
        },
        CallSpec {
            name: "local_size",
            reduce: Reduce::RankZero,
        },
        CallSpec {
            name: "max_local_size",
            reduce: Reduce::Max,
        },
        CallSpec {
            name: "min_local_size",
            reduce: Reduce::Min,
        },
        CallSpec {
            name: "rebuild",
            reduce: Reduce::RankZero,
        },
    ];
    const PROPERTIES: &'static [&'static str] = &["cutoff"];

    fn construct(ctx: &WorkerCtx, args: &[Value]) -> Result<Self, Error> {
        let positions = match args.first() {
            Some(Value::Float3(p)) => p.clone(),
            _ => return Err(Error::bad_argument("VerletList expects positions")),
        };
        let cutoff = match args.get(1) {
            Some(Value::Float(c)) => *c,
            _ => return Err(Error::bad_argument("VerletList expects a cutoff")),
        };
        if cutoff <= 0.0 {
            return Err(Error::bad_argument(format!(
                "Cutoff should be positive, found {}",
                cutoff
            )));
        }
        let mut list = Self {
            positions,
            cutoff,
            rank: ctx.rank,
            size: ctx.size,
            pairs: Vec::new(),
        };
        list.count();
        Ok(list)
    }
}

impl LocalObject for VerletList {
    fn call(&mut self, method: &str, _args: &[Value], _ctx: &WorkerCtx) -> Result<Value, Error> {
        match method {
            "total_size" | "local_size" | "max_local_size" | "min_local_size" => {
                Ok(Value::Usize(self.pairs.len()))
            }
            "rebuild" => {
                self.count();
                Ok(Value::None)
            }
            _ => Err(Error::wiring(Self::NAME, method)),
        }
    }
    fn get(&self, prop: &str) -> Result<Value, Error> {
        match prop {
            "cutoff" => Ok(Value::Float(self.cutoff)),
            _ => Err(Error::wiring(Self::NAME, prop)),
        }
    }
    fn set(&mut self, prop: &str, value: &Value) -> Result<(), Error> {
        match prop {
            "cutoff" => {
                let cutoff = value.as_float()?;
                if cutoff <= 0.0 {
                    return Err(Error::bad_argument(format!(
                        "Cutoff should be positive, found {}",
                        cutoff
                    )));
                }
                self.cutoff = cutoff;
                self.count();
                Ok(())
            }
            _ => Err(Error::wiring(Self::NAME, prop)),
        }
    }
}
