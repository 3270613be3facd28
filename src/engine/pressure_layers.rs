use crate::{
    group::WorkerCtx,
    registry::{CallSpec, LocalClass, LocalObject},
    Error, Reduce, Value,
};

/// Kinetic pressure-tensor analysis over `n` horizontal layers.
///
/// Layers are perpendicular to z and equidistant (thickness `lz / n`).
/// `compute` accumulates `m * v_a * v_b` for the atoms each rank owns
/// (striped by index, as in `VerletList`) and sum-reduces the per-rank
/// tensors into `6 * n` global components `[xx, yy, zz, xy, xz, yz]` per
/// layer. `perform_measurement` feeds running statistics in the manner of
/// the analysis base class: measure, `get_average_value` (per layer the
/// six averages followed by their six standard deviations), `reset`.
/// Statistics run over the full configuration on every rank — the data is
/// replicated, so the replicas stay identical and a rank-zero read of the
/// average is exact; the per-rank stripes cannot recover the variance of
/// the global tensor, their cross terms are lost in a sum reduction.
pub struct PressureTensorLayers {
    lz: f64,
    n: usize,
    dh: f64,
    positions: Vec<[f64; 3]>,
    velocities: Vec<[f64; 3]>,
    masses: Vec<f64>,
    rank: usize,
    size: usize,
    mean: Vec<f64>,
    m2: Vec<f64>,
    num_measurements: usize,
}
impl PressureTensorLayers {
    fn tensor(&self, offset: usize, stride: usize) -> Vec<f64> {
        let mut tensor = vec![0.0; 6 * self.n];
        let layer_height = self.lz / self.n as f64;
        for i in (offset..self.positions.len()).step_by(stride) {
            let z = self.positions[i][2];
            let layer = ((z / layer_height) as usize).min(self.n - 1);
            let m = self.masses[i];
            let [vx, vy, vz] = self.velocities[i];
            let base = 6 * layer;
            tensor[base] += m * vx * vx;
            tensor[base + 1] += m * vy * vy;
            tensor[base + 2] += m * vz * vz;
            tensor[base + 3] += m * vx * vy;
            tensor[base + 4] += m * vx * vz;
            tensor[base + 5] += m * vy * vz;
        }
        tensor
    }

    // Welford update over the global tensor
    fn measure(&mut self) {
        let tensor = self.tensor(0, 1);
        self.num_measurements += 1;
        let count = self.num_measurements as f64;
        for ((mean, m2), t) in self.mean.iter_mut().zip(self.m2.iter_mut()).zip(tensor) {
            let delta = t - *mean;
            *mean += delta / count;
            *m2 += delta * (t - *mean);
        }
    }

    fn average_value(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(12 * self.n);
        for layer in 0..self.n {
            let base = 6 * layer;
            out.extend_from_slice(&self.mean[base..base + 6]);
            for component in base..base + 6 {
                let deviation = if self.num_measurements > 1 {
                    (self.m2[component] / (self.num_measurements - 1) as f64).sqrt()
                } else {
                    0.0
                };
                out.push(deviation);
            }
        }
        out
    }

    fn reset(&mut self) {
        self.mean = vec![0.0; 6 * self.n];
        self.m2 = vec![0.0; 6 * self.n];
        self.num_measurements = 0;
    }
}

impl LocalClass for PressureTensorLayers {
    const NAME: &'static str = "PressureTensorLayers";
    const CALLS: &'static [CallSpec] = &[
        CallSpec {
            name: "compute",
            reduce: Reduce::Sum,
        },
        CallSpec {
            name: "perform_measurement",
            reduce: Reduce::RankZero,
        },
        CallSpec {
            name: "get_average_value",
            reduce: Reduce::RankZero,
        },
        CallSpec {
            name: "get_number_of_measurements",
            reduce: Reduce::RankZero,
        },
        CallSpec {
            name: "reset",
            reduce: Reduce::RankZero,
        },
    ];
    const PROPERTIES: &'static [&'static str] = &["n", "dh"];

    fn construct(ctx: &WorkerCtx, args: &[Value]) -> Result<Self, Error> {
        let lz = match args.first() {
            Some(Value::Float(v)) => *v,
            _ => return Err(Error::bad_argument("PressureTensorLayers expects lz")),
        };
        let n = match args.get(1) {
            Some(Value::Usize(v)) => *v,
            _ => return Err(Error::bad_argument("PressureTensorLayers expects n layers")),
        };
        let dh = match args.get(2) {
            Some(Value::Float(v)) => *v,
            _ => return Err(Error::bad_argument("PressureTensorLayers expects dh")),
        };
        let positions = match args.get(3) {
            Some(Value::Float3(v)) => v.clone(),
            _ => return Err(Error::bad_argument("PressureTensorLayers expects positions")),
        };
        let velocities = match args.get(4) {
            Some(Value::Float3(v)) => v.clone(),
            _ => {
                return Err(Error::bad_argument(
                    "PressureTensorLayers expects velocities",
                ))
            }
        };
        let masses = match args.get(5) {
            Some(Value::Floats(v)) => v.clone(),
            _ => return Err(Error::bad_argument("PressureTensorLayers expects masses")),
        };
        if lz <= 0.0 || n == 0 {
            return Err(Error::bad_argument(format!(
                "Box height and layer count should be positive, found {} and {}",
                lz, n
            )));
        }
        if velocities.len() != positions.len() || masses.len() != positions.len() {
            return Err(Error::bad_argument(
                "positions, velocities and masses should have equal lengths",
            ));
        }
        Ok(Self {
            lz,
            n,
            dh,
            positions,
            velocities,
            masses,
            rank: ctx.rank,
            size: ctx.size,
            mean: vec![0.0; 6 * n],
            m2: vec![0.0; 6 * n],
            num_measurements: 0,
        })
    }
}

impl LocalObject for PressureTensorLayers {
    fn call(&mut self, method: &str, _args: &[Value], _ctx: &WorkerCtx) -> Result<Value, Error> {
        match method {
            "compute" => Ok(Value::Floats(self.tensor(self.rank, self.size))),
            "perform_measurement" => {
                self.measure();
                Ok(Value::None)
            }
            "get_average_value" => Ok(Value::Floats(self.average_value())),
            "get_number_of_measurements" => Ok(Value::Usize(self.num_measurements)),
            "reset" => {
                self.reset();
                Ok(Value::None)
            }
            _ => Err(Error::wiring(Self::NAME, method)),
        }
    }
    fn get(&self, prop: &str) -> Result<Value, Error> {
        match prop {
            "n" => Ok(Value::Usize(self.n)),
            "dh" => Ok(Value::Float(self.dh)),
            _ => Err(Error::wiring(Self::NAME, prop)),
        }
    }
    fn set(&mut self, prop: &str, value: &Value) -> Result<(), Error> {
        match prop {
            // Changing the layer count invalidates the running average
            "n" => {
                let n = value.as_usize()?;
                if n == 0 {
                    return Err(Error::bad_argument("Layer count should be positive"));
                }
                self.n = n;
                self.reset();
                Ok(())
            }
            "dh" => {
                self.dh = value.as_float()?;
                Ok(())
            }
            _ => Err(Error::wiring(Self::NAME, prop)),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn args() -> Vec<Value> {
        // Two atoms: one in the lower layer, one in the upper
        Vec::from([
            Value::Float(2.0),
            Value::Usize(2),
            Value::Float(0.1),
            Value::Float3(vec![[0.0, 0.0, 0.5], [0.0, 0.0, 1.5]]),
            Value::Float3(vec![[1.0, 0.0, 0.0], [0.0, 2.0, 0.0]]),
            Value::Floats(vec![1.0, 3.0]),
        ])
    }

    #[test]
    fn layers_collect_their_own_atoms() {
        let ctx = WorkerCtx { rank: 0, size: 1 };
        let mut pt = PressureTensorLayers::construct(&ctx, &args()).unwrap();
        let tensor = match pt.call("compute", &[], &ctx).unwrap() {
            Value::Floats(t) => t,
            _ => panic!("compute should return Floats"),
        };
        assert_eq!(tensor.len(), 12);
        // layer 0: m=1, vx=1 -> xx = 1
        assert_relative_eq!(tensor[0], 1.0);
        // layer 1: m=3, vy=2 -> yy = 12
        assert_relative_eq!(tensor[7], 12.0);
    }

    #[test]
    fn measurements_average_and_reset() {
        let ctx = WorkerCtx { rank: 0, size: 1 };
        let mut pt = PressureTensorLayers::construct(&ctx, &args()).unwrap();
        pt.call("perform_measurement", &[], &ctx).unwrap();
        pt.call("perform_measurement", &[], &ctx).unwrap();
        assert_eq!(
            pt.call("get_number_of_measurements", &[], &ctx).unwrap(),
            Value::Usize(2)
        );
        let average = match pt.call("get_average_value", &[], &ctx).unwrap() {
            Value::Floats(t) => t,
            _ => panic!("average should return Floats"),
        };
        // 12 per layer: six averages, then their six deviations
        assert_eq!(average.len(), 24);
        assert_relative_eq!(average[0], 1.0);
        assert_relative_eq!(average[6], 0.0);

        pt.call("reset", &[], &ctx).unwrap();
        assert_eq!(
            pt.call("get_number_of_measurements", &[], &ctx).unwrap(),
            Value::Usize(0)
        );
    }

    #[test]
    fn standard_deviation_tracks_the_spread() {
        let ctx = WorkerCtx { rank: 0, size: 1 };
        let mut pt = PressureTensorLayers::construct(&ctx, &args()).unwrap();
        pt.call("perform_measurement", &[], &ctx).unwrap();
        // layer 0 xx jumps from 1 to 9 between the two measurements
        pt.velocities[0] = [3.0, 0.0, 0.0];
        pt.call("perform_measurement", &[], &ctx).unwrap();

        let average = match pt.call("get_average_value", &[], &ctx).unwrap() {
            Value::Floats(t) => t,
            _ => panic!("average should return Floats"),
        };
        assert_relative_eq!(average[0], 5.0);
        // sample deviation of {1, 9}
        assert_relative_eq!(average[6], 32.0_f64.sqrt());
    }

    #[test]
    fn setting_n_resizes_and_resets() {
        let ctx = WorkerCtx { rank: 0, size: 1 };
        let mut pt = PressureTensorLayers::construct(&ctx, &args()).unwrap();
        pt.call("perform_measurement", &[], &ctx).unwrap();
        pt.set("n", &Value::Usize(4)).unwrap();
        assert_eq!(pt.get("n").unwrap(), Value::Usize(4));
        assert_eq!(
            pt.call("get_number_of_measurements", &[], &ctx).unwrap(),
            Value::Usize(0)
        );
    }
}
