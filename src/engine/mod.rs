//! Demonstration local classes driving the dispatch core. Their geometry
//! is deliberately naive; the point is the proxy contract, not the physics.

mod pressure_layers;
mod verlet_list;

pub use pressure_layers::PressureTensorLayers;
pub use verlet_list::VerletList;

use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::Error;

/// Uniform positions in a cubic box of the given side, with velocities
/// drawn from a Maxwell-Boltzmann distribution at `temperature`.
/// Deterministic for a fixed seed.
pub fn random_configuration(
    num_atoms: usize,
    side: f64,
    temperature: f64,
    mass: f64,
    seed: u64,
) -> Result<(Vec<[f64; 3]>, Vec<[f64; 3]>), Error> {
    if side <= 0.0 || temperature < 0.0 || mass <= 0.0 {
        return Err(Error::bad_argument(format!(
            "invalid configuration: side {}, temperature {}, mass {}",
            side, temperature, mass
        )));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let sigma = (temperature / mass).sqrt();
    let normal = Normal::new(0.0, sigma).map_err(|e| Error::bad_argument(e.to_string()))?;

    let positions = (0..num_atoms)
        .map(|_| {
            [
                rng.gen_range(0.0..side),
                rng.gen_range(0.0..side),
                rng.gen_range(0.0..side),
            ]
        })
        .collect();
    let velocities = (0..num_atoms)
        .map(|_| {
            [
                normal.sample(&mut rng),
                normal.sample(&mut rng),
                normal.sample(&mut rng),
            ]
        })
        .collect();
    Ok((positions, velocities))
}

pub(crate) fn distance_sq(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let [dx, dy, dz] = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
    dx * dx + dy * dy + dz * dz
}
