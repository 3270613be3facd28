use ::pmi::engine::{self, PressureTensorLayers, VerletList};
use ::pmi::*;

fn run(ctrl: &mut Controller) -> Result<(), Error> {
    let side = 6.0;
    let (positions, velocities) = engine::random_configuration(200, side, 1.5, 1.0, 7)?;
    let masses = vec![1.0; positions.len()];

    // Pair list mirrored on every rank
    let verlet_def = ctrl.define("VerletList", &["total_size", "rebuild"], &["cutoff"])?;
    let verlet = ctrl.create(
        &verlet_def,
        vec![Value::Float3(positions.clone()), Value::Float(1.2)],
        ctrl.all(),
    )?;
    println!("pairs within 1.2: {}", verlet.call("total_size", vec![])?);

    verlet.set("cutoff", Value::Float(2.0))?;
    verlet.call("rebuild", vec![])?;
    println!("pairs within 2.0: {}", verlet.call("total_size", vec![])?);

    let layers = 4;
    let pt_def = ctrl.define(
        "PressureTensorLayers",
        &[
            "compute",
            "perform_measurement",
            "get_average_value",
            "get_number_of_measurements",
        ],
        &["n", "dh"],
    )?;
    let pt = ctrl.create(
        &pt_def,
        vec![
            Value::Float(side),
            Value::Usize(layers),
            Value::Float(0.1),
            Value::Float3(positions),
            Value::Float3(velocities),
            Value::Floats(masses),
        ],
        ctrl.all(),
    )?;

    for _ in 0..10 {
        pt.call("perform_measurement", vec![])?;
    }
    println!(
        "measurements: {}",
        pt.call("get_number_of_measurements", vec![])?
    );
    if let Value::Floats(average) = pt.call("get_average_value", vec![])? {
        for (i, layer) in average.chunks(12).enumerate() {
            println!("average pressure tensor in layer {}: {:?}", i, &layer[..6]);
            println!("          std deviation in layer {}: {:?}", i, &layer[6..]);
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let mut registry = Registry::new();
    registry.register::<VerletList>().unwrap();
    registry.register::<PressureTensorLayers>().unwrap();

    let mut app = Pmi::new(registry);
    app.run(4, run).unwrap();
}
