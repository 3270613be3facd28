use std::sync::atomic::{AtomicUsize, Ordering};

use ::pmi::*;

/// Each rank holds one slot of the broadcast payload plus a per-object
/// call counter and a writable bias.
struct Holder {
    held: f64,
    bias: f64,
    calls: usize,
}

impl LocalClass for Holder {
    const NAME: &'static str = "Holder";
    const CALLS: &'static [CallSpec] = &[
        CallSpec {
            name: "total",
            reduce: Reduce::Sum,
        },
        CallSpec {
            name: "rank_value",
            reduce: Reduce::RankZero,
        },
        CallSpec {
            name: "bump",
            reduce: Reduce::Sum,
        },
        CallSpec {
            name: "calls_seen",
            reduce: Reduce::RankZero,
        },
        CallSpec {
            name: "fail_on_rank",
            reduce: Reduce::Sum,
        },
    ];
    const PROPERTIES: &'static [&'static str] = &["bias"];

    fn construct(ctx: &WorkerCtx, args: &[Value]) -> Result<Self, Error> {
        let loads = args
            .first()
            .ok_or_else(|| Error::bad_argument("Holder expects per-rank loads"))?
            .as_floats()?;
        if loads.len() != ctx.size {
            return Err(Error::bad_argument("Holder expects one load per rank"));
        }
        Ok(Self {
            held: loads[ctx.rank],
            bias: 0.0,
            calls: 0,
        })
    }
}
impl LocalObject for Holder {
    fn call(&mut self, method: &str, args: &[Value], ctx: &WorkerCtx) -> Result<Value, Error> {
        self.calls += 1;
        match method {
            "total" => Ok(Value::Float(self.held + self.bias)),
            "rank_value" => Ok(Value::Float(self.held)),
            "bump" => Ok(Value::Usize(self.calls)),
            "calls_seen" => Ok(Value::Usize(self.calls)),
            "fail_on_rank" => {
                let bad_rank = args
                    .first()
                    .ok_or_else(|| Error::bad_argument("fail_on_rank expects a rank"))?
                    .as_usize()?;
                if ctx.rank == bad_rank {
                    Err(Error::bad_argument("induced failure"))
                } else {
                    Ok(Value::None)
                }
            }
            _ => Err(Error::wiring(Self::NAME, method)),
        }
    }
    fn get(&self, prop: &str) -> Result<Value, Error> {
        match prop {
            "bias" => Ok(Value::Float(self.bias)),
            _ => Err(Error::wiring(Self::NAME, prop)),
        }
    }
    fn set(&mut self, prop: &str, value: &Value) -> Result<(), Error> {
        match prop {
            "bias" => {
                self.bias = value.as_float()?;
                Ok(())
            }
            _ => Err(Error::wiring(Self::NAME, prop)),
        }
    }
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.register::<Holder>().unwrap();
    registry
}

fn holder_def(ctrl: &Controller) -> Result<ProxyDef, Error> {
    ctrl.define(
        "Holder",
        &["total", "rank_value", "bump", "calls_seen", "fail_on_rank"],
        &["bias"],
    )
}

#[test]
fn sum_reduce_is_the_arithmetic_sum() {
    let mut app = Pmi::new(registry());
    app.run(4, |ctrl| {
        let def = holder_def(ctrl)?;
        let loads = Value::Floats(vec![3.0, 5.0, 0.0, 2.0]);
        let proxy = ctrl.create(&def, vec![loads], ctrl.all())?;
        assert_eq!(proxy.call("total", vec![])?, Value::Float(10.0));
        Ok(())
    })
    .unwrap();
}

#[test]
fn one_worker_group_matches_many() {
    // The same global data split across 1 and 4 ranks sums identically
    let mut totals = Vec::new();
    for loads in [vec![10.0], vec![3.0, 5.0, 0.0, 2.0]] {
        let num_workers = loads.len();
        let mut app = Pmi::new(registry());
        let totals = &mut totals;
        app.run(num_workers, move |ctrl| {
            let def = holder_def(ctrl)?;
            let proxy = ctrl.create(&def, vec![Value::Floats(loads)], ctrl.all())?;
            totals.push(proxy.call("total", vec![])?);
            Ok(())
        })
        .unwrap();
    }
    assert_eq!(totals[0], Value::Float(10.0));
    assert_eq!(totals[0], totals[1]);
}

#[test]
fn property_write_reaches_every_rank() {
    let mut app = Pmi::new(registry());
    app.run(3, |ctrl| {
        let def = holder_def(ctrl)?;
        let loads = Value::Floats(vec![1.0, 2.0, 3.0]);
        let proxy = ctrl.create(&def, vec![loads], ctrl.all())?;

        proxy.set("bias", Value::Float(10.0))?;
        assert_eq!(proxy.get("bias")?, Value::Float(10.0));
        // every rank applied the write: sum = (1 + 2 + 3) + 3 * 10
        assert_eq!(proxy.call("total", vec![])?, Value::Float(36.0));
        Ok(())
    })
    .unwrap();
}

#[test]
fn invocations_execute_in_issue_order_everywhere() {
    let mut app = Pmi::new(registry());
    app.run(4, |ctrl| {
        let def = holder_def(ctrl)?;
        let loads = Value::Floats(vec![0.0; 4]);
        let proxy = ctrl.create(&def, vec![loads], ctrl.all())?;

        // Each bump returns the rank's own call count. The second round
        // starts only after the first has finished on every rank, so the
        // sums are exactly 1 * size then 2 * size.
        assert_eq!(proxy.call("bump", vec![])?, Value::Usize(4));
        assert_eq!(proxy.call("bump", vec![])?, Value::Usize(8));
        assert_eq!(proxy.call("calls_seen", vec![])?, Value::Usize(3));
        Ok(())
    })
    .unwrap();
}

#[test]
fn undeclared_names_fail_at_definition_time() {
    let mut app = Pmi::new(registry());
    app.run(2, |ctrl| {
        assert!(matches!(
            ctrl.define("Holder", &["undeclared"], &[]),
            Err(Error::Wiring { .. })
        ));
        assert!(matches!(
            ctrl.define("Nowhere", &[], &[]),
            Err(Error::UnknownClass(_))
        ));

        // a valid definition dispatches fine on first use
        let def = holder_def(ctrl)?;
        let proxy = ctrl.create(&def, vec![Value::Floats(vec![1.0, 1.0])], ctrl.all())?;
        assert_eq!(proxy.call("total", vec![])?, Value::Float(2.0));
        Ok(())
    })
    .unwrap();
}

#[test]
fn calls_outside_the_declared_list_are_wiring_errors() {
    let mut app = Pmi::new(registry());
    app.run(2, |ctrl| {
        let def = ctrl.define("Holder", &["total"], &[])?;
        let proxy = ctrl.create(&def, vec![Value::Floats(vec![0.0, 0.0])], ctrl.all())?;
        assert!(matches!(
            proxy.call("bump", vec![]),
            Err(Error::Wiring { .. })
        ));
        assert!(matches!(
            proxy.get("bias"),
            Err(Error::Wiring { .. })
        ));
        Ok(())
    })
    .unwrap();
}

/// Construction fails on one designated rank; a process-wide counter
/// tracks instances that are still alive. Used by a single test, so the
/// counter sees no traffic from elsewhere.
struct Fragile;

static LIVE_FRAGILES: AtomicUsize = AtomicUsize::new(0);

impl LocalClass for Fragile {
    const NAME: &'static str = "Fragile";
    const CALLS: &'static [CallSpec] = &[CallSpec {
        name: "ping",
        reduce: Reduce::RankZero,
    }];
    const PROPERTIES: &'static [&'static str] = &[];

    fn construct(ctx: &WorkerCtx, args: &[Value]) -> Result<Self, Error> {
        let bad_rank = args
            .first()
            .ok_or_else(|| Error::bad_argument("Fragile expects a rank to fail on"))?
            .as_usize()?;
        if ctx.rank == bad_rank {
            return Err(Error::bad_argument("constructor poisoned on this rank"));
        }
        LIVE_FRAGILES.fetch_add(1, Ordering::SeqCst);
        Ok(Fragile)
    }
}
impl Drop for Fragile {
    fn drop(&mut self) {
        LIVE_FRAGILES.fetch_sub(1, Ordering::SeqCst);
    }
}
impl LocalObject for Fragile {
    fn call(&mut self, method: &str, _: &[Value], _: &WorkerCtx) -> Result<Value, Error> {
        match method {
            "ping" => Ok(Value::None),
            _ => Err(Error::wiring(Self::NAME, method)),
        }
    }
    fn get(&self, prop: &str) -> Result<Value, Error> {
        Err(Error::wiring(Self::NAME, prop))
    }
    fn set(&mut self, prop: &str, _: &Value) -> Result<(), Error> {
        Err(Error::wiring(Self::NAME, prop))
    }
}

#[test]
fn failed_construction_leaves_no_object_anywhere() {
    let mut registry = Registry::new();
    registry.register::<Fragile>().unwrap();
    let mut app = Pmi::new(registry);
    app.run(4, |ctrl| {
        let def = ctrl.define("Fragile", &["ping"], &[])?;
        // rank 2 refuses to construct; the three successes are rolled back
        let result = ctrl.create(&def, vec![Value::Usize(2)], ctrl.all());
        assert!(matches!(result, Err(Error::Construction { rank: 2, .. })));
        assert_eq!(LIVE_FRAGILES.load(Ordering::SeqCst), 0);
        Ok(())
    })
    .unwrap();
}

/// Counts live instances across all ranks. Used by a single test, so the
/// counter sees no traffic from elsewhere.
struct Counted;

static LIVE_COUNTED: AtomicUsize = AtomicUsize::new(0);

impl LocalClass for Counted {
    const NAME: &'static str = "Counted";
    const CALLS: &'static [CallSpec] = &[CallSpec {
        name: "ping",
        reduce: Reduce::RankZero,
    }];
    const PROPERTIES: &'static [&'static str] = &[];

    fn construct(_: &WorkerCtx, _: &[Value]) -> Result<Self, Error> {
        LIVE_COUNTED.fetch_add(1, Ordering::SeqCst);
        Ok(Counted)
    }
}
impl Drop for Counted {
    fn drop(&mut self) {
        LIVE_COUNTED.fetch_sub(1, Ordering::SeqCst);
    }
}
impl LocalObject for Counted {
    fn call(&mut self, method: &str, _: &[Value], _: &WorkerCtx) -> Result<Value, Error> {
        match method {
            "ping" => Ok(Value::None),
            _ => Err(Error::wiring(Self::NAME, method)),
        }
    }
    fn get(&self, prop: &str) -> Result<Value, Error> {
        Err(Error::wiring(Self::NAME, prop))
    }
    fn set(&mut self, prop: &str, _: &Value) -> Result<(), Error> {
        Err(Error::wiring(Self::NAME, prop))
    }
}

#[test]
fn dropping_a_proxy_destroys_every_replica() {
    let mut registry = Registry::new();
    registry.register::<Counted>().unwrap();
    let mut app = Pmi::new(registry);
    app.run(4, |ctrl| {
        let def = ctrl.define("Counted", &["ping"], &[])?;
        let proxy = ctrl.create(&def, vec![], ctrl.all())?;
        assert_eq!(LIVE_COUNTED.load(Ordering::SeqCst), 4);
        proxy.call("ping", vec![])?;

        // the teardown round is synchronous: once drop returns, every
        // rank has removed its replica
        drop(proxy);
        assert_eq!(LIVE_COUNTED.load(Ordering::SeqCst), 0);
        Ok(())
    })
    .unwrap();
}

#[test]
fn membership_subsets_reduce_over_members_only() {
    let mut app = Pmi::new(registry());
    app.run(4, |ctrl| {
        let def = holder_def(ctrl)?;
        let loads = Value::Floats(vec![1.0, 2.0, 4.0, 8.0]);
        let proxy = ctrl.create(&def, vec![loads], ctrl.members(|rank| rank % 2 == 0))?;
        assert_eq!(proxy.members().len(), 2);
        assert_eq!(proxy.call("total", vec![])?, Value::Float(5.0));
        Ok(())
    })
    .unwrap();
}

#[test]
fn a_failed_dispatch_poisons_the_proxy() {
    let mut app = Pmi::new(registry());
    app.run(3, |ctrl| {
        let def = holder_def(ctrl)?;
        let loads = Value::Floats(vec![0.0; 3]);
        let proxy = ctrl.create(&def, vec![loads], ctrl.all())?;

        assert!(matches!(
            proxy.call("fail_on_rank", vec![Value::Usize(1)]),
            Err(Error::Dispatch { rank: 1, .. })
        ));
        assert!(matches!(
            proxy.call("total", vec![]),
            Err(Error::PoisonedProxy)
        ));
        Ok(())
    })
    .unwrap();
}

#[test]
fn controller_errors_propagate_out_of_run() {
    let mut app = Pmi::new(registry());
    let result = app.run(2, |ctrl| {
        ctrl.define("Holder", &["undeclared"], &[])?;
        Ok(())
    });
    assert!(matches!(result, Err(Error::Wiring { .. })));
}
