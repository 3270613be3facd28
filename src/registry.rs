use crate::{group::WorkerCtx, Error, Reduce, Value};

/// One remotely invokable method of a local class
#[derive(Clone, Copy, Debug)]
pub struct CallSpec {
    pub name: &'static str,
    pub reduce: Reduce,
}

/// Worker-side computational object, one per (proxy, member rank).
///
/// The `match` on operation names inside each implementation is the
/// dispatch table for that class: it lists exactly the operations a
/// proxy may trigger remotely.
pub trait LocalObject: Send {
    fn call(&mut self, method: &str, args: &[Value], ctx: &WorkerCtx) -> Result<Value, Error>;
    fn get(&self, prop: &str) -> Result<Value, Error>;
    fn set(&mut self, prop: &str, value: &Value) -> Result<(), Error>;
}

/// A local class that proxies can be wired to by name
pub trait LocalClass: LocalObject + Sized + 'static {
    const NAME: &'static str;
    const CALLS: &'static [CallSpec];
    const PROPERTIES: &'static [&'static str];

    /// Build the per-rank instance from the broadcast constructor arguments
    fn construct(ctx: &WorkerCtx, args: &[Value]) -> Result<Self, Error>;
}

type Factory = fn(&WorkerCtx, &[Value]) -> Result<Box<dyn LocalObject>, Error>;

fn make<L: LocalClass>(ctx: &WorkerCtx, args: &[Value]) -> Result<Box<dyn LocalObject>, Error> {
    Ok(Box::new(L::construct(ctx, args)?))
}

pub(crate) struct ClassSpec {
    pub name: &'static str,
    pub calls: &'static [CallSpec],
    pub properties: &'static [&'static str],
    pub factory: Factory,
}

/// Maps local class names to their factories and declared operation tables
pub struct Registry {
    classes: Vec<ClassSpec>,
}
impl Registry {
    pub fn new() -> Self {
        Self {
            classes: Vec::new(),
        }
    }
    pub fn register<L: LocalClass>(&mut self) -> Result<(), Error> {
        if self.spec(L::NAME).is_some() {
            return Err(Error::bad_argument(format!(
                "class `{}` is already registered",
                L::NAME
            )));
        }
        self.classes.push(ClassSpec {
            name: L::NAME,
            calls: L::CALLS,
            properties: L::PROPERTIES,
            factory: make::<L>,
        });
        Ok(())
    }
    pub(crate) fn spec(&self, name: &str) -> Option<&ClassSpec> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Declare a proxy class: which local class it mirrors and which of
    /// that class's calls and properties it exposes. Validation is eager,
    /// a wiring mistake fails here and never at first use.
    pub fn define(
        &self,
        class: &str,
        calls: &[&str],
        properties: &[&str],
    ) -> Result<ProxyDef, Error> {
        let spec = self
            .spec(class)
            .ok_or_else(|| Error::UnknownClass(class.into()))?;

        let mut call_specs = Vec::with_capacity(calls.len());
        for &name in calls {
            let c = spec
                .calls
                .iter()
                .find(|c| c.name == name)
                .ok_or_else(|| Error::wiring(class, name))?;
            call_specs.push(*c);
        }

        let mut props = Vec::with_capacity(properties.len());
        for &name in properties {
            let p = spec
                .properties
                .iter()
                .find(|&&p| p == name)
                .ok_or_else(|| Error::wiring(class, name))?;
            props.push(*p);
        }

        Ok(ProxyDef {
            class: spec.name,
            calls: call_specs,
            properties: props,
        })
    }
}

/// Validated controller-side declaration of a proxy class
#[derive(Clone, Debug)]
pub struct ProxyDef {
    pub(crate) class: &'static str,
    pub(crate) calls: Vec<CallSpec>,
    pub(crate) properties: Vec<&'static str>,
}
impl ProxyDef {
    pub fn class(&self) -> &str {
        self.class
    }
    pub(crate) fn call_spec(&self, name: &str) -> Option<&CallSpec> {
        self.calls.iter().find(|c| c.name == name)
    }
    pub(crate) fn has_property(&self, name: &str) -> bool {
        self.properties.iter().any(|&p| p == name)
    }
}
