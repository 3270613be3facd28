use crate::Value;

/// Identifies one proxied object across the whole worker group
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId(pub(crate) usize);

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Operation carried by one dispatch round
#[derive(Clone, Debug)]
pub enum Op {
    Create { class: String, args: Vec<Value> },
    Call { method: String, args: Vec<Value> },
    Get { prop: String },
    Set { prop: String, value: Value },
    Destroy,
}
impl Op {
    pub(crate) fn label(&self) -> &str {
        match self {
            Op::Create { .. } => "create",
            Op::Call { method, .. } => method.as_str(),
            Op::Get { prop } => prop.as_str(),
            Op::Set { prop, .. } => prop.as_str(),
            Op::Destroy => "destroy",
        }
    }
}

/// Description of one invocation, identical on every participating rank.
/// Immutable once broadcast.
#[derive(Clone, Debug)]
pub struct Descriptor {
    pub object: ObjectId,
    pub op: Op,
}
