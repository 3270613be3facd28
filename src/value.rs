use crate::Error;

/// Dynamic payload carried in invocation descriptors and results
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    None,
    Usize(usize),
    Float(f64),
    Floats(Vec<f64>),
    Float3(Vec<[f64; 3]>),
}
impl Value {
    pub fn as_float(&self) -> Result<f64, Error> {
        match self {
            Value::Float(v) => Ok(*v),
            _ => Err(Error::bad_argument(format!("expected Float, found {:?}", self))),
        }
    }
    pub fn as_usize(&self) -> Result<usize, Error> {
        match self {
            Value::Usize(v) => Ok(*v),
            _ => Err(Error::bad_argument(format!("expected Usize, found {:?}", self))),
        }
    }
    pub fn as_floats(&self) -> Result<&Vec<f64>, Error> {
        match self {
            Value::Floats(v) => Ok(v),
            _ => Err(Error::bad_argument(format!("expected Floats, found {:?}", self))),
        }
    }
    pub fn as_float3(&self) -> Result<&Vec<[f64; 3]>, Error> {
        match self {
            Value::Float3(v) => Ok(v),
            _ => Err(Error::bad_argument(format!("expected Float3, found {:?}", self))),
        }
    }

    pub fn try_add(self, other: Self) -> Result<Self, Error> {
        match (self, other) {
            (Value::None, Value::None) => Ok(Value::None),
            (Value::Usize(i), Value::Usize(j)) => Ok(Value::Usize(i + j)),
            (Value::Float(i), Value::Float(j)) => Ok(Value::Float(i + j)),
            (Value::Floats(x), Value::Floats(y)) => {
                if x.len() != y.len() {
                    return Err(Error::ReduceMismatch);
                }
                Ok(Value::Floats(
                    x.iter().zip(y.iter()).map(|(a, b)| a + b).collect(),
                ))
            }
            _ => Err(Error::ReduceMismatch),
        }
    }
    pub fn try_max(self, other: Self) -> Result<Self, Error> {
        match (self, other) {
            (Value::Usize(i), Value::Usize(j)) => Ok(Value::Usize(i.max(j))),
            (Value::Float(i), Value::Float(j)) => Ok(Value::Float(f64::max(i, j))),
            _ => Err(Error::ReduceMismatch),
        }
    }
    pub fn try_min(self, other: Self) -> Result<Self, Error> {
        match (self, other) {
            (Value::Usize(i), Value::Usize(j)) => Ok(Value::Usize(i.min(j))),
            (Value::Float(i), Value::Float(j)) => Ok(Value::Float(f64::min(i, j))),
            _ => Err(Error::ReduceMismatch),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::None => write!(f, "()"),
            Value::Usize(v) => v.fmt(f),
            Value::Float(v) => v.fmt(f),
            Value::Floats(v) => write!(f, "{:?}", v),
            Value::Float3(v) => write!(f, "{:?}", v),
        }
    }
}

/// How per-rank results of one call are combined into the value
/// returned to the controller. Declared per call, never inferred.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Reduce {
    /// Arithmetic sum across all participating ranks (elementwise for `Floats`)
    Sum,
    Max,
    Min,
    /// Value from the lowest participating rank; the rest are discarded
    RankZero,
}

/// Combine per-rank results, ordered by ascending rank, under `policy`.
pub(crate) fn reduce(results: Vec<(usize, Value)>, policy: Reduce) -> Result<Value, Error> {
    let mut values = results.into_iter().map(|(_, v)| v);
    let first = match values.next() {
        Some(v) => v,
        None => return Ok(Value::None),
    };
    match policy {
        Reduce::RankZero => Ok(first),
        Reduce::Sum => values.try_fold(first, Value::try_add),
        Reduce::Max => values.try_fold(first, Value::try_max),
        Reduce::Min => values.try_fold(first, Value::try_min),
    }
}
