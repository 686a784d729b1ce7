//! Typed attribute storage with data ids.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;

static NEXT_DATA_ID: AtomicU64 = AtomicU64::new(1);

/// Revision token of one attribute.
///
/// Ids come from a process-wide counter, so two attributes never share an id
/// unless one is a copy of the other that has not been written since.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DataId(u64);

impl DataId {
    /// A fresh id, greater than every id handed out before.
    pub fn next() -> Self {
        Self(NEXT_DATA_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which element an attribute is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttribOwner {
    Point,
    Vertex,
    Primitive,
    Detail,
}

impl fmt::Display for AttribOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttribOwner::Point => "point",
            AttribOwner::Vertex => "vertex",
            AttribOwner::Primitive => "primitive",
            AttribOwner::Detail => "detail",
        };
        f.write_str(name)
    }
}

/// Values of one attribute plus the value new elements start with.
#[derive(Clone, Debug, PartialEq)]
pub struct Values<T> {
    pub values: Vec<T>,
    pub default: T,
}

impl<T: Copy> Values<T> {
    fn resize(&mut self, len: usize) {
        self.values.resize(len, self.default);
    }

    fn fill_default(&mut self) {
        let default = self.default;
        self.values.iter_mut().for_each(|v| *v = default);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AttribData {
    Float(Values<f32>),
    Int(Values<i32>),
    Vector3(Values<Vec3>),
}

impl AttribData {
    pub fn len(&self) -> usize {
        match self {
            AttribData::Float(v) => v.values.len(),
            AttribData::Int(v) => v.values.len(),
            AttribData::Vector3(v) => v.values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn resize(&mut self, len: usize) {
        match self {
            AttribData::Float(v) => v.resize(len),
            AttribData::Int(v) => v.resize(len),
            AttribData::Vector3(v) => v.resize(len),
        }
    }

    pub(crate) fn fill_default(&mut self) {
        match self {
            AttribData::Float(v) => v.fill_default(),
            AttribData::Int(v) => v.fill_default(),
            AttribData::Vector3(v) => v.fill_default(),
        }
    }
}

/// Element types an attribute can hold.
pub trait AttribType: Copy + PartialEq + fmt::Debug + 'static {
    fn values(data: &AttribData) -> Option<&Values<Self>>;
    fn values_mut(data: &mut AttribData) -> Option<&mut Values<Self>>;
    fn wrap(values: Values<Self>) -> AttribData;
}

macro_rules! impl_attrib_type {
    ($ty:ty, $variant:ident) => {
        impl AttribType for $ty {
            fn values(data: &AttribData) -> Option<&Values<Self>> {
                match data {
                    AttribData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn values_mut(data: &mut AttribData) -> Option<&mut Values<Self>> {
                match data {
                    AttribData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn wrap(values: Values<Self>) -> AttribData {
                AttribData::$variant(values)
            }
        }
    };
}

impl_attrib_type!(f32, Float);
impl_attrib_type!(i32, Int);
impl_attrib_type!(Vec3, Vector3);

/// A named attribute.
#[derive(Clone, Debug)]
pub struct Attribute {
    data: AttribData,
    data_id: DataId,
}

impl Attribute {
    pub fn new<T: AttribType>(len: usize, default: T) -> Self {
        Self {
            data: T::wrap(Values {
                values: vec![default; len],
                default,
            }),
            data_id: DataId::next(),
        }
    }

    pub fn data(&self) -> &AttribData {
        &self.data
    }

    pub fn data_id(&self) -> DataId {
        self.data_id
    }

    /// Give the attribute a new data id.
    pub fn bump_data_id(&mut self) {
        self.data_id = DataId::next();
    }

    pub fn values<T: AttribType>(&self) -> Option<&[T]> {
        T::values(&self.data).map(|v| v.values.as_slice())
    }

    /// Write access. Bumps the data id when the type matches.
    pub fn values_mut<T: AttribType>(&mut self) -> Option<&mut [T]> {
        let values = T::values_mut(&mut self.data)?;
        self.data_id = DataId::next();
        Some(values.values.as_mut_slice())
    }

    pub(crate) fn resize(&mut self, len: usize) {
        if self.data.len() != len {
            self.data.resize(len);
            self.bump_data_id();
        }
    }

    pub(crate) fn reset(&mut self, len: usize) {
        self.data.resize(len);
        self.data.fill_default();
        self.bump_data_id();
    }
}
