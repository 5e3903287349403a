use crate::geometry::Axis;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Neg, Add, Sub, Mul, Div, Display, Serialize, Deserialize)]
#[display(fmt = "({}, {}, {})", x, y, z)]
#[serde(from = "[T; 3]", into = "[T; 3]")]
#[serde(bound(serialize = "T: serde::Serialize + Copy", deserialize = "T: serde::Deserialize<'de>"))]
pub struct Vector<T> {
    pub x: T,
    pub y: T,
    pub z: T,
}

impl<T> Vector<T> {
    pub const fn new(x: T, y: T, z: T) -> Self {
        Self { x, y, z }
    }
}

impl<T: Copy> Vector<T> {
    pub const fn splat(v: T) -> Self {
        Self { x: v, y: v, z: v }
    }

    pub fn component(&self, axis: Axis) -> T {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn with_component(mut self, axis: Axis, value: T) -> Self {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
        self
    }
}

impl<T> From<[T; 3]> for Vector<T> {
    fn from([x, y, z]: [T; 3]) -> Self {
        Self { x, y, z }
    }
}

impl<T> From<Vector<T>> for [T; 3] {
    fn from(v: Vector<T>) -> Self {
        [v.x, v.y, v.z]
    }
}

impl<T> Vector<T>
where
    T: Copy + core::ops::Add<Output = T> + core::ops::Sub<Output = T> + core::ops::Mul<Output = T>,
{
    pub fn dot(self, rhs: Self) -> T {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn norm_sqr(self) -> T {
        self.dot(self)
    }

    pub fn cross(self, rhs: Self) -> Self {
        Self {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
        }
    }
}

impl Vector<f64> {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub fn norm(self) -> f64 {
        self.norm_sqr().sqrt()
    }

    /// self * b + c
    pub fn mul_add(self, b: f64, c: Self) -> Self {
        Self {
            x: self.x.mul_add(b, c.x),
            y: self.y.mul_add(b, c.y),
            z: self.z.mul_add(b, c.z),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Serialized as its `[x, y, z]` components; deserialization rejects
/// vectors that are not unit length.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Deref, Into, Display, Serialize)]
#[serde(transparent)]
#[serde(bound(serialize = "T: serde::Serialize + Copy"))]
pub struct UnitVector<T>(pub Vector<T>);

impl<'de> serde::Deserialize<'de> for UnitVector<f64> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = <Vector<f64> as serde::Deserialize>::deserialize(deserializer)?;
        UnitVector::new(v).ok_or_else(|| serde::de::Error::custom(format!("{} is not a unit vector", v)))
    }
}

impl UnitVector<f64> {
    /// `None` unless `v` already has unit length.
    pub fn new(v: Vector<f64>) -> Option<Self> {
        if (v.norm_sqr() - 1.0).abs() < 1e-12 {
            Some(Self(v))
        } else {
            None
        }
    }

    /// `None` for zero-length or non-finite input.
    pub fn normalize(v: Vector<f64>) -> Option<Self> {
        let n = v.norm();
        if n > 0.0 && n.is_finite() {
            Some(Self(v / n))
        } else {
            None
        }
    }

    pub fn axis(axis: Axis) -> Self {
        Self(axis.unit())
    }

    /// Perpendicular unit vector, built by zeroing the smallest component and
    /// swapping the other two.
    pub fn orthogonal(self) -> Self {
        let Vector { x, y, z } = self.0;
        let (ax, ay, az) = (x.abs(), y.abs(), z.abs());
        let o = if ax < ay {
            if ax < az {
                Vector::new(0.0, z, -y)
            } else {
                Vector::new(y, -x, 0.0)
            }
        } else if ay < az {
            Vector::new(-z, 0.0, x)
        } else {
            Vector::new(y, -x, 0.0)
        };
        // keeps the two largest components, so |o| >= 1/sqrt(2)
        Self(o / o.norm())
    }
}
