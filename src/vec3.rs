// src/vec3.rs

use crate::error::SimError;

/// Tolerance used throughout for "is this unit length / are these equal"
/// style floating-point checks on spin vectors and coordinates.
pub const PRECISION: f64 = 1e-6;

/// 3D vector dot product.
#[inline]
pub fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// 3D vector cross product: a × b.
#[inline]
pub fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
pub fn add(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn scale(a: [f64; 3], s: f64) -> [f64; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

/// Euclidean norm.
#[inline]
pub fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

/// Squared distance between two points.
#[inline]
pub fn dist2(a: [f64; 3], b: [f64; 3]) -> f64 {
    let d = sub(a, b);
    dot(d, d)
}

/// Normalise a 3D vector to unit length. A zero vector is a typed error:
/// spin directions must never silently collapse to a default.
#[inline]
pub fn normalize(v: [f64; 3]) -> Result<[f64; 3], SimError> {
    let n2 = dot(v, v);
    if n2 == 0.0 {
        return Err(SimError::ZeroNormalization);
    }
    let inv = 1.0 / n2.sqrt();
    Ok([v[0] * inv, v[1] * inv, v[2] * inv])
}

/// Normalise, substituting `fallback` for a zero vector. Used on per-step
/// fallback paths where a single degenerate vector must not abort the run;
/// callers count these events and report them in the step diagnostics.
#[inline]
pub fn normalize_or(v: [f64; 3], fallback: [f64; 3]) -> [f64; 3] {
    let n2 = dot(v, v);
    if n2 == 0.0 {
        return fallback;
    }
    let inv = 1.0 / n2.sqrt();
    [v[0] * inv, v[1] * inv, v[2] * inv]
}

/// Apply a 3x3 rotation matrix (row-major) to a vector.
#[inline]
pub fn rotate(r: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [dot(r[0], v), dot(r[1], v), dot(r[2], v)]
}

/// Rodrigues rotation matrix for a rotation of `angle` radians about a unit
/// `axis`. The axis is not re-normalized here; pass a unit vector.
pub fn rotation_matrix(axis: [f64; 3], angle: f64) -> [[f64; 3]; 3] {
    let (s, c) = angle.sin_cos();
    let t = 1.0 - c;
    let [x, y, z] = axis;
    [
        [t * x * x + c, t * x * y - s * z, t * x * z + s * y],
        [t * x * y + s * z, t * y * y + c, t * y * z - s * x],
        [t * x * z - s * y, t * y * z + s * x, t * z * z + c],
    ]
}
