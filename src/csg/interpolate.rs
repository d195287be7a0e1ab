//! Attribute interpolators: carry per-face, per-face-vertex and
//! per-face-edge attributes from the inputs onto the result.
//!
//! Each interpolator owns shared storage and installs a hook at
//! [`HookPoint::ResultFace`]; after an evaluation the same handle reads the
//! attributes of the output faces.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use hashbrown::HashMap;
use nalgebra::{Point2, Point3};

use super::hooks::{FaceHook, HookCtx, HookPoint, Hooks, PendingFace};
use crate::float_types::{tolerance, Real};
use crate::geom::Plane;
use crate::mesh::{FaceIdx, FaceKey};

/// Values that can be combined with barycentric weights.
pub trait Blend: Clone {
    fn blend(samples: &[(Self, Real)]) -> Self;
}

impl Blend for Real {
    fn blend(samples: &[(Self, Real)]) -> Self {
        samples.iter().map(|(v, w)| v * w).sum()
    }
}

impl<const N: usize> Blend for [Real; N] {
    fn blend(samples: &[(Self, Real)]) -> Self {
        let mut out = [0.0; N];
        for (v, w) in samples {
            for (o, c) in out.iter_mut().zip(v.iter()) {
                *o += c * w;
            }
        }
        out
    }
}

/// Per-face attribute: a derived face inherits its origin face's value.
pub struct FaceAttr<T> {
    inner: Rc<RefCell<HashMap<FaceKey, T>>>,
}

impl<T: Clone + 'static> FaceAttr<T> {
    pub fn new() -> Self {
        FaceAttr { inner: Rc::new(RefCell::new(HashMap::new())) }
    }

    pub fn set(&self, face: FaceKey, value: T) {
        self.inner.borrow_mut().insert(face, value);
    }

    pub fn get(&self, face: FaceKey) -> Option<T> {
        self.inner.borrow().get(&face).cloned()
    }

    pub fn install<S: Clone + Send + Sync + Debug>(&self, hooks: &mut Hooks<S>) {
        let hook = FaceAttrHook { inner: Rc::clone(&self.inner) };
        hooks.register(HookPoint::ResultFace, Rc::new(RefCell::new(hook)));
    }
}

impl<T: Clone + 'static> Default for FaceAttr<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct FaceAttrHook<T> {
    inner: Rc<RefCell<HashMap<FaceKey, T>>>,
}

impl<S: Clone + Send + Sync + Debug, T: Clone + 'static> FaceHook<S> for FaceAttrHook<T> {
    fn result_face(&mut self, face: &PendingFace, out_face: FaceIdx, ctx: &HookCtx<S>) {
        let value = self.inner.borrow().get(&face.orig).cloned();
        if let Some(value) = value {
            let key = FaceKey { set: ctx.out_set, face: out_face.0 };
            self.inner.borrow_mut().insert(key, value);
        }
    }
}

/// Per-(face, corner) attribute; values at new vertices are interpolated
/// barycentrically from the origin face's corner values.
pub struct FaceVertexAttr<T> {
    inner: Rc<RefCell<HashMap<(FaceKey, usize), T>>>,
}

impl<T: Blend + 'static> FaceVertexAttr<T> {
    pub fn new() -> Self {
        FaceVertexAttr { inner: Rc::new(RefCell::new(HashMap::new())) }
    }

    pub fn set(&self, face: FaceKey, corner: usize, value: T) {
        self.inner.borrow_mut().insert((face, corner), value);
    }

    pub fn get(&self, face: FaceKey, corner: usize) -> Option<T> {
        self.inner.borrow().get(&(face, corner)).cloned()
    }

    pub fn install<S: Clone + Send + Sync + Debug>(&self, hooks: &mut Hooks<S>) {
        let hook = FaceVertexAttrHook { inner: Rc::clone(&self.inner) };
        hooks.register(HookPoint::ResultFace, Rc::new(RefCell::new(hook)));
    }
}

impl<T: Blend + 'static> Default for FaceVertexAttr<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct FaceVertexAttrHook<T> {
    inner: Rc<RefCell<HashMap<(FaceKey, usize), T>>>,
}

impl<S: Clone + Send + Sync + Debug, T: Blend + 'static> FaceHook<S> for FaceVertexAttrHook<T> {
    fn result_face(&mut self, face: &PendingFace, out_face: FaceIdx, ctx: &HookCtx<S>) {
        let Some((src, orig_face)) = ctx.source_face(face.orig) else {
            return;
        };
        let corners = src.face_points(orig_face);
        let corner_values: Vec<Option<T>> = {
            let store = self.inner.borrow();
            (0..corners.len()).map(|k| store.get(&(face.orig, k)).cloned()).collect()
        };
        if corner_values.iter().all(|v| v.is_none()) {
            return;
        }
        let plane = src.faces[orig_face.index()].plane;
        let corners2d: Vec<Point2<Real>> = corners.iter().map(|p| plane.project(p)).collect();

        let mut store = self.inner.borrow_mut();
        for (k, &node) in face.verts.iter().enumerate() {
            let p2 = plane.project(&ctx.pool[node as usize]);
            let weights = corner_weights(&corners2d, &p2);
            let samples: Vec<(T, Real)> = corner_values
                .iter()
                .zip(weights.iter())
                .filter_map(|(v, &w)| v.clone().map(|v| (v, w)))
                .collect();
            if samples.is_empty() {
                continue;
            }
            let norm: Real = samples.iter().map(|(_, w)| *w).sum();
            if norm <= 0.0 {
                continue;
            }
            let samples: Vec<(T, Real)> =
                samples.into_iter().map(|(v, w)| (v, w / norm)).collect();
            let key = FaceKey { set: ctx.out_set, face: out_face.0 };
            store.insert((key, k), T::blend(&samples));
        }
    }
}

/// Barycentric weights of `p` against a polygon's corners: the containing
/// fan triangle contributes its three barycentric coordinates; points
/// outside every fan triangle fall back to inverse-distance weights.
fn corner_weights(corners: &[Point2<Real>], p: &Point2<Real>) -> Vec<Real> {
    let n = corners.len();
    let mut weights = vec![0.0; n];

    let area2 = |a: &Point2<Real>, b: &Point2<Real>, c: &Point2<Real>| -> Real {
        (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)
    };
    for i in 1..n - 1 {
        let (a, b, c) = (&corners[0], &corners[i], &corners[i + 1]);
        let total = area2(a, b, c);
        if total.abs() < Real::EPSILON {
            continue;
        }
        let wa = area2(p, b, c) / total;
        let wb = area2(a, p, c) / total;
        let wc = area2(a, b, p) / total;
        if wa >= -1e-9 && wb >= -1e-9 && wc >= -1e-9 {
            weights[0] = wa.max(0.0);
            weights[i] = wb.max(0.0);
            weights[i + 1] = wc.max(0.0);
            return weights;
        }
    }

    let mut total = 0.0;
    for (i, c) in corners.iter().enumerate() {
        let d = (c - p).norm().max(1e-30);
        weights[i] = 1.0 / d;
        total += weights[i];
    }
    for w in &mut weights {
        *w /= total;
    }
    weights
}

/// Per-(face, edge) attribute: split fragments of an original edge inherit
/// its value; edges created by the cut stay unset.
pub struct FaceEdgeAttr<T> {
    inner: Rc<RefCell<HashMap<(FaceKey, usize), T>>>,
}

impl<T: Clone + 'static> FaceEdgeAttr<T> {
    pub fn new() -> Self {
        FaceEdgeAttr { inner: Rc::new(RefCell::new(HashMap::new())) }
    }

    /// Set the attribute of the edge from corner `edge` to corner
    /// `edge + 1` of `face`.
    pub fn set(&self, face: FaceKey, edge: usize, value: T) {
        self.inner.borrow_mut().insert((face, edge), value);
    }

    pub fn get(&self, face: FaceKey, edge: usize) -> Option<T> {
        self.inner.borrow().get(&(face, edge)).cloned()
    }

    pub fn install<S: Clone + Send + Sync + Debug>(&self, hooks: &mut Hooks<S>) {
        let hook = FaceEdgeAttrHook { inner: Rc::clone(&self.inner) };
        hooks.register(HookPoint::ResultFace, Rc::new(RefCell::new(hook)));
    }
}

impl<T: Clone + 'static> Default for FaceEdgeAttr<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct FaceEdgeAttrHook<T> {
    inner: Rc<RefCell<HashMap<(FaceKey, usize), T>>>,
}

impl<S: Clone + Send + Sync + Debug, T: Clone + 'static> FaceHook<S> for FaceEdgeAttrHook<T> {
    fn result_face(&mut self, face: &PendingFace, out_face: FaceIdx, ctx: &HookCtx<S>) {
        let Some((src, orig_face)) = ctx.source_face(face.orig) else {
            return;
        };
        let corners = src.face_points(orig_face);
        let n_orig = corners.len();
        let has_any = {
            let store = self.inner.borrow();
            (0..n_orig).any(|j| store.contains_key(&(face.orig, j)))
        };
        if !has_any {
            return;
        }
        let eps = tolerance().max(1e-9);

        let n = face.verts.len();
        for k in 0..n {
            let p = ctx.pool[face.verts[k] as usize];
            let q = ctx.pool[face.verts[(k + 1) % n] as usize];
            for j in 0..n_orig {
                let a = corners[j];
                let b = corners[(j + 1) % n_orig];
                if dist_to_segment(&p, &a, &b) <= eps && dist_to_segment(&q, &a, &b) <= eps {
                    let value = self.inner.borrow().get(&(face.orig, j)).cloned();
                    if let Some(value) = value {
                        let key = FaceKey { set: ctx.out_set, face: out_face.0 };
                        self.inner.borrow_mut().insert((key, k), value);
                    }
                    break;
                }
            }
        }
    }
}

fn dist_to_segment(p: &Point3<Real>, a: &Point3<Real>, b: &Point3<Real>) -> Real {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 < Real::EPSILON {
        return (p - a).norm();
    }
    let t = (ab.dot(&(p - a)) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_scalars_and_arrays() {
        let v = Real::blend(&[(1.0, 0.25), (3.0, 0.75)]);
        assert!((v - 2.5).abs() < 1e-14);
        let v = <[Real; 3]>::blend(&[([1.0, 0.0, 2.0], 0.5), ([3.0, 4.0, 0.0], 0.5)]);
        assert_eq!(v, [2.0, 2.0, 1.0]);
    }

    #[test]
    fn corner_weights_inside_square() {
        let sq = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        // Center of the square: weights must sum to one and reproduce the
        // point.
        let w = corner_weights(&sq, &Point2::new(0.5, 0.5));
        let sum: Real = w.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        let x: Real = w.iter().zip(&sq).map(|(w, c)| w * c.x).sum();
        let y: Real = w.iter().zip(&sq).map(|(w, c)| w * c.y).sum();
        assert!((x - 0.5).abs() < 1e-12 && (y - 0.5).abs() < 1e-12);
        // A corner reproduces itself.
        let w = corner_weights(&sq, &Point2::new(0.0, 0.0));
        assert!((w[0] - 1.0).abs() < 1e-9);
    }
}
