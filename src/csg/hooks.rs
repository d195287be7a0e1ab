//! Hook registry fired by the result composer, plus the built-in earcut
//! triangulation hook.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use nalgebra::Point3;

use super::detail::NodeId;
use crate::float_types::Real;
use crate::geom::Plane;
use crate::mesh::{FaceIdx, FaceKey, MeshSet};

/// Named points at which subscribers fire.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HookPoint {
    /// A face about to be emitted; subscribers may rewrite it into several.
    ProcessOutputFace,
    /// A retained face, observed with its originating face and flip flag.
    ResultFace,
}

/// A face being emitted by the composer: pool node ids plus provenance.
#[derive(Clone, Debug)]
pub struct PendingFace {
    /// Vertex nodes into [`HookCtx::pool`], already wound for output.
    pub verts: Vec<NodeId>,
    /// The input face this region was carved from.
    pub orig: FaceKey,
    /// Whether the composer reversed the loop relative to its origin.
    pub flipped: bool,
}

/// Read-only context handed to hook subscribers.
pub struct HookCtx<'a, S: Clone + Send + Sync + Debug> {
    pub pool: &'a [Point3<Real>],
    pub src_a: &'a MeshSet<S>,
    pub src_b: &'a MeshSet<S>,
    /// Uid the output mesh set will carry; key new faces with it.
    pub out_set: u64,
}

impl<S: Clone + Send + Sync + Debug> HookCtx<'_, S> {
    /// Resolve a face key against the two inputs.
    pub fn source_face(&self, key: FaceKey) -> Option<(&MeshSet<S>, FaceIdx)> {
        if key.set == self.src_a.uid() {
            Some((self.src_a, FaceIdx(key.face)))
        } else if key.set == self.src_b.uid() {
            Some((self.src_b, FaceIdx(key.face)))
        } else {
            None
        }
    }
}

/// A hook subscriber. Implement the methods for the points you register at.
pub trait FaceHook<S: Clone + Send + Sync + Debug> {
    /// Rewrite an output face into several (e.g. triangulation). `None`
    /// leaves the face unchanged.
    fn process_output_face(
        &mut self,
        _face: &PendingFace,
        _ctx: &HookCtx<S>,
    ) -> Option<Vec<Vec<NodeId>>> {
        None
    }

    /// Observe a retained face and the index it will occupy in the output.
    fn result_face(&mut self, _face: &PendingFace, _out_face: FaceIdx, _ctx: &HookCtx<S>) {}
}

/// Registry of hook subscribers, fired in registration order. Subscribers
/// are shared (`Rc<RefCell<..>>`) so callers keep access to state the hooks
/// accumulate, e.g. interpolated attributes.
pub struct Hooks<S: Clone + Send + Sync + Debug> {
    subs: Vec<(HookPoint, Rc<RefCell<dyn FaceHook<S>>>)>,
    /// Warnings from the evaluation (dropped degenerate regions and the
    /// like); not errors.
    pub diagnostics: Vec<String>,
}

impl<S: Clone + Send + Sync + Debug> Hooks<S> {
    pub fn new() -> Self {
        Hooks { subs: Vec::new(), diagnostics: Vec::new() }
    }

    pub fn register(&mut self, point: HookPoint, hook: Rc<RefCell<dyn FaceHook<S>>>) {
        self.subs.push((point, hook));
    }

    pub fn has(&self, point: HookPoint) -> bool {
        self.subs.iter().any(|(p, _)| *p == point)
    }

    pub fn diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics.push(message.into());
    }

    pub(crate) fn run_process_output_face(
        &mut self,
        face: &PendingFace,
        ctx: &HookCtx<S>,
    ) -> Vec<Vec<NodeId>> {
        let mut faces = vec![face.verts.clone()];
        for (point, hook) in &self.subs {
            if *point != HookPoint::ProcessOutputFace {
                continue;
            }
            let mut next = Vec::new();
            for verts in faces {
                let pf = PendingFace { verts, orig: face.orig, flipped: face.flipped };
                match hook.borrow_mut().process_output_face(&pf, ctx) {
                    Some(split) => next.extend(split),
                    None => next.push(pf.verts),
                }
            }
            faces = next;
        }
        faces
    }

    pub(crate) fn run_result_face(
        &mut self,
        face: &PendingFace,
        out_face: FaceIdx,
        ctx: &HookCtx<S>,
    ) {
        for (point, hook) in &self.subs {
            if *point == HookPoint::ResultFace {
                hook.borrow_mut().result_face(face, out_face, ctx);
            }
        }
    }
}

impl<S: Clone + Send + Sync + Debug> Default for Hooks<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Built-in triangulation hook: fans every emitted n-gon (n > 3) into
/// triangles with earcut in the face's own plane.
#[derive(Clone, Copy, Debug, Default)]
pub struct TriangulateOutput;

impl TriangulateOutput {
    /// Register at [`HookPoint::ProcessOutputFace`].
    pub fn install<S: Clone + Send + Sync + Debug>(hooks: &mut Hooks<S>) {
        hooks.register(HookPoint::ProcessOutputFace, Rc::new(RefCell::new(TriangulateOutput)));
    }
}

impl<S: Clone + Send + Sync + Debug> FaceHook<S> for TriangulateOutput {
    fn process_output_face(
        &mut self,
        face: &PendingFace,
        ctx: &HookCtx<S>,
    ) -> Option<Vec<Vec<NodeId>>> {
        if face.verts.len() <= 3 {
            return None;
        }
        let points: Vec<Point3<Real>> =
            face.verts.iter().map(|&n| ctx.pool[n as usize]).collect();
        let plane = Plane::from_loop(&points)?;
        Some(triangulate_loop(&face.verts, &points, &plane))
    }
}

/// Earcut a polygon loop; returns triangles as node-id triples. The earcut
/// vertex array is the exterior ring in input order, so triangle indices
/// map back to the loop modulo the closing duplicate.
pub fn triangulate_loop(
    verts: &[NodeId],
    points: &[Point3<Real>],
    plane: &Plane,
) -> Vec<Vec<NodeId>> {
    use geo::{coord, LineString, Polygon as GeoPolygon, TriangulateEarcut};

    let ring: Vec<_> = points
        .iter()
        .map(|p| {
            let q = plane.project(p);
            coord! { x: q.x, y: q.y }
        })
        .collect();
    let triangulation = GeoPolygon::new(LineString::new(ring), Vec::new()).earcut_triangles_raw();

    let n = verts.len();
    let mut out = Vec::with_capacity(triangulation.triangle_indices.len() / 3);
    for tri in triangulation.triangle_indices.chunks_exact(3) {
        let ids: Vec<NodeId> = tri.iter().map(|&i| verts[i % n]).collect();
        if ids[0] != ids[1] && ids[1] != ids[2] && ids[0] != ids[2] {
            out.push(ids);
        }
    }
    out
}
