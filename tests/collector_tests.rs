mod support;

use meshcsg::csg::{
    assemble, ClassifyType, Collector, Csg, CsgContext, FaceClass, FaceLoop, FaceLoopGroup, Hooks,
    Src,
};
use meshcsg::errors::CsgError;
use meshcsg::mesh::{MeshIdx, MeshSet};
use meshcsg::shapes;
use meshcsg::traits::TransformOps;

use crate::support::approx_eq;

/// Keeps regions of A that lie between two components of B: inside
/// component 1, outside component 0.
struct Between {
    kept: Vec<(FaceLoop, bool)>,
}

impl Collector<()> for Between {
    fn collect(&mut self, group: FaceLoopGroup, _ctx: &CsgContext<()>, _hooks: &mut Hooks<()>) {
        if group.src != Src::A {
            return;
        }
        if group.classification_against(MeshIdx(1)) != FaceClass::In {
            return;
        }
        if group.classification_against(MeshIdx(0)) != FaceClass::Out {
            return;
        }
        for l in group.loops {
            self.kept.push((l, false));
        }
    }

    fn done(&mut self, ctx: &CsgContext<()>, hooks: &mut Hooks<()>) -> Result<MeshSet, CsgError> {
        assemble(std::mem::take(&mut self.kept), ctx, hooks)
    }
}

/// Splice several closed sets into one multi-component set.
fn splice(sets: &[&MeshSet]) -> MeshSet {
    let mut vertices = Vec::new();
    let mut stream = Vec::new();
    for set in sets {
        let offset = vertices.len();
        vertices.extend(set.vertices.iter().copied());
        for f in set.live_faces() {
            let verts = set.face_vertices(f);
            stream.push(verts.len());
            stream.extend(verts.iter().map(|v| v.index() + offset));
        }
    }
    MeshSet::from_face_stream(&vertices, &stream, None).unwrap()
}

#[test]
fn custom_between_collector_selects_by_component() {
    // A sits inside the big shell (component 1) and far from the small
    // distant cube (component 0).
    let a = shapes::cube(1.0, None).unwrap().translate(1.0, 1.0, 1.0);
    let far = shapes::cube(1.0, None).unwrap().translate(20.0, 0.0, 0.0);
    let big = shapes::cube(3.0, None).unwrap();
    let b = splice(&[&far, &big]);
    assert_eq!(b.meshes.len(), 2);

    let mut collector = Between { kept: Vec::new() };
    let out = Csg::new()
        .compute_with(&a, &b, &mut collector, ClassifyType::Normal)
        .unwrap();

    // All of A qualifies: inside the big shell, outside the far cube.
    assert_eq!(out.face_count(), 6);
    assert!(approx_eq(out.signed_volume(), 1.0, 1e-12));
}

#[test]
fn custom_collector_rejects_when_outside() {
    // Moved outside the big shell: nothing satisfies the between rule.
    let a = shapes::cube(1.0, None).unwrap().translate(10.0, 10.0, 10.0);
    let far = shapes::cube(1.0, None).unwrap().translate(20.0, 0.0, 0.0);
    let big = shapes::cube(3.0, None).unwrap();
    let b = splice(&[&far, &big]);

    let mut collector = Between { kept: Vec::new() };
    let out = Csg::new()
        .compute_with(&a, &b, &mut collector, ClassifyType::Normal)
        .unwrap();
    assert!(out.is_empty());
}
