mod support;

use meshcsg::csg::{BooleanOp, ClassifyType, Csg, Tree};
use meshcsg::mesh::{MeshIdx, MeshSet};
use meshcsg::shapes;
use meshcsg::traits::TransformOps;
use nalgebra::{Matrix4, Vector3};

use crate::support::{approx_eq, assert_well_formed};

fn cube() -> MeshSet {
    shapes::cube(1.0, None).unwrap()
}

#[test]
fn primitive_evaluates_to_itself() {
    let tree = Tree::Primitive(cube());
    let out = tree.eval(&mut Csg::new()).unwrap();
    assert_eq!(out.face_count(), 6);
    assert!(approx_eq(out.signed_volume(), 1.0, 1e-12));
}

#[test]
fn transform_node_applies_affine_map() {
    let m = Matrix4::new_translation(&Vector3::new(0.5, 0.5, 0.5));
    let tree = Tree::Transform(m, Box::new(Tree::Primitive(cube())));
    let out = tree.eval(&mut Csg::new()).unwrap();
    let bb = out.bounding_box();
    assert!(approx_eq(bb.mins.x, 0.5, 1e-12) && approx_eq(bb.maxs.x, 1.5, 1e-12));
}

#[test]
fn op_node_combines_children() {
    let m = Matrix4::new_translation(&Vector3::new(0.5, 0.5, 0.5));
    let tree = Tree::op(
        Tree::Primitive(cube()),
        Tree::Transform(m, Box::new(Tree::Primitive(cube()))),
        BooleanOp::Union,
    );
    let out = tree.eval(&mut Csg::new()).unwrap();
    assert_well_formed(&out, "tree union");
    assert!(approx_eq(out.signed_volume(), 1.875, 1e-12));
}

#[test]
fn nested_ops_evaluate_postorder() {
    // (A ∪ B) ∖ C
    let b = Tree::Transform(
        Matrix4::new_translation(&Vector3::new(0.5, 0.5, 0.5)),
        Box::new(Tree::Primitive(cube())),
    );
    let c = Tree::Transform(
        Matrix4::new_translation(&Vector3::new(-0.5, -0.5, -0.5)),
        Box::new(Tree::Primitive(cube())),
    );
    let tree = Tree::op(Tree::op(Tree::Primitive(cube()), b, BooleanOp::Union), c, BooleanOp::AMinusB);
    let out = tree.eval(&mut Csg::new()).unwrap();
    assert_well_formed(&out, "nested tree");
    // 1.875 minus the 0.125 corner bite.
    assert!(approx_eq(out.signed_volume(), 1.75, 1e-12));
}

#[test]
fn invert_node_flips_selected_components() {
    let tree = Tree::Invert(None, Box::new(Tree::Primitive(cube())));
    let out = tree.eval(&mut Csg::new()).unwrap();
    assert!(approx_eq(out.signed_volume(), -1.0, 1e-12));
}

#[test]
fn select_node_keeps_chosen_components() {
    // Two far-apart cubes in one set, built through a union.
    let far = Tree::Transform(
        Matrix4::new_translation(&Vector3::new(5.0, 0.0, 0.0)),
        Box::new(Tree::Primitive(cube())),
    );
    let both = Tree::op(Tree::Primitive(cube()), far, BooleanOp::Union);
    let selected = Tree::Select(vec![MeshIdx(1)], Box::new(both));
    let out = selected.eval(&mut Csg::new()).unwrap();
    assert_eq!(out.meshes.len(), 1);
    assert_eq!(out.vertices.len(), 8);
    let bb = out.bounding_box();
    assert!(approx_eq(bb.mins.x, 5.0, 1e-12));
}

#[test]
fn op_node_with_rescale() {
    let m = Matrix4::new_translation(&Vector3::new(0.5, 0.5, 0.5));
    let tree = Tree::Op {
        left: Box::new(Tree::Primitive(cube())),
        right: Box::new(Tree::Transform(m, Box::new(Tree::Primitive(cube())))),
        op: BooleanOp::Intersection,
        rescale: true,
        classify: ClassifyType::Normal,
    };
    let out = tree.eval(&mut Csg::new()).unwrap();
    assert_well_formed(&out, "rescaled tree op");
    assert!(approx_eq(out.signed_volume(), 0.125, 1e-9));
}
