//! Robust geometric predicates.
//!
//! Each predicate comes in two tiers: a `fast` tier evaluated in plain `f64`
//! with an a-priori forward error bound, and an `exact` tier that evaluates
//! the full determinant over expansions from [`crate::exact`]. The public
//! functions are the adaptive dispatch: the fast result is returned whenever
//! its magnitude clears the error bound, and the exact tier is consulted only
//! when the sign is uncertain.
//!
//! The returned value is a signed double whose **sign** is the exact sign of
//! the symbolic determinant; its magnitude is approximate. Callers must treat
//! an exact zero as the degenerate case. These functions never fail for
//! finite coordinates. A NaN return reports that the exact tier exhausted
//! the supported expansion length (or that coordinate products overflowed
//! the double range); the engine surfaces that condition as
//! [`CsgError::NumericOverflow`](crate::errors::CsgError::NumericOverflow).

use nalgebra::{Point2, Point3};

use crate::exact::{self, diff_e, prod_e, sign_component, Expansion};
use crate::float_types::Real;

// Shewchuk's machine epsilon: 2^-53, half of f64::EPSILON.
const EPS: Real = f64::EPSILON * 0.5;

const CCW_ERRBOUND_A: Real = (3.0 + 16.0 * EPS) * EPS;
const O3D_ERRBOUND_A: Real = (7.0 + 56.0 * EPS) * EPS;
const ICC_ERRBOUND_A: Real = (10.0 + 96.0 * EPS) * EPS;
const ISP_ERRBOUND_A: Real = (16.0 + 224.0 * EPS) * EPS;

/// Sign of the 2D orientation determinant: positive when `a`, `b`, `c` wind
/// counterclockwise, negative when clockwise, zero when collinear.
pub fn orient2d(pa: &Point2<Real>, pb: &Point2<Real>, pc: &Point2<Real>) -> Real {
    let detleft = (pa.x - pc.x) * (pb.y - pc.y);
    let detright = (pa.y - pc.y) * (pb.x - pc.x);
    let det = detleft - detright;

    let detsum = if detleft > 0.0 {
        if detright <= 0.0 {
            return det;
        }
        detleft + detright
    } else if detleft < 0.0 {
        if detright >= 0.0 {
            return det;
        }
        -detleft - detright
    } else {
        return det;
    };

    let errbound = CCW_ERRBOUND_A * detsum;
    if det >= errbound || -det >= errbound {
        return det;
    }
    orient2d_exact(pa, pb, pc)
}

/// Full-precision 2D orientation: the determinant expanded into the six
/// products of the original coordinates, summed exactly.
pub fn orient2d_exact(pa: &Point2<Real>, pb: &Point2<Real>, pc: &Point2<Real>) -> Real {
    // ax*by - ax*cy - ay*bx + ay*cx + bx*cy - by*cx
    let mut det: Expansion = prod_e(pa.x, pb.y);
    det = exact::sub(&det, &prod_e(pa.x, pc.y));
    det = exact::sub(&det, &prod_e(pa.y, pb.x));
    det = exact::add(&det, &prod_e(pa.y, pc.x));
    det = exact::add(&det, &prod_e(pb.x, pc.y));
    det = exact::sub(&det, &prod_e(pb.y, pc.x));
    sign_component(&det)
}

/// Sign of the signed volume of the tetrahedron `(a, b, c, d)`: positive when
/// `d` lies above the plane of `(a, b, c)` under the right-hand rule.
pub fn orient3d(
    pa: &Point3<Real>,
    pb: &Point3<Real>,
    pc: &Point3<Real>,
    pd: &Point3<Real>,
) -> Real {
    let bax = pb.x - pa.x;
    let bay = pb.y - pa.y;
    let baz = pb.z - pa.z;
    let cax = pc.x - pa.x;
    let cay = pc.y - pa.y;
    let caz = pc.z - pa.z;
    let dax = pd.x - pa.x;
    let day = pd.y - pa.y;
    let daz = pd.z - pa.z;

    let caydaz = cay * daz;
    let cazday = caz * day;
    let cazdax = caz * dax;
    let caxdaz = cax * daz;
    let caxday = cax * day;
    let caydax = cay * dax;

    let det = bax * (caydaz - cazday) + bay * (cazdax - caxdaz) + baz * (caxday - caydax);

    let permanent = (caydaz.abs() + cazday.abs()) * bax.abs()
        + (cazdax.abs() + caxdaz.abs()) * bay.abs()
        + (caxday.abs() + caydax.abs()) * baz.abs();
    let errbound = O3D_ERRBOUND_A * permanent;
    if det > errbound || -det > errbound {
        return det;
    }
    orient3d_exact(pa, pb, pc, pd)
}

/// Full-precision 3D orientation over two-component coordinate differences.
pub fn orient3d_exact(
    pa: &Point3<Real>,
    pb: &Point3<Real>,
    pc: &Point3<Real>,
    pd: &Point3<Real>,
) -> Real {
    let bax = diff_e(pb.x, pa.x);
    let bay = diff_e(pb.y, pa.y);
    let baz = diff_e(pb.z, pa.z);
    let cax = diff_e(pc.x, pa.x);
    let cay = diff_e(pc.y, pa.y);
    let caz = diff_e(pc.z, pa.z);
    let dax = diff_e(pd.x, pa.x);
    let day = diff_e(pd.y, pa.y);
    let daz = diff_e(pd.z, pa.z);

    let m1 = exact::sub(&exact::mul(&cay, &daz), &exact::mul(&caz, &day));
    let m2 = exact::sub(&exact::mul(&caz, &dax), &exact::mul(&cax, &daz));
    let m3 = exact::sub(&exact::mul(&cax, &day), &exact::mul(&cay, &dax));

    let mut det = exact::mul(&bax, &m1);
    det = exact::add(&det, &exact::mul(&bay, &m2));
    det = exact::add(&det, &exact::mul(&baz, &m3));
    sign_component(&det)
}

/// Positive when `pd` lies inside the circle through `pa`, `pb`, `pc`
/// (which must wind counterclockwise), negative outside, zero on the circle.
pub fn incircle(
    pa: &Point2<Real>,
    pb: &Point2<Real>,
    pc: &Point2<Real>,
    pd: &Point2<Real>,
) -> Real {
    let adx = pa.x - pd.x;
    let ady = pa.y - pd.y;
    let bdx = pb.x - pd.x;
    let bdy = pb.y - pd.y;
    let cdx = pc.x - pd.x;
    let cdy = pc.y - pd.y;

    let bdxcdy = bdx * cdy;
    let cdxbdy = cdx * bdy;
    let alift = adx * adx + ady * ady;

    let cdxady = cdx * ady;
    let adxcdy = adx * cdy;
    let blift = bdx * bdx + bdy * bdy;

    let adxbdy = adx * bdy;
    let bdxady = bdx * ady;
    let clift = cdx * cdx + cdy * cdy;

    let det = alift * (bdxcdy - cdxbdy) + blift * (cdxady - adxcdy) + clift * (adxbdy - bdxady);

    let permanent = (bdxcdy.abs() + cdxbdy.abs()) * alift
        + (cdxady.abs() + adxcdy.abs()) * blift
        + (adxbdy.abs() + bdxady.abs()) * clift;
    let errbound = ICC_ERRBOUND_A * permanent;
    if det > errbound || -det > errbound {
        return det;
    }
    incircle_exact(pa, pb, pc, pd)
}

fn incircle_exact(
    pa: &Point2<Real>,
    pb: &Point2<Real>,
    pc: &Point2<Real>,
    pd: &Point2<Real>,
) -> Real {
    let adx = diff_e(pa.x, pd.x);
    let ady = diff_e(pa.y, pd.y);
    let bdx = diff_e(pb.x, pd.x);
    let bdy = diff_e(pb.y, pd.y);
    let cdx = diff_e(pc.x, pd.x);
    let cdy = diff_e(pc.y, pd.y);

    let bxcy = exact::sub(&exact::mul(&bdx, &cdy), &exact::mul(&cdx, &bdy));
    let cxay = exact::sub(&exact::mul(&cdx, &ady), &exact::mul(&adx, &cdy));
    let axby = exact::sub(&exact::mul(&adx, &bdy), &exact::mul(&bdx, &ady));

    let alift = exact::add(&exact::mul(&adx, &adx), &exact::mul(&ady, &ady));
    let blift = exact::add(&exact::mul(&bdx, &bdx), &exact::mul(&bdy, &bdy));
    let clift = exact::add(&exact::mul(&cdx, &cdx), &exact::mul(&cdy, &cdy));

    let mut det = exact::mul(&alift, &bxcy);
    det = exact::add(&det, &exact::mul(&blift, &cxay));
    det = exact::add(&det, &exact::mul(&clift, &axby));
    sign_component(&det)
}

/// Positive when `pe` lies inside the sphere through `pa`..`pd` (which must
/// be positively oriented), negative outside, zero on the sphere.
pub fn insphere(
    pa: &Point3<Real>,
    pb: &Point3<Real>,
    pc: &Point3<Real>,
    pd: &Point3<Real>,
    pe: &Point3<Real>,
) -> Real {
    let aex = pa.x - pe.x;
    let aey = pa.y - pe.y;
    let aez = pa.z - pe.z;
    let bex = pb.x - pe.x;
    let bey = pb.y - pe.y;
    let bez = pb.z - pe.z;
    let cex = pc.x - pe.x;
    let cey = pc.y - pe.y;
    let cez = pc.z - pe.z;
    let dex = pd.x - pe.x;
    let dey = pd.y - pe.y;
    let dez = pd.z - pe.z;

    let aexbey = aex * bey;
    let bexaey = bex * aey;
    let ab = aexbey - bexaey;
    let bexcey = bex * cey;
    let cexbey = cex * bey;
    let bc = bexcey - cexbey;
    let cexdey = cex * dey;
    let dexcey = dex * cey;
    let cd = cexdey - dexcey;
    let dexaey = dex * aey;
    let aexdey = aex * dey;
    let da = dexaey - aexdey;

    let aexcey = aex * cey;
    let cexaey = cex * aey;
    let ac = aexcey - cexaey;
    let bexdey = bex * dey;
    let dexbey = dex * bey;
    let bd = bexdey - dexbey;

    let abc = aez * bc - bez * ac + cez * ab;
    let bcd = bez * cd - cez * bd + dez * bc;
    let cda = cez * da + dez * ac + aez * cd;
    let dab = dez * ab + aez * bd + bez * da;

    let alift = aex * aex + aey * aey + aez * aez;
    let blift = bex * bex + bey * bey + bez * bez;
    let clift = cex * cex + cey * cey + cez * cez;
    let dlift = dex * dex + dey * dey + dez * dez;

    // Negated so that "inside" is positive for a simplex that is positively
    // oriented under this crate's `orient3d` convention.
    let det = -((dlift * abc - clift * dab) + (blift * cda - alift * bcd));

    let aezplus = aez.abs();
    let bezplus = bez.abs();
    let cezplus = cez.abs();
    let dezplus = dez.abs();
    let aexbeyplus = aexbey.abs();
    let bexaeyplus = bexaey.abs();
    let bexceyplus = bexcey.abs();
    let cexbeyplus = cexbey.abs();
    let cexdeyplus = cexdey.abs();
    let dexceyplus = dexcey.abs();
    let dexaeyplus = dexaey.abs();
    let aexdeyplus = aexdey.abs();
    let aexceyplus = aexcey.abs();
    let cexaeyplus = cexaey.abs();
    let bexdeyplus = bexdey.abs();
    let dexbeyplus = dexbey.abs();
    let permanent = ((cexdeyplus + dexceyplus) * bezplus
        + (dexbeyplus + bexdeyplus) * cezplus
        + (bexceyplus + cexbeyplus) * dezplus)
        * alift
        + ((dexaeyplus + aexdeyplus) * cezplus
            + (aexceyplus + cexaeyplus) * dezplus
            + (cexdeyplus + dexceyplus) * aezplus)
            * blift
        + ((aexbeyplus + bexaeyplus) * dezplus
            + (bexdeyplus + dexbeyplus) * aezplus
            + (dexaeyplus + aexdeyplus) * bezplus)
            * clift
        + ((bexceyplus + cexbeyplus) * aezplus
            + (cexaeyplus + aexceyplus) * bezplus
            + (aexbeyplus + bexaeyplus) * cezplus)
            * dlift;
    let errbound = ISP_ERRBOUND_A * permanent;
    if det > errbound || -det > errbound {
        return det;
    }
    insphere_exact(pa, pb, pc, pd, pe)
}

fn insphere_exact(
    pa: &Point3<Real>,
    pb: &Point3<Real>,
    pc: &Point3<Real>,
    pd: &Point3<Real>,
    pe: &Point3<Real>,
) -> Real {
    let aex = diff_e(pa.x, pe.x);
    let aey = diff_e(pa.y, pe.y);
    let aez = diff_e(pa.z, pe.z);
    let bex = diff_e(pb.x, pe.x);
    let bey = diff_e(pb.y, pe.y);
    let bez = diff_e(pb.z, pe.z);
    let cex = diff_e(pc.x, pe.x);
    let cey = diff_e(pc.y, pe.y);
    let cez = diff_e(pc.z, pe.z);
    let dex = diff_e(pd.x, pe.x);
    let dey = diff_e(pd.y, pe.y);
    let dez = diff_e(pd.z, pe.z);

    let det2 = |ux: &Expansion, uy: &Expansion, vx: &Expansion, vy: &Expansion| {
        exact::sub(&exact::mul(ux, vy), &exact::mul(vx, uy))
    };

    let ab = det2(&aex, &aey, &bex, &bey);
    let bc = det2(&bex, &bey, &cex, &cey);
    let cd = det2(&cex, &cey, &dex, &dey);
    let da = det2(&dex, &dey, &aex, &aey);
    let ac = det2(&aex, &aey, &cex, &cey);
    let bd = det2(&bex, &bey, &dex, &dey);

    let abc = exact::add(
        &exact::sub(&exact::mul(&aez, &bc), &exact::mul(&bez, &ac)),
        &exact::mul(&cez, &ab),
    );
    let bcd = exact::add(
        &exact::sub(&exact::mul(&bez, &cd), &exact::mul(&cez, &bd)),
        &exact::mul(&dez, &bc),
    );
    let cda = exact::add(
        &exact::add(&exact::mul(&cez, &da), &exact::mul(&dez, &ac)),
        &exact::mul(&aez, &cd),
    );
    let dab = exact::add(
        &exact::add(&exact::mul(&dez, &ab), &exact::mul(&aez, &bd)),
        &exact::mul(&bez, &da),
    );

    let lift = |x: &Expansion, y: &Expansion, z: &Expansion| {
        exact::add(
            &exact::add(&exact::mul(x, x), &exact::mul(y, y)),
            &exact::mul(z, z),
        )
    };
    let alift = lift(&aex, &aey, &aez);
    let blift = lift(&bex, &bey, &bez);
    let clift = lift(&cex, &cey, &cez);
    let dlift = lift(&dex, &dey, &dez);

    let left = exact::sub(&exact::mul(&dlift, &abc), &exact::mul(&clift, &dab));
    let right = exact::sub(&exact::mul(&blift, &cda), &exact::mul(&alift, &bcd));
    -sign_component(&exact::add(&left, &right))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orient2d_basic() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(1.0, 0.0);
        let c = Point2::new(0.0, 1.0);
        assert!(orient2d(&a, &b, &c) > 0.0);
        assert!(orient2d(&a, &c, &b) < 0.0);
        let m = Point2::new(0.5, 0.0);
        assert_eq!(orient2d(&a, &b, &m), 0.0);
    }

    #[test]
    fn orient2d_near_degenerate() {
        // Points almost on the line y = x; the naive determinant underflows
        // into noise, the adaptive result must still be exact.
        let a = Point2::new(1e-40, 1e-40);
        let b = Point2::new(2e-40, 2e-40);
        let c = Point2::new(3e-40, 3e-40);
        assert_eq!(orient2d(&a, &b, &c), 0.0);
    }

    #[test]
    fn orient3d_sign_convention() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        let c = Point3::new(0.0, 1.0, 0.0);
        let above = Point3::new(0.0, 0.0, 1.0);
        let below = Point3::new(0.0, 0.0, -1.0);
        assert!(orient3d(&a, &b, &c, &above) > 0.0);
        assert!(orient3d(&a, &b, &c, &below) < 0.0);
        let on = Point3::new(0.25, 0.25, 0.0);
        assert_eq!(orient3d(&a, &b, &c, &on), 0.0);
    }

    #[test]
    fn orient3d_exact_zero_on_skewed_plane() {
        // d is an affine combination of a, b, c, so the volume is exactly
        // representable and must come out zero.
        let a = Point3::new(0.5, 0.25, 0.125);
        let b = Point3::new(1.5, 0.25, 0.125);
        let c = Point3::new(0.5, 2.25, 0.125);
        let d = Point3::new(1.0, 1.25, 0.125);
        assert_eq!(orient3d(&a, &b, &c, &d), 0.0);
    }

    #[test]
    fn orient3d_scaling_preserves_sign() {
        let a = Point3::new(0.1, 0.2, 0.3);
        let b = Point3::new(1.1, 0.2, 0.3);
        let c = Point3::new(0.1, 1.3, 0.4);
        let d = Point3::new(0.3, 0.4, 7.0);
        let s = orient3d(&a, &b, &c, &d);
        let k = 2f64.powi(40);
        let scale = |p: &Point3<Real>| Point3::new(p.x * k, p.y * k, p.z * k);
        let s2 = orient3d(&scale(&a), &scale(&b), &scale(&c), &scale(&d));
        assert_eq!(s.signum(), s2.signum());
    }

    #[test]
    fn incircle_basic() {
        let a = Point2::new(-1.0, 0.0);
        let b = Point2::new(1.0, 0.0);
        let c = Point2::new(0.0, 1.0);
        assert!(incircle(&a, &b, &c, &Point2::new(0.0, 0.1)) > 0.0);
        assert!(incircle(&a, &b, &c, &Point2::new(0.0, 5.0)) < 0.0);
        assert_eq!(incircle(&a, &b, &c, &Point2::new(0.0, -1.0)), 0.0);
    }

    #[test]
    fn insphere_basic() {
        let a = Point3::new(1.0, 0.0, 0.0);
        let b = Point3::new(0.0, 1.0, 0.0);
        let c = Point3::new(0.0, 0.0, 1.0);
        let d = Point3::new(-1.0, 0.0, 0.0);
        // Orientation check first: (a, b, c, d) must be positively oriented.
        assert!(orient3d(&a, &b, &c, &d) < 0.0);
        // Swap to a positive orientation.
        let (a, b) = (b, a);
        assert!(orient3d(&a, &b, &c, &d) > 0.0);
        assert!(insphere(&a, &b, &c, &d, &Point3::new(0.0, 0.0, 0.0)) > 0.0);
        assert!(insphere(&a, &b, &c, &d, &Point3::new(3.0, 3.0, 3.0)) < 0.0);
        assert_eq!(insphere(&a, &b, &c, &d, &Point3::new(0.0, -1.0, 0.0)), 0.0);
    }
}
