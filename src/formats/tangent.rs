//! Per-triangle tangent generation with per-vertex accumulation and
//! Gram-Schmidt orthogonalization against the averaged normal (§4.5).
//!
//! Not grounded in the teacher (none of `pd2tools-rust`'s formats carry a
//! tangent solver; Diesel release models store tangents pre-baked). This
//! is the standard per-triangle UV-gradient construction used across the
//! mesh-import corpus (see e.g. the tangent-space derivations in the
//! other retrieved mesh-format crates), written in the teacher's plain
//! `vek`-typed numeric style.

use vek::Vec3;

use super::mesh::{Triangle, Vertex};

const DEGENERATE_EPSILON: f32 = 1e-8;

fn deterministic_perpendicular(n: Vec3<f32>) -> Vec3<f32> {
    let axes = [Vec3::unit_x(), Vec3::unit_y(), Vec3::unit_z()];
    let axis = axes
        .into_iter()
        .min_by(|a, b| {
            n.dot(*a)
                .abs()
                .partial_cmp(&n.dot(*b).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .unwrap();
    let cross = n.cross(axis);
    if cross.magnitude_squared() < DEGENERATE_EPSILON {
        // n itself was (anti)parallel to every axis we tried, which can't
        // actually happen for a unit vector in R^3, but keep this total.
        Vec3::unit_x()
    } else {
        cross.normalized()
    }
}

/// Computes a unit tangent (plus handedness byte, always 255 per §4.5)
/// for every vertex in `vertices`, given the triangle list that indexes
/// into it.
pub fn solve_tangents(vertices: &[Vertex], triangles: &[Triangle]) -> Vec<([f32; 3], u8)> {
    let mut sums = vec![Vec3::<f32>::zero(); vertices.len()];

    for &(i0, i1, i2) in triangles {
        let (i0, i1, i2) = (i0 as usize, i1 as usize, i2 as usize);
        let p0 = Vec3::from(vertices[i0].position);
        let p1 = Vec3::from(vertices[i1].position);
        let p2 = Vec3::from(vertices[i2].position);

        let uv0 = vertices[i0].uv0;
        let uv1 = vertices[i1].uv0;
        let uv2 = vertices[i2].uv0;

        let edge1 = p1 - p0;
        let edge2 = p2 - p0;
        let du1 = [uv1[0] - uv0[0], uv1[1] - uv0[1]];
        let du2 = [uv2[0] - uv0[0], uv2[1] - uv0[1]];

        let d = du1[0] * du2[1] - du2[0] * du1[1];

        let raw_tangent = if d.abs() < DEGENERATE_EPSILON {
            let face_normal = edge1.cross(edge2);
            let face_normal = if face_normal.magnitude_squared() < DEGENERATE_EPSILON {
                Vec3::from(vertices[i0].normal)
            } else {
                face_normal.normalized()
            };
            deterministic_perpendicular(face_normal)
        } else {
            (edge1 * du2[1] - edge2 * du1[1]) / d
        };

        sums[i0] += raw_tangent;
        sums[i1] += raw_tangent;
        sums[i2] += raw_tangent;
    }

    vertices
        .iter()
        .zip(sums)
        .map(|(v, sum)| {
            let n = Vec3::from(v.normal).normalized();
            let orthogonalized = sum - n * n.dot(sum);
            let tangent = if !is_finite_vec3(orthogonalized)
                || orthogonalized.magnitude_squared() < DEGENERATE_EPSILON
            {
                deterministic_perpendicular(n)
            } else {
                orthogonalized.normalized()
            };
            ([tangent.x, tangent.y, tangent.z], 255u8)
        })
        .collect()
}

fn is_finite_vec3(v: Vec3<f32>) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(p: [f32; 3], n: [f32; 3], uv: [f32; 2]) -> Vertex {
        Vertex {
            position: p,
            normal: n,
            tangent: [0.0; 3],
            normal_w: 255,
            tangent_w: 255,
            uv0: uv,
            uv1: [0.0, 0.0],
        }
    }

    #[test]
    fn single_triangle_tangent_is_unit_and_perpendicular_to_normal() {
        let verts = vec![
            v([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            v([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            v([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
        ];
        let tris = vec![(0u16, 1u16, 2u16)];
        let out = solve_tangents(&verts, &tris);
        for (t, w) in &out {
            let len = (t[0] * t[0] + t[1] * t[1] + t[2] * t[2]).sqrt();
            assert!((len - 1.0).abs() < 1e-5);
            let dot = t[0] * 0.0 + t[1] * 0.0 + t[2] * 1.0;
            assert!(dot.abs() < 1e-5);
            assert_eq!(*w, 255);
        }
    }

    #[test]
    fn degenerate_uvs_still_produce_finite_unit_tangents() {
        let verts = vec![
            v([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.3, 0.3]),
            v([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.3, 0.3]),
            v([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.3, 0.3]),
        ];
        let tris = vec![(0u16, 1u16, 2u16)];
        let out = solve_tangents(&verts, &tris);
        for (t, _) in &out {
            assert!(t.iter().all(|c| c.is_finite()));
            let len = (t[0] * t[0] + t[1] * t[1] + t[2] * t[2]).sqrt();
            assert!((len - 1.0).abs() < 1e-4);
        }
    }
}
