//! Reads/writes the textual triangle-mesh interchange format and its
//! companion material file (§4.8).
//!
//! Not grounded in the teacher's own `fdm`/`oil` binary-section parsers
//! (this is a line-oriented text format, not a tagged binary container),
//! but kept in the teacher's "accumulate a struct field by field, carry
//! forward what we don't understand" spirit seen in `formats/oil.rs`'s
//! `trailing_unparsed` fields: unrecognised interchange-file directives
//! are skipped rather than rejected, matching common practice for this
//! ubiquitous format across the retrieval pack.

use std::collections::HashMap;

use thiserror::Error;

use super::mesh::{MeshGroup, Shader, Vertex};
use super::tangent;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ObjError {
    #[error("line {line}: face directive has fewer than 3 corners")]
    DegenerateFace { line: usize },

    #[error("line {line}: malformed face corner \"{corner}\"")]
    BadFaceCorner { line: usize, corner: String },

    #[error("line {line}: vertex/uv/normal index {index} is out of range")]
    IndexOutOfRange { line: usize, index: i64 },

    #[error("line {line}: expected a number, got \"{token}\"")]
    BadNumber { line: usize, token: String },
}

fn parse_f32(line: usize, token: &str) -> Result<f32, ObjError> {
    token.parse().map_err(|_| ObjError::BadNumber {
        line,
        token: token.to_string(),
    })
}

/// Resolves a 1-based-or-negative OBJ index against a list whose current
/// length is `len` (i.e. as it stands at this point in the file).
fn resolve_index(line: usize, raw: i64, len: usize) -> Result<usize, ObjError> {
    let idx = if raw < 0 {
        len as i64 + raw
    } else {
        raw - 1
    };
    if idx < 0 || idx as usize >= len {
        return Err(ObjError::IndexOutOfRange { line, index: raw });
    }
    Ok(idx as usize)
}

#[derive(Debug, Clone, Copy)]
struct FaceCorner {
    v: usize,
    vt: Option<usize>,
    vn: Option<usize>,
}

fn parse_face_corner(
    line: usize,
    token: &str,
    v_len: usize,
    vt_len: usize,
    vn_len: usize,
) -> Result<FaceCorner, ObjError> {
    let parts: Vec<&str> = token.split('/').collect();
    let bad = || ObjError::BadFaceCorner {
        line,
        corner: token.to_string(),
    };

    let parse_raw = |s: &str| -> Result<i64, ObjError> {
        s.parse::<i64>().map_err(|_| bad())
    };

    match parts.as_slice() {
        [v] => Ok(FaceCorner {
            v: resolve_index(line, parse_raw(v)?, v_len)?,
            vt: None,
            vn: None,
        }),
        [v, vt] if !vt.is_empty() => Ok(FaceCorner {
            v: resolve_index(line, parse_raw(v)?, v_len)?,
            vt: Some(resolve_index(line, parse_raw(vt)?, vt_len)?),
            vn: None,
        }),
        [v, vt] => {
            let _ = vt;
            Ok(FaceCorner {
                v: resolve_index(line, parse_raw(v)?, v_len)?,
                vt: None,
                vn: None,
            })
        }
        [v, vt, vn] => Ok(FaceCorner {
            v: resolve_index(line, parse_raw(v)?, v_len)?,
            vt: if vt.is_empty() {
                None
            } else {
                Some(resolve_index(line, parse_raw(vt)?, vt_len)?)
            },
            vn: if vn.is_empty() {
                None
            } else {
                Some(resolve_index(line, parse_raw(vn)?, vn_len)?)
            },
        }),
        _ => Err(bad()),
    }
}

fn face_normal(positions: &[[f32; 3]], corners: &[FaceCorner]) -> [f32; 3] {
    let p0 = vek::Vec3::from(positions[corners[0].v]);
    let p1 = vek::Vec3::from(positions[corners[1].v]);
    let p2 = vek::Vec3::from(positions[corners[2].v]);
    let n = (p1 - p0).cross(p2 - p0);
    if n.magnitude_squared() < 1e-12 {
        [0.0, 0.0, 1.0]
    } else {
        let n = n.normalized();
        [n.x, n.y, n.z]
    }
}

struct BuildingGroup {
    name: String,
    material_name: String,
    vertices: Vec<Vertex>,
    triangles: Vec<(u16, u16, u16)>,
    // Keyed on (v, vt, face index if vn missing else vn) to decide sharing.
    index_of: HashMap<(usize, Option<usize>, Option<usize>), u16>,
}

/// Parses the textual interchange format into one [`MeshGroup`] per
/// `g`/`usemtl`-delimited section (§4.8). `materials` maps a material
/// name (as named by `usemtl`) to the [`Shader`] already parsed out of
/// the companion `.mtl` text by [`parse_material_library`]; a `usemtl`
/// naming an unknown material gets a default (all-zero) `Shader` with
/// just its name set, rather than failing the whole read.
pub fn parse_mesh(text: &str, materials: &HashMap<String, Shader>) -> Result<Vec<MeshGroup>, ObjError> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut uvs: Vec<[f32; 2]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();

    let mut groups: Vec<BuildingGroup> = Vec::new();
    let mut current: Option<usize> = None;
    let mut pending_name = "default".to_string();
    let mut pending_material = String::new();
    let mut face_counter: usize = 0;

    for (line_no, raw_line) in text.lines().enumerate() {
        let line_no = line_no + 1;
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let directive = match tokens.next() {
            Some(d) => d,
            None => continue,
        };
        let rest: Vec<&str> = tokens.collect();

        match directive {
            "v" => {
                if rest.len() < 3 {
                    continue;
                }
                positions.push([
                    parse_f32(line_no, rest[0])?,
                    parse_f32(line_no, rest[1])?,
                    parse_f32(line_no, rest[2])?,
                ]);
            }
            "vt" => {
                if rest.len() < 2 {
                    continue;
                }
                uvs.push([parse_f32(line_no, rest[0])?, parse_f32(line_no, rest[1])?]);
            }
            "vn" => {
                if rest.len() < 3 {
                    continue;
                }
                normals.push([
                    parse_f32(line_no, rest[0])?,
                    parse_f32(line_no, rest[1])?,
                    parse_f32(line_no, rest[2])?,
                ]);
            }
            "g" => {
                pending_name = rest.first().map(|s| s.to_string()).unwrap_or_else(|| "default".to_string());
            }
            "usemtl" => {
                pending_material = rest.first().map(|s| s.to_string()).unwrap_or_default();
            }
            "f" => {
                if rest.len() < 3 {
                    return Err(ObjError::DegenerateFace { line: line_no });
                }
                let corners: Vec<FaceCorner> = rest
                    .iter()
                    .map(|t| parse_face_corner(line_no, t, positions.len(), uvs.len(), normals.len()))
                    .collect::<Result<_, _>>()?;

                let needs_face_normal = corners.iter().any(|c| c.vn.is_none());
                let computed_normal = if needs_face_normal {
                    Some(face_normal(&positions, &corners[0..3]))
                } else {
                    None
                };

                let group_idx = match current {
                    Some(idx)
                        if groups[idx].name == pending_name
                            && groups[idx].material_name == pending_material =>
                    {
                        idx
                    }
                    _ => {
                        groups.push(BuildingGroup {
                            name: pending_name.clone(),
                            material_name: pending_material.clone(),
                            vertices: Vec::new(),
                            triangles: Vec::new(),
                            index_of: HashMap::new(),
                        });
                        groups.len() - 1
                    }
                };
                current = Some(group_idx);

                // Fan-triangulate from the first vertex (§4.8).
                let mut local_indices = Vec::with_capacity(corners.len());
                for c in &corners {
                    let key = (c.v, c.vt, c.vn.or(Some(usize::MAX - face_counter)));
                    let group = &mut groups[group_idx];
                    let idx = *group.index_of.entry(key).or_insert_with(|| {
                        let position = positions[c.v];
                        let uv0 = c.vt.map(|i| uvs[i]).unwrap_or([0.0, 0.0]);
                        let normal = c
                            .vn
                            .map(|i| normals[i])
                            .or(computed_normal)
                            .unwrap_or([0.0, 0.0, 1.0]);
                        group.vertices.push(Vertex {
                            position,
                            normal,
                            tangent: [0.0, 0.0, 0.0],
                            normal_w: 255,
                            tangent_w: 255,
                            uv0,
                            uv1: [0.0, 0.0],
                        });
                        (group.vertices.len() - 1) as u16
                    });
                    local_indices.push(idx);
                }
                face_counter += 1;

                let group = &mut groups[group_idx];
                for i in 1..local_indices.len() - 1 {
                    group.triangles.push((
                        local_indices[0],
                        local_indices[i],
                        local_indices[i + 1],
                    ));
                }
            }
            _ => { /* mtllib and anything else: not this function's concern */ }
        }
    }

    Ok(groups
        .into_iter()
        .map(|g| {
            let mut vertices = g.vertices;
            let tangents = tangent::solve_tangents(&vertices, &g.triangles);
            for (v, (t, w)) in vertices.iter_mut().zip(tangents) {
                v.tangent = t;
                v.tangent_w = w;
            }
            let material = materials.get(&g.material_name).cloned().unwrap_or_else(|| Shader {
                name: g.material_name.clone(),
                ..Default::default()
            });
            MeshGroup {
                name: g.name,
                vertex_format: 1,
                vertices,
                triangles: g.triangles,
                material,
            }
        })
        .collect())
}

/// Normalizes a texture filename's extension to `.dds` (case-insensitive
/// match on the existing extension); used only when building a [`Shader`]
/// from a parsed material file (§4.8).
pub fn normalize_texture_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if ext.eq_ignore_ascii_case("dds") => format!("{stem}.{ext}"),
        Some((stem, _ext)) => format!("{stem}.dds"),
        None => format!("{name}.dds"),
    }
}

/// Parses a `.mtl`-style material library into a name→[`Shader`] map
/// (§4.8 material mapping table).
pub fn parse_material_library(text: &str) -> HashMap<String, Shader> {
    let mut materials = HashMap::new();
    let mut current: Option<Shader> = None;
    let mut current_name = String::new();

    macro_rules! flush {
        () => {
            if let Some(shader) = current.take() {
                materials.insert(current_name.clone(), shader);
            }
        };
    }

    for raw_line in text.lines() {
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let directive = match tokens.next() {
            Some(d) => d,
            None => continue,
        };
        let rest: Vec<&str> = tokens.collect();

        if directive == "newmtl" {
            flush!();
            current_name = rest.first().map(|s| s.to_string()).unwrap_or_default();
            current = Some(Shader {
                name: current_name.clone(),
                ..Default::default()
            });
            continue;
        }

        let Some(shader) = current.as_mut() else { continue };
        let f = |s: &str| s.parse::<f32>().unwrap_or(0.0);
        match directive {
            "Kd" if rest.len() >= 3 => {
                shader.dest_color = [f(rest[0]), f(rest[1]), f(rest[2]), 1.0];
            }
            "Ks" if rest.len() >= 3 => {
                shader.spec_color[0] = f(rest[0]);
                shader.spec_color[1] = f(rest[1]);
                shader.spec_color[2] = f(rest[2]);
            }
            "Ns" if !rest.is_empty() => {
                shader.spec_color[3] = f(rest[0]);
            }
            "d" if !rest.is_empty() => {
                shader.alpha = f(rest[0]);
            }
            "map_Kd" if !rest.is_empty() => {
                shader.tex_s0 = normalize_texture_name(rest.last().unwrap());
            }
            "map_bump" | "bump" if !rest.is_empty() => {
                shader.tex_s1 = normalize_texture_name(rest.last().unwrap());
            }
            "map_Ka" if !rest.is_empty() => {
                shader.tex_s2 = normalize_texture_name(rest.last().unwrap());
            }
            _ => {}
        }
    }
    flush!();
    materials
}

/// Writes the interchange text for `groups`: positions, uv0, per-vertex
/// normals, and triangle faces. UV1 is intentionally not emitted (§4.8,
/// §9 "External-format UV2 loss"): the skeleton mechanism is what
/// preserves it.
///
/// `mtllib_name` is the companion material file's name as it should
/// appear in the `mtllib` directive (§4.8 lists `mtllib` among the
/// supported directives), so a standard OBJ consumer can find the
/// materials without being told the path out of band.
pub fn write_mesh(groups: &[MeshGroup], mtllib_name: &str) -> String {
    let mut out = String::new();
    out.push_str("# written by ntf-toolkit\n");
    out.push_str(&format!("mtllib {mtllib_name}\n"));

    let mut base: u32 = 0;
    let mut blocks = Vec::with_capacity(groups.len());
    for group in groups {
        for v in &group.vertices {
            out.push_str(&format!("v {} {} {}\n", v.position[0], v.position[1], v.position[2]));
        }
        for v in &group.vertices {
            out.push_str(&format!("vt {} {}\n", v.uv0[0], v.uv0[1]));
        }
        for v in &group.vertices {
            out.push_str(&format!("vn {} {} {}\n", v.normal[0], v.normal[1], v.normal[2]));
        }
        blocks.push(base);
        base += group.vertices.len() as u32;
    }

    for (group, base) in groups.iter().zip(blocks) {
        out.push_str(&format!("g {}\n", group.name));
        out.push_str(&format!("usemtl {}\n", group.material.name));
        for &(a, b, c) in &group.triangles {
            let (a, b, c) = (a as u32 + base + 1, b as u32 + base + 1, c as u32 + base + 1);
            out.push_str(&format!("f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}\n"));
        }
    }

    out
}

/// Writes the companion `.mtl` text for every distinct material name
/// among `groups`, in first-seen order.
pub fn write_material_library(groups: &[MeshGroup]) -> String {
    let mut out = String::new();
    let mut seen = std::collections::HashSet::new();
    for group in groups {
        let m = &group.material;
        if !seen.insert(m.name.clone()) {
            continue;
        }
        out.push_str(&format!("newmtl {}\n", m.name));
        out.push_str(&format!(
            "Kd {} {} {}\n",
            m.dest_color[0], m.dest_color[1], m.dest_color[2]
        ));
        out.push_str(&format!(
            "Ks {} {} {}\n",
            m.spec_color[0], m.spec_color[1], m.spec_color[2]
        ));
        out.push_str(&format!("Ns {}\n", m.spec_color[3]));
        out.push_str(&format!("d {}\n", m.alpha));
        if !m.tex_s0.is_empty() {
            out.push_str(&format!("map_Kd {}\n", m.tex_s0));
        }
        if !m.tex_s1.is_empty() {
            out.push_str(&format!("map_bump {}\n", m.tex_s1));
        }
        if !m.tex_s2.is_empty() {
            out.push_str(&format!("map_Ka {}\n", m.tex_s2));
        }
        out.push('\n');
    }
    out
}
