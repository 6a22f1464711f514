//! OBJ parser supporting positions, normals, texture coordinates and
//! MTL materials. Faces with more than three corners are fan-triangulated
//! and every triangle corner becomes its own vertex (no index buffer).

use std::{
    collections::HashMap,
    fs::{self, File},
    io::{self, BufRead, BufReader},
    path::Path,
};

use crate::error::{ImportError, ImportResult};
use crate::mesh::{Material, ObjModel, ObjVertex, Submesh};
use crate::mtl;

const DEFAULT_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];
const DEFAULT_UV: [f32; 2] = [0.0, 0.0];
const UNTINTED: [f32; 3] = [1.0, 1.0, 1.0];

/// Load an OBJ mesh from a file path. `mtllib` references are resolved
/// relative to the file's directory.
pub fn load_obj_from_path(path: impl AsRef<Path>) -> ImportResult<ObjModel> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| ImportError::io(path.display().to_string(), e))?;
    let dir = path.parent().unwrap_or_else(|| Path::new(""));

    load_obj_from_reader(BufReader::new(file), |name| {
        let mtl_path = dir.join(name);
        fs::read_to_string(&mtl_path).map_err(|e| ImportError::io(mtl_path.display().to_string(), e))
    })
}

/// Load an OBJ mesh from a [`BufRead`] implementation. `resolve_mtl` maps a
/// `mtllib` name to the library's contents.
pub fn load_obj_from_reader<R, F>(reader: R, resolve_mtl: F) -> ImportResult<ObjModel>
where
    R: BufRead,
    F: FnMut(&str) -> ImportResult<String>,
{
    parse_obj(reader, resolve_mtl)
}

/// Convenience helper to parse an OBJ string literal without materials.
pub fn load_obj_from_str(contents: &str) -> ImportResult<ObjModel> {
    parse_obj(io::Cursor::new(contents), |name| {
        Err(ImportError::io(
            name,
            io::Error::new(io::ErrorKind::NotFound, "no material resolver"),
        ))
    })
}

/// Parse an OBJ string, resolving material libraries through `resolve_mtl`.
pub fn load_obj_from_str_with<F>(contents: &str, resolve_mtl: F) -> ImportResult<ObjModel>
where
    F: FnMut(&str) -> ImportResult<String>,
{
    parse_obj(io::Cursor::new(contents), resolve_mtl)
}

/// One face corner, already resolved to zero-based indices.
#[derive(Clone, Copy, Debug)]
struct Corner {
    position: usize,
    uv: Option<usize>,
    normal: Option<usize>,
}

#[derive(Clone, Copy, Debug)]
struct Triangle {
    corners: [Corner; 3],
    material: Option<usize>,
}

fn parse_obj<R, F>(reader: R, mut resolve_mtl: F) -> ImportResult<ObjModel>
where
    R: BufRead,
    F: FnMut(&str) -> ImportResult<String>,
{
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();
    let mut texcoords: Vec<[f32; 2]> = Vec::new();

    let mut materials: Vec<Material> = Vec::new();
    let mut material_ids: HashMap<String, usize> = HashMap::new();
    let mut current_material: Option<usize> = None;

    let mut triangles: Vec<Triangle> = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData => ImportError::parse(line_no, "line is not valid UTF-8"),
            _ => ImportError::io(format!("OBJ line {}", line_no + 1), e),
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };

        match tag {
            "v" => {
                let x = parse_f32(parts.next(), line_no, "x coordinate")?;
                let y = parse_f32(parts.next(), line_no, "y coordinate")?;
                let z = parse_f32(parts.next(), line_no, "z coordinate")?;
                positions.push([x, y, z]);
            }
            "vt" => {
                let u = parse_f32(parts.next(), line_no, "u coordinate")?;
                // `vt u` alone is legal, v defaults to 0.
                let v = match parts.next() {
                    Some(token) => parse_f32(Some(token), line_no, "v coordinate")?,
                    None => 0.0,
                };
                texcoords.push([u, v]);
            }
            "vn" => {
                let nx = parse_f32(parts.next(), line_no, "nx coordinate")?;
                let ny = parse_f32(parts.next(), line_no, "ny coordinate")?;
                let nz = parse_f32(parts.next(), line_no, "nz coordinate")?;
                normals.push([nx, ny, nz]);
            }
            "f" => {
                let mut corners: Vec<Corner> = Vec::new();
                for part in parts {
                    corners.push(parse_face_vertex(
                        part,
                        positions.len(),
                        texcoords.len(),
                        normals.len(),
                        line_no,
                    )?);
                }
                if corners.len() < 3 {
                    return Err(ImportError::parse(
                        line_no,
                        format!("face needs at least 3 vertices, got {}", corners.len()),
                    ));
                }

                // Triangulate fan
                for tri in 1..(corners.len() - 1) {
                    triangles.push(Triangle {
                        corners: [corners[0], corners[tri], corners[tri + 1]],
                        material: current_material,
                    });
                }
            }
            "mtllib" => {
                for name in parts {
                    match resolve_mtl(name).and_then(|src| mtl::load_mtl_from_str(&src)) {
                        Ok(library) => {
                            for material in library {
                                material_ids.insert(material.name.clone(), materials.len());
                                materials.push(material);
                            }
                        }
                        Err(ImportError::Parse { line, message }) => {
                            return Err(ImportError::Parse {
                                line,
                                message: format!("in material library '{name}': {message}"),
                            });
                        }
                        Err(err) => {
                            log::warn!("Skipping material library '{}': {}", name, err);
                        }
                    }
                }
            }
            "usemtl" => {
                let name = parts.collect::<Vec<_>>().join(" ");
                current_material = material_ids.get(&name).copied();
                if current_material.is_none() {
                    log::warn!(
                        "Unknown material '{}' on line {}; faces will be untextured",
                        name,
                        line_no + 1
                    );
                }
            }
            _ => {
                // Ignore other directives (o/g/s/etc.)
            }
        }
    }

    build_model(&positions, &normals, &texcoords, materials, triangles)
}

fn build_model(
    positions: &[[f32; 3]],
    normals: &[[f32; 3]],
    texcoords: &[[f32; 2]],
    materials: Vec<Material>,
    triangles: Vec<Triangle>,
) -> ImportResult<ObjModel> {
    let mut face_counts = vec![0usize; materials.len()];
    for tri in &triangles {
        if let Some(id) = tri.material {
            face_counts[id] += 1;
        }
    }

    // Group faces by material so each submesh is one contiguous range;
    // faces without a material go last. The sort is stable, so face order
    // inside a group is preserved.
    let mut order: Vec<usize> = (0..triangles.len()).collect();
    order.sort_by_key(|&i| triangles[i].material.unwrap_or(usize::MAX));

    let mut vertices = reserve_vertices(triangles.len() * 3)?;

    for &i in &order {
        let tri = &triangles[i];
        let tint = tri
            .material
            .map(|id| materials[id].diffuse)
            .unwrap_or(UNTINTED);

        for corner in &tri.corners {
            let uv = corner
                .uv
                .and_then(|i| texcoords.get(i).copied())
                .unwrap_or(DEFAULT_UV);
            let normal = corner
                .normal
                .and_then(|i| normals.get(i).copied())
                .unwrap_or(DEFAULT_NORMAL);
            vertices.push(ObjVertex::new(positions[corner.position], normal, uv, tint));
        }
    }

    let mut submeshes: Vec<Submesh> = Vec::new();
    let mut offset = 0u32;
    for (material, &faces) in face_counts.iter().enumerate() {
        if faces == 0 {
            continue;
        }
        let vertex_count = (faces * 3) as u32;
        submeshes.push(Submesh {
            first_vertex: offset,
            vertex_count,
            material,
        });
        offset += vertex_count;
    }

    Ok(ObjModel {
        vertices,
        materials,
        submeshes,
    })
}

fn reserve_vertices(count: usize) -> ImportResult<Vec<ObjVertex>> {
    let mut vertices = Vec::new();
    vertices
        .try_reserve_exact(count)
        .map_err(|_| ImportError::Allocation {
            what: "vertex buffer",
            bytes: count.saturating_mul(ObjVertex::LAYOUT.stride),
        })?;
    Ok(vertices)
}

fn parse_f32(value: Option<&str>, line_no: usize, what: &str) -> ImportResult<f32> {
    let token = value.ok_or_else(|| ImportError::parse(line_no, format!("missing {what}")))?;
    token
        .parse::<f32>()
        .map_err(|_| ImportError::parse(line_no, format!("failed to parse {what} '{token}'")))
}

fn parse_face_vertex(
    token: &str,
    pos_count: usize,
    tex_count: usize,
    norm_count: usize,
    line_no: usize,
) -> ImportResult<Corner> {
    let mut split = token.split('/');
    let pos = split.next().unwrap_or_default();
    if pos.is_empty() {
        return Err(ImportError::parse(
            line_no,
            format!("malformed face element '{token}'"),
        ));
    }
    let position = resolve_index(pos, pos_count, line_no)?;

    let uv = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, tex_count, line_no)?),
        _ => None,
    };

    let normal = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, norm_count, line_no)?),
        _ => None,
    };

    Ok(Corner {
        position,
        uv,
        normal,
    })
}

fn resolve_index(token: &str, len: usize, line_no: usize) -> ImportResult<usize> {
    let raw = token
        .parse::<i64>()
        .map_err(|_| ImportError::parse(line_no, format!("invalid index '{token}'")))?;
    if raw == 0 {
        return Err(ImportError::parse(line_no, "OBJ indices are 1-based; found 0"));
    }

    let idx = if raw > 0 { raw - 1 } else { len as i64 + raw };

    if idx < 0 || idx as usize >= len {
        return Err(ImportError::parse(
            line_no,
            format!("index {raw} resolved out of bounds (len={len})"),
        ));
    }

    Ok(idx as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_MATERIALS_MTL: &str = "newmtl red\nKd 1 0 0\nnewmtl blue\nKd 0 0 1\nmap_Kd blue.png\n";

    fn with_materials(src: &str) -> ObjModel {
        load_obj_from_str_with(src, |name| {
            assert_eq!(name, "scene.mtl");
            Ok(TWO_MATERIALS_MTL.to_string())
        })
        .expect("parse obj")
    }

    #[test]
    fn parse_simple_triangle() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            vn 0.0 0.0 1.0
            vt 0.0 0.0
            vt 1.0 0.0
            vt 0.0 1.0
            f 1/1/1 2/2/1 3/3/1
        "#;
        let mesh = load_obj_from_str(src).expect("parse triangle");
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.vertices[1].uv, [1.0, 0.0]);
        assert_eq!(mesh.vertices[2].position, [0.0, 1.0, 0.0]);
        assert_eq!(mesh.vertices[0].tint, UNTINTED);
        assert!(mesh.submeshes.is_empty());
    }

    #[test]
    fn quad_becomes_two_triangles() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let mesh = load_obj_from_str(src).unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn pentagon_is_fanned_from_first_vertex() {
        let src = "v 0 0 0\nv 1 0 0\nv 2 1 0\nv 1 2 0\nv 0 1 0\nf 1 2 3 4 5\n";
        let mesh = load_obj_from_str(src).unwrap();
        assert_eq!(mesh.vertex_count(), 9);

        let p = |i: usize| mesh.vertices[i].position;
        for tri in 0..3 {
            assert_eq!(p(tri * 3), [0.0, 0.0, 0.0]);
        }
        assert_eq!(p(1), [1.0, 0.0, 0.0]);
        assert_eq!(p(2), [2.0, 1.0, 0.0]);
        assert_eq!(p(4), [2.0, 1.0, 0.0]);
        assert_eq!(p(5), [1.0, 2.0, 0.0]);
        assert_eq!(p(7), [1.0, 2.0, 0.0]);
        assert_eq!(p(8), [0.0, 1.0, 0.0]);
    }

    #[test]
    fn faces_are_grouped_into_one_submesh_per_material() {
        // Interleaved usemtl: blue, red, blue, then red quad.
        let src = r#"
            mtllib scene.mtl
            v 0 0 0
            v 1 0 0
            v 0 1 0
            v 1 1 0
            usemtl blue
            f 1 2 3
            usemtl red
            f 1 2 3
            usemtl blue
            f 2 4 3
            usemtl red
            f 1 2 4 3
        "#;
        let mesh = with_materials(src);
        assert_eq!(mesh.materials.len(), 2);
        assert_eq!(mesh.submeshes.len(), 2);

        let red = mesh.submeshes[0];
        let blue = mesh.submeshes[1];
        assert_eq!((red.material, red.first_vertex, red.vertex_count), (0, 0, 9));
        assert_eq!((blue.material, blue.first_vertex, blue.vertex_count), (1, 9, 6));

        let total: u32 = mesh.submeshes.iter().map(|s| s.vertex_count).sum();
        assert_eq!(total as usize, mesh.vertex_count());
        for sub in &mesh.submeshes {
            assert_eq!(sub.vertex_count % 3, 0);
            for v in sub.range() {
                let expected = mesh.materials[sub.material].diffuse;
                assert_eq!(mesh.vertices[v as usize].tint, expected);
            }
        }
        assert_eq!(mesh.materials[1].texture.as_deref(), Some("blue.png"));
    }

    #[test]
    fn unknown_material_faces_trail_untinted() {
        let src = r#"
            mtllib scene.mtl
            v 0 0 0
            v 1 0 0
            v 0 1 0
            usemtl missing
            f 1 2 3
            usemtl red
            f 1 2 3
        "#;
        let mesh = with_materials(src);
        assert_eq!(mesh.submeshes.len(), 1);
        assert_eq!(mesh.submeshes[0].range(), 0..3);
        assert_eq!(mesh.untagged_range(), 3..6);
        assert_eq!(mesh.vertices[4].tint, UNTINTED);
    }

    #[test]
    fn missing_material_library_is_not_fatal() {
        let src = "mtllib gone.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl red\nf 1 2 3\n";
        let mesh = load_obj_from_str(src).unwrap();
        assert!(mesh.materials.is_empty());
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn malformed_material_library_fails_import() {
        let src = "mtllib broken.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl red\nf 1 2 3\n";
        let err = load_obj_from_str_with(src, |_| Ok("newmtl red\nKd 1 zero 0\n".to_string()))
            .unwrap_err();
        match err {
            ImportError::Parse { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("broken.mtl"), "{message}");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let bytes: &[u8] = b"v 0 0 0\nv \xff 0 0\n";
        let err = load_obj_from_reader(bytes, |_| unreachable!()).unwrap_err();
        assert!(matches!(err, ImportError::Parse { line: 2, .. }), "{err:?}");
    }

    #[test]
    fn oversized_vertex_buffer_reports_allocation_failure() {
        let err = reserve_vertices(usize::MAX / ObjVertex::LAYOUT.stride).unwrap_err();
        assert!(
            matches!(err, ImportError::Allocation { what: "vertex buffer", .. }),
            "{err:?}"
        );
    }

    #[test]
    fn index_forms_and_negative_indices() {
        let src = r#"
            v 0 0 0
            v 1 0 0
            v 0 1 0
            vt 0.5 0.5
            vn 0 1 0
            f -3//1 -2/1 -1/1/1
        "#;
        let mesh = load_obj_from_str(src).unwrap();
        assert_eq!(mesh.vertices[0].normal, [0.0, 1.0, 0.0]);
        assert_eq!(mesh.vertices[0].uv, DEFAULT_UV);
        assert_eq!(mesh.vertices[1].normal, DEFAULT_NORMAL);
        assert_eq!(mesh.vertices[1].uv, [0.5, 0.5]);
        assert_eq!(mesh.vertices[2].position, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn empty_source_is_a_valid_empty_model() {
        let mesh = load_obj_from_str("# nothing here\no empty\n").unwrap();
        assert!(mesh.is_empty());
        assert!(mesh.submeshes.is_empty());
    }

    #[test]
    fn malformed_input_reports_parse_errors() {
        let cases = [
            "v 0 0\n",
            "v 0 0 zero\n",
            "v 0 0 0\nv 1 0 0\nf 1 2\n",
            "v 0 0 0\nf 1 2 3\n",
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n",
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1/x 2 3\n",
        ];
        for src in cases {
            let err = load_obj_from_str(src).unwrap_err();
            assert!(matches!(err, ImportError::Parse { .. }), "{src:?} -> {err}");
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_obj_from_path("/definitely/not/here.obj").unwrap_err();
        assert!(matches!(err, ImportError::Io { .. }));
    }

    #[test]
    fn path_loading_resolves_mtllib_next_to_obj() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("scene.mtl"), TWO_MATERIALS_MTL).unwrap();
        fs::write(
            dir.path().join("tri.obj"),
            "mtllib scene.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl blue\nf 1 2 3\n",
        )
        .unwrap();

        let mesh = load_obj_from_path(dir.path().join("tri.obj")).unwrap();
        assert_eq!(mesh.submeshes.len(), 1);
        assert_eq!(mesh.submeshes[0].material, 1);
        assert_eq!(mesh.vertices[0].tint, [0.0, 0.0, 1.0]);
    }
}
