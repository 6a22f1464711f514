//! MTL material library parser.

use std::io::{self, BufRead};

use crate::error::{ImportError, ImportResult};
use crate::mesh::Material;

/// Parse an MTL library held in memory.
pub fn load_mtl_from_str(contents: &str) -> ImportResult<Vec<Material>> {
    parse_mtl(io::Cursor::new(contents))
}

/// Parse an MTL library from a [`BufRead`] implementation.
pub fn load_mtl_from_reader<R: BufRead>(reader: R) -> ImportResult<Vec<Material>> {
    parse_mtl(reader)
}

fn parse_mtl<R: BufRead>(reader: R) -> ImportResult<Vec<Material>> {
    let mut materials: Vec<Material> = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| ImportError::io("material library", e))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };

        if tag == "newmtl" {
            let name = parts.collect::<Vec<_>>().join(" ");
            if name.is_empty() {
                return Err(ImportError::parse(line_no, "newmtl without a name"));
            }
            materials.push(Material::named(name));
            continue;
        }

        // Unknown directives are ignored; known ones need a current material.
        let known = matches!(tag, "Ka" | "Kd" | "Ks" | "Ns" | "d" | "Tr" | "illum" | "map_Kd");
        if !known {
            continue;
        }
        let current = materials
            .last_mut()
            .ok_or_else(|| ImportError::parse(line_no, format!("'{tag}' before any newmtl")))?;

        match tag {
            "Ka" => current.ambient = parse_rgb(&mut parts, line_no, tag)?,
            "Kd" => current.diffuse = parse_rgb(&mut parts, line_no, tag)?,
            "Ks" => current.specular = parse_rgb(&mut parts, line_no, tag)?,
            "Ns" => current.shininess = parse_f32(parts.next(), line_no, tag)?,
            "d" => current.dissolve = parse_f32(parts.next(), line_no, tag)?,
            "Tr" => current.dissolve = 1.0 - parse_f32(parts.next(), line_no, tag)?,
            "illum" => {
                let token = parts
                    .next()
                    .ok_or_else(|| ImportError::parse(line_no, "missing illum value"))?;
                current.illum = token.parse::<i32>().map_err(|_| {
                    ImportError::parse(line_no, format!("invalid illum value '{token}'"))
                })?;
            }
            "map_Kd" => {
                // Options such as `-s 1 1 1` may precede the file name.
                let file = parts
                    .last()
                    .ok_or_else(|| ImportError::parse(line_no, "map_Kd without a file name"))?;
                current.texture = Some(file.to_string());
            }
            _ => unreachable!("filtered by `known`"),
        }
    }

    Ok(materials)
}

fn parse_rgb<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    line_no: usize,
    what: &str,
) -> ImportResult<[f32; 3]> {
    let r = parse_f32(parts.next(), line_no, what)?;
    // A single value means grey.
    match parts.next() {
        None => Ok([r, r, r]),
        Some(g) => {
            let g = parse_f32(Some(g), line_no, what)?;
            let b = parse_f32(parts.next(), line_no, what)?;
            Ok([r, g, b])
        }
    }
}

fn parse_f32(value: Option<&str>, line_no: usize, what: &str) -> ImportResult<f32> {
    let token = value.ok_or_else(|| ImportError::parse(line_no, format!("missing {what} value")))?;
    token
        .parse::<f32>()
        .map_err(|_| ImportError::parse(line_no, format!("invalid {what} value '{token}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_two_materials() {
        let src = r#"
            # Blender MTL File
            newmtl Skin
            Ns 225.000000
            Ka 1.000000 1.000000 1.000000
            Kd 0.800000 0.600000 0.100000
            Ks 0.500000 0.500000 0.500000
            d 0.5
            illum 2
            map_Kd sponge.png

            newmtl Eyes
            Kd 0.1 0.1 0.1
            Tr 0.25
        "#;
        let materials = load_mtl_from_str(src).expect("parse mtl");
        assert_eq!(materials.len(), 2);

        let skin = &materials[0];
        assert_eq!(skin.name, "Skin");
        assert_eq!(skin.diffuse, [0.8, 0.6, 0.1]);
        assert_eq!(skin.ambient, [1.0, 1.0, 1.0]);
        assert_eq!(skin.shininess, 225.0);
        assert_eq!(skin.dissolve, 0.5);
        assert_eq!(skin.illum, 2);
        assert_eq!(skin.texture.as_deref(), Some("sponge.png"));

        let eyes = &materials[1];
        assert_eq!(eyes.texture, None);
        assert!((eyes.dissolve - 0.75).abs() < 1e-6);
        assert_eq!(eyes.specular, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn map_kd_options_are_skipped() {
        let materials = load_mtl_from_str("newmtl a\nmap_Kd -s 2 2 1 tex/grass.png\n").unwrap();
        assert_eq!(materials[0].texture.as_deref(), Some("tex/grass.png"));
    }

    #[test]
    fn field_before_newmtl_is_rejected() {
        let err = load_mtl_from_str("Kd 1 0 0\n").unwrap_err();
        assert!(matches!(err, ImportError::Parse { line: 1, .. }));
    }

    #[test]
    fn bad_number_is_a_parse_error() {
        let err = load_mtl_from_str("newmtl a\nNs shiny\n").unwrap_err();
        assert!(matches!(err, ImportError::Parse { line: 2, .. }));
    }
}
