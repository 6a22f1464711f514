//! Default render path shared by entity classes.

use crate::Vec3;
use crate::entity::Entity;
use crate::gfx::GraphicsDevice;

/// Draw the entity's mesh one submesh at a time.
///
/// Each submesh gets its material's texture (or none) and the material's
/// diffuse colour tinted by the entity colour. Faces with no material are
/// drawn last, untextured and opaque. Entities without an uploaded mesh
/// draw nothing.
pub fn draw_entity_basic(entity: &Entity, gfx: &mut dyn GraphicsDevice) {
    let Some(mesh) = &entity.mesh else {
        return;
    };
    let Some(gpu) = mesh.gpu() else {
        return;
    };

    gfx.set_transform(entity.model_matrix());
    gfx.bind_mesh(gpu);

    for submesh in mesh.submeshes() {
        let (diffuse, alpha) = mesh
            .materials()
            .get(submesh.material)
            .map(|m| (Vec3::from(m.diffuse), m.dissolve))
            .unwrap_or((Vec3::ONE, 1.0));

        gfx.bind_texture(mesh.texture(submesh.material));
        gfx.set_material(diffuse * entity.color, alpha);
        gfx.draw_triangles(submesh.first_vertex, submesh.vertex_count);
    }

    let untagged = mesh.untagged_range();
    if !untagged.is_empty() {
        gfx.bind_texture(None);
        gfx.set_material(entity.color, 1.0);
        gfx.draw_triangles(untagged.start, untagged.len() as u32);
    }
}
