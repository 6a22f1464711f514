//! Core types: math re-exports, entity classes and instances, the mesh
//! cache, collaborator traits for graphics and physics, and the per-frame
//! driver.

pub use glam::{EulerRot, Mat4, Quat, Vec3, vec3};

pub mod cache;
pub mod class;
pub mod draw;
pub mod entity;
pub mod error;
pub mod frame;
pub mod gfx;
pub mod physics;
pub mod transform;
pub mod view;
pub mod world;

pub use cache::{MeshCache, MeshHandle, MeshRecord};
pub use class::{ClassHandle, ClassRegistry, EntityCallbacks, EntityClass, SpawnContext};
pub use entity::{Entity, EntityId, EntityInit, EntityRegistry, MAX_ENTITIES};
pub use error::{CoreError, CoreResult};
pub use frame::FrameDispatcher;
pub use gfx::{GpuMeshId, GraphicsDevice, TextureId};
pub use physics::{BodyHandle, GeomHandle, PhysicsWorld, Shape};
pub use transform::Transform;
pub use view::RenderView;
pub use world::World;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_then_rotate_matrix() {
        let t = Transform::new(vec3(1.0, 2.0, 3.0), vec3(0.0, 90.0, 0.0));
        let m = t.matrix();
        // Last column is the translation, rotation leaves it alone.
        let c = m.to_cols_array();
        assert!((c[12] - 1.0).abs() < 1e-6);
        assert!((c[13] - 2.0).abs() < 1e-6);
        assert!((c[14] - 3.0).abs() < 1e-6);
        // +90 degrees about Y turns +X into -Z.
        let x = m.transform_vector3(Vec3::X);
        assert!((x - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn render_view_pv_is_finite() {
        let view = RenderView::new(vec3(0.0, 2.0, 6.0), vec3(0.0, -0.3, -1.0), 60.0, 0.1, 100.0)
            .with_aspect(16.0 / 9.0);
        let a = view.proj_view().to_cols_array();
        assert!(a.iter().all(|f| f.is_finite()));
    }
}
