//! Path-keyed mesh cache. Each distinct path is imported, uploaded and
//! has its textures resolved exactly once; records live until the cache
//! is dropped.

use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use asset::texture::TextureData;
use asset::{ImportResult, Material, ObjModel, ObjVertex, Submesh};

use crate::error::{CoreError, CoreResult};
use crate::gfx::{GpuMeshId, GraphicsDevice, TextureId};

/// Shared, non-owning view of a cached mesh. Compare with [`Rc::ptr_eq`].
pub type MeshHandle = Rc<MeshRecord>;

/// A loaded mesh together with its GPU-side handles.
#[derive(Debug)]
pub struct MeshRecord {
    path: PathBuf,
    model: ObjModel,
    /// `None` when the model had no faces to upload.
    gpu: Option<GpuMeshId>,
    /// Resolved texture per material, parallel to `model.materials`.
    textures: Vec<Option<TextureId>>,
}

impl MeshRecord {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn model(&self) -> &ObjModel {
        &self.model
    }

    pub fn vertex_count(&self) -> usize {
        self.model.vertex_count()
    }

    pub fn materials(&self) -> &[Material] {
        &self.model.materials
    }

    pub fn submeshes(&self) -> &[Submesh] {
        &self.model.submeshes
    }

    pub fn gpu(&self) -> Option<GpuMeshId> {
        self.gpu
    }

    pub fn texture(&self, material: usize) -> Option<TextureId> {
        self.textures.get(material).copied().flatten()
    }

    /// Faces that belong to no material.
    pub fn untagged_range(&self) -> Range<u32> {
        self.model.untagged_range()
    }
}

#[derive(Debug, Default)]
pub struct MeshCache {
    meshes: HashMap<PathBuf, MeshHandle>,
    /// Keyed by resolved texture path; `None` records a failed decode.
    textures: HashMap<PathBuf, Option<TextureId>>,
}

impl MeshCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached mesh for `path`, importing and uploading it on
    /// first use. Failures are not cached, so a later call retries.
    pub fn get_or_load(
        &mut self,
        path: impl AsRef<Path>,
        gfx: &mut dyn GraphicsDevice,
    ) -> CoreResult<MeshHandle> {
        self.get_or_load_with(path, gfx, |p| asset::obj::load_obj_from_path(p))
    }

    /// Same as [`get_or_load`](Self::get_or_load) with a custom importer.
    pub fn get_or_load_with<F>(
        &mut self,
        path: impl AsRef<Path>,
        gfx: &mut dyn GraphicsDevice,
        import: F,
    ) -> CoreResult<MeshHandle>
    where
        F: FnOnce(&Path) -> ImportResult<ObjModel>,
    {
        let path = path.as_ref();
        if let Some(existing) = self.meshes.get(path) {
            return Ok(Rc::clone(existing));
        }

        let model = import(path).map_err(|e| {
            log::error!("Failed to load model '{}': {}", path.display(), e);
            CoreError::import(path.display().to_string(), e)
        })?;

        let record = self.upload(path, model, gfx);
        log::info!(
            "Loaded model '{}' - vertices: {} size: {} materials: {} submeshes: {}",
            path.display(),
            record.vertex_count(),
            record.model.byte_size(),
            record.materials().len(),
            record.submeshes().len()
        );

        let handle = Rc::new(record);
        self.meshes.insert(path.to_path_buf(), Rc::clone(&handle));
        Ok(handle)
    }

    /// Cached mesh for `path`, without loading.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<MeshHandle> {
        self.meshes.get(path.as_ref()).cloned()
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.meshes.contains_key(path.as_ref())
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    fn upload(&mut self, path: &Path, model: ObjModel, gfx: &mut dyn GraphicsDevice) -> MeshRecord {
        let dir = path.parent().unwrap_or_else(|| Path::new(""));

        let mut textures = Vec::with_capacity(model.materials.len());
        for material in &model.materials {
            let texture = match &material.texture {
                Some(file) => self.resolve_texture(&dir.join(file), gfx),
                None => None,
            };
            textures.push(texture);
        }

        let gpu = if model.is_empty() {
            log::warn!("Model '{}' has no faces; nothing to upload", path.display());
            None
        } else {
            let label = path.display().to_string();
            Some(gfx.upload_vertices(&label, model.as_floats(), &ObjVertex::LAYOUT))
        };

        MeshRecord {
            path: path.to_path_buf(),
            model,
            gpu,
            textures,
        }
    }

    fn resolve_texture(&mut self, path: &Path, gfx: &mut dyn GraphicsDevice) -> Option<TextureId> {
        if let Some(&cached) = self.textures.get(path) {
            return cached;
        }

        let id = match TextureData::load(path) {
            Ok(texture) => Some(gfx.create_texture(&path.display().to_string(), &texture)),
            Err(e) => {
                log::warn!("Failed to load texture at '{}': {}", path.display(), e);
                None
            }
        };
        self.textures.insert(path.to_path_buf(), id);
        id
    }
}
