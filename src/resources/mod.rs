//! Model importers and the registry they are activated in.
//!
//! Importers are extensions of the viewer: the registry knows which ones can be
//! activated (their factories are compiled in) but only activates them when the
//! dependency resolver asks for them. The registry is therefore the shared
//! "library handle" the resolver checks presence against.

use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, RwLock},
};

use crate::{
    data_structures::model::ModelData,
    platform::{self, BoxedFuture, MaybeSend, MaybeSync},
    resolver::ExtensionHost,
};

pub mod fetch;
pub mod glb;
pub mod obj;

pub const GLTF_EXTENSION: &str = "GLTFLoader";
pub const OBJ_EXTENSION: &str = "OBJLoader";

/// Decodes a file into CPU mesh data.
pub trait AssetImporter: MaybeSend + MaybeSync {
    fn import(&self, url: &str) -> BoxedFuture<'static, anyhow::Result<ModelData>>;
}

/// The two file formats the viewer understands.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AssetFormat {
    Gltf,
    Obj,
}

impl AssetFormat {
    /// Format by file extension (case-insensitive), `None` if unsupported.
    pub fn from_url(url: &str) -> Option<Self> {
        let extension = Path::new(url).extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "glb" => Some(Self::Gltf),
            "obj" => Some(Self::Obj),
            _ => None,
        }
    }

    /// Identifier of the extension that provides the importer for this format.
    pub fn extension_id(&self) -> &'static str {
        match self {
            Self::Gltf => GLTF_EXTENSION,
            Self::Obj => OBJ_EXTENSION,
        }
    }
}

pub type ImporterFactory = fn() -> Arc<dyn AssetImporter>;

fn gltf_importer() -> Arc<dyn AssetImporter> {
    Arc::new(glb::GltfImporter)
}

fn obj_importer() -> Arc<dyn AssetImporter> {
    Arc::new(obj::ObjImporter)
}

#[derive(Default)]
struct Registry {
    available: HashMap<String, (AssetFormat, ImporterFactory)>,
    active: HashMap<String, (AssetFormat, Arc<dyn AssetImporter>)>,
}

/// Shared, cloneable handle to the importer extensions.
#[derive(Clone, Default)]
pub struct ImporterRegistry {
    inner: Arc<RwLock<Registry>>,
}

impl std::fmt::Debug for ImporterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut active = self
            .inner
            .read()
            .map(|r| r.active.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        active.sort();
        f.debug_struct("ImporterRegistry")
            .field("active", &active)
            .finish()
    }
}

impl ImporterRegistry {
    /// An empty registry; nothing can be activated.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that can activate the glTF and OBJ importers. Neither is active yet.
    pub fn with_builtin_importers() -> Self {
        let registry = Self::new();
        registry.register(GLTF_EXTENSION, AssetFormat::Gltf, gltf_importer);
        registry.register(OBJ_EXTENSION, AssetFormat::Obj, obj_importer);
        registry
    }

    /// Make an extension available for activation.
    pub fn register(&self, id: &str, format: AssetFormat, factory: ImporterFactory) {
        match self.inner.write() {
            Ok(mut registry) => {
                registry.available.insert(id.to_string(), (format, factory));
            }
            Err(_) => log::error!("Importer registry is poisoned, cannot register {id}"),
        }
    }

    /// Activate an importer right away, without going through a load.
    pub fn install(&self, id: &str, format: AssetFormat, importer: Arc<dyn AssetImporter>) {
        match self.inner.write() {
            Ok(mut registry) => {
                registry.active.insert(id.to_string(), (format, importer));
            }
            Err(_) => log::error!("Importer registry is poisoned, cannot install {id}"),
        }
    }

    /// The active importer for `format`, if its extension has been loaded.
    pub fn importer(&self, format: AssetFormat) -> Option<Arc<dyn AssetImporter>> {
        let registry = self.inner.read().ok()?;
        registry
            .active
            .values()
            .find(|(active_format, _)| *active_format == format)
            .map(|(_, importer)| importer.clone())
    }
}

impl ExtensionHost for ImporterRegistry {
    fn has(&self, id: &str) -> bool {
        self.inner
            .read()
            .map(|registry| registry.active.contains_key(id))
            .unwrap_or(false)
    }

    fn load(&self, id: &str) -> BoxedFuture<'static, anyhow::Result<()>> {
        let inner = self.inner.clone();
        let id = id.to_string();
        platform::boxed(async move {
            let mut registry = inner
                .write()
                .map_err(|_| anyhow::anyhow!("importer registry is poisoned"))?;
            let Some((format, factory)) = registry.available.get(&id).copied() else {
                anyhow::bail!("no importer extension named {id}");
            };
            registry.active.insert(id, (format, factory()));
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;

    #[test]
    fn formats_are_picked_by_extension() {
        assert_eq!(AssetFormat::from_url("assets/cube.glb"), Some(AssetFormat::Gltf));
        assert_eq!(AssetFormat::from_url("assets/Osiris.OBJ"), Some(AssetFormat::Obj));
        assert_eq!(AssetFormat::from_url("assets/scene.fbx"), None);
        assert_eq!(AssetFormat::from_url("assets/no_extension"), None);
    }

    #[test]
    fn loading_activates_a_registered_importer() {
        let registry = ImporterRegistry::with_builtin_importers();
        assert!(!registry.has(OBJ_EXTENSION));
        assert!(registry.importer(AssetFormat::Obj).is_none());

        block_on(registry.load(OBJ_EXTENSION)).expect("OBJ importer is compiled in");

        assert!(registry.has(OBJ_EXTENSION));
        assert!(registry.importer(AssetFormat::Obj).is_some());
        assert!(registry.importer(AssetFormat::Gltf).is_none());
    }

    #[test]
    fn loading_an_unknown_extension_fails() {
        let registry = ImporterRegistry::with_builtin_importers();
        assert!(block_on(registry.load("FBXLoader")).is_err());
        assert!(!registry.has("FBXLoader"));
    }
}
