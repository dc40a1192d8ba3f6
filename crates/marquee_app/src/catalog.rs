//! Per-content-set texture catalog.
//!
//! A catalog owns every GPU texture belonging to one content-set: discovery
//! caches the file list under the set's resource folder, creation decodes
//! and uploads each file whose name carries a known role suffix, and release
//! tears handles down again. Creation is idempotent and never fatal -- a
//! file that fails to decode is logged and skipped, leaving a partial but
//! valid catalog.

use glam::Vec2;
use marquee_core::manifest::ContentSetDesc;
use marquee_core::role::{classify_file_name, Role};
use marquee_core::sidecar::{parse_corner_offsets, CornerOffsets};
use marquee_render::{Binding, SpritePipeline, Texture};
use rand::Rng;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

/// Cloned GPU handles captured when the device is mounted. wgpu device and
/// queue handles are internally ref-counted, so clones are cheap and the
/// catalog never has to borrow the surface state.
#[derive(Clone)]
pub struct GpuHandles {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub pipeline: Rc<SpritePipeline>,
}

struct GpuImage {
    texture: Texture,
    bind_group: Arc<wgpu::BindGroup>,
}

/// One GPU-backed image plus its dimensions. `gpu` is `None` once released;
/// a released handle draws as a no-op and is never re-uploaded.
pub struct TextureHandle {
    file_name: String,
    width: u32,
    height: u32,
    gpu: Option<GpuImage>,
}

impl TextureHandle {
    fn new(file_name: String, texture: Texture, bind_group: Arc<wgpu::BindGroup>) -> Self {
        let (width, height) = texture.size;
        Self {
            file_name,
            width,
            height,
            gpu: Some(GpuImage {
                texture,
                bind_group,
            }),
        }
    }

    /// A handle with dimensions but no GPU resources behind it. Drawing it
    /// is a no-op; everything else (placement math, selection) works.
    #[cfg(test)]
    pub fn detached(file_name: &str, width: u32, height: u32) -> Self {
        Self {
            file_name: file_name.to_string(),
            width,
            height,
            gpu: None,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    pub fn is_live(&self) -> bool {
        self.gpu.is_some()
    }

    pub fn binding(&self) -> Option<Binding> {
        self.gpu
            .as_ref()
            .map(|gpu| Binding::Texture(Arc::clone(&gpu.bind_group)))
    }

    /// Drop the GPU resources. Releasing an already-released handle does
    /// nothing.
    pub fn release(&mut self) {
        if let Some(gpu) = self.gpu.take() {
            let (w, h) = gpu.texture.size;
            log::debug!("Released texture '{}' ({}x{})", self.file_name, w, h);
        }
    }
}

pub struct CatalogEntry {
    pub handle: Rc<RefCell<TextureHandle>>,
    pub role: Role,
    /// Background-only corner pre-skew from the sidecar config; zero for
    /// everything else.
    pub offsets: CornerOffsets,
    file_name: String,
}

/// Result of a bulk-creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(usize),
    AlreadyCreated,
    InProgress,
}

pub struct ResourceCatalog {
    content_set_id: u32,
    resource_folder: PathBuf,
    character_scale: Vec2,
    cached_files: Vec<PathBuf>,
    entries: Vec<CatalogEntry>,
    were_created: bool,
    currently_creating: bool,
}

impl ResourceCatalog {
    pub fn new(desc: &ContentSetDesc, asset_root: &Path) -> Self {
        Self {
            content_set_id: desc.content_set_id,
            resource_folder: asset_root.join(&desc.resource_folder),
            character_scale: desc.character_scale,
            cached_files: Vec::new(),
            entries: Vec::new(),
            were_created: false,
            currently_creating: false,
        }
    }

    pub fn content_set_id(&self) -> u32 {
        self.content_set_id
    }

    pub fn character_scale(&self) -> Vec2 {
        self.character_scale
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.entries.iter().any(|e| e.role == role)
    }

    /// Recursively walk the resource folder and cache every file path.
    /// Scanning is O(files under root), which is why the result is cached
    /// here instead of re-walked per creation call.
    pub fn discover_files(&mut self) -> Result<usize, String> {
        self.cached_files.clear();
        walk_files(&self.resource_folder, &mut self.cached_files)?;
        log::debug!(
            "Content-set {}: discovered {} files under {}",
            self.content_set_id,
            self.cached_files.len(),
            self.resource_folder.display()
        );
        Ok(self.cached_files.len())
    }

    /// Create every role-suffixed texture not already present. Safe to call
    /// repeatedly: a completed catalog short-circuits, and a re-entrant call
    /// during creation reports `InProgress` instead of double-creating.
    pub fn create_all(&mut self, gpu: &GpuHandles) -> CreateOutcome {
        if self.were_created {
            return CreateOutcome::AlreadyCreated;
        }
        if self.currently_creating {
            return CreateOutcome::InProgress;
        }
        self.currently_creating = true;
        let created = self.create_matching(gpu, None);
        self.currently_creating = false;
        self.were_created = true;
        log::info!(
            "Content-set {}: created {} textures ({} total entries)",
            self.content_set_id,
            created,
            self.len()
        );
        CreateOutcome::Created(created)
    }

    /// Create only the textures of one role. Used to materialize logos
    /// ahead of the first load.
    pub fn create_of_role(&mut self, gpu: &GpuHandles, role: Role) -> CreateOutcome {
        if self.currently_creating {
            return CreateOutcome::InProgress;
        }
        self.currently_creating = true;
        let created = self.create_matching(gpu, Some(role));
        self.currently_creating = false;
        CreateOutcome::Created(created)
    }

    /// Release and remove matching entries (`None` releases everything).
    /// Any release resets the created flag, so the next `create_all` fills
    /// the gaps back in instead of short-circuiting.
    pub fn release_of_role(&mut self, role: Option<Role>) {
        let before = self.entries.len();
        self.entries.retain(|entry| {
            let keep = match role {
                Some(r) => entry.role != r,
                None => false,
            };
            if !keep {
                entry.handle.borrow_mut().release();
            }
            keep
        });
        self.were_created = false;
        let removed = before - self.entries.len();
        if removed > 0 {
            log::debug!(
                "Content-set {}: released {} entries ({} remain)",
                self.content_set_id,
                removed,
                self.entries.len()
            );
        }
    }

    /// Uniform-random entry of the given role, or `None` when the role has
    /// no entries yet (retryable, never an error).
    pub fn random_of_role(&self, role: Role, rng: &mut impl Rng) -> Option<&CatalogEntry> {
        let matching: Vec<&CatalogEntry> =
            self.entries.iter().filter(|e| e.role == role).collect();
        if matching.is_empty() {
            return None;
        }
        Some(matching[rng.gen_range(0..matching.len())])
    }

    pub fn first_of_role(&self, role: Role) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.role == role)
    }

    /// Match every cached `.json` sidecar against a background entry with
    /// the same base name and attach its corner offsets. A config without a
    /// matching image is silently ignored; a parse failure leaves that
    /// background with zero offsets.
    pub fn attach_background_configs(&mut self) {
        let configs: Vec<PathBuf> = self
            .cached_files
            .iter()
            .filter(|p| has_extension(p, "json"))
            .filter(|p| classify_path(p) == Role::Background)
            .cloned()
            .collect();

        for path in configs {
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };
            let Some(entry) = self.entries.iter_mut().find(|e| {
                e.role == Role::Background
                    && Path::new(&e.file_name)
                        .file_stem()
                        .is_some_and(|s| s.to_string_lossy().eq_ignore_ascii_case(&stem))
            }) else {
                continue;
            };

            let raw = match fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(e) => {
                    log::warn!("Failed to read config {}: {e}", path.display());
                    continue;
                }
            };
            match parse_corner_offsets(&raw) {
                Ok(offsets) => {
                    entry.offsets = offsets;
                    log::debug!("Attached corner offsets from {}", path.display());
                }
                Err(e) => {
                    log::warn!("Skipping config {}: {e}", path.display());
                }
            }
        }
    }

    fn contains(&self, file_name: &str) -> bool {
        self.entries.iter().any(|e| e.file_name == file_name)
    }

    /// Cached `.dds` paths with a known role (optionally filtered to one)
    /// that have no entry yet.
    fn pending_paths(&self, filter: Option<Role>) -> Vec<PathBuf> {
        self.cached_files
            .iter()
            .filter(|p| has_extension(p, "dds"))
            .filter(|p| {
                let role = classify_path(p);
                role != Role::Unknown && filter.is_none_or(|f| role == f)
            })
            .filter(|p| !self.contains(&file_name_of(p)))
            .cloned()
            .collect()
    }

    fn create_matching(&mut self, gpu: &GpuHandles, filter: Option<Role>) -> usize {
        let mut created = 0;
        for path in self.pending_paths(filter) {
            // The cache can go stale between discovery and creation.
            if !path.exists() {
                log::warn!(
                    "Cached resource {} no longer exists on disk, skipping",
                    path.display()
                );
                continue;
            }
            let file_name = file_name_of(&path);
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::error!("Failed to read texture {}: {e}", path.display());
                    continue;
                }
            };
            let texture = match Texture::from_bytes(&gpu.device, &gpu.queue, &bytes, &file_name) {
                Ok(texture) => texture,
                Err(e) => {
                    log::error!("{e}");
                    continue;
                }
            };
            let bind_group = Arc::new(
                gpu.pipeline
                    .create_texture_bind_group(&gpu.device, &texture),
            );
            let role = classify_file_name(&file_name);
            log::debug!(
                "Created {} texture '{}' ({}x{})",
                role,
                file_name,
                texture.size.0,
                texture.size.1
            );
            self.entries.push(CatalogEntry {
                handle: Rc::new(RefCell::new(TextureHandle::new(
                    file_name.clone(),
                    texture,
                    bind_group,
                ))),
                role,
                offsets: CornerOffsets::default(),
                file_name,
            });
            created += 1;
        }
        created
    }

    #[cfg(test)]
    pub fn insert_detached(&mut self, file_name: &str, width: u32, height: u32) {
        let role = classify_file_name(file_name);
        self.entries.push(CatalogEntry {
            handle: Rc::new(RefCell::new(TextureHandle::detached(
                file_name, width, height,
            ))),
            role,
            offsets: CornerOffsets::default(),
            file_name: file_name.to_string(),
        });
    }

    #[cfg(test)]
    pub fn cache_file(&mut self, path: PathBuf) {
        self.cached_files.push(path);
    }
}

fn walk_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), String> {
    let reader = fs::read_dir(dir)
        .map_err(|e| format!("Failed to read resource folder {}: {e}", dir.display()))?;
    for entry in reader {
        let entry = entry
            .map_err(|e| format!("Failed to read entry under {}: {e}", dir.display()))?;
        let path = entry.path();
        if path.is_dir() {
            walk_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn classify_path(path: &Path) -> Role {
    classify_file_name(&file_name_of(path))
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "marquee_catalog_test_{}_{}_{}",
            name_hint,
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn test_catalog() -> ResourceCatalog {
        let desc = ContentSetDesc {
            content_set_id: 0,
            resource_folder: "base".to_string(),
            character_scale: Vec2::ONE,
        };
        ResourceCatalog::new(&desc, Path::new("/nonexistent"))
    }

    #[test]
    fn discovery_walks_nested_folders() {
        let root = temp_dir("discovery");
        fs::write(root.join("town.bg.dds"), b"x").expect("write");
        let nested = root.join("extra");
        fs::create_dir_all(&nested).expect("mkdir");
        fs::write(nested.join("hero.char.dds"), b"x").expect("write");

        let desc = ContentSetDesc {
            content_set_id: 1,
            resource_folder: ".".to_string(),
            character_scale: Vec2::ONE,
        };
        let mut catalog = ResourceCatalog::new(&desc, &root);
        let count = catalog.discover_files().expect("discovery should succeed");
        assert_eq!(count, 2);

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn discovery_of_missing_folder_is_an_error() {
        let mut catalog = test_catalog();
        assert!(catalog.discover_files().is_err());
    }

    #[test]
    fn pending_excludes_existing_entries_and_unknown_roles() {
        let mut catalog = test_catalog();
        catalog.cache_file(PathBuf::from("/r/town.bg.dds"));
        catalog.cache_file(PathBuf::from("/r/hero.char.dds"));
        catalog.cache_file(PathBuf::from("/r/readme.txt"));
        catalog.cache_file(PathBuf::from("/r/stray.dds"));
        catalog.insert_detached("town.bg.dds", 200, 100);

        let pending = catalog.pending_paths(None);
        assert_eq!(pending, vec![PathBuf::from("/r/hero.char.dds")]);
    }

    #[test]
    fn pending_respects_role_filter() {
        let mut catalog = test_catalog();
        catalog.cache_file(PathBuf::from("/r/town.bg.dds"));
        catalog.cache_file(PathBuf::from("/r/chapter.logo.dds"));

        let pending = catalog.pending_paths(Some(Role::Logo));
        assert_eq!(pending, vec![PathBuf::from("/r/chapter.logo.dds")]);
    }

    #[test]
    fn release_all_empties_the_catalog() {
        let mut catalog = test_catalog();
        catalog.insert_detached("town.bg.dds", 200, 100);
        catalog.insert_detached("hero.char.dds", 50, 150);
        catalog.insert_detached("chapter.logo.dds", 64, 64);

        catalog.release_of_role(None);
        assert_eq!(catalog.len(), 0);
    }

    #[test]
    fn release_of_one_role_keeps_the_rest() {
        let mut catalog = test_catalog();
        catalog.insert_detached("town.bg.dds", 200, 100);
        catalog.insert_detached("field.bg.dds", 200, 100);
        catalog.insert_detached("hero.char.dds", 50, 150);

        catalog.release_of_role(Some(Role::Background));
        assert_eq!(catalog.len(), 1);
        assert!(catalog.has_role(Role::Character));
        assert!(!catalog.has_role(Role::Background));
    }

    #[test]
    fn released_handle_is_not_live() {
        let mut catalog = test_catalog();
        catalog.insert_detached("town.bg.dds", 200, 100);
        let handle = Rc::clone(&catalog.first_of_role(Role::Background).unwrap().handle);

        catalog.release_of_role(None);
        assert!(!handle.borrow().is_live());
        // Double release is a no-op.
        handle.borrow_mut().release();
    }

    #[test]
    fn random_selection_honors_role_and_empty_roles_yield_none() {
        let mut catalog = test_catalog();
        catalog.insert_detached("town.bg.dds", 200, 100);
        catalog.insert_detached("field.bg.dds", 300, 100);

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..16 {
            let entry = catalog
                .random_of_role(Role::Background, &mut rng)
                .expect("backgrounds exist");
            assert_eq!(entry.role, Role::Background);
        }
        assert!(catalog.random_of_role(Role::Character, &mut rng).is_none());
    }

    #[test]
    fn attaches_matching_config_and_ignores_unmatched() {
        let root = temp_dir("attach");
        let config_path = root.join("town.bg.json");
        fs::write(
            &config_path,
            r#"{ "top_right": { "x": 5.0, "y": -2.0 } }"#,
        )
        .expect("write config");
        let orphan_path = root.join("ghost.bg.json");
        fs::write(&orphan_path, r#"{}"#).expect("write orphan");

        let mut catalog = test_catalog();
        catalog.insert_detached("town.bg.dds", 200, 100);
        catalog.cache_file(config_path);
        catalog.cache_file(orphan_path);

        catalog.attach_background_configs();
        let entry = catalog.first_of_role(Role::Background).unwrap();
        assert_eq!(entry.offsets.top_right, Vec2::new(5.0, -2.0));
        assert_eq!(entry.offsets.top_left, Vec2::ZERO);

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn broken_config_leaves_zero_offsets() {
        let root = temp_dir("broken_config");
        let config_path = root.join("town.bg.json");
        fs::write(&config_path, "not json").expect("write config");

        let mut catalog = test_catalog();
        catalog.insert_detached("town.bg.dds", 200, 100);
        catalog.cache_file(config_path);

        catalog.attach_background_configs();
        let entry = catalog.first_of_role(Role::Background).unwrap();
        assert_eq!(entry.offsets, CornerOffsets::default());

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn detached_handles_report_size_but_no_binding() {
        let handle = TextureHandle::detached("town.bg.dds", 200, 100);
        assert_eq!(handle.size(), Vec2::new(200.0, 100.0));
        assert!(handle.binding().is_none());
        assert!(!handle.is_live());
    }
}
