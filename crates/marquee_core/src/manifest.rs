//! Content-set manifest loading.
//!
//! `loading_screens.json` is an ordered list of content-set descriptors:
//! which resource folder holds a chapter's textures and how its characters
//! are scaled. The file is read once at startup. A missing manifest is not
//! fatal -- the overlay simply never activates.

use crate::jsonc::strip_comment_lines;
use glam::Vec2;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct ContentSetDesc {
    pub content_set_id: u32,
    pub resource_folder: String,
    pub character_scale: Vec2,
}

#[derive(Debug, Deserialize)]
struct ContentSetJson {
    content_set_id: u32,
    resource_folder: String,
    #[serde(default = "default_scale")]
    character_scale: ScaleJson,
}

#[derive(Debug, Deserialize)]
struct ScaleJson {
    x: f32,
    y: f32,
}

fn default_scale() -> ScaleJson {
    ScaleJson { x: 1.0, y: 1.0 }
}

/// Load the manifest. Missing file ⇒ `Ok(vec![])` with a warning, per the
/// degrade-to-dormant error model.
pub fn load_manifest(path: &Path) -> Result<Vec<ContentSetDesc>, String> {
    if !path.exists() {
        log::warn!(
            "Content-set manifest {} does not exist; loading screens stay inactive",
            path.display()
        );
        return Ok(Vec::new());
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read manifest {}: {e}", path.display()))?;
    let sets: Vec<ContentSetJson> = serde_json::from_str(&strip_comment_lines(&raw))
        .map_err(|e| format!("Failed to parse manifest {}: {e}", path.display()))?;
    validate_manifest(&sets)?;

    let sets = sets
        .into_iter()
        .map(|s| ContentSetDesc {
            content_set_id: s.content_set_id,
            resource_folder: s.resource_folder,
            character_scale: Vec2::new(s.character_scale.x, s.character_scale.y),
        })
        .collect::<Vec<_>>();
    log::info!("Loaded {} content-set descriptors", sets.len());
    Ok(sets)
}

fn validate_manifest(sets: &[ContentSetJson]) -> Result<(), String> {
    let mut ids = HashSet::new();
    for set in sets {
        if !ids.insert(set.content_set_id) {
            return Err(format!(
                "Manifest validation failed: duplicate content_set_id {}",
                set.content_set_id
            ));
        }
        if set.resource_folder.is_empty() {
            return Err(format!(
                "Manifest validation failed: content-set {} has an empty resource_folder",
                set.content_set_id
            ));
        }
    }
    Ok(())
}
