//! Texture role classification.
//!
//! A texture's role is a pure function of its file name: strip the `.dds`
//! (or `.json`, for sidecar configs) extension, then match the remaining
//! suffix against `.bg` / `.char` / `.logo`. Anything else is `Unknown` and
//! never enters a catalog.

/// What a texture is used for on the loading screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Background,
    Character,
    Logo,
    Unknown,
}

impl Role {
    /// Roles that can actually be materialized from disk.
    pub const KNOWN: &'static [Role] = &[Role::Background, Role::Character, Role::Logo];

    /// The file-name suffix (before the `.dds` extension) selecting this role.
    pub fn suffix(self) -> Option<&'static str> {
        match self {
            Self::Background => Some(".bg"),
            Self::Character => Some(".char"),
            Self::Logo => Some(".logo"),
            Self::Unknown => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Character => "character",
            Self::Logo => "logo",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a file name (with or without its `.dds`/`.json` extension).
///
/// Matching is case-insensitive; resource folders on disk are authored by
/// hand and mixed case shows up in practice.
pub fn classify_file_name(file_name: &str) -> Role {
    let lower = file_name.to_lowercase();
    let stem = lower
        .strip_suffix(".dds")
        .or_else(|| lower.strip_suffix(".json"))
        .unwrap_or(&lower);

    if stem.ends_with(".bg") {
        Role::Background
    } else if stem.ends_with(".char") {
        Role::Character
    } else if stem.ends_with(".logo") {
        Role::Logo
    } else {
        Role::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_suffixes() {
        assert_eq!(classify_file_name("town.bg.dds"), Role::Background);
        assert_eq!(classify_file_name("hero.char.dds"), Role::Character);
        assert_eq!(classify_file_name("chapter1.logo.dds"), Role::Logo);
    }

    #[test]
    fn classifies_sidecar_configs_like_their_image() {
        assert_eq!(classify_file_name("town.bg.json"), Role::Background);
    }

    #[test]
    fn unknown_for_unrecognized_suffix() {
        assert_eq!(classify_file_name("readme.txt"), Role::Unknown);
        assert_eq!(classify_file_name("town.dds"), Role::Unknown);
        assert_eq!(classify_file_name("town.background.dds"), Role::Unknown);
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(classify_file_name("Town.BG.DDS"), Role::Background);
        assert_eq!(classify_file_name("HERO.Char.dds"), Role::Character);
    }

    #[test]
    fn works_without_extension() {
        assert_eq!(classify_file_name("town.bg"), Role::Background);
        assert_eq!(classify_file_name("town"), Role::Unknown);
    }

    #[test]
    fn display_matches_label() {
        for &role in Role::KNOWN {
            assert_eq!(format!("{}", role), role.label());
        }
    }
}
