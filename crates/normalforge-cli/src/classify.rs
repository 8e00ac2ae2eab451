//! Filename classification and derived output names.
//!
//! All of the naming convention lives here. Other tooling depends on these
//! names, so the suffixes must not change.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Marker carried by every generated normal map.
pub const NORMAL_MAP_MARKER: &str = "_normal_map";

/// Marker carried by every bit-depth reduced variant.
pub const REDUCED_MARKER: &str = "_8bit";

/// The only extension considered during a walk (case-insensitive).
pub const PNG_EXTENSION: &str = "png";

/// What a file is, judged from its name alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    /// Not a `.png`; never opened.
    Ignored,
    /// Already a normal map; skipped entirely.
    NormalMap,
    /// Already bit-depth reduced; kernel input only.
    Reduced,
    /// Source heightmap; eligible for reduction and generation.
    Raw,
}

/// Classify a file name. First match wins: extension, normal-map marker,
/// reduced marker. Markers and extension are matched case-insensitively.
pub fn classify(file_name: &str) -> FileClass {
    let lower = file_name.to_ascii_lowercase();

    let is_png = Path::new(&lower)
        .extension()
        .is_some_and(|ext| ext == PNG_EXTENSION);
    if !is_png {
        return FileClass::Ignored;
    }

    if lower.contains(NORMAL_MAP_MARKER) {
        FileClass::NormalMap
    } else if lower.contains(REDUCED_MARKER) {
        FileClass::Reduced
    } else {
        FileClass::Raw
    }
}

/// Classify the file name component of a path.
pub fn classify_path(path: &Path) -> FileClass {
    match path.file_name() {
        Some(name) => classify(&name.to_string_lossy()),
        None => FileClass::Ignored,
    }
}

/// `dir/basename.ext` -> `dir/basename_8bit.ext`.
///
/// A stem that already ends in `_8bit` is returned unchanged, so the suffix
/// is never appended twice.
pub fn reduced_path(source: &Path) -> PathBuf {
    let stem = source.file_stem().unwrap_or_default();
    if stem
        .to_string_lossy()
        .to_ascii_lowercase()
        .ends_with(REDUCED_MARKER)
    {
        return source.to_path_buf();
    }
    with_suffix(source, stem, REDUCED_MARKER)
}

/// `dir/basename.ext` -> `dir/basename_normal_map.ext`.
pub fn normal_map_path(source: &Path) -> PathBuf {
    let stem = source.file_stem().unwrap_or_default();
    with_suffix(source, stem, NORMAL_MAP_MARKER)
}

fn with_suffix(source: &Path, stem: &OsStr, suffix: &str) -> PathBuf {
    let mut name = OsString::from(stem);
    name.push(suffix);
    if let Some(ext) = source.extension() {
        name.push(".");
        name.push(ext);
    }
    source.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_raw() {
        assert_eq!(classify("rock.png"), FileClass::Raw);
        assert_eq!(classify("Rock.PNG"), FileClass::Raw);
    }

    #[test]
    fn test_classify_reduced() {
        assert_eq!(classify("rock_8bit.png"), FileClass::Reduced);
        assert_eq!(classify("rock_8BIT.png"), FileClass::Reduced);
    }

    #[test]
    fn test_normal_marker_wins() {
        assert_eq!(classify("rock_normal_map.png"), FileClass::NormalMap);
        assert_eq!(classify("rock_8bit_normal_map.png"), FileClass::NormalMap);
        assert_eq!(classify("rock_normal_map_8bit.png"), FileClass::NormalMap);
        assert_eq!(classify("ROCK_NORMAL_MAP.png"), FileClass::NormalMap);
    }

    #[test]
    fn test_classify_ignores_other_extensions() {
        assert_eq!(classify("rock.jpg"), FileClass::Ignored);
        assert_eq!(classify("rock_normal_map.tga"), FileClass::Ignored);
        assert_eq!(classify("rock.png.bak"), FileClass::Ignored);
        assert_eq!(classify("png"), FileClass::Ignored);
        assert_eq!(classify(".png"), FileClass::Ignored);
    }

    #[test]
    fn test_reduced_path() {
        assert_eq!(
            reduced_path(Path::new("assets/rock.png")),
            PathBuf::from("assets/rock_8bit.png")
        );
        assert_eq!(reduced_path(Path::new("Rock.PNG")), PathBuf::from("Rock_8bit.PNG"));
    }

    #[test]
    fn test_reduced_path_never_double_appends() {
        assert_eq!(
            reduced_path(Path::new("assets/rock_8bit.png")),
            PathBuf::from("assets/rock_8bit.png")
        );
    }

    #[test]
    fn test_normal_map_path() {
        assert_eq!(
            normal_map_path(Path::new("assets/rock.png")),
            PathBuf::from("assets/rock_normal_map.png")
        );
        assert_eq!(
            normal_map_path(&reduced_path(Path::new("assets/rock.png"))),
            PathBuf::from("assets/rock_8bit_normal_map.png")
        );
    }

    #[test]
    fn test_derived_names_classify_as_expected() {
        let source = Path::new("rock.png");
        assert_eq!(classify_path(&reduced_path(source)), FileClass::Reduced);
        assert_eq!(classify_path(&normal_map_path(source)), FileClass::NormalMap);
        assert_eq!(
            classify_path(&normal_map_path(&reduced_path(source))),
            FileClass::NormalMap
        );
    }

    #[test]
    fn test_multi_dot_names() {
        assert_eq!(
            normal_map_path(Path::new("a.b.png")),
            PathBuf::from("a.b_normal_map.png")
        );
    }
}
