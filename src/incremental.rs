// WHY: Scenes whose segments file already exists are skipped on re-runs
// These helpers keep the naming rule in one place for the CLI and tests

use std::path::{Path, PathBuf};

/// Suffix recognised on scene input files
pub const SCENE_SUFFIX: &str = ".scene.json";

/// Scene name with `.scene.json` (or just the extension) removed
pub fn scene_stem(scene_path: &Path) -> String {
    let file_name = scene_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");
    match file_name.strip_suffix(SCENE_SUFFIX) {
        Some(stem) => stem.to_string(),
        None => scene_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string(),
    }
}

/// Output path for a scene: `<dir>/<stem>_segments.json`
///
/// # Example
/// ```
/// use dialogue_seams::incremental::segments_path_for;
/// use std::path::Path;
/// let out = segments_path_for(Path::new("book/ch01.scene.json"));
/// assert_eq!(out, Path::new("book/ch01_segments.json"));
/// ```
pub fn segments_path_for(scene_path: &Path) -> PathBuf {
    let mut out = scene_path.to_path_buf();
    out.set_file_name(format!("{}_segments.json", scene_stem(scene_path)));
    out
}

pub fn segments_file_exists<P: AsRef<Path>>(scene_path: P) -> bool {
    segments_path_for(scene_path.as_ref()).exists()
}

/// Read a previously written segments document
pub async fn read_segments_file<P: AsRef<Path>>(scene_path: P) -> Result<String, std::io::Error> {
    tokio::fs::read_to_string(segments_path_for(scene_path.as_ref())).await
}
