// Integration test utilities and common code
// WHY: Centralized utilities avoid duplication across integration tests

#![allow(dead_code)]

pub mod fixtures;

use dialogue_seams::ClaimedSpan;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test fixture helper for creating temporary directories with scene files
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub root_path: PathBuf,
}

impl TestFixture {
    /// Create a new test fixture with temporary directory
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path().to_path_buf();

        Self { temp_dir, root_path }
    }

    /// Write a `*.scene.json` file with given JSON content
    pub fn create_scene_file<P: AsRef<Path>>(&self, relative_path: P, content: &str) -> PathBuf {
        let file_path = self.root_path.join(relative_path);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }

        fs::write(&file_path, content).expect("Failed to write scene file");
        file_path
    }

    /// Serialize a built scene and write it under `relative_path`
    pub fn create_scene(&self, relative_path: &str, scene: &SceneBuilder) -> PathBuf {
        let json = serde_json::json!({
            "id": relative_path,
            "prose": scene.prose(),
            "dialogue_map": scene.spans(),
        });
        self.create_scene_file(relative_path, &json.to_string())
    }

    pub fn read_segments_json<P: AsRef<Path>>(&self, scene_path: P) -> serde_json::Value {
        let path = dialogue_seams::incremental::segments_path_for(scene_path.as_ref());
        let content = fs::read_to_string(path).expect("Failed to read segments file");
        serde_json::from_str(&content).expect("Segments file is not valid JSON")
    }
}

/// Assembles prose and a dialogue map with correct character offsets
#[derive(Debug, Default, Clone)]
pub struct SceneBuilder {
    prose: String,
    spans: Vec<ClaimedSpan>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn char_len(&self) -> i64 {
        self.prose.chars().count() as i64
    }

    pub fn narrate(mut self, text: &str) -> Self {
        self.prose.push_str(text);
        self
    }

    /// Append `quote` (glyphs included) and claim it at its true position
    pub fn say(mut self, speaker: &str, quote: &str) -> Self {
        let start = self.char_len();
        self.prose.push_str(quote);
        let end = self.char_len();
        self.spans.push(ClaimedSpan::new(speaker, quote, start, end));
        self
    }

    /// Claim a quote that never made it into the prose, at the current offset
    pub fn claim_missing(mut self, speaker: &str, quote: &str) -> Self {
        let start = self.char_len();
        let end = start + quote.chars().count() as i64;
        self.spans.push(ClaimedSpan::new(speaker, quote, start, end));
        self
    }

    /// Shift every claimed offset by `delta` characters
    pub fn shift_claims(mut self, delta: i64) -> Self {
        for span in &mut self.spans {
            span.start_char += delta;
            span.end_char += delta;
        }
        self
    }

    pub fn prose(&self) -> &str {
        &self.prose
    }

    pub fn spans(&self) -> &[ClaimedSpan] {
        &self.spans
    }
}
