// Discovery -> segmentation -> segments files, end to end
// WHY: Validates the batch pipeline on real temp directories, including the CLI binary

mod integration;

use dialogue_seams::batch::{process_files_parallel, write_run_stats, BatchConfig, RunStats};
use dialogue_seams::discovery::find_scene_files;
use dialogue_seams::incremental::segments_file_exists;
use dialogue_seams::Segmenter;
use integration::fixtures::SCENE_JSON;
use integration::{SceneBuilder, TestFixture};
use std::process::Command;
use std::sync::Arc;

fn bridge_scene() -> SceneBuilder {
    SceneBuilder::new()
        .narrate("The bridge groaned. ")
        .say("Mara", "\"It won't hold us both.\"")
        .narrate(" Jensen looked down. ")
        .say("Jensen", "\"Then you go first.\"")
}

async fn run_batch(fixture: &TestFixture, config: &BatchConfig) -> RunStats {
    let paths = find_scene_files(&fixture.root_path).await.expect("Discovery failed");
    process_files_parallel(paths, &fixture.root_path, Arc::new(Segmenter::default()), config)
        .await
        .expect("Batch run failed")
}

#[tokio::test]
async fn test_batch_writes_segments_next_to_scenes() {
    let fixture = TestFixture::new();
    let ch01 = fixture.create_scene_file("book/ch01.scene.json", SCENE_JSON);
    let ch02 = fixture.create_scene("book/ch02.scene.json", &bridge_scene());
    fixture.create_scene_file("book/notes.json", "{}");

    let stats = run_batch(&fixture, &BatchConfig::default()).await;
    assert_eq!(stats.files_processed, 2);
    assert_eq!(stats.files_failed, 0);
    assert_eq!(stats.file_stats.len(), 2);
    assert_eq!(stats.file_stats[0].path, "book/ch01.scene.json");

    let output = fixture.read_segments_json(&ch01);
    assert_eq!(output["scene_id"], "ch01");
    let segments = output["segments"].as_array().unwrap();
    assert_eq!(segments.len(), 3);
    assert_eq!(segments[1]["role"], "dialogue");
    assert_eq!(segments[1]["speaker"], "Jensen");
    assert_eq!(segments[1]["emotion"], "urgent");
    assert_eq!(segments[1]["text"], "We need to move,");

    let output = fixture.read_segments_json(&ch02);
    let roles: Vec<&str> = output["segments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["narrator", "dialogue", "narrator", "dialogue"]);
    assert_eq!(output["counts"]["verified"], 2);
}

#[tokio::test]
async fn test_existing_segments_skipped_unless_overwrite() {
    let fixture = TestFixture::new();
    let scene = fixture.create_scene("ch01.scene.json", &bridge_scene());

    let first = run_batch(&fixture, &BatchConfig::default()).await;
    assert_eq!(first.files_processed, 1);
    assert!(segments_file_exists(&scene));

    let second = run_batch(&fixture, &BatchConfig::default()).await;
    assert_eq!(second.files_skipped, 1);
    assert_eq!(second.files_processed, 0);

    let overwrite = BatchConfig { overwrite_all: true, ..BatchConfig::default() };
    let third = run_batch(&fixture, &overwrite).await;
    assert_eq!(third.files_processed, 1);
}

#[tokio::test]
async fn test_corrupted_scene_fails_without_stopping_run() {
    let fixture = TestFixture::new();
    fixture.create_scene("a.scene.json", &bridge_scene());
    let corrupt = bridge_scene();
    let mut spans = corrupt.spans().to_vec();
    spans[1].start_char = spans[0].start_char + 3;
    let json = serde_json::json!({ "prose": corrupt.prose(), "dialogue_map": spans });
    let bad = fixture.create_scene_file("b.scene.json", &json.to_string());

    let stats = run_batch(&fixture, &BatchConfig::default()).await;
    assert_eq!(stats.files_processed, 1);
    assert_eq!(stats.files_failed, 1);
    let failed = stats.file_stats.iter().find(|s| s.status == "failed").unwrap();
    assert!(failed.error.as_deref().unwrap().contains("overlapping"), "{:?}", failed.error);
    assert!(!segments_file_exists(&bad));

    let fail_fast = BatchConfig { fail_fast: true, overwrite_all: true, ..BatchConfig::default() };
    let paths = find_scene_files(&fixture.root_path).await.unwrap();
    let result = process_files_parallel(paths, &fixture.root_path, Arc::new(Segmenter::default()), &fail_fast).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_run_stats_json_structure() {
    let fixture = TestFixture::new();
    fixture.create_scene("ch01.scene.json", &bridge_scene());
    let stats = run_batch(&fixture, &BatchConfig::default()).await;

    let stats_path = fixture.root_path.join("run_stats.json");
    write_run_stats(&stats, &stats_path).await.unwrap();

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&stats_path).unwrap()).unwrap();
    let obj = json.as_object().unwrap();
    for key in [
        "run_start",
        "total_processing_time_ms",
        "total_chars_processed",
        "total_segments_emitted",
        "overall_chars_per_sec",
        "files_processed",
        "files_skipped",
        "files_failed",
        "file_stats",
    ] {
        assert!(obj.contains_key(key), "Missing {key} field");
    }
    let file = &obj["file_stats"][0];
    assert_eq!(file["status"], "success");
    assert!(file["error"].is_null());
    assert_eq!(file["segments_emitted"], 4);
    assert_eq!(file["chars_processed"].as_u64().unwrap(), bridge_scene().prose().chars().count() as u64);
}

#[test]
fn test_cli_writes_stats_and_segments() {
    let fixture = TestFixture::new();
    let scene = fixture.create_scene("ch01.scene.json", &bridge_scene());
    let stats_file = fixture.root_path.join("cli_stats.json");

    let output = Command::new(env!("CARGO_BIN_EXE_dialogue-seams"))
        .arg(fixture.root_path.as_os_str())
        .arg("--stats-out")
        .arg(stats_file.as_os_str())
        .arg("--no-progress")
        .arg("--dedup-mode")
        .arg("aggressive")
        .output()
        .expect("Failed to run dialogue-seams");

    assert!(output.status.success(), "command failed: {}", String::from_utf8_lossy(&output.stderr));
    assert!(segments_file_exists(&scene));

    let stats: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&stats_file).unwrap()).unwrap();
    assert_eq!(stats["files_processed"], 1);
}

#[test]
fn test_cli_rejects_missing_root() {
    let fixture = TestFixture::new();
    let output = Command::new(env!("CARGO_BIN_EXE_dialogue-seams"))
        .arg(fixture.root_path.join("does-not-exist").as_os_str())
        .arg("--no-progress")
        .output()
        .expect("Failed to run dialogue-seams");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}
