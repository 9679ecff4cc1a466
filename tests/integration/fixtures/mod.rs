// Known scenes used across integration tests

/// Narration, one line of dialogue, trailing narration
pub const JENSEN_PROSE: &str = "Jensen walked in. \"We need to move,\" she said, glancing back.";

/// Dialogue followed by narration that repeats it
pub const ECHO_PROSE: &str = "\"Come here,\" she said. Come here.";

/// Words used to give each generated quote distinct content
pub const SIGNAL_WORDS: [&str; 10] = [
    "amber", "birch", "cobalt", "delta", "ember", "falcon", "granite", "harbor", "indigo", "juniper",
];

/// Scene document JSON with a dialogue map and known speakers
pub const SCENE_JSON: &str = r#"{
  "id": "ch01",
  "prose": "Jensen walked in. \"We need to move,\" she said, glancing back.",
  "dialogue_map": [
    {"speaker": "Jensen", "quote": "\"We need to move,\"", "start_char": 18, "end_char": 36, "emotion": "urgent"}
  ],
  "known_speakers": ["Jensen"]
}"#;
