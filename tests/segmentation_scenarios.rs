// End-to-end segmentation behaviour through the public API
// WHY: Exercises verify -> relocate -> build together on realistic scenes

mod integration;

use dialogue_seams::segmentation::{verify, BytePos, CharPos, ProseText, SpanOutcome};
use dialogue_seams::{
    convert_dialogue_map_to_segments, ClaimedSpan, DedupMode, RelocationMethod, Segment, SegmentationConfig,
    SegmentationIntegrityError, SegmentationWarning, Segmenter,
};
use integration::fixtures::{ECHO_PROSE, JENSEN_PROSE, SIGNAL_WORDS};
use integration::SceneBuilder;

fn texts(segments: &[Segment]) -> Vec<&str> {
    segments.iter().map(Segment::text).collect()
}

fn jensen_scene() -> SceneBuilder {
    SceneBuilder::new()
        .narrate("Jensen walked in. ")
        .say("Jensen", "\"We need to move,\"")
        .narrate(" she said, glancing back.")
}

/// Ten quotes separated by narration; indices in `garbled` claim `garbled_quote` instead
fn radio_scene(garbled: &[usize], garbled_quote: &str) -> SceneBuilder {
    let mut scene = SceneBuilder::new().narrate("The radio crackled. ");
    for (i, word) in SIGNAL_WORDS.iter().enumerate() {
        scene = if garbled.contains(&i) {
            scene.claim_missing("Operator", garbled_quote)
        } else {
            scene.say("Operator", &format!("\"Signal {word} is clear.\""))
        };
        scene = scene.narrate(&format!(" Pause {i} held while the static rolled on. "));
    }
    scene
}

fn alphanumerics(text: &str) -> String {
    text.chars().filter(|c| c.is_alphanumeric()).collect()
}

fn positioned_text_chars(segments: &[Segment]) -> usize {
    segments
        .iter()
        .filter(|s| s.char_range().is_some())
        .map(|s| s.text().chars().count())
        .sum()
}

#[test]
fn test_missing_or_empty_map_is_whole_prose() {
    let prose = "  The house was quiet.\n\nNothing moved.  ";
    for map in [None, Some(&[][..])] {
        let segments = convert_dialogue_map_to_segments(prose, map).unwrap();
        assert_eq!(segments.len(), 1);
        assert!(segments[0].is_narrator());
        assert_eq!(segments[0].text(), prose);
    }
}

#[test]
fn test_single_quote_scene() {
    let span = ClaimedSpan::new("Jensen", "We need to move,", 17, 36);
    let segments = convert_dialogue_map_to_segments(JENSEN_PROSE, Some(&[span])).unwrap();

    assert_eq!(texts(&segments), vec!["Jensen walked in.", "We need to move,", "she said, glancing back."]);
    assert_eq!(segments[1].speaker(), "Jensen");
    assert_eq!(segments[1].char_range(), Some((18, 36)));
    assert_eq!(segments[0].speaker(), "narrator");
}

#[test]
fn test_stale_offsets_are_relocated() {
    let baseline = convert_dialogue_map_to_segments(JENSEN_PROSE, Some(jensen_scene().spans())).unwrap();

    for shift in [5, -5] {
        let scene = jensen_scene().shift_claims(shift);
        let report = Segmenter::default().segment(scene.prose(), Some(scene.spans())).unwrap();
        assert_eq!(report.counts.relocated, 1, "shift {shift}");
        assert_eq!(report.segments, baseline, "shift {shift}");
    }

    let scene = jensen_scene().shift_claims(-5);
    let resolved = Segmenter::default().resolve(scene.prose(), scene.spans()).unwrap();
    assert!(matches!(
        resolved[0].outcome,
        SpanOutcome::Relocated { method: RelocationMethod::ExactPattern, .. }
    ));
}

#[test]
fn test_narrative_echo_depends_on_dedup_mode() {
    let span = ClaimedSpan::new("Mara", "\"Come here,\"", 0, 12);

    let conservative = Segmenter::default().segment(ECHO_PROSE, Some(&[span.clone()])).unwrap();
    assert_eq!(texts(&conservative.segments), vec!["Come here,", "she said. Come here."]);

    let aggressive = Segmenter::new(SegmentationConfig { dedup_mode: DedupMode::Aggressive, ..Default::default() })
        .unwrap()
        .segment(ECHO_PROSE, Some(&[span]))
        .unwrap();
    assert_eq!(texts(&aggressive.segments), vec!["Come here,", "she said."]);
}

#[test]
fn test_leaked_dialogue_removed_in_both_modes() {
    // Narration that repeats the quote verbatim is a position artifact
    let scene = SceneBuilder::new()
        .narrate("Get down behind the wall. ")
        .say("Ada", "\"Get down behind the wall,\"")
        .narrate(" Ada hissed.");
    for mode in [DedupMode::Conservative, DedupMode::Aggressive] {
        let segmenter = Segmenter::new(SegmentationConfig { dedup_mode: mode, ..Default::default() }).unwrap();
        let report = segmenter.segment(scene.prose(), Some(scene.spans())).unwrap();
        assert_eq!(texts(&report.segments), vec!["Get down behind the wall,", "Ada hissed."]);
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, SegmentationWarning::NarratorSuppressed { .. })));
    }
}

#[test]
fn test_contraction_after_dialogue_is_kept_whole() {
    let cases = [
        ("\"Come on,\" he'd said, and left.", "\"Come on,\"", "he'd said, and left."),
        ("\"Dinner!\" mom's voice carried up the stairs.", "\"Dinner!\"", "mom's voice carried up the stairs."),
    ];
    for (prose, quote, narration) in cases {
        let end = quote.chars().count() as i64;
        let span = ClaimedSpan::new("Tom", quote, 0, end);
        let segments = convert_dialogue_map_to_segments(prose, Some(&[span])).unwrap();
        assert_eq!(segments.len(), 2, "{prose}");
        assert_eq!(segments[1].text(), narration);
        assert!(segments[1].is_narrator());
    }
}

#[test]
fn test_one_letter_claim_is_relocated_not_accepted() {
    let prose = "Jensen walked in. \"We need to move,\" she said.";
    let span = ClaimedSpan::new("Jensen", "\"We need to move,\"", 1, 2);
    let report = Segmenter::default().segment(prose, Some(&[span])).unwrap();

    assert_eq!(report.counts.relocated, 1);
    assert_eq!(texts(&report.segments), vec!["Jensen walked in.", "We need to move,", "she said."]);
    assert_eq!(report.segments[1].char_range(), Some((18, 36)));
}

#[test]
fn test_high_failure_rate_aborts() {
    let scene = radio_scene(&[2, 5, 8], "\"Xq zvv br\"");
    let err = convert_dialogue_map_to_segments(scene.prose(), Some(scene.spans())).unwrap_err();
    match err {
        SegmentationIntegrityError::FailureRateExceeded { failed, total, .. } => {
            assert_eq!((failed, total), (3, 10));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_single_unlocatable_span_kept_as_synthetic() {
    let scene = radio_scene(&[4], "\"Qwrtp zxcvb mnbvc lkjhg\"");
    let report = Segmenter::default().segment(scene.prose(), Some(scene.spans())).unwrap();

    assert_eq!(report.counts.synthetic, 1);
    assert_eq!(report.counts.verified, 9);
    let dialogue: Vec<&Segment> = report.segments.iter().filter(|s| s.is_dialogue()).collect();
    assert_eq!(dialogue.len(), 10);

    let synthetic_at = report
        .segments
        .iter()
        .position(|s| matches!(s, Segment::Synthetic { .. }))
        .unwrap();
    assert_eq!(report.segments[synthetic_at].text(), "Qwrtp zxcvb mnbvc lkjhg");
    assert_eq!(report.segments[synthetic_at - 1].text(), "Signal delta is clear.");
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, SegmentationWarning::SyntheticSpan { .. })));
}

#[test]
fn test_single_unlocatable_span_dropped_in_strict_mode() {
    let scene = radio_scene(&[4], "\"Qwrtp zxcvb mnbvc lkjhg\"");
    let strict = Segmenter::new(SegmentationConfig { synthetic_fallback: false, ..Default::default() }).unwrap();
    let report = strict.segment(scene.prose(), Some(scene.spans())).unwrap();

    assert_eq!(report.counts.failed, 1);
    assert_eq!(report.segments.iter().filter(|s| s.is_dialogue()).count(), 9);
    assert!(report.segments.iter().all(|s| s.char_range().is_some()));
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, SegmentationWarning::DroppedSpan { speaker, .. } if speaker == "Operator")));
}

#[test]
fn test_all_spans_failed_aborts() {
    let span = ClaimedSpan::new("Ada", "\"Nope.\"", 0, 7);
    let err = convert_dialogue_map_to_segments("Rain on the roof all night.", Some(&[span])).unwrap_err();
    assert!(matches!(err, SegmentationIntegrityError::AllSpansFailed { total: 1 }));
}

#[test]
fn test_relocated_text_that_disagrees_with_claim_is_fatal() {
    let prose = "Detective Hale leaned in. \"Lighthouse? Yesterday? I never went anywhere near the harbour, officer.\"";
    let span = ClaimedSpan::new("Suspect", "\"lighthouse keeper painted yesterday\"", 0, 10);
    let err = convert_dialogue_map_to_segments(prose, Some(&[span])).unwrap_err();
    match err {
        SegmentationIntegrityError::ContentMismatch { speaker, overlap, .. } => {
            assert_eq!(speaker, "Suspect");
            assert!(overlap < 0.6);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_overlapping_claims_fail_loud() {
    let prose = "\"Hello,\" she said. \"Goodbye,\" he said.";
    let map = vec![
        ClaimedSpan::new("Ada", "\"Goodbye,\"", 5, 29),
        ClaimedSpan::new("Ben", "\"Hello,\"", 0, 8),
    ];
    let err = convert_dialogue_map_to_segments(prose, Some(&map)).unwrap_err();
    assert!(matches!(
        err,
        SegmentationIntegrityError::OverlappingSpans { start_char: 5, previous_end_char: 8, .. }
    ));
}

#[test]
fn test_segments_follow_prose_order() {
    let scene = SceneBuilder::new()
        .narrate("Ève hesitated. ")
        .say("Eve", "\u{201C}Is the café still open?\u{201D}")
        .narrate(" she asked. ")
        .say("Ann", "\u{201C}Only until nine.\u{201D}")
        .narrate(" The door swung shut.");
    let segments = convert_dialogue_map_to_segments(scene.prose(), Some(scene.spans())).unwrap();

    assert_eq!(
        texts(&segments),
        vec!["Ève hesitated.", "Is the café still open?", "she asked.", "Only until nine.", "The door swung shut."]
    );

    let ranges: Vec<(usize, usize)> = segments.iter().filter_map(Segment::char_range).collect();
    for pair in ranges.windows(2) {
        assert!(pair[0].1 <= pair[1].0, "{pair:?}");
    }
    for pair in segments.windows(2) {
        assert!(!(pair[0].is_narrator() && pair[1].is_narrator()));
    }

    let first_quote = &scene.spans()[0];
    assert_eq!(
        segments[1].char_range(),
        Some((first_quote.start_char as usize, first_quote.end_char as usize))
    );

    let joined: String = segments.iter().map(Segment::text).collect();
    assert_eq!(alphanumerics(&joined), alphanumerics(scene.prose()));
}

#[test]
fn test_reverifying_resolved_spans_succeeds() {
    let scene = radio_scene(&[], "").shift_claims(3);
    let resolved = Segmenter::default().resolve(scene.prose(), scene.spans()).unwrap();
    let prose = ProseText::new(scene.prose());

    let mut cursor = BytePos(0);
    for span in &resolved {
        let range = span.range().unwrap();
        let CharPos(start) = prose.char_of(range.start);
        let CharPos(end) = prose.char_of(range.end);
        let claim = ClaimedSpan::new(span.claim.speaker.clone(), span.claim.quote.clone(), start as i64, end as i64);

        let first = verify(&prose, &claim, cursor, 20, 0.5);
        let second = verify(&prose, &claim, cursor, 20, 0.5);
        assert!(first.valid);
        assert_eq!(first, second);
        cursor = range.end;
    }
}

#[test]
fn test_resolved_ranges_never_overlap() {
    let scene = radio_scene(&[3, 7], "\"Qwrtp zxcvb mnbvc lkjhg\"").shift_claims(4);
    let resolved = Segmenter::default().resolve(scene.prose(), scene.spans()).unwrap();

    let ranges: Vec<_> = resolved.iter().filter_map(|s| s.range()).collect();
    assert_eq!(ranges.len(), 8);
    for (i, a) in ranges.iter().enumerate() {
        for b in &ranges[i + 1..] {
            assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
        }
    }
}

#[test]
fn test_emitted_text_stays_within_prose_length() {
    let scenes = [
        jensen_scene(),
        jensen_scene().shift_claims(5),
        radio_scene(&[4], "\"Qwrtp zxcvb mnbvc lkjhg\""),
        SceneBuilder::new()
            .say("Mara", "\"Come here,\"")
            .narrate(" she said. Come here."),
    ];
    for mode in [DedupMode::Conservative, DedupMode::Aggressive] {
        let segmenter = Segmenter::new(SegmentationConfig { dedup_mode: mode, ..Default::default() }).unwrap();
        for scene in &scenes {
            let report = segmenter.segment(scene.prose(), Some(scene.spans())).unwrap();
            let prose_chars = scene.prose().chars().count() as f64;
            assert!(positioned_text_chars(&report.segments) as f64 <= prose_chars * 1.05);
            assert!(!report.duplication_detected);
        }
    }
}

#[test]
fn test_emotion_and_delivery_carried_to_dialogue() {
    let span = ClaimedSpan::new("Jensen", "\"We need to move,\"", 18, 36)
        .with_emotion("urgent")
        .with_delivery("whispered");
    let segments = convert_dialogue_map_to_segments(JENSEN_PROSE, Some(&[span])).unwrap();
    match &segments[1] {
        Segment::Dialogue { emotion, delivery, .. } => {
            assert_eq!(emotion.as_deref(), Some("urgent"));
            assert_eq!(delivery.as_deref(), Some("whispered"));
        }
        other => panic!("expected dialogue, got {other:?}"),
    }
}
