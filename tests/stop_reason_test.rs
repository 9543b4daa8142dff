//! Tests for finish reason resolution.

use genai_meter::signals::stop_reason::{
    finish_reason, from_response, resolve, resolve_with_fallback_name,
};
use genai_meter::{GenerateResponse, StopReason};
use serde_json::json;

fn response(value: serde_json::Value) -> GenerateResponse {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_known_reasons_map_to_members() {
    let cases = [
        ("STOP", StopReason::End),
        ("MAX_TOKENS", StopReason::TokenLimit),
        ("SAFETY", StopReason::Error),
        ("RECITATION", StopReason::Error),
        ("BLOCKLIST", StopReason::Error),
        ("PROHIBITED_CONTENT", StopReason::Error),
        ("SPII", StopReason::Error),
        ("MODEL_ARMOR", StopReason::Error),
        ("IMAGE_SAFETY", StopReason::Error),
        ("IMAGE_PROHIBITED_CONTENT", StopReason::Error),
        ("IMAGE_RECITATION", StopReason::Error),
        ("MALFORMED_FUNCTION_CALL", StopReason::Error),
        ("UNEXPECTED_TOOL_CALL", StopReason::Error),
        ("NO_IMAGE", StopReason::Error),
        ("CANCELLED", StopReason::Cancelled),
        ("CANCELED", StopReason::Cancelled),
    ];
    for (raw, expected) in cases {
        assert_eq!(resolve(Some(raw), StopReason::End), expected, "{raw}");
    }
}

#[test]
fn test_input_is_trimmed_and_case_insensitive() {
    assert_eq!(resolve(Some("  stop "), StopReason::Error), StopReason::End);
    assert_eq!(resolve(Some("Max_Tokens"), StopReason::End), StopReason::TokenLimit);
}

#[test]
fn test_unspecified_and_missing_use_fallback() {
    for raw in [
        None,
        Some(""),
        Some("   "),
        Some("FINISH_REASON_UNSPECIFIED"),
        Some("OTHER"),
        Some("IMAGE_OTHER"),
    ] {
        assert_eq!(resolve(raw, StopReason::Timeout), StopReason::Timeout, "{raw:?}");
    }
}

#[test]
fn test_unknown_reason_never_escapes_the_enum() {
    for raw in ["SOMETHING_NEW", "stop!", "42", "END_OF_WORLD"] {
        let resolved = resolve(Some(raw), StopReason::End);
        assert!(StopReason::ALL.contains(&resolved));
        assert_eq!(resolved, StopReason::End);
    }
}

#[test]
fn test_invalid_fallback_name_becomes_end() {
    assert_eq!(resolve_with_fallback_name(None, "NOT_A_REASON"), StopReason::End);
    assert_eq!(resolve_with_fallback_name(None, "timeout"), StopReason::Timeout);
    assert_eq!(
        resolve_with_fallback_name(Some("weird"), "COST_LIMIT"),
        StopReason::CostLimit
    );
}

#[test]
fn test_first_candidate_wins_over_top_level() {
    let r = response(json!({
        "finishReason": "STOP",
        "candidates": [{ "finishReason": "MAX_TOKENS" }]
    }));
    assert_eq!(finish_reason(&r), Some("MAX_TOKENS"));
    assert_eq!(from_response(&r), StopReason::TokenLimit);
}

#[test]
fn test_top_level_used_without_candidates() {
    let r = response(json!({ "finishReason": "SAFETY" }));
    assert_eq!(from_response(&r), StopReason::Error);
}

#[test]
fn test_wrongly_typed_reason_reads_as_missing() {
    let r = response(json!({ "candidates": [{ "finishReason": 7 }] }));
    assert_eq!(finish_reason(&r), None);
    assert_eq!(from_response(&r), StopReason::End);
}

#[test]
fn test_wire_names_round_trip_through_from_str() {
    for reason in StopReason::ALL {
        assert_eq!(reason.as_str().parse::<StopReason>().unwrap(), reason);
    }
    assert!("nope".parse::<StopReason>().is_err());
    assert_eq!(StopReason::validate("nope"), StopReason::End);
}
