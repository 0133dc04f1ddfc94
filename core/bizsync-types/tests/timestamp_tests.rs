use bizsync_types::{Error, HybridTimestamp, NodeId};

fn node(s: &str) -> NodeId {
    NodeId::parse(s).unwrap()
}

fn ts(wall: u64, logical: u32, n: &str) -> HybridTimestamp {
    HybridTimestamp::new(wall, logical, node(n))
}

// ── Construction ─────────────────────────────────────────────────

#[test]
fn system_clock_reading_has_zero_logical() {
    let ts = HybridTimestamp::from_system_clock(node("a"));
    assert_eq!(ts.logical(), 0);
    assert!(ts.wall_time() > 0);
    assert_eq!(ts.node_id(), &node("a"));
}

#[test]
fn system_clock_readings_are_not_a_sequence() {
    // Unlike the logical clock, back-to-back readings may be equal.
    let a = HybridTimestamp::from_system_clock(node("a"));
    let b = HybridTimestamp::from_system_clock(node("a"));
    assert!(b >= a);
    assert!(b.wall_time() - a.wall_time() < 60_000);
}

#[test]
fn new_from_components() {
    let t = ts(42, 7, "node-a");
    assert_eq!(t.wall_time(), 42);
    assert_eq!(t.logical(), 7);
    assert_eq!(t.node_id().as_str(), "node-a");
}

// ── Ordering ─────────────────────────────────────────────────────

#[test]
fn ordering_by_wall_time() {
    assert!(ts(100, 9, "z") < ts(200, 0, "a"));
}

#[test]
fn ordering_by_logical_when_wall_time_equal() {
    assert!(ts(100, 0, "z") < ts(100, 1, "a"));
}

#[test]
fn ordering_by_node_when_wall_and_logical_equal() {
    let a = ts(100, 3, "node-a");
    let b = ts(100, 3, "node-b");
    assert!(a < b);
    assert_ne!(a, b);
}

#[test]
fn equal_timestamps() {
    let a = ts(100, 5, "a");
    let b = ts(100, 5, "a");
    assert_eq!(a, b);
    assert!(!(a < b));
    assert!(!(a > b));
}

#[test]
fn is_before_and_is_after() {
    let a = ts(1, 0, "a");
    let b = ts(2, 0, "a");
    assert!(a.is_before(&b));
    assert!(!b.is_before(&a));
    assert!(b.is_after(&a));
}

#[test]
fn latest_picks_greater() {
    let a = ts(1, 0, "a");
    let b = ts(1, 0, "b");
    assert_eq!(a.latest(&b), &b);
    assert_eq!(b.latest(&a), &b);
}

// ── Text form ────────────────────────────────────────────────────

#[test]
fn display_is_zero_padded() {
    assert_eq!(
        ts(1700000000000, 3, "node-a").to_string(),
        "00000001700000000000-0000000003-node-a"
    );
}

#[test]
fn text_roundtrip_with_dashed_node_id() {
    let node_id = NodeId::generate();
    let t = HybridTimestamp::new(123, 45, node_id);
    let parsed: HybridTimestamp = t.to_string().parse().unwrap();
    assert_eq!(parsed, t);
    assert_eq!(parsed.to_string(), t.to_string());
}

#[test]
fn text_order_matches_timestamp_order() {
    let a = ts(99, 12, "n");
    let b = ts(100, 0, "n");
    assert!(a.to_string() < b.to_string());
}

#[test]
fn parse_rejects_garbage() {
    assert!("".parse::<HybridTimestamp>().is_err());
    assert!("12-3".parse::<HybridTimestamp>().is_err());
    assert!("abc-0-node".parse::<HybridTimestamp>().is_err());
    assert!("12-xyz-node".parse::<HybridTimestamp>().is_err());
    assert!("12-0-".parse::<HybridTimestamp>().is_err());
    assert!("12-99999999999-node".parse::<HybridTimestamp>().is_err());
}

// ── Serde ────────────────────────────────────────────────────────

#[test]
fn serde_uses_text_form() {
    let t = ts(5, 1, "node-a");
    let json = serde_json::to_string(&t).unwrap();
    assert_eq!(json, "\"00000000000000000005-0000000001-node-a\"");
    let parsed: HybridTimestamp = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, t);
}

#[test]
fn serde_rejects_malformed_text() {
    let result: Result<HybridTimestamp, _> = serde_json::from_str("\"not-a-timestamp\"");
    assert!(result.is_err());
}

#[test]
fn parse_errors_are_invalid_timestamp() {
    let err = "12-3".parse::<HybridTimestamp>().unwrap_err();
    assert!(matches!(err, Error::InvalidTimestamp(_)));

    // Serde surfaces the same message through its own error type.
    let err = serde_json::from_str::<HybridTimestamp>("\"12-3\"").unwrap_err();
    assert!(err.to_string().contains("invalid timestamp"));
}
