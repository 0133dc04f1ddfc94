use bizsync_crdt::{CausalOrder, Crdt, VectorClock};
use bizsync_types::NodeId;
use pretty_assertions::assert_eq;

fn node(s: &str) -> NodeId {
    NodeId::parse(s).unwrap()
}

fn clock_with(owner: &str, ticks: &[(&str, u64)]) -> VectorClock {
    let mut clock = VectorClock::new(node(owner));
    for &(n, count) in ticks {
        let mut other = VectorClock::new(node(n));
        for _ in 0..count {
            other.tick();
        }
        clock.update(&other);
    }
    clock
}

// ── Construction ─────────────────────────────────────────────────

#[test]
fn new_clock_is_empty() {
    let clock = VectorClock::new(node("a"));
    assert!(clock.is_empty());
    assert_eq!(clock.len(), 0);
    assert_eq!(clock.node_id(), &node("a"));
}

#[test]
fn get_unknown_node_returns_zero() {
    let clock = VectorClock::new(node("a"));
    assert_eq!(clock.get(&node("nobody")), 0);
}

// ── tick ─────────────────────────────────────────────────────────

#[test]
fn tick_increments_own_counter() {
    let mut clock = VectorClock::new(node("a"));
    assert_eq!(clock.tick(), 1);
    assert_eq!(clock.tick(), 2);
    assert_eq!(clock.get(&node("a")), 2);
    assert_eq!(clock.len(), 1);
}

#[test]
fn tick_never_touches_other_nodes() {
    let mut clock = clock_with("a", &[("b", 3)]);
    clock.tick();
    assert_eq!(clock.get(&node("b")), 3);
    assert_eq!(clock.get(&node("a")), 1);
}

#[test]
fn rebind_changes_which_counter_ticks() {
    let mut clock = VectorClock::new(node("a"));
    clock.tick();
    clock.rebind(node("b"));
    clock.tick();
    assert_eq!(clock.get(&node("a")), 1);
    assert_eq!(clock.get(&node("b")), 1);
}

// ── update ───────────────────────────────────────────────────────

#[test]
fn update_takes_pointwise_max() {
    let mut a = clock_with("a", &[("a", 3), ("b", 1)]);
    let b = clock_with("b", &[("a", 1), ("b", 4), ("c", 2)]);
    a.update(&b);
    assert_eq!(a.get(&node("a")), 3);
    assert_eq!(a.get(&node("b")), 4);
    assert_eq!(a.get(&node("c")), 2);
    assert_eq!(a.node_id(), &node("a"));
}

#[test]
fn update_is_commutative() {
    let a = clock_with("a", &[("a", 2), ("b", 5)]);
    let b = clock_with("b", &[("b", 1), ("c", 7)]);
    assert_eq!(a.merged(&b), b.merged(&a));
}

#[test]
fn update_is_idempotent() {
    let a = clock_with("a", &[("a", 2), ("b", 5)]);
    assert_eq!(a.merged(&a), a);
}

#[test]
fn update_with_empty_is_identity() {
    let a = clock_with("a", &[("a", 2)]);
    let empty = VectorClock::new(node("z"));
    assert_eq!(a.merged(&empty), a);
    assert_eq!(empty.merged(&a), a);
}

// ── compare ──────────────────────────────────────────────────────

#[test]
fn identical_clocks_are_equal() {
    let a = clock_with("a", &[("a", 2)]);
    let b = clock_with("b", &[("a", 2)]);
    assert_eq!(a.compare(&b), CausalOrder::Equal);
    assert_eq!(a, b);
}

#[test]
fn missing_entries_count_as_zero() {
    let a = clock_with("a", &[("a", 2), ("b", 0)]);
    let b = clock_with("a", &[("a", 2)]);
    assert_eq!(a.compare(&b), CausalOrder::Equal);
}

#[test]
fn strictly_smaller_happens_before() {
    let a = clock_with("a", &[("a", 1), ("b", 1)]);
    let b = clock_with("b", &[("a", 1), ("b", 2)]);
    assert_eq!(a.compare(&b), CausalOrder::Before);
    assert_eq!(b.compare(&a), CausalOrder::After);
    assert!(a.happens_before(&b));
    assert!(!b.happens_before(&a));
    assert!(b.dominates(&a));
}

#[test]
fn divergent_clocks_are_concurrent() {
    let a = clock_with("a", &[("a", 2), ("b", 1)]);
    let b = clock_with("b", &[("a", 1), ("b", 2)]);
    assert_eq!(a.compare(&b), CausalOrder::Concurrent);
    assert!(a.is_concurrent(&b));
    assert!(!a.dominates(&b));
    assert!(!b.dominates(&a));
}

#[test]
fn merged_clock_dominates_both_inputs() {
    let a = clock_with("a", &[("a", 2), ("b", 1)]);
    let b = clock_with("b", &[("a", 1), ("b", 2)]);
    let m = a.merged(&b);
    assert!(m.dominates(&a));
    assert!(m.dominates(&b));
    assert!(a.happens_before(&m));
}

#[test]
fn equality_ignores_owner() {
    assert_eq!(VectorClock::new(node("a")), VectorClock::new(node("b")));
}

// ── Text form ────────────────────────────────────────────────────

#[test]
fn display_lists_nodes_in_order() {
    let clock = clock_with("b", &[("c", 1), ("a", 3)]);
    assert_eq!(clock.to_string(), "b|a=3,c=1");
}

#[test]
fn display_of_empty_clock() {
    assert_eq!(VectorClock::new(node("a")).to_string(), "a|");
}

#[test]
fn text_roundtrip() {
    let clock = clock_with("owner", &[("x", 9), ("y", 1)]);
    let text = clock.to_string();
    let parsed: VectorClock = text.parse().unwrap();
    assert_eq!(parsed, clock);
    assert_eq!(parsed.node_id(), clock.node_id());
    assert_eq!(parsed.to_string(), text);
}

#[test]
fn parse_rejects_malformed_text() {
    for bad in ["", "no-owner", "|a=1", "a|b", "a|b=x", "a|b=1,b=2", "a|b c=1"] {
        assert!(bad.parse::<VectorClock>().is_err(), "{bad:?} should be rejected");
    }
}

// ── JSON ─────────────────────────────────────────────────────────

#[test]
fn json_roundtrip_is_byte_identical() {
    let clock = clock_with("a", &[("a", 2), ("b", 7)]);
    let json = clock.to_json().unwrap();
    assert_eq!(json, r#"{"node_id":"a","counters":{"a":2,"b":7}}"#);
    let parsed = VectorClock::from_json(&json).unwrap();
    assert_eq!(parsed.to_json().unwrap(), json);
}

#[test]
fn json_rejects_negative_counter() {
    assert!(VectorClock::from_json(r#"{"node_id":"a","counters":{"a":-1}}"#).is_err());
}
