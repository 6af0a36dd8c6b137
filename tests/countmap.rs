// Integration tests for the two-shape count map.
//
// Coverage:
//   - sorted inline shape: ordering, overwrite, delete-with-shift
//   - promotion to the hash shape and survival of all entries
//   - add() insert-if-absent and wrap-on-underflow semantics
//   - back-shift deletion keeps every surviving key reachable
//   - long randomized op sequence checked against std::collections::HashMap

use std::collections::HashMap;

use bitalign::countmap::{CountMap, MAX_FIXED};
use bitalign::Rng;

// ─────────────────────────────────────────────────────────────────────────────
// Inline shape
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn empty_map_has_no_entries() {
    let m = CountMap::new();
    assert_eq!(m.len(), 0);
    assert!(m.is_empty());
    assert_eq!(m.get(0), None);
    assert_eq!(m.iter().count(), 0);
}

#[test]
fn insert_returns_presence() {
    let mut m = CountMap::new();
    assert!(!m.insert(10, 1));
    assert!(m.insert(10, 2));
    assert_eq!(m.get(10), Some(2));
    assert_eq!(m.len(), 1);
}

#[test]
fn inline_iteration_is_key_sorted() {
    let mut m = CountMap::new();
    for key in [9u32, 2, 7, 4] {
        m.insert(key, key + 100);
    }
    let keys: Vec<u32> = m.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![2, 4, 7, 9]);
}

#[test]
fn remove_from_inline_shape_shifts_tail() {
    let mut m = CountMap::new();
    for key in [1u32, 2, 3] {
        m.insert(key, key);
    }
    assert!(m.remove(2));
    assert!(!m.remove(2));
    assert_eq!(m.get(1), Some(1));
    assert_eq!(m.get(3), Some(3));
    assert_eq!(m.len(), 2);
    let keys: Vec<u32> = m.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![1, 3]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Promotion and the hash shape
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn promotion_preserves_every_entry() {
    let mut m = CountMap::new();
    let n = (MAX_FIXED as u32 + 1) * 3;
    for key in 0..n {
        m.insert(key * 17, key);
    }
    assert!(m.is_dynamic());
    assert_eq!(m.len(), n as usize);
    for key in 0..n {
        assert_eq!(m.get(key * 17), Some(key), "key {}", key * 17);
    }
}

#[test]
fn growth_keeps_load_factor_at_half() {
    let mut m = CountMap::new();
    for key in 0..1000u32 {
        m.insert(key, key);
    }
    assert!(m.capacity() >= 2 * m.len());
    assert!(m.capacity().is_power_of_two());
}

#[test]
fn backshift_deletion_keeps_survivors_reachable() {
    let mut m = CountMap::new();
    for key in 0..512u32 {
        m.insert(key, key + 1);
    }
    // remove every third key, then every remaining survivor must still be
    // reachable through its (possibly shifted) probe run
    for key in (0..512u32).step_by(3) {
        assert!(m.remove(key));
    }
    for key in 0..512u32 {
        if key % 3 == 0 {
            assert_eq!(m.get(key), None, "deleted key {key} resurfaced");
        } else {
            assert_eq!(m.get(key), Some(key + 1), "key {key} lost after deletes");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// add() semantics
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn add_inserts_delta_when_absent() {
    let mut m = CountMap::new();
    assert_eq!(m.add(5, 3), 3);
    assert_eq!(m.add(5, 2), 5);
    assert_eq!(m.get(5), Some(5));
}

#[test]
fn add_subtracts_via_twos_complement() {
    let mut m = CountMap::new();
    m.insert(8, 2);
    assert_eq!(m.add(8, 1u32.wrapping_neg()), 1);
    assert_eq!(m.add(8, 1u32.wrapping_neg()), 0);
    // one step past zero wraps and sets the sign bit, which callers treat
    // as an invariant violation
    assert_ne!(m.add(8, 1u32.wrapping_neg()) & 0x8000_0000, 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Model-based randomized comparison
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn random_ops_match_hashmap_model() {
    let mut rng = Rng::from_seed(0x00c0_ffee);
    let mut map = CountMap::new();
    let mut model: HashMap<u32, u32> = HashMap::new();

    for step in 0..20_000 {
        let key = rng.uint32_biased(400);
        match rng.uint32_biased(4) {
            0 => {
                let value = rng.uint32_biased(1000);
                assert_eq!(
                    map.insert(key, value),
                    model.insert(key, value).is_some(),
                    "insert disagreement at step {step}"
                );
            }
            1 => {
                let delta = rng.uint32_biased(5) + 1;
                let expected = *model
                    .entry(key)
                    .and_modify(|v| *v = v.wrapping_add(delta))
                    .or_insert(delta);
                assert_eq!(map.add(key, delta), expected, "add disagreement at step {step}");
            }
            2 => {
                assert_eq!(
                    map.remove(key),
                    model.remove(&key).is_some(),
                    "remove disagreement at step {step}"
                );
            }
            _ => {
                assert_eq!(map.get(key), model.get(&key).copied());
            }
        }
        assert_eq!(map.len(), model.len());
    }

    let mut items: Vec<(u32, u32)> = map.iter().collect();
    items.sort_unstable();
    let mut expected: Vec<(u32, u32)> = model.into_iter().collect();
    expected.sort_unstable();
    assert_eq!(items, expected);
}

#[test]
fn reset_then_refill_reuses_capacity() {
    let mut m = CountMap::new();
    for key in 0..256u32 {
        m.insert(key, key);
    }
    let cap = m.capacity();
    m.reset();
    for key in 0..128u32 {
        m.insert(key, key);
    }
    assert_eq!(m.capacity(), cap);
    for key in 0..128u32 {
        assert_eq!(m.get(key), Some(key));
    }
}
