#![no_main]
use libfuzzer_sys::fuzz_target;

use std::collections::HashMap;

use bitalign::countmap::CountMap;

// Interpret the fuzz input as a stream of map operations and check every
// result against a std HashMap model.  Keys are confined to 16 bits so
// collisions, promotion and back-shift deletion all get exercised heavily.
fuzz_target!(|data: &[u8]| {
    let mut map = CountMap::new();
    let mut model: HashMap<u32, u32> = HashMap::new();

    for op in data.chunks_exact(4) {
        let key = u32::from(u16::from_le_bytes([op[1], op[2]]));
        let value = u32::from(op[3]);
        match op[0] % 5 {
            0 => {
                let existed = map.insert(key, value);
                assert_eq!(existed, model.insert(key, value).is_some());
            }
            1 => {
                let expected = *model
                    .entry(key)
                    .and_modify(|v| *v = v.wrapping_add(value))
                    .or_insert(value);
                assert_eq!(map.add(key, value), expected);
            }
            2 => {
                assert_eq!(map.remove(key), model.remove(&key).is_some());
            }
            3 => {
                assert_eq!(map.get(key), model.get(&key).copied());
            }
            _ => {
                if value == 0 {
                    map.reset();
                    model.clear();
                }
            }
        }
        assert_eq!(map.len(), model.len());
    }

    let mut items: Vec<(u32, u32)> = map.iter().collect();
    items.sort_unstable();
    let mut expected: Vec<(u32, u32)> = model.into_iter().collect();
    expected.sort_unstable();
    assert_eq!(items, expected);
});
