#![no_main]
use libfuzzer_sys::fuzz_target;

use bitalign::corpus::Corpus;

// Arbitrary bytes through the corpus reader: malformed headers, truncated
// rows, absurd lengths and out-of-range ids must all surface as Err values,
// never as panics or out-of-bounds indexing.
fuzz_target!(|data: &[u8]| {
    let _ = Corpus::read("fuzz", data);
    let _ = Corpus::read_pair("fuzz-a", "fuzz-b", data);
});
