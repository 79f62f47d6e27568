#![no_main]

use cildiff::{compare, diff::CompareOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let comparison = compare(data.to_vec(), data.to_vec(), &CompareOptions::default());
    let _ = comparison.version_change();
    let _ = comparison.to_xml();
});
