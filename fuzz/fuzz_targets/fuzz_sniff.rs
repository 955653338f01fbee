#![no_main]

use libfuzzer_sys::fuzz_target;
use mihiraki::sniff;

// The sniffers see source bytes before any validation, so arbitrary input
// must never panic them. Truncated or hostile containers sniff as static.
fuzz_target!(|data: &[u8]| {
    let _ = sniff::is_animated(data);
    let _ = sniff::probe_bounds(data);
});
