//! Fuzz target for the AIGER reader
//!
//! Feeds arbitrary bytes to the reader; anything it accepts must also turn
//! into a transition relation without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sisi_core::{Aig, Context};
use sisi_ts::TransitionRelation;

fuzz_target!(|data: &[u8]| {
    let Ok(aig) = Aig::parse(data) else {
        return;
    };
    for property in 0..aig.num_properties().min(4) {
        let _ = TransitionRelation::from_aig(Context::with_defaults(), &aig, property);
    }
});
