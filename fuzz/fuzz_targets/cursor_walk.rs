#![no_main]
use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use xmlnav::{from_xml_bytes, Cursor};

// First byte drives the moves, the rest is the document.
fuzz_target!(|data: &[u8]| {
    let Some((&moves, xml)) = data.split_first() else {
        return;
    };
    let Ok(document) = from_xml_bytes(xml) else {
        return;
    };
    let Ok(mut cursor) = Cursor::new(Arc::new(document)) else {
        return;
    };

    let saved = cursor.save();
    for bit in 0..8 {
        if moves & (1 << bit) != 0 {
            cursor.enter();
            cursor.find("a");
        } else {
            cursor.next();
            let _ = cursor.leave();
        }
        let _ = (cursor.name(), cursor.value(), cursor.depth());
    }
    cursor.first();
    cursor.restore(saved);
    assert_eq!(cursor.save(), saved);
});
