#![no_main]
use libfuzzer_sys::fuzz_target;
use xmlnav::{Config, Parser};

fuzz_target!(|data: &[u8]| {
    let mut parser = Parser::with_config(data, Config::new(64, 1 << 20));
    let _ = parser.parse();
});
