#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Arbitrary TOML must either parse or be rejected; validate() must never panic.
    if let Ok(cfg) = breath_config::load_toml(data) {
        let _ = cfg.validate();
    }
});
