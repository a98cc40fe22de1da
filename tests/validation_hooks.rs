//! Validation call accounting. Kept in its own test binary because the
//! counter is process-wide.
#![cfg(feature = "test-hooks")]

use qrcanvas_core::validation::{get_validation_call_count, reset_validation_call_count};
use qrcanvas_core::{Configuration, RenderPipeline, WriterKey};

#[test]
fn validation_runs_only_when_requested() {
    let pipeline = RenderPipeline::new();
    let mut config = Configuration::new("hooks");
    reset_validation_call_count();

    pipeline.write_string(&config, WriterKey::PNG).unwrap();
    assert_eq!(get_validation_call_count(), 0);

    config.set_validate_result(true);
    pipeline.write_string(&config, WriterKey::EPS).unwrap();
    pipeline.write_string(&config, WriterKey::PNG).unwrap();
    assert_eq!(get_validation_call_count(), 2);
}
