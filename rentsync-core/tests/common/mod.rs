//! Common test utilities for rentsync-core integration tests

pub mod fixtures;
pub mod recording_push;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use recording_push::RecordingPush;
