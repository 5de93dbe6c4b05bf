//! Prelude module - commonly used test utilities.
//!
//! Use `use tessera_test::prelude::*;` to import all essential helpers.

// Mocks
pub use crate::{Gate, MockBridge};

// Fixtures
pub use crate::{charts_entry, sample_registry};

// Harness
pub use crate::{module_dir, setup_test_logging};
