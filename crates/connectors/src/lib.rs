//! Source and sink connectors for the weir runtime.
//!
//! Architecture role:
//! - [`Generator`]: rate-limited synthetic source driven by the plan schema
//! - [`Console`]: formatted stdout sink
//! - [`Collect`]: accumulating sink for tests and examples

pub mod collect;
pub mod console;
pub mod generator;

pub use collect::{Collect, CollectHandle};
pub use console::Console;
pub use generator::Generator;
