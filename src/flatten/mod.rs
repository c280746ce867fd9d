//! Document flattening - turn a nested tree into same-shaped rows
//!
//! The repeating node is located by path, by tag name, or by inference. Each
//! instance is then promoted up to the root, picking up the scalar context of
//! its ancestors on the way, and nested structure is collapsed into leaves.
//!
//! ## Naming
//!
//! - promotion joins names with the vertical separator: `order_item`
//! - collapsing joins names with the lateral separator: `shipping-city`
//! - root-level leaves folded into rows get the base prefix: `base-currency`

pub mod children;
pub mod detector;
pub mod engine;
pub mod instances;
pub mod promoter;
pub mod selector;
pub mod siblings;
pub mod types;

pub use detector::{detect, FrequencyTable, Selection, SelectionSource};
pub use engine::Flattener;
pub use instances::RepeatInstances;
pub use selector::PathSelector;
pub use types::{
    FlattenConfig, DEFAULT_BASE_PREFIX, DEFAULT_LATERAL_SEPARATOR, DEFAULT_VERTICAL_SEPARATOR,
};
