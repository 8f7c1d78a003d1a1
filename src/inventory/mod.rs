mod cell;
mod loader;
mod normalize;
mod synthetic;
#[cfg(test)]
mod tests;

pub use cell::{split_bracketed_cell, split_cell};
pub use loader::{NormalizedBatch, load_inventory, normalize_reader, normalize_source};
pub use normalize::*;
pub use synthetic::{
    FLAG_VOCABULARY, SYNTHETIC_DIMENSION_RANGE, SYNTHETIC_INVENTORY_RANGE, SYNTHETIC_PRICE_RANGE,
    SYNTHETIC_SKU_RANGE, SYNTHETIC_WEIGHT_RANGE, SyntheticFields, TAG_VOCABULARY, generate_fields,
};
