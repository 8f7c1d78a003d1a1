use std::ops::RangeInclusive;

use rand::Rng;
use rand::seq::SliceRandom;

pub const FLAG_VOCABULARY: [&str; 6] = [
    "Core",
    "Brewing Basics",
    "Special Order Only",
    "Temporarily Unavailable",
    "Discontinued",
    "Hidden",
];

pub const TAG_VOCABULARY: [&str; 3] = ["red", "white", "blue"];

pub const SYNTHETIC_SKU_RANGE: RangeInclusive<u64> = 1..=100_000;
pub const SYNTHETIC_INVENTORY_RANGE: RangeInclusive<i64> = 20..=89;

// Synthetic prices are whole cents, weights and dimensions whole tenths.
const PRICE_CENTS: RangeInclusive<u32> = 0..=99_999;
const WEIGHT_TENTHS: RangeInclusive<u32> = 5..=104;
const DIMENSION_TENTHS: RangeInclusive<u32> = 10..=99;

pub const SYNTHETIC_PRICE_RANGE: RangeInclusive<f64> = 0.0..=999.99;
pub const SYNTHETIC_WEIGHT_RANGE: RangeInclusive<f64> = 0.5..=10.4;
pub const SYNTHETIC_DIMENSION_RANGE: RangeInclusive<f64> = 1.0..=9.9;

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticFields {
    pub sku: u64,
    pub price: f64,
    pub flag: String,
    pub tag: String,
    pub bulk: bool,
    pub weight: f64,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub inventory: i64,
}

pub fn generate_fields<R: Rng + ?Sized>(rng: &mut R) -> SyntheticFields {
    SyntheticFields {
        sku: rng.gen_range(SYNTHETIC_SKU_RANGE),
        price: f64::from(rng.gen_range(PRICE_CENTS)) / 100.0,
        flag: pick(rng, &FLAG_VOCABULARY),
        tag: pick(rng, &TAG_VOCABULARY),
        bulk: rng.gen_bool(0.5),
        weight: tenths(rng, WEIGHT_TENTHS),
        length: tenths(rng, DIMENSION_TENTHS),
        width: tenths(rng, DIMENSION_TENTHS),
        height: tenths(rng, DIMENSION_TENTHS),
        inventory: rng.gen_range(SYNTHETIC_INVENTORY_RANGE),
    }
}

fn tenths<R: Rng + ?Sized>(rng: &mut R, range: RangeInclusive<u32>) -> f64 {
    f64::from(rng.gen_range(range)) / 10.0
}

fn pick<R: Rng + ?Sized>(rng: &mut R, vocabulary: &[&str]) -> String {
    vocabulary
        .choose(rng)
        .map(|value| (*value).to_string())
        .unwrap_or_default()
}
