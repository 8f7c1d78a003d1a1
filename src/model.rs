use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type RawRow = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub sku: u64,
    pub name: String,
    pub primary_category: String,
    pub other_categories: Vec<String>,
    pub flags: Vec<String>,
    pub tags: Vec<String>,
    pub bulk: bool,
    pub grocery: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_supplier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    pub price: f64,
    pub weight: f64,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub last_received: NaiveDate,
    pub last_inventory: NaiveDate,
    pub last_sold: NaiveDate,
    pub inventory_low: i64,
    pub inventory_par: i64,
    pub inventory: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedRow {
    pub ordinal: usize,
    pub raw: RawRow,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub collection: String,
    pub mode: String,
    pub source_path: String,
    pub rows_read: usize,
    pub inserted: usize,
    pub skipped: Vec<SkippedRow>,
}

impl LoadSummary {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadPaths {
    pub source_path: String,
    pub store_root: String,
    pub database_path: String,
    pub report_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub duration_ms: u64,
    pub environment: String,
    pub database: String,
    pub collection: String,
    pub mode: String,
    pub row_failure_policy: String,
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_sha256: Option<String>,
    pub paths: LoadPaths,
    pub rows_read: usize,
    pub inserted: usize,
    pub skipped_count: usize,
    pub skipped: Vec<SkippedRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
