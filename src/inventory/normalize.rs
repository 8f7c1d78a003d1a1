use chrono::NaiveDate;
use rand::Rng;

use super::cell::{split_bracketed_cell, split_cell};
use super::synthetic::generate_fields;
use crate::cli::LoadMode;
use crate::error::RowError;
use crate::model::{InventoryRecord, RawRow};

pub const COLUMN_NAME: &str = "Name";
pub const COLUMN_PRIMARY_CATEGORY: &str = "Primary Category";
pub const COLUMN_OTHER_CATEGORIES: &str = "Other Categories";
pub const COLUMN_FLAGS: &str = "Flags";
pub const COLUMN_TAGS: &str = "Tags";
pub const COLUMN_BULK: &str = "Bulk";
pub const COLUMN_GROCERY: &str = "Grocery";
pub const COLUMN_MANUFACTURER: &str = "manufacturer";
pub const COLUMN_PRIMARY_SUPPLIER: &str = "Primary supplier";
pub const COLUMN_COST: &str = "Cost";
pub const COLUMN_PRICE: &str = "Price";

pub const IMPORT_COLUMNS: [&str; 11] = [
    COLUMN_NAME,
    COLUMN_PRIMARY_CATEGORY,
    COLUMN_OTHER_CATEGORIES,
    COLUMN_FLAGS,
    COLUMN_TAGS,
    COLUMN_BULK,
    COLUMN_GROCERY,
    COLUMN_MANUFACTURER,
    COLUMN_PRIMARY_SUPPLIER,
    COLUMN_COST,
    COLUMN_PRICE,
];

pub const SYNTHETIC_COLUMNS: [&str; 3] =
    [COLUMN_NAME, COLUMN_PRIMARY_CATEGORY, COLUMN_OTHER_CATEGORIES];

pub const CATEGORY_OPEN: char = '[';
pub const CATEGORY_CLOSE: char = ']';
pub const CATEGORY_DELIMITER: char = '?';
pub const LIST_DELIMITER: char = ',';

// Source names write commas as `*`.
pub const NAME_COMMA_PLACEHOLDER: char = '*';

pub const BOOLEAN_TRUE: &str = "TRUE";
pub const BOOLEAN_FALSE: &str = "FALSE";

pub const GROCERY_CATEGORY: &str = "Ingredients";

// Ordinal 0 is spreadsheet line 2.
pub const SKU_ROW_OFFSET: u64 = 2;

pub const DEFAULT_DIMENSION: f64 = 1.0;

pub const IMPORT_INVENTORY_LOW: i64 = 0;
pub const IMPORT_INVENTORY: i64 = 100;
pub const SYNTHETIC_INVENTORY_LOW: i64 = 10;
pub const INVENTORY_PAR: i64 = 100;

pub const IMPORT_STOCK_DATE: (i32, u32, u32) = (2019, 2, 23);
pub const SYNTHETIC_LAST_RECEIVED: (i32, u32, u32) = (2018, 1, 31);
pub const SYNTHETIC_LAST_INVENTORY: (i32, u32, u32) = (2017, 12, 31);
pub const SYNTHETIC_LAST_SOLD: (i32, u32, u32) = (2018, 1, 5);

pub fn required_columns(mode: LoadMode) -> &'static [&'static str] {
    match mode {
        LoadMode::Import => &IMPORT_COLUMNS,
        LoadMode::Synthetic => &SYNTHETIC_COLUMNS,
    }
}

pub fn calendar_date((year, month, day): (i32, u32, u32)) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

pub fn normalize_row<R: Rng + ?Sized>(
    row: &RawRow,
    ordinal: usize,
    mode: LoadMode,
    rng: &mut R,
) -> Result<InventoryRecord, RowError> {
    match mode {
        LoadMode::Import => normalize_import_row(row, ordinal),
        LoadMode::Synthetic => normalize_synthetic_row(row, rng),
    }
}

pub fn normalize_import_row(row: &RawRow, ordinal: usize) -> Result<InventoryRecord, RowError> {
    let stock_date = calendar_date(IMPORT_STOCK_DATE);

    Ok(InventoryRecord {
        sku: ordinal as u64 + SKU_ROW_OFFSET,
        name: required_text(row, COLUMN_NAME)?,
        primary_category: required_text(row, COLUMN_PRIMARY_CATEGORY)?,
        other_categories: other_categories(row)?,
        flags: split_cell(column(row, COLUMN_FLAGS)?, LIST_DELIMITER),
        tags: split_cell(column(row, COLUMN_TAGS)?, LIST_DELIMITER),
        bulk: parse_boolean(COLUMN_BULK, column(row, COLUMN_BULK)?)?,
        grocery: parse_boolean(COLUMN_GROCERY, column(row, COLUMN_GROCERY)?)?,
        manufacturer: Some(column(row, COLUMN_MANUFACTURER)?.to_string()),
        primary_supplier: Some(column(row, COLUMN_PRIMARY_SUPPLIER)?.to_string()),
        cost: Some(parse_number(COLUMN_COST, column(row, COLUMN_COST)?)?),
        price: parse_number(COLUMN_PRICE, column(row, COLUMN_PRICE)?)?,
        weight: DEFAULT_DIMENSION,
        length: DEFAULT_DIMENSION,
        width: DEFAULT_DIMENSION,
        height: DEFAULT_DIMENSION,
        last_received: stock_date,
        last_inventory: stock_date,
        last_sold: stock_date,
        inventory_low: IMPORT_INVENTORY_LOW,
        inventory_par: INVENTORY_PAR,
        inventory: IMPORT_INVENTORY,
    })
}

pub fn normalize_synthetic_row<R: Rng + ?Sized>(
    row: &RawRow,
    rng: &mut R,
) -> Result<InventoryRecord, RowError> {
    let name = required_text(row, COLUMN_NAME)?.replace(NAME_COMMA_PLACEHOLDER, ",");
    let primary_category = required_text(row, COLUMN_PRIMARY_CATEGORY)?;
    let other_categories = other_categories(row)?;

    let cost = match row.get(COLUMN_COST).map(|value| value.trim()) {
        Some(value) if !value.is_empty() => Some(parse_number(COLUMN_COST, value)?),
        _ => None,
    };

    let generated = generate_fields(rng);

    Ok(InventoryRecord {
        sku: generated.sku,
        name,
        grocery: primary_category == GROCERY_CATEGORY,
        primary_category,
        other_categories,
        flags: vec![generated.flag],
        tags: vec![generated.tag],
        bulk: generated.bulk,
        manufacturer: row.get(COLUMN_MANUFACTURER).cloned(),
        primary_supplier: row.get(COLUMN_PRIMARY_SUPPLIER).cloned(),
        cost,
        price: generated.price,
        weight: generated.weight,
        length: generated.length,
        width: generated.width,
        height: generated.height,
        last_received: calendar_date(SYNTHETIC_LAST_RECEIVED),
        last_inventory: calendar_date(SYNTHETIC_LAST_INVENTORY),
        last_sold: calendar_date(SYNTHETIC_LAST_SOLD),
        inventory_low: SYNTHETIC_INVENTORY_LOW,
        inventory_par: INVENTORY_PAR,
        inventory: generated.inventory,
    })
}

pub fn parse_boolean(column: &str, value: &str) -> Result<bool, RowError> {
    match value.trim() {
        BOOLEAN_TRUE => Ok(true),
        BOOLEAN_FALSE | "" => Ok(false),
        other => Err(RowError::InvalidBoolean {
            column: column.to_string(),
            value: other.to_string(),
        }),
    }
}

pub fn parse_number(column: &str, value: &str) -> Result<f64, RowError> {
    let invalid = || RowError::InvalidNumber {
        column: column.to_string(),
        value: value.to_string(),
    };

    let parsed = value.trim().parse::<f64>().map_err(|_| invalid())?;
    if !parsed.is_finite() {
        return Err(invalid());
    }
    Ok(parsed)
}

fn other_categories(row: &RawRow) -> Result<Vec<String>, RowError> {
    split_bracketed_cell(
        COLUMN_OTHER_CATEGORIES,
        column(row, COLUMN_OTHER_CATEGORIES)?,
        CATEGORY_OPEN,
        CATEGORY_CLOSE,
        CATEGORY_DELIMITER,
    )
}

fn column<'a>(row: &'a RawRow, name: &str) -> Result<&'a str, RowError> {
    row.get(name)
        .map(String::as_str)
        .ok_or_else(|| RowError::MissingColumn(name.to_string()))
}

fn required_text(row: &RawRow, name: &str) -> Result<String, RowError> {
    let value = column(row, name)?.trim();
    if value.is_empty() {
        return Err(RowError::EmptyField {
            column: name.to_string(),
        });
    }
    Ok(value.to_string())
}
