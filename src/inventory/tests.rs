use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;

use super::*;
use crate::cli::LoadMode;
use crate::config::StoreSettings;
use crate::error::{LoadError, RowError};
use crate::model::{InventoryRecord, RawRow};
use crate::store::DocumentStore;
use crate::util::scratch_dir;

const HEADER: &str = "Name,Primary Category,Other Categories,Flags,Tags,Bulk,Grocery,manufacturer,Primary supplier,Cost,Price";

fn row(pairs: &[(&str, &str)]) -> RawRow {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn oat_milk_row() -> RawRow {
    row(&[
        ("Name", "Oat Milk IPA"),
        ("Primary Category", "Beer"),
        ("Other Categories", "[Seasonal?Limited]"),
        ("Flags", "Core,Hidden"),
        ("Tags", "red,blue"),
        ("Bulk", "FALSE"),
        ("Grocery", "FALSE"),
        ("manufacturer", "Gnome Brewing"),
        ("Primary supplier", "Hop Co"),
        ("Cost", "2.50"),
        ("Price", "5.99"),
    ])
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn scratch_store(label: &str) -> DocumentStore {
    let settings = StoreSettings {
        root: scratch_dir(label),
        ..StoreSettings::default()
    };
    DocumentStore::new(settings, "test")
}

#[test]
fn split_cell_trims_tokens_and_drops_blanks() {
    assert_eq!(split_cell(" Core , Hidden ", ','), strings(&["Core", "Hidden"]));
    assert_eq!(split_cell("a,,b", ','), strings(&["a", "b"]));
    assert!(split_cell("", ',').is_empty());
    assert!(split_cell("   ", ',').is_empty());
}

#[test]
fn split_cell_without_delimiter_returns_whole_cell() {
    assert_eq!(split_cell("  Special Order Only ", ','), strings(&["Special Order Only"]));
}

#[test]
fn split_cell_is_stable_when_rejoined() {
    let cells = [
        "Core, Hidden ,Discontinued",
        " red ",
        "a,,b, ,c",
        "",
        "Brewing Basics,Special Order Only",
    ];

    for cell in cells {
        let tokens = split_cell(cell, ',');
        let rejoined = tokens.join(",");
        assert_eq!(split_cell(&rejoined, ','), tokens, "cell {cell:?}");
    }
}

#[test]
fn split_bracketed_cell_strips_brackets_before_splitting() {
    let categories = split_bracketed_cell("Other Categories", "[Seasonal? Limited ]", '[', ']', '?')
        .expect("bracketed list should parse");
    assert_eq!(categories, strings(&["Seasonal", "Limited"]));
}

#[test]
fn split_bracketed_cell_empty_brackets_yield_no_tokens() {
    let categories = split_bracketed_cell("Other Categories", "[]", '[', ']', '?')
        .expect("empty list should parse");
    assert!(categories.is_empty());

    let blank = split_bracketed_cell("Other Categories", "  ", '[', ']', '?')
        .expect("blank cell should parse");
    assert!(blank.is_empty());
}

#[test]
fn split_bracketed_cell_rejects_unwrapped_lists() {
    let err = split_bracketed_cell("Other Categories", "Seasonal?Limited", '[', ']', '?')
        .expect_err("missing brackets should fail");
    assert!(matches!(err, RowError::MalformedCell { ref column, .. } if column == "Other Categories"));

    assert!(split_bracketed_cell("Other Categories", "[", '[', ']', '?').is_err());
}

#[test]
fn parse_boolean_accepts_only_upper_case_literals() {
    assert_eq!(parse_boolean("Bulk", "TRUE"), Ok(true));
    assert_eq!(parse_boolean("Bulk", "FALSE"), Ok(false));
    assert_eq!(parse_boolean("Bulk", ""), Ok(false));
    assert_eq!(
        parse_boolean("Bulk", "true"),
        Err(RowError::InvalidBoolean {
            column: "Bulk".to_string(),
            value: "true".to_string(),
        })
    );
    assert!(parse_boolean("Grocery", "yes").is_err());
}

#[test]
fn parse_number_rejects_blank_and_non_finite_values() {
    assert_eq!(parse_number("Cost", " 2.50 "), Ok(2.5));
    assert!(parse_number("Cost", "").is_err());
    assert!(parse_number("Cost", "two").is_err());
    assert!(parse_number("Cost", "NaN").is_err());
    assert!(parse_number("Cost", "inf").is_err());
}

#[test]
fn import_row_matches_expected_record() {
    let mut rng = StdRng::seed_from_u64(0);
    let record = normalize_row(&oat_milk_row(), 0, LoadMode::Import, &mut rng)
        .expect("row should normalize");

    assert_eq!(record.sku, SKU_ROW_OFFSET);
    assert_eq!(record.name, "Oat Milk IPA");
    assert_eq!(record.primary_category, "Beer");
    assert_eq!(record.other_categories, strings(&["Seasonal", "Limited"]));
    assert_eq!(record.flags, strings(&["Core", "Hidden"]));
    assert_eq!(record.tags, strings(&["red", "blue"]));
    assert!(!record.bulk);
    assert!(!record.grocery);
    assert_eq!(record.manufacturer.as_deref(), Some("Gnome Brewing"));
    assert_eq!(record.primary_supplier.as_deref(), Some("Hop Co"));
    assert_eq!(record.cost, Some(2.50));
    assert_eq!(record.price, 5.99);
    assert_eq!(record.weight, DEFAULT_DIMENSION);
    assert_eq!(record.weight, 1.0);
    assert_eq!(record.length, DEFAULT_DIMENSION);
    assert_eq!(record.width, DEFAULT_DIMENSION);
    assert_eq!(record.height, DEFAULT_DIMENSION);
    assert_eq!(record.inventory, IMPORT_INVENTORY);
    assert_eq!(record.inventory, 100);
    assert_eq!(record.inventory_low, IMPORT_INVENTORY_LOW);
    assert_eq!(record.inventory_par, INVENTORY_PAR);
    assert_eq!(record.last_received, calendar_date(IMPORT_STOCK_DATE));
    assert_eq!(record.last_sold.to_string(), "2019-02-23");
}

#[test]
fn import_sku_follows_row_ordinal() {
    let record = normalize_import_row(&oat_milk_row(), 41).expect("row should normalize");
    assert_eq!(record.sku, 43);
}

#[test]
fn import_grocery_reads_explicit_column() {
    let mut source = oat_milk_row();
    source.insert("Grocery".to_string(), "TRUE".to_string());
    source.insert("Primary Category".to_string(), "Beer".to_string());

    let record = normalize_import_row(&source, 0).expect("row should normalize");
    assert!(record.grocery);
}

#[test]
fn import_row_reports_the_offending_column() {
    let mut source = oat_milk_row();
    source.insert("Price".to_string(), "5,99".to_string());
    assert_eq!(
        normalize_import_row(&source, 0),
        Err(RowError::InvalidNumber {
            column: "Price".to_string(),
            value: "5,99".to_string(),
        })
    );

    let mut source = oat_milk_row();
    source.remove("Tags");
    assert_eq!(
        normalize_import_row(&source, 0),
        Err(RowError::MissingColumn("Tags".to_string()))
    );

    let mut source = oat_milk_row();
    source.insert("Name".to_string(), "   ".to_string());
    assert!(matches!(
        normalize_import_row(&source, 0),
        Err(RowError::EmptyField { .. })
    ));
}

#[test]
fn synthetic_row_restores_commas_and_derives_grocery() {
    let source = row(&[
        ("Name", "Malt*Extra Light"),
        ("Primary Category", "Ingredients"),
        ("Other Categories", "[Malt?Extract]"),
    ]);
    let mut rng = StdRng::seed_from_u64(7);

    let record = normalize_row(&source, 0, LoadMode::Synthetic, &mut rng)
        .expect("row should normalize");

    assert_eq!(record.name, "Malt,Extra Light");
    assert!(record.grocery);
    assert_eq!(record.other_categories, strings(&["Malt", "Extract"]));
    assert_eq!(record.manufacturer, None);
    assert_eq!(record.cost, None);
    assert_eq!(record.inventory_low, SYNTHETIC_INVENTORY_LOW);
    assert_eq!(record.inventory_par, INVENTORY_PAR);
    assert_eq!(record.last_received, calendar_date(SYNTHETIC_LAST_RECEIVED));
    assert_eq!(record.last_inventory.to_string(), "2017-12-31");
    assert_eq!(record.last_sold.to_string(), "2018-01-05");

    let beer = row(&[
        ("Name", "Stout"),
        ("Primary Category", "Beer"),
        ("Other Categories", "[]"),
    ]);
    let record = normalize_synthetic_row(&beer, &mut rng).expect("row should normalize");
    assert!(!record.grocery);
    assert!(record.other_categories.is_empty());
}

#[test]
fn synthetic_values_stay_within_documented_bounds() {
    let source = row(&[
        ("Name", "Pale Malt"),
        ("Primary Category", "Ingredients"),
        ("Other Categories", "[Malt]"),
    ]);
    let mut rng = StdRng::seed_from_u64(2019);

    for ordinal in 0..1000 {
        let record = normalize_row(&source, ordinal, LoadMode::Synthetic, &mut rng)
            .expect("row should normalize");

        assert!(SYNTHETIC_WEIGHT_RANGE.contains(&record.weight), "weight {}", record.weight);
        for dimension in [record.length, record.width, record.height] {
            assert!(SYNTHETIC_DIMENSION_RANGE.contains(&dimension), "dimension {dimension}");
        }
        assert!(SYNTHETIC_PRICE_RANGE.contains(&record.price), "price {}", record.price);
        assert!(SYNTHETIC_SKU_RANGE.contains(&record.sku));
        assert!(SYNTHETIC_INVENTORY_RANGE.contains(&record.inventory));

        assert_eq!(record.flags.len(), 1);
        assert!(FLAG_VOCABULARY.contains(&record.flags[0].as_str()));
        assert_eq!(record.tags.len(), 1);
        assert!(TAG_VOCABULARY.contains(&record.tags[0].as_str()));
    }
}

#[test]
fn synthetic_generation_is_deterministic_for_a_seed() {
    let first = generate_fields(&mut StdRng::seed_from_u64(42));
    let second = generate_fields(&mut StdRng::seed_from_u64(42));
    assert_eq!(first, second);
}

#[test]
fn import_reader_skips_bad_rows_and_keeps_ordinals() {
    let csv = format!(
        "{HEADER}\n\
         Oat Milk IPA,Beer,[Seasonal?Limited],\"Core,Hidden\",\"red,blue\",FALSE,FALSE,Gnome Brewing,Hop Co,2.50,5.99\n\
         Broken Cost,Beer,[Seasonal],Core,red,FALSE,FALSE,Gnome Brewing,Hop Co,abc,5.99\n\
         Pale Malt,Ingredients,[Malt],Core,white,TRUE,TRUE,Maltster,Malt Co,1.10,2.20\n"
    );
    let mut rng = StdRng::seed_from_u64(0);

    let batch = normalize_reader(csv.as_bytes(), Path::new("inline.csv"), LoadMode::Import, &mut rng)
        .expect("batch should normalize");

    assert_eq!(batch.rows_read, 3);
    assert_eq!(batch.records.len(), batch.rows_read - batch.skipped.len());
    assert_eq!(batch.skipped.len(), 1);
    assert_eq!(batch.skipped[0].ordinal, 1);
    assert_eq!(batch.skipped[0].raw.get("Name").map(String::as_str), Some("Broken Cost"));
    assert!(batch.skipped[0].reason.contains("Cost"));

    let skus = batch.records.iter().map(|record| record.sku).collect::<Vec<u64>>();
    assert_eq!(skus, vec![2, 4]);
    assert!(batch.records[1].bulk);
    assert!(batch.records[1].grocery);
}

#[test]
fn import_reader_skips_rows_with_wrong_field_count() {
    let csv = format!("{HEADER}\nShort Row,Beer\n");
    let mut rng = StdRng::seed_from_u64(0);

    let batch = normalize_reader(csv.as_bytes(), Path::new("inline.csv"), LoadMode::Import, &mut rng)
        .expect("batch should normalize");

    assert_eq!(batch.rows_read, 1);
    assert!(batch.records.is_empty());
    assert_eq!(batch.skipped.len(), 1);

    let skipped = &batch.skipped[0];
    assert_eq!(skipped.raw.get("Name").map(String::as_str), Some("Short Row"));
    assert_eq!(skipped.raw.get("Primary Category").map(String::as_str), Some("Beer"));
    assert!(skipped.reason.contains("expected 11 fields, found 2"), "{}", skipped.reason);
}

#[test]
fn synthetic_reader_reports_values_of_short_rows() {
    let csv = "Name,Primary Category,Other Categories\n\
               Pale Malt,Ingredients,[Malt]\n\
               Short Row,Beer\n";
    let mut rng = StdRng::seed_from_u64(0);

    let err = normalize_reader(csv.as_bytes(), Path::new("inline.csv"), LoadMode::Synthetic, &mut rng)
        .expect_err("short row should abort");

    match err {
        LoadError::Row { ordinal, raw, source } => {
            assert_eq!(ordinal, 1);
            assert!(!raw.is_empty());
            assert_eq!(raw.get("Name").map(String::as_str), Some("Short Row"));
            assert_eq!(raw.get("Primary Category").map(String::as_str), Some("Beer"));
            assert!(matches!(source, RowError::MalformedRecord(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn blank_primary_category_is_rejected_in_both_modes() {
    let mut source = oat_milk_row();
    source.insert("Primary Category".to_string(), "  ".to_string());
    assert_eq!(
        normalize_import_row(&source, 0),
        Err(RowError::EmptyField {
            column: "Primary Category".to_string(),
        })
    );

    let synthetic = row(&[
        ("Name", "Pale Malt"),
        ("Primary Category", ""),
        ("Other Categories", "[Malt]"),
    ]);
    let mut rng = StdRng::seed_from_u64(0);
    assert_eq!(
        normalize_synthetic_row(&synthetic, &mut rng),
        Err(RowError::EmptyField {
            column: "Primary Category".to_string(),
        })
    );
}

#[test]
fn synthetic_reader_aborts_on_first_bad_row() {
    let csv = "Name,Primary Category,Other Categories\n\
               Pale Malt,Ingredients,[Malt]\n\
               ,Ingredients,[Malt]\n";
    let mut rng = StdRng::seed_from_u64(0);

    let err = normalize_reader(csv.as_bytes(), Path::new("inline.csv"), LoadMode::Synthetic, &mut rng)
        .expect_err("blank name should abort");

    match err {
        LoadError::Row { ordinal, raw, source } => {
            assert_eq!(ordinal, 1);
            assert_eq!(raw.get("Primary Category").map(String::as_str), Some("Ingredients"));
            assert!(matches!(source, RowError::EmptyField { .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn reader_rejects_header_missing_required_columns() {
    let csv = "Name,Primary Category,Other Categories\nPale Malt,Ingredients,[Malt]\n";
    let mut rng = StdRng::seed_from_u64(0);

    let err = normalize_reader(csv.as_bytes(), Path::new("inline.csv"), LoadMode::Import, &mut rng)
        .expect_err("import needs every column");
    match err {
        LoadError::Header { message, .. } => {
            assert!(message.contains("Flags"));
            assert!(message.contains("Price"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let lower_case = "name,primary category,other categories\n";
    assert!(matches!(
        normalize_reader(lower_case.as_bytes(), Path::new("inline.csv"), LoadMode::Synthetic, &mut rng),
        Err(LoadError::Header { .. })
    ));
}

#[test]
fn load_replaces_collection_and_round_trips_records() {
    let store = scratch_store("load-roundtrip");
    let source_dir = scratch_dir("load-roundtrip-source");
    let source = source_dir.join("inventory.csv");
    std::fs::write(
        &source,
        format!(
            "{HEADER}\n\
             Oat Milk IPA,Beer,[Seasonal?Limited],\"Core,Hidden\",\"red,blue\",FALSE,FALSE,Gnome Brewing,Hop Co,2.50,5.99\n\
             Pale Malt,Ingredients,[Malt],Core,white,TRUE,TRUE,Maltster,Malt Co,1.10,2.20\n"
        ),
    )
    .expect("source should be written");

    store
        .insert_one(
            "inventory",
            json!({"name": "stale"}).as_object().cloned().expect("object"),
        )
        .expect("stale document should insert");

    let mut rng = StdRng::seed_from_u64(0);
    let summary = load_inventory(&source, "inventory", LoadMode::Import, &store, &mut rng)
        .expect("load should succeed");

    assert_eq!(summary.rows_read, 2);
    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.skipped_count(), 0);

    let documents = store
        .find("inventory", &json!({}), None, 0)
        .expect("find should succeed");
    assert_eq!(documents.len(), 2);
    assert!(documents.iter().all(|document| document.contains_key("_id")));

    let stored = store
        .find_one("inventory", &json!({"name": "Oat Milk IPA"}), None)
        .expect("find_one should succeed")
        .expect("record should exist");
    let record: InventoryRecord =
        serde_json::from_value(serde_json::Value::Object(stored)).expect("record should decode");
    let expected = normalize_import_row(&oat_milk_row(), 0).expect("row should normalize");
    assert_eq!(record, expected);
}

#[test]
fn header_only_load_empties_collection_without_error() {
    let store = scratch_store("load-empty");
    let source_dir = scratch_dir("load-empty-source");
    let source = source_dir.join("inventory.csv");
    std::fs::write(&source, format!("{HEADER}\n")).expect("source should be written");

    store
        .insert_one(
            "inventory",
            json!({"name": "stale"}).as_object().cloned().expect("object"),
        )
        .expect("stale document should insert");

    let mut rng = StdRng::seed_from_u64(0);
    let summary = load_inventory(&source, "inventory", LoadMode::Import, &store, &mut rng)
        .expect("empty load should succeed");

    assert_eq!(summary.rows_read, 0);
    assert_eq!(summary.inserted, 0);
    assert!(
        store
            .find("inventory", &json!({}), None, 0)
            .expect("find should succeed")
            .is_empty()
    );
}

#[test]
fn failed_load_leaves_collection_untouched() {
    let store = scratch_store("load-missing");
    store
        .insert_one(
            "inventory",
            json!({"name": "kept"}).as_object().cloned().expect("object"),
        )
        .expect("document should insert");

    let mut rng = StdRng::seed_from_u64(0);
    let err = load_inventory(
        Path::new("/nonexistent/gnome/inventory.csv"),
        "inventory",
        LoadMode::Import,
        &store,
        &mut rng,
    )
    .expect_err("missing file should fail");
    assert!(matches!(err, LoadError::File { .. }));

    let documents = store
        .find("inventory", &json!({}), None, 0)
        .expect("find should succeed");
    assert_eq!(documents.len(), 1);
}
