use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::cli::{DistinctArgs, FindArgs, LastArgs, StoreArgs};
use crate::commands::open_store;
use crate::store::{Projection, SortSpec};

pub fn run_find(store_args: &StoreArgs, args: FindArgs) -> Result<()> {
    let context = open_store(store_args)?;

    let filter = parse_json_arg("--filter", &args.filter)?;
    let sort = SortSpec::parse_terms(&args.sort).context("invalid --sort")?;
    let projection = args
        .projection
        .as_deref()
        .map(|raw| parse_json_arg("--projection", raw))
        .transpose()?;

    let mut documents = context
        .store
        .find(&args.collection, &filter, Some(&sort), args.limit)
        .with_context(|| format!("find on {} failed", args.collection))?;

    if let Some(projection) = projection {
        let projection = Projection::parse(&projection).context("invalid --projection")?;
        documents = documents
            .into_iter()
            .map(|document| projection.apply(document))
            .collect();
    }

    info!(collection = %args.collection, returned = documents.len(), "find completed");
    write_json_stdout(&documents)
}

pub fn run_distinct(store_args: &StoreArgs, args: DistinctArgs) -> Result<()> {
    let context = open_store(store_args)?;
    let values = context
        .store
        .distinct(&args.collection, &args.field)
        .with_context(|| format!("distinct {} on {} failed", args.field, args.collection))?;

    info!(
        collection = %args.collection,
        field = %args.field,
        values = values.len(),
        "distinct completed"
    );
    write_json_stdout(&values)
}

pub fn run_last(store_args: &StoreArgs, args: LastArgs) -> Result<()> {
    let context = open_store(store_args)?;
    let document = context
        .store
        .find_last(&args.collection, &args.field)
        .with_context(|| format!("find-last on {} failed", args.collection))?;

    write_json_stdout(&document)
}

fn parse_json_arg(flag: &str, raw: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("{flag} is not valid JSON: {raw}"))
}

fn write_json_stdout<T: Serialize>(value: &T) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, value).context("failed to serialize json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}
