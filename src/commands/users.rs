use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::{AddUserArgs, StoreArgs};
use crate::commands::open_store;

pub fn run_add_user(store_args: &StoreArgs, args: AddUserArgs) -> Result<()> {
    if args.user.trim().is_empty() {
        bail!("--user must not be empty");
    }
    if args.password.is_empty() {
        bail!("--password must not be empty");
    }

    let context = open_store(store_args)?;
    context
        .store
        .add_user(args.user.trim(), &args.password)
        .with_context(|| format!("failed to add store user {}", args.user))?;

    info!(user = %args.user.trim(), database = context.store.database(), "store user saved");
    Ok(())
}
