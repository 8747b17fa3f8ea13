use anyhow::{Context, Result};
use calsync_core::config::SyncConfig;
use calsync_core::setup::MailboxSetup;

use super::LocalAccount;
use crate::render::Render;

pub fn run(config: &SyncConfig) -> Result<()> {
    let account = LocalAccount::open(config);
    let report = MailboxSetup::new(&account.mailbox, config)
        .install()
        .context("Could not set up the mailbox")?;

    println!("{}", report.render());
    Ok(())
}
