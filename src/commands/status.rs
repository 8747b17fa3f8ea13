use anyhow::{Context, Result};
use calsync_core::config::SyncConfig;
use calsync_core::session::SyncSession;
use calsync_core::setup::MailboxSetup;
use owo_colors::OwoColorize;

use super::LocalAccount;
use crate::render::Render;

pub fn run(config: &SyncConfig, json: bool) -> Result<()> {
    let mut config = config.clone();
    let account = LocalAccount::open(&config);

    let provisioned = MailboxSetup::new(&account.mailbox, &config).is_complete()?;
    if !provisioned {
        // Nothing can have arrived in a folder that does not exist yet.
        config.enable_receive = false;
    }

    let session = SyncSession::for_today(&config, account.collaborators())?;
    let preview = session.preview()?;

    if json {
        let out = serde_json::to_string_pretty(&preview).context("Could not serialize preview")?;
        println!("{out}");
        return Ok(());
    }

    println!("{}", preview.render());
    if !provisioned {
        println!(
            "{}",
            "Mailbox is not set up yet. Run `calsync setup` first.".yellow()
        );
    }
    Ok(())
}
