use anyhow::{Context, Result};
use calsync_core::config::SyncConfig;
use calsync_core::session::SyncSession;
use calsync_core::setup::MailboxSetup;

use super::LocalAccount;
use crate::render::Render;

/// Returns false if any branch failed.
pub fn run(config: &SyncConfig, no_send: bool, no_receive: bool) -> Result<bool> {
    let mut config = config.clone();
    config.enable_send &= !no_send;
    config.enable_receive &= !no_receive;

    let account = LocalAccount::open(&config);

    // First run on this mailbox only provisions it.
    let setup = MailboxSetup::new(&account.mailbox, &config);
    if !setup.is_complete()? {
        let report = setup.install().context("Could not set up the mailbox")?;
        println!("{}", report.render());
        println!("Mailbox set up. Run again to sync.");
        return Ok(true);
    }

    let moved = account
        .mailbox
        .apply_rules()
        .context("Could not apply mailbox rules")?;
    tracing::debug!(moved, "applied mailbox rules");

    let session = SyncSession::for_today(&config, account.collaborators())?;
    let report = session.run();
    println!("{}", report.render());

    Ok(report.is_success())
}
