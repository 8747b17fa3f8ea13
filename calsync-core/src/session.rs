//! One sync run: the send branch and the receive branch.
//!
//! ```text
//! send:    Init -> FilterOutbound -> DetectChange -> Send | SkipSend
//! receive: Init -> FetchRemote -> Reconcile -> ApplyAddRemove
//! ```
//!
//! Both branches share one window and run independently: a failure in one
//! is recorded in the [`RunReport`] and the other still runs.

use std::fmt;

use chrono::Utc;
use serde::Serialize;

use crate::change::has_changed;
use crate::collaborators::{
    Attachment, CalendarStore, InboundMessage, InboundSource, MailFolder, MailTransport,
    SnapshotStore, TagFilter,
};
use crate::config::SyncConfig;
use crate::error::{CalSyncError, CalSyncResult, ErrorKind};
use crate::filter::filter_outbound;
use crate::ics::{generate_calendar, parse_occurrences};
use crate::occurrence::Occurrence;
use crate::reconcile::{Reconciliation, reconcile};
use crate::window::SyncWindow;

pub const ATTACHMENT_NAME: &str = "calsync.ics";

/// The external systems a session talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub calendar: &'a dyn CalendarStore,
    pub transport: &'a dyn MailTransport,
    pub inbound: &'a dyn InboundSource,
    pub snapshot: &'a dyn SnapshotStore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Init,
    FilterOutbound,
    DetectChange,
    Send,
    SkipSend,
    FetchRemote,
    Reconcile,
    ApplyAddRemove,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncPhase::Init => "init",
            SyncPhase::FilterOutbound => "filter outbound",
            SyncPhase::DetectChange => "detect change",
            SyncPhase::Send => "send",
            SyncPhase::SkipSend => "skip send",
            SyncPhase::FetchRemote => "fetch remote",
            SyncPhase::Reconcile => "reconcile",
            SyncPhase::ApplyAddRemove => "apply add/remove",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SendOutcome {
    Sent { count: usize },
    /// Same fingerprints as the last sent snapshot.
    Unchanged,
    /// Nothing in the window may be shared.
    NothingToSend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReceiveOutcome {
    NoMessages,
    /// Messages were present but none carried readable calendar data.
    /// They are left in place.
    NothingDecoded { messages: usize },
    Reconciled {
        added: usize,
        removed: usize,
        messages: usize,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BranchReport<T> {
    Disabled,
    Completed {
        outcome: T,
    },
    Failed {
        phase: SyncPhase,
        kind: ErrorKind,
        message: String,
    },
}

impl<T> BranchReport<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, BranchReport::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub window: SyncWindow,
    pub send: BranchReport<SendOutcome>,
    pub receive: BranchReport<ReceiveOutcome>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        !self.send.is_failed() && !self.receive.is_failed()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OutboundPreview {
    pub count: usize,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InboundPreview {
    pub messages: usize,
    /// `None` when no message carried readable calendar data.
    pub plan: Option<Reconciliation>,
}

/// What a run would do, computed without touching anything.
#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub window: SyncWindow,
    pub outbound: Option<OutboundPreview>,
    pub inbound: Option<InboundPreview>,
}

/// The newest decodable message and everything fetched alongside it.
struct RemoteSnapshot {
    messages: Vec<InboundMessage>,
    occurrences: Option<Vec<Occurrence>>,
}

pub struct SyncSession<'a> {
    config: &'a SyncConfig,
    window: SyncWindow,
    io: Collaborators<'a>,
}

impl<'a> SyncSession<'a> {
    pub fn new(config: &'a SyncConfig, window: SyncWindow, io: Collaborators<'a>) -> Self {
        SyncSession { config, window, io }
    }

    /// Session over `sync_range_days` days starting today.
    pub fn for_today(config: &'a SyncConfig, io: Collaborators<'a>) -> CalSyncResult<Self> {
        let window = SyncWindow::from_today(config.sync_range_days)?;
        Ok(Self::new(config, window, io))
    }

    pub fn window(&self) -> &SyncWindow {
        &self.window
    }

    /// Run every enabled branch, send first.
    pub fn run(&self) -> RunReport {
        tracing::info!(window = %self.window, "starting sync run");

        let send = if self.config.enable_send {
            let mut phase = SyncPhase::Init;
            branch_report(self.send_tracked(&mut phase), phase)
        } else {
            BranchReport::Disabled
        };

        let receive = if self.config.enable_receive {
            let mut phase = SyncPhase::Init;
            branch_report(self.receive_tracked(&mut phase), phase)
        } else {
            BranchReport::Disabled
        };

        RunReport {
            window: self.window,
            send,
            receive,
        }
    }

    /// Mail the filtered local snapshot if it differs from the last one sent.
    pub fn send(&self) -> CalSyncResult<SendOutcome> {
        self.send_tracked(&mut SyncPhase::Init)
    }

    /// Mirror the newest remote snapshot into the local calendar.
    pub fn receive(&self) -> CalSyncResult<ReceiveOutcome> {
        self.receive_tracked(&mut SyncPhase::Init)
    }

    pub fn preview(&self) -> CalSyncResult<Preview> {
        let outbound = if self.config.enable_send {
            let outbound = self.outbound_snapshot()?;
            let changed = !outbound.is_empty() && self.differs_from_last_sent(&outbound)?;
            Some(OutboundPreview {
                count: outbound.len(),
                changed,
            })
        } else {
            None
        };

        let inbound = if self.config.enable_receive {
            let remote = self.fetch_remote()?;
            let plan = match &remote.occurrences {
                Some(occurrences) => Some(self.plan(occurrences)?),
                None => None,
            };
            Some(InboundPreview {
                messages: remote.messages.len(),
                plan,
            })
        } else {
            None
        };

        Ok(Preview {
            window: self.window,
            outbound,
            inbound,
        })
    }

    /// Apply a plan to the calendar store: removals, then additions.
    ///
    /// Fails before touching the store if any removal targets an occurrence
    /// this system does not own.
    pub fn apply(&self, plan: &Reconciliation) -> CalSyncResult<()> {
        if let Some(untagged) = plan.to_remove.iter().find(|o| !o.is_tagged()) {
            return Err(CalSyncError::UntaggedDeletion {
                start: untagged.start,
                end: untagged.end,
            });
        }

        for occurrence in &plan.to_remove {
            self.io.calendar.delete(occurrence)?;
            tracing::debug!(%occurrence, "removed synced occurrence");
        }
        for occurrence in &plan.to_add {
            let created = self.io.calendar.create(occurrence)?;
            tracing::debug!(occurrence = %created, id = ?created.id, "created synced occurrence");
        }
        Ok(())
    }

    fn send_tracked(&self, phase: &mut SyncPhase) -> CalSyncResult<SendOutcome> {
        let result = self.send_snapshot(phase);
        self.clean_up_sent_copies();
        if let Ok(outcome) = &result {
            tracing::info!(?outcome, "send branch finished");
        }
        result
    }

    fn send_snapshot(&self, phase: &mut SyncPhase) -> CalSyncResult<SendOutcome> {
        enter(phase, SyncPhase::FilterOutbound);
        let outbound = self.outbound_snapshot()?;
        if outbound.is_empty() {
            enter(phase, SyncPhase::SkipSend);
            return Ok(SendOutcome::NothingToSend);
        }

        enter(phase, SyncPhase::DetectChange);
        if !self.differs_from_last_sent(&outbound)? {
            enter(phase, SyncPhase::SkipSend);
            return Ok(SendOutcome::Unchanged);
        }

        enter(phase, SyncPhase::Send);
        let target = self.config.target_address.as_deref().ok_or_else(|| {
            CalSyncError::Config("target_address is required when enable_send is true".into())
        })?;
        let ics = generate_calendar(&outbound);
        let body = format!(
            "Synchronization Message for CalSync. {} Events sent at UTC Time: {}",
            outbound.len(),
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        );
        let attachment = Attachment {
            filename: ATTACHMENT_NAME.to_string(),
            data: ics.into_bytes(),
        };

        self.io
            .transport
            .send_message(target, &self.config.email_subject, &body, &attachment)?;
        self.io.snapshot.save(&attachment.data)?;

        Ok(SendOutcome::Sent {
            count: outbound.len(),
        })
    }

    fn outbound_snapshot(&self) -> CalSyncResult<Vec<Occurrence>> {
        let local = self
            .io
            .calendar
            .query_occurrences(&self.window, TagFilter::Any)?;
        let outbound = filter_outbound(&local);
        tracing::debug!(local = local.len(), outbound = outbound.len(), "filtered outbound");
        Ok(outbound)
    }

    fn differs_from_last_sent(&self, outbound: &[Occurrence]) -> CalSyncResult<bool> {
        let previous = match self.io.snapshot.load()? {
            Some(data) => parse_occurrences(&data, &self.window).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "last sent snapshot is unreadable, treating as empty");
                Vec::new()
            }),
            None => Vec::new(),
        };
        Ok(has_changed(&previous, outbound))
    }

    /// Sent copies of sync messages are clutter. Failure here is not a
    /// branch failure.
    fn clean_up_sent_copies(&self) {
        for folder in [MailFolder::Sent, MailFolder::DeletedItems] {
            match self
                .io
                .transport
                .delete_messages_matching(&folder, &self.config.email_subject)
            {
                Ok(0) => {}
                Ok(count) => tracing::debug!(%folder, count, "deleted sync message copies"),
                Err(e) => tracing::warn!(%folder, error = %e, "could not clean up sync messages"),
            }
        }
    }

    fn receive_tracked(&self, phase: &mut SyncPhase) -> CalSyncResult<ReceiveOutcome> {
        let result = self.receive_snapshot(phase);
        if let Ok(outcome) = &result {
            tracing::info!(?outcome, "receive branch finished");
        }
        result
    }

    fn receive_snapshot(&self, phase: &mut SyncPhase) -> CalSyncResult<ReceiveOutcome> {
        enter(phase, SyncPhase::FetchRemote);
        let remote = self.fetch_remote()?;
        if remote.messages.is_empty() {
            return Ok(ReceiveOutcome::NoMessages);
        }
        let Some(occurrences) = remote.occurrences else {
            return Ok(ReceiveOutcome::NothingDecoded {
                messages: remote.messages.len(),
            });
        };

        enter(phase, SyncPhase::Reconcile);
        let plan = self.plan(&occurrences)?;

        enter(phase, SyncPhase::ApplyAddRemove);
        self.apply(&plan)?;

        let folder = self.sync_folder();
        for message in &remote.messages {
            self.io.inbound.delete_message(&folder, &message.id)?;
        }

        Ok(ReceiveOutcome::Reconciled {
            added: plan.to_add.len(),
            removed: plan.to_remove.len(),
            messages: remote.messages.len(),
        })
    }

    fn sync_folder(&self) -> MailFolder {
        MailFolder::Named(self.config.folder_name.clone())
    }

    /// List the sync folder and decode the newest message that carries
    /// readable calendar data. Older messages are superseded restatements.
    fn fetch_remote(&self) -> CalSyncResult<RemoteSnapshot> {
        let mut messages = self.io.inbound.list_messages(&self.sync_folder())?;
        messages.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        tracing::debug!(count = messages.len(), "fetched sync messages");

        let occurrences = messages.iter().find_map(|m| self.decode_message(m));
        Ok(RemoteSnapshot {
            messages,
            occurrences,
        })
    }

    /// Occurrences from every readable attachment, `None` if there are none.
    fn decode_message(&self, message: &InboundMessage) -> Option<Vec<Occurrence>> {
        let mut decoded: Option<Vec<Occurrence>> = None;
        for attachment in &message.attachments {
            match parse_occurrences(&attachment.data, &self.window) {
                Ok(occurrences) => decoded.get_or_insert_with(Vec::new).extend(occurrences),
                Err(e) => tracing::warn!(
                    message = %message.id,
                    attachment = %attachment.filename,
                    error = %e,
                    "skipping unreadable attachment"
                ),
            }
        }
        decoded
    }

    fn plan(&self, remote: &[Occurrence]) -> CalSyncResult<Reconciliation> {
        let local_synced: Vec<Occurrence> = self
            .io
            .calendar
            .query_occurrences(&self.window, TagFilter::SyncedOnly)?
            .into_iter()
            .filter(Occurrence::is_tagged)
            .collect();

        let plan = reconcile(remote, &local_synced);
        tracing::debug!(
            remote = remote.len(),
            local = local_synced.len(),
            add = plan.to_add.len(),
            remove = plan.to_remove.len(),
            "reconciled"
        );
        Ok(plan)
    }
}

fn enter(phase: &mut SyncPhase, next: SyncPhase) {
    tracing::debug!(from = %phase, to = %next, "phase");
    *phase = next;
}

fn branch_report<T>(result: CalSyncResult<T>, phase: SyncPhase) -> BranchReport<T> {
    match result {
        Ok(outcome) => BranchReport::Completed { outcome },
        Err(e) => {
            tracing::error!(%phase, error = %e, "branch failed");
            BranchReport::Failed {
                phase,
                kind: e.kind(),
                message: e.to_string(),
            }
        }
    }
}
