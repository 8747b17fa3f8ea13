//! Terminal rendering for calsync-core types, colored with owo_colors.

use calsync_core::reconcile::{Change, ChangeKind, Reconciliation};
use calsync_core::session::{
    BranchReport, InboundPreview, OutboundPreview, Preview, ReceiveOutcome, RunReport, SendOutcome,
};
use calsync_core::setup::SetupReport;
use owo_colors::OwoColorize;

/// Plans longer than this are shown as counts.
const COMPACT_THRESHOLD: usize = 5;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for ChangeKind {
    fn render(&self) -> String {
        let symbol = self.to_string();
        match self {
            ChangeKind::Add => symbol.green().to_string(),
            ChangeKind::Remove => symbol.red().to_string(),
        }
    }
}

impl Render for Change<'_> {
    fn render(&self) -> String {
        let occurrence = self.occurrence;
        let time = format!(
            "{} - {}",
            occurrence.start.format("%a %b %-d %H:%M"),
            occurrence.end.format("%H:%M")
        );
        let time = match self.kind {
            ChangeKind::Add => time.green().to_string(),
            ChangeKind::Remove => time.red().to_string(),
        };
        let state = format!("({:?})", occurrence.busy_state);
        format!("{} {} {}", self.kind.render(), time, state.dimmed())
    }
}

impl Render for Reconciliation {
    fn render(&self) -> String {
        if self.is_empty() {
            return "   Mirror is up to date".dimmed().to_string();
        }

        let total = self.to_add.len() + self.to_remove.len();
        if total <= COMPACT_THRESHOLD {
            return self
                .changes()
                .map(|c| format!("   {}", c.render()))
                .collect::<Vec<_>>()
                .join("\n");
        }

        let mut lines = Vec::new();
        if !self.to_add.is_empty() {
            let label = format!(
                "({} new busy {})",
                self.to_add.len(),
                pluralize("block", self.to_add.len())
            );
            lines.push(format!("   {} {}", "+".green(), label.green()));
        }
        if !self.to_remove.is_empty() {
            let label = format!(
                "({} removed busy {})",
                self.to_remove.len(),
                pluralize("block", self.to_remove.len())
            );
            lines.push(format!("   {} {}", "-".red(), label.red()));
        }
        lines.join("\n")
    }
}

impl Render for SendOutcome {
    fn render(&self) -> String {
        match self {
            SendOutcome::Sent { count } => format!(
                "{} {} busy {}",
                "Sent".green(),
                count,
                pluralize("block", *count)
            ),
            SendOutcome::Unchanged => "No changes since last send".dimmed().to_string(),
            SendOutcome::NothingToSend => "Nothing to share in this window".dimmed().to_string(),
        }
    }
}

impl Render for ReceiveOutcome {
    fn render(&self) -> String {
        match self {
            ReceiveOutcome::NoMessages => "No new messages".dimmed().to_string(),
            ReceiveOutcome::NothingDecoded { messages } => format!(
                "{} {} {} without readable calendar data",
                "Skipped".yellow(),
                messages,
                pluralize("message", *messages)
            ),
            ReceiveOutcome::Reconciled {
                added,
                removed,
                messages,
            } => format!(
                "{} added, {} removed (from {} {})",
                format!("+{added}").green(),
                format!("-{removed}").red(),
                messages,
                pluralize("message", *messages)
            ),
        }
    }
}

fn render_branch<T: Render>(label: &str, report: &BranchReport<T>) -> String {
    let body = match report {
        BranchReport::Disabled => "disabled".dimmed().to_string(),
        BranchReport::Completed { outcome } => outcome.render(),
        BranchReport::Failed {
            phase,
            kind,
            message,
        } => format!("{} during {} ({:?}): {}", "failed".red(), phase, kind, message),
    };
    format!("{} {}", format!("{label}:").bold(), body)
}

impl Render for RunReport {
    fn render(&self) -> String {
        [
            format!("Window {}", self.window).dimmed().to_string(),
            render_branch("send", &self.send),
            render_branch("receive", &self.receive),
        ]
        .join("\n")
    }
}

impl Render for OutboundPreview {
    fn render(&self) -> String {
        let state = if self.count == 0 {
            "nothing to send".dimmed().to_string()
        } else if self.changed {
            "changed, would send".yellow().to_string()
        } else {
            "unchanged".dimmed().to_string()
        };
        format!("{} busy {}, {}", self.count, pluralize("block", self.count), state)
    }
}

impl Render for InboundPreview {
    fn render(&self) -> String {
        let header = format!("{} {}", self.messages, pluralize("message", self.messages));
        match &self.plan {
            Some(plan) => format!("{header}\n{}", plan.render()),
            None if self.messages == 0 => header,
            None => format!("{header}, {}", "none readable".yellow()),
        }
    }
}

impl Render for Preview {
    fn render(&self) -> String {
        let mut lines = vec![format!("Window {}", self.window).dimmed().to_string()];
        lines.push(match &self.outbound {
            Some(outbound) => format!("{} {}", "send:".bold(), outbound.render()),
            None => format!("{} {}", "send:".bold(), "disabled".dimmed()),
        });
        lines.push(match &self.inbound {
            Some(inbound) => format!("{} {}", "receive:".bold(), inbound.render()),
            None => format!("{} {}", "receive:".bold(), "disabled".dimmed()),
        });
        lines.join("\n")
    }
}

impl Render for SetupReport {
    fn render(&self) -> String {
        if !self.changed_anything() {
            return "Mailbox already set up".dimmed().to_string();
        }
        let mut lines = Vec::new();
        if self.created_folder {
            lines.push(format!("{} created sync folder", "+".green()));
        }
        if self.created_rule {
            lines.push(format!("{} created folder rule", "+".green()));
        }
        lines.join("\n")
    }
}

pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}
