use std::fmt;

use serde::Serialize;

use crate::occurrence::Occurrence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeKind {
    Add,
    Remove,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Add => write!(f, "+"),
            ChangeKind::Remove => write!(f, "-"),
        }
    }
}

/// One planned mutation of the local calendar.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Change<'a> {
    pub kind: ChangeKind,
    pub occurrence: &'a Occurrence,
}

impl fmt::Display for Change<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.occurrence)
    }
}
