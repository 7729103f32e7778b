use serde_json::Value;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Events,
    ProblemStatements,
    Registrations,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Events => "events",
            Table::ProblemStatements => "problem_statements",
            Table::Registrations => "registrations",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One committed row mutation. `row` carries the new row (the old one for deletes).
#[derive(Debug, Clone)]
pub struct RowChange {
    pub table: Table,
    pub kind: ChangeKind,
    pub row: Value,
}

impl RowChange {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.row.get(name).and_then(|v| v.as_str())
    }

    pub fn id(&self) -> Option<&str> {
        self.field("id")
    }
}

/// Fan-out of committed row changes to in-process listeners.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<RowChange>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, table: Table, kind: ChangeKind, row: Value) {
        // No listeners is normal (tests, one-shot tools).
        let _ = self.tx.send(RowChange { table, kind, row });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RowChange> {
        self.tx.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(256)
    }
}
