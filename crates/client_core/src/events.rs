use shared::{
    domain::{Category, CategoryKey},
    protocol::ServerEvent,
};

#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Full reordered list, sent as soon as a drop commits and before any write resolves.
    OrderChanged(Vec<Category>),
    Notice(Notice),
    Server(ServerEvent),
    Error(String),
}

/// User-facing outcome of a persistence batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Saved {
        writes: usize,
    },
    SaveFailed {
        failed: Vec<CategoryKey>,
        message: String,
    },
    Reverted {
        restored: usize,
    },
    /// The local order was restored but these items kept the new ordinal in the store.
    RevertFailed {
        stuck: Vec<CategoryKey>,
        message: String,
    },
}

impl Notice {
    pub fn is_failure(&self) -> bool {
        !matches!(self, Notice::Saved { .. })
    }

    pub fn message(&self) -> String {
        match self {
            Notice::Saved { writes } => format!("Category order saved ({writes} updated)"),
            Notice::SaveFailed { failed, message } => {
                let keys: Vec<&str> = failed.iter().map(CategoryKey::as_str).collect();
                format!(
                    "Could not save order for {}: {message}. Retry or reload to resync.",
                    keys.join(", ")
                )
            }
            Notice::Reverted { restored } => {
                format!("Order change undone; restored {restored} categories")
            }
            Notice::RevertFailed { stuck, message } => {
                let keys: Vec<&str> = stuck.iter().map(CategoryKey::as_str).collect();
                format!(
                    "Could not undo the order change for {}: {message}. Retry or reload to resync.",
                    keys.join(", ")
                )
            }
        }
    }
}
