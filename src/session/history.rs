use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::Message;
use crate::errors::PlaygroundResult;
use crate::llm::types::Role;

const SUMMARY_LIMIT: usize = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub ts: DateTime<Utc>,
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    /// One-line preview: role prefix plus content cut at 60 characters.
    pub fn summary(&self) -> String {
        let prefix = match self.role {
            Role::User => "User: ",
            Role::Assistant => "Assistant: ",
            Role::System => "System: ",
            Role::Function => "Function: ",
        };
        let text = self.content.trim();
        if text.is_empty() {
            return format!("{prefix}<empty>");
        }
        if text.chars().count() > SUMMARY_LIMIT {
            let cut: String = text.chars().take(SUMMARY_LIMIT).collect();
            format!("{prefix}{cut}...")
        } else {
            format!("{prefix}{text}")
        }
    }
}

/// Every user and assistant turn sent through the session, in order.
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records user and assistant turns; other roles are not part of the history.
    pub fn record(&mut self, message: &Message) {
        if !matches!(message.role(), Role::User | Role::Assistant) {
            return;
        }
        self.entries.push(HistoryEntry {
            ts: message.created_at,
            role: message.role(),
            content: message.original_content.clone(),
        });
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries bucketed by local calendar day, newest day first. Entries keep
    /// their recording order inside a day.
    pub fn grouped_by_date(&self) -> Vec<(NaiveDate, Vec<&HistoryEntry>)> {
        let mut days: BTreeMap<NaiveDate, Vec<&HistoryEntry>> = BTreeMap::new();
        for entry in &self.entries {
            let day = entry.ts.with_timezone(&Local).date_naive();
            days.entry(day).or_default().push(entry);
        }
        days.into_iter().rev().collect()
    }

    pub fn export_json(&self) -> PlaygroundResult<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    pub fn export_to(&self, path: &Path) -> PlaygroundResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.export_json()?)?;
        tracing::info!(path = %path.display(), entries = self.entries.len(), "history exported");
        Ok(())
    }
}

/// Default export location: `<data dir>/playground/history_<timestamp>.json`,
/// or the working directory when no data dir is known.
pub fn default_export_path() -> PathBuf {
    let dir = dirs::data_dir()
        .map(|d| d.join("playground"))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    dir.join(format!("history_{}.json", Utc::now().format("%Y%m%d_%H%M%S")))
}
