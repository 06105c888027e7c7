use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::config::RefreshConfig;
use crate::tree::LabelTree;

/// How often labels may be polled and how many at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub cooldown_secs: i64,
    pub batch_limit: usize,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            cooldown_secs: 300,
            batch_limit: 5,
        }
    }
}

impl From<&RefreshConfig> for RefreshPolicy {
    fn from(cfg: &RefreshConfig) -> Self {
        Self {
            cooldown_secs: cfg.cooldown_secs,
            batch_limit: cfg.batch_limit,
        }
    }
}

/// Current time in unix seconds.
pub fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Pick up to `policy.batch_limit` labels whose last poll is older than the
/// cooldown, oldest first, and stamp each chosen label with `now`.
///
/// Candidates are selectable, existing, not the Inbox, and either system
/// labels or subscribed-and-checkable user labels. Labels whose path no
/// longer resolves (renamed, not yet re-keyed) are passed over.
pub fn select_due_labels(tree: &mut LabelTree, now: i64, policy: RefreshPolicy) -> Vec<String> {
    let inbox = tree.inbox_name().to_string();

    let mut candidates: Vec<(i64, String)> = tree
        .walk()
        .into_iter()
        .filter_map(|id| {
            let label = tree.get(id)?;
            let due = label.full_name_raw() != inbox
                && label.is_selectable()
                && label.exists()
                && now - label.last_polled_at() > policy.cooldown_secs
                && (label.kind().is_system() || (label.is_subscribed() && label.is_checkable()));
            due.then(|| (label.last_polled_at(), label.full_name_raw().to_string()))
        })
        .collect();
    candidates.sort_by_key(|(polled, _)| *polled);

    let mut picked = Vec::new();
    let mut seen = HashSet::new();
    for (_, path) in candidates {
        if picked.len() >= policy.batch_limit {
            break;
        }
        if !seen.insert(path.clone()) {
            continue;
        }
        if let Some(label) = tree.label_by_path_mut(&path) {
            label.last_polled_at = now;
            picked.push(path);
        }
    }

    if !picked.is_empty() {
        debug!(count = picked.len(), now, "labels due for refresh");
    }
    picked
}

/// Run [`select_due_labels`] every `tick` and send each non-empty batch to the
/// network side. Returns when the receiver is dropped.
///
/// The tree stays locked for the whole selection pass, so no other writer can
/// touch poll stamps in between.
pub async fn run(
    tree: Arc<Mutex<LabelTree>>,
    policy: RefreshPolicy,
    tick: Duration,
    tx: mpsc::Sender<Vec<String>>,
) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let batch = {
            let mut tree = tree.lock().await;
            select_due_labels(&mut tree, now_unix(), policy)
        };
        if batch.is_empty() {
            continue;
        }
        if tx.send(batch).await.is_err() {
            info!("refresh receiver gone, stopping scheduler");
            return;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
