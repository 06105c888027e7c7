use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::roles::SystemLabels;

/// Quiet period before a burst of system-label changes is written out.
pub const SAVE_DELAY: Duration = Duration::from_secs(1);

/// Load persisted system labels. `Ok(None)` if nothing has been saved yet.
pub fn load_system_labels(path: &Path) -> Result<Option<SystemLabels>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let labels = toml::from_str(&contents)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(labels))
}

/// Save system labels to disk. Creates parent directories if needed.
pub fn save_system_labels(path: &Path, labels: &SystemLabels) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let contents = toml::to_string_pretty(labels).context("failed to serialize system labels")?;
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Coalesces save requests: each request restarts the quiet period and only
/// the latest state is written once it elapses. Dropping the saver flushes
/// any pending state and ends the task.
pub struct SettingsSaver {
    tx: mpsc::UnboundedSender<SystemLabels>,
}

impl SettingsSaver {
    /// Save to `path` after [`SAVE_DELAY`] of quiet.
    pub fn spawn(path: PathBuf) -> (Self, JoinHandle<()>) {
        Self::spawn_with(SAVE_DELAY, move |labels| {
            save_system_labels(&path, labels)?;
            debug!(path = %path.display(), "system labels saved");
            Ok(())
        })
    }

    pub fn spawn_with<F>(quiet: Duration, mut save: F) -> (Self, JoinHandle<()>)
    where
        F: FnMut(&SystemLabels) -> Result<()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<SystemLabels>();
        let handle = tokio::spawn(async move {
            while let Some(mut latest) = rx.recv().await {
                loop {
                    tokio::select! {
                        next = rx.recv() => match next {
                            Some(labels) => latest = labels,
                            None => break,
                        },
                        _ = tokio::time::sleep(quiet) => break,
                    }
                }
                if let Err(e) = save(&latest) {
                    warn!(error = %e, "failed to save system labels");
                }
            }
        });
        (Self { tx }, handle)
    }

    pub fn request(&self, labels: SystemLabels) {
        if self.tx.send(labels).is_err() {
            warn!("settings saver is gone; system labels not saved");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::RoleSlot;
    use std::sync::{Arc, Mutex};

    fn labels(sent: &str) -> SystemLabels {
        SystemLabels {
            sent: sent.into(),
            ..SystemLabels::default()
        }
    }

    #[test]
    fn load_save_roundtrip() {
        let dir = std::env::temp_dir().join("labeltree-test-settings");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("nested").join("system_labels.toml");

        assert!(load_system_labels(&path).unwrap().is_none());

        let saved = SystemLabels {
            sent: "Sent Items".into(),
            trash: RoleSlot::Unused,
            ..SystemLabels::default()
        };
        save_system_labels(&path, &saved).unwrap();
        assert_eq!(load_system_labels(&path).unwrap(), Some(saved));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_rejects_garbage() {
        let dir = std::env::temp_dir().join("labeltree-test-settings-bad");
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("system_labels.toml");
        std::fs::write(&path, "sent = [").unwrap();
        assert!(load_system_labels(&path).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_is_saved_once_with_latest_state() {
        let saves = Arc::new(Mutex::new(Vec::new()));
        let sink = saves.clone();
        let (saver, handle) = SettingsSaver::spawn_with(SAVE_DELAY, move |l| {
            sink.lock().unwrap().push(l.clone());
            Ok(())
        });

        saver.request(labels("A"));
        tokio::time::sleep(Duration::from_millis(300)).await;
        saver.request(labels("B"));
        tokio::time::sleep(Duration::from_millis(300)).await;
        saver.request(labels("C"));
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(*saves.lock().unwrap(), vec![labels("C")]);

        saver.request(labels("D"));
        drop(saver);
        handle.await.unwrap();
        assert_eq!(*saves.lock().unwrap(), vec![labels("C"), labels("D")]);
    }
}
