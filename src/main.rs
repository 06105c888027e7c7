use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

use labeltree::settings::{load_system_labels, SettingsSaver};
use labeltree::{
    scheduler, select_due_labels, Config, LabelDescriptor, LabelEvent, LabelTree, RefreshPolicy,
    TreeContext,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    let Some(snapshot) = args.get(1) else {
        bail!("usage: labeltree <snapshot.json> [--watch]");
    };
    let watch = args.iter().skip(2).any(|a| a == "--watch");

    // Load config
    let config = Config::load()?;

    let json = std::fs::read_to_string(snapshot)
        .with_context(|| format!("failed to read label snapshot {}", snapshot))?;
    let descriptors = LabelDescriptor::parse_snapshot(&json)
        .with_context(|| format!("failed to parse label snapshot {}", snapshot))?;
    let mut tree = LabelTree::from_descriptors(TreeContext::from_config(&config), &descriptors);

    // Persisted choices win over the config file
    let settings_path = config.effective_settings_path();
    let system = load_system_labels(&settings_path)?.unwrap_or_else(|| config.system_labels.clone());
    tree.set_system_labels(system);
    tree.drain_events();

    print_tree(&tree);

    let policy = RefreshPolicy::from(&config.refresh);
    let due = select_due_labels(&mut tree, scheduler::now_unix(), policy);
    println!("due for refresh: {}", due.join(", "));

    if !watch {
        return Ok(());
    }

    let (saver, saver_task) = SettingsSaver::spawn(settings_path);
    let tree = Arc::new(Mutex::new(tree));
    let (tx, mut rx) = mpsc::channel(8);
    let tick = Duration::from_secs(config.refresh.tick_secs.max(1));
    let scheduler_task = tokio::spawn(scheduler::run(tree.clone(), policy, tick, tx));

    loop {
        tokio::select! {
            batch = rx.recv() => match batch {
                Some(labels) => info!(?labels, "refresh due"),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
        let events = tree.lock().await.drain_events();
        dispatch(events, &saver);
    }

    scheduler_task.abort();
    drop(saver);
    let _ = saver_task.await;
    Ok(())
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_env("LABELTREE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Hand queued tree events to their collaborators.
fn dispatch(events: Vec<LabelEvent>, saver: &SettingsSaver) {
    for event in events {
        match event {
            LabelEvent::SystemLabelsChanged(labels) => saver.request(labels),
            LabelEvent::InboxUnreadCount(n) => info!(unread = n, "inbox unread count"),
            LabelEvent::Action(action) => info!(?action, "server action requested"),
            LabelEvent::CountsChanged { .. } => {}
        }
    }
}

/// Print the visible labels, indented, with their unread indicators.
fn print_tree(tree: &LabelTree) {
    for id in tree.walk() {
        let shown = tree.is_system_label(id) || (tree.visible(id) && !tree.hidden(id));
        let Some(label) = tree.get(id).filter(|_| shown) else {
            continue;
        };
        let indent = "  ".repeat(label.depth());
        let unread = tree.printable_unread_count(id);
        if unread.is_empty() {
            println!("{}{}", indent, tree.local_name(id));
        } else {
            println!("{}{} ({})", indent, tree.local_name(id), unread);
        }
    }
}
