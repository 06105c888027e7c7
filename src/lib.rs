//! Mailbox label tree: per-label state, derived presentation flags, system
//! role bindings, and the scheduler that decides which labels to poll next.

pub mod config;
pub mod derived;
pub mod error;
pub mod events;
pub mod label;
pub mod menu;
pub mod roles;
pub mod scheduler;
pub mod settings;
pub mod tree;

pub use config::Config;
pub use derived::{CollapseMarker, LabelFlags};
pub use error::{LabelError, TreeError};
pub use events::{LabelAction, LabelEvent};
pub use label::{CountValue, Label, LabelDescriptor, LabelKind};
pub use roles::{RoleSlot, SystemLabels, SystemRole};
pub use scheduler::{select_due_labels, RefreshPolicy};
pub use tree::{LabelId, LabelTree, TreeContext};
