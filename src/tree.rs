use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::config::{Config, SystemNames};
use crate::error::TreeError;
use crate::events::{LabelAction, LabelEvent, Outbox};
use crate::label::{CountValue, Label, LabelDescriptor, LabelKind};
use crate::roles::SystemLabels;

/// Handle to a node in a [`LabelTree`]. Stable until the node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelId(usize);

#[derive(Debug)]
struct Node {
    label: Label,
    parent: Option<LabelId>,
    children: Vec<LabelId>,
}

/// Settings the tree needs from its surroundings.
#[derive(Debug, Clone)]
pub struct TreeContext {
    pub inbox_name: String,
    pub namespace: String,
    pub names: SystemNames,
}

impl Default for TreeContext {
    fn default() -> Self {
        Self {
            inbox_name: "INBOX".to_string(),
            namespace: String::new(),
            names: SystemNames::default(),
        }
    }
}

impl TreeContext {
    pub fn from_config(config: &Config) -> Self {
        Self {
            inbox_name: config.inbox.clone(),
            namespace: config.namespace.clone(),
            names: config.names.clone(),
        }
    }
}

/// All labels of one account: an arena of nodes, indexed by raw path.
///
/// Children are held in display order. Every mutation that the server must
/// hear about queues a [`LabelEvent`]; drain them with [`Self::drain_events`].
#[derive(Debug)]
pub struct LabelTree {
    ctx: TreeContext,
    nodes: Vec<Option<Node>>,
    roots: Vec<LabelId>,
    index: HashMap<String, LabelId>,
    pub(crate) roles: SystemLabels,
    current: Option<LabelId>,
    armed_for_deletion: Option<LabelId>,
    outbox: Outbox,
}

impl LabelTree {
    pub fn new(ctx: TreeContext) -> Self {
        Self {
            ctx,
            nodes: Vec::new(),
            roots: Vec::new(),
            index: HashMap::new(),
            roles: SystemLabels::default(),
            current: None,
            armed_for_deletion: None,
            outbox: Outbox::default(),
        }
    }

    pub fn from_descriptors(ctx: TreeContext, descriptors: &[LabelDescriptor]) -> Self {
        let mut tree = Self::new(ctx);
        tree.ingest(None, descriptors);
        tree
    }

    /// Replace the whole tree with a fresh server listing.
    ///
    /// Poll stamps, counts and collapse state survive for paths that are still
    /// present; system-role slots are applied to the new labels.
    pub fn reload(&mut self, descriptors: &[LabelDescriptor]) {
        let kept: HashMap<String, (i64, u32, u32, bool)> = self
            .index
            .iter()
            .filter_map(|(path, &id)| {
                let l = self.get(id)?;
                Some((
                    path.clone(),
                    (
                        l.last_polled_at,
                        l.message_count_all,
                        l.message_count_unread,
                        l.collapsed,
                    ),
                ))
            })
            .collect();
        let current = self.current_full_name_raw().to_string();

        self.nodes.clear();
        self.roots.clear();
        self.index.clear();
        self.current = None;
        self.armed_for_deletion = None;

        self.ingest(None, descriptors);

        for (path, (polled, all, unread, collapsed)) in kept {
            if let Some(label) = self.label_by_path_mut(&path) {
                label.last_polled_at = polled;
                label.message_count_all = all;
                label.message_count_unread = unread;
                label.collapsed = collapsed;
            }
        }
        self.reapply_system_labels();
        if let Some(id) = self.id_of(&current) {
            self.select(Some(id));
        }
        info!(labels = self.len(), "label tree reloaded");
    }

    fn ingest(&mut self, parent: Option<LabelId>, descriptors: &[LabelDescriptor]) {
        for desc in descriptors {
            let label = match Label::from_descriptor(desc, &self.ctx.inbox_name) {
                Ok(label) => label,
                Err(e) => {
                    warn!(error = %e, "skipping label descriptor");
                    continue;
                }
            };
            match self.attach(parent, label) {
                Ok(id) => self.ingest(Some(id), &desc.sub_labels),
                Err(e) => warn!(error = %e, "skipping label descriptor"),
            }
        }
    }

    fn attach(&mut self, parent: Option<LabelId>, label: Label) -> Result<LabelId, TreeError> {
        let path = label.full_name_raw().to_string();
        if self.index.contains_key(&path) {
            return Err(TreeError::DuplicatePath(path));
        }
        let id = LabelId(self.nodes.len());
        match parent {
            Some(p) => match self.node_mut(p) {
                Some(node) => node.children.push(id),
                None => return Err(TreeError::UnknownPath(path)),
            },
            None => self.roots.push(id),
        }
        self.nodes.push(Some(Node {
            label,
            parent,
            children: Vec::new(),
        }));
        self.index.insert(path, id);
        Ok(id)
    }

    /// Add a label under `parent` (or at the root), after any existing siblings.
    pub fn insert(&mut self, parent: Option<&str>, label: Label) -> Result<LabelId, TreeError> {
        let parent = match parent {
            Some(path) => Some(self.require(path)?),
            None => None,
        };
        self.attach(parent, label)
    }

    /// Put back a label whose removal the server refused.
    pub fn restore_label(&mut self, parent: Option<&str>, label: Label) -> Result<LabelId, TreeError> {
        let path = label.full_name_raw().to_string();
        let id = self.insert(parent, label)?;
        info!(%path, "label restored");
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    pub fn context(&self) -> &TreeContext {
        &self.ctx
    }

    pub fn inbox_name(&self) -> &str {
        &self.ctx.inbox_name
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn roots(&self) -> &[LabelId] {
        &self.roots
    }

    pub fn children(&self, id: LabelId) -> &[LabelId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: LabelId) -> Option<LabelId> {
        self.node(id)?.parent
    }

    pub fn get(&self, id: LabelId) -> Option<&Label> {
        self.node(id).map(|n| &n.label)
    }

    pub fn id_of(&self, path: &str) -> Option<LabelId> {
        self.index.get(path).copied()
    }

    pub fn get_by_path(&self, path: &str) -> Option<&Label> {
        self.get(self.id_of(path)?)
    }

    pub(crate) fn get_mut(&mut self, id: LabelId) -> Option<&mut Label> {
        self.node_mut(id).map(|n| &mut n.label)
    }

    pub(crate) fn label_by_path_mut(&mut self, path: &str) -> Option<&mut Label> {
        let id = self.id_of(path)?;
        self.get_mut(id)
    }

    /// Every reachable node, parents before children, siblings in order.
    /// A node is visited at most once even if the links are malformed.
    pub fn walk(&self) -> Vec<LabelId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack: Vec<LabelId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) || self.node(id).is_none() {
                continue;
            }
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    fn node(&self, id: LabelId) -> Option<&Node> {
        self.nodes.get(id.0)?.as_ref()
    }

    fn node_mut(&mut self, id: LabelId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)?.as_mut()
    }

    fn require(&self, path: &str) -> Result<LabelId, TreeError> {
        self.id_of(path)
            .ok_or_else(|| TreeError::UnknownPath(path.to_string()))
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub(crate) fn emit(&mut self, event: LabelEvent) {
        self.outbox.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<LabelEvent> {
        self.outbox.drain()
    }

    // -----------------------------------------------------------------------
    // Counts
    // -----------------------------------------------------------------------

    /// Store a new total count. Invalid values are dropped, but the change is
    /// still announced so bound views re-render. Returns whether it was stored.
    pub fn set_message_count_all(&mut self, path: &str, value: impl CountValue) -> Result<bool, TreeError> {
        let id = self.require(path)?;
        let accepted = match (value.to_count(), self.get_mut(id)) {
            (Some(n), Some(label)) => {
                label.message_count_all = n;
                true
            }
            _ => {
                debug!(path, "ignoring invalid total count");
                false
            }
        };
        self.emit(LabelEvent::CountsChanged {
            full_name_raw: path.to_string(),
        });
        Ok(accepted)
    }

    /// Like [`Self::set_message_count_all`]; writes on the Inbox also publish
    /// [`LabelEvent::InboxUnreadCount`] every time.
    pub fn set_message_count_unread(&mut self, path: &str, value: impl CountValue) -> Result<bool, TreeError> {
        let id = self.require(path)?;
        let count = value.to_count();
        let Some(label) = self.get_mut(id) else {
            return Err(TreeError::UnknownPath(path.to_string()));
        };
        let accepted = match count {
            Some(n) => {
                label.message_count_unread = n;
                true
            }
            None => {
                debug!(path, "ignoring invalid unread count");
                false
            }
        };
        let is_inbox = label.kind() == LabelKind::Inbox;
        let unread = label.message_count_unread;

        self.emit(LabelEvent::CountsChanged {
            full_name_raw: path.to_string(),
        });
        if is_inbox {
            self.emit(LabelEvent::InboxUnreadCount(unread));
        }
        Ok(accepted)
    }

    /// Empty a label locally and ask the server to do the same.
    pub fn clear_label(&mut self, path: &str) -> Result<(), TreeError> {
        self.set_message_count_all(path, 0u32)?;
        self.set_message_count_unread(path, 0u32)?;
        self.emit(LabelEvent::Action(LabelAction::Clear {
            full_name_raw: path.to_string(),
        }));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Subscription and polling eligibility
    // -----------------------------------------------------------------------

    /// Show or hide a label. Refused (returns false) for system labels, the
    /// Inbox and non-selectable labels.
    pub fn set_subscribed(&mut self, path: &str, subscribed: bool) -> Result<bool, TreeError> {
        let id = self.require(path)?;
        if !self.can_be_subscribed(id) {
            debug!(path, "label cannot be subscribed or unsubscribed");
            return Ok(false);
        }
        if let Some(label) = self.get_mut(id) {
            label.subscribed = subscribed;
        }
        self.emit(LabelEvent::Action(LabelAction::Subscribe {
            full_name_raw: path.to_string(),
            subscribed,
        }));
        Ok(true)
    }

    /// Include or exclude a label from unread polling, under the same rules
    /// as [`Self::set_subscribed`].
    pub fn set_checkable(&mut self, path: &str, checkable: bool) -> Result<bool, TreeError> {
        let id = self.require(path)?;
        if !self.can_be_checked(id) {
            debug!(path, "label cannot be checked");
            return Ok(false);
        }
        if let Some(label) = self.get_mut(id) {
            label.checkable = checkable;
        }
        self.emit(LabelEvent::Action(LabelAction::Checkable {
            full_name_raw: path.to_string(),
            checkable,
        }));
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // View state
    // -----------------------------------------------------------------------

    pub fn set_collapsed(&mut self, path: &str, collapsed: bool) -> Result<(), TreeError> {
        let id = self.require(path)?;
        if let Some(label) = self.get_mut(id) {
            label.collapsed = collapsed;
        }
        Ok(())
    }

    pub fn set_focused(&mut self, path: &str, focused: bool) -> Result<(), TreeError> {
        let id = self.require(path)?;
        if let Some(label) = self.get_mut(id) {
            label.focused = focused;
        }
        Ok(())
    }

    /// Make `path` the current label, or clear the selection with `None`.
    pub fn set_current(&mut self, path: Option<&str>) -> Result<(), TreeError> {
        let id = match path {
            Some(p) => Some(self.require(p)?),
            None => None,
        };
        self.select(id);
        Ok(())
    }

    fn select(&mut self, id: Option<LabelId>) {
        if let Some(old) = self.current.take() {
            if let Some(label) = self.get_mut(old) {
                label.selected = false;
            }
        }
        if let Some(new) = id {
            if let Some(label) = self.get_mut(new) {
                label.selected = true;
                self.current = Some(new);
            }
        }
    }

    pub fn current(&self) -> Option<&Label> {
        self.get(self.current?)
    }

    pub fn current_full_name_raw(&self) -> &str {
        self.current().map(Label::full_name_raw).unwrap_or("")
    }

    pub fn current_full_name(&self) -> &str {
        self.current().map(Label::full_name).unwrap_or("")
    }

    pub fn current_full_name_hash(&self) -> &str {
        self.current().map(Label::full_name_hash).unwrap_or("")
    }

    // -----------------------------------------------------------------------
    // Create / rename
    // -----------------------------------------------------------------------

    /// Ask the server for a new label. Nothing changes locally; the new label
    /// arrives with the next [`Self::reload`].
    pub fn create_label(&mut self, name: &str, parent: Option<&str>) -> Result<(), TreeError> {
        let name = name.trim();
        if !is_valid_label_name(name) {
            return Err(TreeError::InvalidName(name.to_string()));
        }
        let parent = match parent.filter(|p| !p.is_empty()) {
            Some(p) => {
                self.require(p)?;
                p.to_string()
            }
            None => namespace_parent(&self.ctx.namespace),
        };
        info!(name, %parent, "creating label");
        self.emit(LabelEvent::Action(LabelAction::Create {
            name: name.to_string(),
            parent,
        }));
        Ok(())
    }

    pub fn begin_edit(&mut self, path: &str) -> Result<(), TreeError> {
        let id = self.require(path)?;
        if let Some(label) = self.get_mut(id) {
            label.set_edited(true);
        }
        Ok(())
    }

    pub fn set_name_for_edit(&mut self, path: &str, text: &str) -> Result<(), TreeError> {
        let id = self.require(path)?;
        if let Some(label) = self.get_mut(id) {
            label.set_name_for_edit(text);
        }
        Ok(())
    }

    pub fn cancel_edit(&mut self, path: &str) -> Result<(), TreeError> {
        let id = self.require(path)?;
        if let Some(label) = self.get_mut(id) {
            label.set_edited(false);
        }
        Ok(())
    }

    /// Rename using the label's edit buffer.
    pub fn commit_edit(&mut self, path: &str) -> Result<bool, TreeError> {
        let text = self
            .get_by_path(path)
            .map(|l| l.name_for_edit().to_string())
            .ok_or_else(|| TreeError::UnknownPath(path.to_string()))?;
        self.rename_label(path, &text)
    }

    /// Give a label a new leaf name.
    ///
    /// The old raw path stops resolving: the label stays in place but cannot be
    /// looked up (or scheduled) until the next reload re-keys it. Returns false
    /// when the label cannot be edited (system labels, the Inbox, placeholders)
    /// or the trimmed name is empty or unchanged. Editing ends either way.
    pub fn rename_label(&mut self, path: &str, new_name: &str) -> Result<bool, TreeError> {
        let id = self.require(path)?;
        let new_name = new_name.trim();
        let editable = self.can_be_edited(id);
        let Some(label) = self.get_mut(id) else {
            return Err(TreeError::UnknownPath(path.to_string()));
        };
        if !editable {
            label.set_edited(false);
            debug!(path, "label cannot be renamed");
            return Ok(false);
        }
        if new_name.is_empty() || new_name == label.name() {
            label.set_edited(false);
            return Ok(false);
        }
        label.set_name(new_name.to_string());
        label.set_edited(false);

        self.index.remove(path);
        info!(path, new_name, "label renamed");
        self.emit(LabelEvent::Action(LabelAction::Rename {
            full_name_raw: path.to_string(),
            new_name: new_name.to_string(),
        }));
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Arm `path` for deletion (first step of the two-step confirmation),
    /// disarming whatever was armed before. `None` disarms.
    pub fn arm_delete(&mut self, path: Option<&str>) -> Result<(), TreeError> {
        let id = match path {
            Some(p) => Some(self.require(p)?),
            None => None,
        };
        if let Some(old) = self.armed_for_deletion.take() {
            if let Some(label) = self.get_mut(old) {
                label.delete_access = false;
            }
        }
        if let Some(new) = id {
            if let Some(label) = self.get_mut(new) {
                label.delete_access = true;
                self.armed_for_deletion = Some(new);
            }
        }
        Ok(())
    }

    /// Remove an armed, deletable, empty label and ask the server to delete
    /// it. The removed label is returned so it can be restored on failure.
    pub fn delete_label(&mut self, path: &str) -> Result<Label, TreeError> {
        let id = self.require(path)?;
        let (count, armed) = match self.get(id) {
            Some(l) => (l.message_count_all(), l.has_delete_access()),
            None => return Err(TreeError::UnknownPath(path.to_string())),
        };
        if count > 0 {
            return Err(TreeError::NotEmpty(path.to_string()));
        }
        if !armed || !self.can_be_deleted(id) {
            return Err(TreeError::NotDeletable(path.to_string()));
        }

        let label = self
            .detach(id)
            .ok_or_else(|| TreeError::UnknownPath(path.to_string()))?;
        info!(path, "label deleted");
        self.emit(LabelEvent::Action(LabelAction::Delete {
            full_name_raw: path.to_string(),
        }));
        Ok(label)
    }

    /// Unlink a node and everything below it.
    fn detach(&mut self, id: LabelId) -> Option<Label> {
        match self.parent(id) {
            Some(p) => {
                if let Some(parent) = self.node_mut(p) {
                    parent.children.retain(|&c| c != id);
                }
            }
            None => self.roots.retain(|&r| r != id),
        }

        let mut top = None;
        let mut seen = HashSet::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if !seen.insert(next) {
                continue;
            }
            let Some(mut node) = self.nodes.get_mut(next.0).and_then(Option::take) else {
                continue;
            };
            node.label.selected = false;
            node.label.delete_access = false;
            if self.index.get(node.label.full_name_raw()) == Some(&next) {
                self.index.remove(node.label.full_name_raw());
            }
            if self.current == Some(next) {
                self.current = None;
            }
            if self.armed_for_deletion == Some(next) {
                self.armed_for_deletion = None;
            }
            stack.extend(node.children.iter().copied());
            if next == id {
                top = Some(node.label);
            }
        }
        top
    }
}

/// A new label name must be non-empty and free of path separators.
pub fn is_valid_label_name(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty() && !name.contains(['/', '\\'])
}

/// Default parent for new labels: the namespace without its trailing delimiter.
fn namespace_parent(namespace: &str) -> String {
    let mut chars = namespace.chars();
    match chars.next_back() {
        Some(_) => chars.as_str().to_string(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
