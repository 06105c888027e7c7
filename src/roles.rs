use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::events::LabelEvent;
use crate::label::{Label, LabelKind};
use crate::tree::LabelTree;

/// Slot value meaning "deliberately not used", as opposed to "not chosen yet".
pub const UNUSED_SLOT: &str = "__UNUSE__";

/// The five roles a user may bind to a label of their choosing. Inbox is not
/// among them: it is fixed by the server path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemRole {
    Sent,
    Drafts,
    Spam,
    Trash,
    Archive,
}

impl SystemRole {
    pub const ALL: [SystemRole; 5] = [
        SystemRole::Sent,
        SystemRole::Drafts,
        SystemRole::Spam,
        SystemRole::Trash,
        SystemRole::Archive,
    ];

    pub fn kind(self) -> LabelKind {
        match self {
            SystemRole::Sent => LabelKind::Sent,
            SystemRole::Drafts => LabelKind::Drafts,
            SystemRole::Spam => LabelKind::Spam,
            SystemRole::Trash => LabelKind::Trash,
            SystemRole::Archive => LabelKind::Archive,
        }
    }
}

impl fmt::Display for SystemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind().fmt(f)
    }
}

/// What a role slot points at.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RoleSlot {
    #[default]
    Unset,
    Unused,
    Label(String),
}

impl RoleSlot {
    /// The bound path, if the slot names a label.
    pub fn path(&self) -> Option<&str> {
        match self {
            RoleSlot::Label(p) => Some(p),
            _ => None,
        }
    }
}

impl From<&str> for RoleSlot {
    fn from(s: &str) -> Self {
        match s {
            "" => RoleSlot::Unset,
            UNUSED_SLOT => RoleSlot::Unused,
            other => RoleSlot::Label(other.to_string()),
        }
    }
}

impl From<String> for RoleSlot {
    fn from(s: String) -> Self {
        match s.as_str() {
            "" => RoleSlot::Unset,
            UNUSED_SLOT => RoleSlot::Unused,
            _ => RoleSlot::Label(s),
        }
    }
}

impl From<RoleSlot> for String {
    fn from(slot: RoleSlot) -> Self {
        match slot {
            RoleSlot::Unset => String::new(),
            RoleSlot::Unused => UNUSED_SLOT.to_string(),
            RoleSlot::Label(p) => p,
        }
    }
}

/// The user's choice of label for each system role.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemLabels {
    pub sent: RoleSlot,
    pub drafts: RoleSlot,
    pub spam: RoleSlot,
    pub trash: RoleSlot,
    pub archive: RoleSlot,
}

impl SystemLabels {
    pub fn slot(&self, role: SystemRole) -> &RoleSlot {
        match role {
            SystemRole::Sent => &self.sent,
            SystemRole::Drafts => &self.drafts,
            SystemRole::Spam => &self.spam,
            SystemRole::Trash => &self.trash,
            SystemRole::Archive => &self.archive,
        }
    }

    fn slot_mut(&mut self, role: SystemRole) -> &mut RoleSlot {
        match role {
            SystemRole::Sent => &mut self.sent,
            SystemRole::Drafts => &mut self.drafts,
            SystemRole::Spam => &mut self.spam,
            SystemRole::Trash => &mut self.trash,
            SystemRole::Archive => &mut self.archive,
        }
    }
}

// ---------------------------------------------------------------------------
// Assignment against the tree
// ---------------------------------------------------------------------------

impl LabelTree {
    pub fn system_labels_config(&self) -> &SystemLabels {
        &self.roles
    }

    /// Bind `role` to a new slot value.
    ///
    /// The label the slot pointed at before is demoted to a user label first,
    /// then the newly named label (if it is in the tree) takes the role. The
    /// Inbox label is never demoted or rebound. Returns false when the slot
    /// already held this value.
    ///
    /// Binding one path to two roles at once is not detected here.
    pub fn assign_system_label(&mut self, role: SystemRole, slot: impl Into<RoleSlot>) -> bool {
        let slot = slot.into();
        if *self.roles.slot(role) == slot {
            return false;
        }

        let previous = std::mem::replace(self.roles.slot_mut(role), slot.clone());
        if let Some(path) = previous.path() {
            self.set_kind_by_path(path, LabelKind::User);
        }
        if let Some(path) = slot.path() {
            if !self.set_kind_by_path(path, role.kind()) {
                debug!(%role, path, "system label not in tree yet");
            }
        }

        info!(%role, from = ?previous, to = ?slot, "system label changed");
        self.emit(LabelEvent::SystemLabelsChanged(self.roles.clone()));
        true
    }

    /// Replace every slot at once, as when settings are loaded.
    pub fn set_system_labels(&mut self, labels: SystemLabels) {
        for role in SystemRole::ALL {
            self.assign_system_label(role, labels.slot(role).clone());
        }
    }

    /// Re-apply the current slots to freshly ingested labels.
    pub(crate) fn reapply_system_labels(&mut self) {
        for role in SystemRole::ALL {
            if let Some(path) = self.roles.slot(role).path().map(str::to_string) {
                self.set_kind_by_path(&path, role.kind());
            }
        }
    }

    /// Paths of every label currently of `kind`.
    pub fn holders_of(&self, kind: LabelKind) -> Vec<&str> {
        self.walk()
            .into_iter()
            .filter_map(|id| self.get(id))
            .filter(|l| l.kind() == kind)
            .map(Label::full_name_raw)
            .collect()
    }

    /// Inbox path first, then every slot bound to a path, in role order.
    /// Only the Inbox is listed while the tree is empty.
    pub fn system_label_names(&self) -> Vec<String> {
        let mut names = vec![self.inbox_name().to_string()];
        if !self.is_empty() {
            names.extend(
                SystemRole::ALL
                    .iter()
                    .filter_map(|&role| self.roles.slot(role).path())
                    .map(str::to_string),
            );
        }
        names
    }

    /// [`Self::system_label_names`] resolved to labels present in the tree.
    pub fn system_labels(&self) -> Vec<&Label> {
        self.system_label_names()
            .iter()
            .filter_map(|name| self.get_by_path(name))
            .collect()
    }

    pub fn drafts_disabled(&self) -> bool {
        self.roles.drafts.path().is_none()
    }

    fn set_kind_by_path(&mut self, path: &str, kind: LabelKind) -> bool {
        if path == self.inbox_name() {
            return false;
        }
        match self.label_by_path_mut(path) {
            Some(label) => {
                label.kind = kind;
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::descriptor;
    use crate::tree::TreeContext;

    fn tree(paths: &[&str]) -> LabelTree {
        let descs: Vec<_> = paths.iter().map(|p| descriptor(p, "/")).collect();
        LabelTree::from_descriptors(TreeContext::default(), &descs)
    }

    fn kind(tree: &LabelTree, path: &str) -> LabelKind {
        tree.get_by_path(path).unwrap().kind()
    }

    #[test]
    fn slot_strings_round_trip() {
        assert_eq!(RoleSlot::from(""), RoleSlot::Unset);
        assert_eq!(RoleSlot::from(UNUSED_SLOT), RoleSlot::Unused);
        assert_eq!(RoleSlot::from("Sent"), RoleSlot::Label("Sent".into()));
        assert_eq!(String::from(RoleSlot::Unused), UNUSED_SLOT);
        assert_eq!(RoleSlot::Unused.path(), None);
    }

    #[test]
    fn reassigning_a_role_demotes_previous_holder() {
        let mut t = tree(&["INBOX", "Archive", "Trash"]);
        t.assign_system_label(SystemRole::Archive, "Archive");
        assert_eq!(kind(&t, "Archive"), LabelKind::Archive);

        t.assign_system_label(SystemRole::Archive, "Trash");
        assert_eq!(kind(&t, "Archive"), LabelKind::User);
        assert_eq!(kind(&t, "Trash"), LabelKind::Archive);
        assert_eq!(t.holders_of(LabelKind::Archive), vec!["Trash"]);
    }

    #[test]
    fn unused_and_unset_leave_no_holder() {
        let mut t = tree(&["INBOX", "Junk"]);
        t.assign_system_label(SystemRole::Spam, "Junk");
        t.assign_system_label(SystemRole::Spam, UNUSED_SLOT);
        assert_eq!(kind(&t, "Junk"), LabelKind::User);
        assert!(t.holders_of(LabelKind::Spam).is_empty());

        t.assign_system_label(SystemRole::Spam, "Junk");
        t.assign_system_label(SystemRole::Spam, "");
        assert!(t.holders_of(LabelKind::Spam).is_empty());
    }

    #[test]
    fn at_most_one_holder_after_any_sequence() {
        let mut t = tree(&["INBOX", "A", "B", "C"]);
        for path in ["A", "B", "C", "B", "A", "Missing", "C"] {
            t.assign_system_label(SystemRole::Trash, path);
            assert!(t.holders_of(LabelKind::Trash).len() <= 1);
        }
        assert_eq!(t.holders_of(LabelKind::Trash), vec!["C"]);
    }

    #[test]
    fn inbox_is_never_rebound() {
        let mut t = tree(&["INBOX", "Sent"]);
        t.assign_system_label(SystemRole::Sent, "INBOX");
        assert_eq!(kind(&t, "INBOX"), LabelKind::Inbox);
        t.assign_system_label(SystemRole::Sent, "Sent");
        assert_eq!(kind(&t, "INBOX"), LabelKind::Inbox);
        assert_eq!(kind(&t, "Sent"), LabelKind::Sent);
    }

    #[test]
    fn role_holder_cannot_be_renamed_out_of_reach() {
        let mut t = tree(&["INBOX", "A", "B"]);
        t.assign_system_label(SystemRole::Sent, "A");
        assert!(!t.rename_label("A", "Z").unwrap());
        assert_eq!(t.get_by_path("A").unwrap().name(), "A");

        t.assign_system_label(SystemRole::Sent, "B");
        assert_eq!(t.holders_of(LabelKind::Sent), vec!["B"]);
        assert_eq!(kind(&t, "A"), LabelKind::User);
    }

    #[test]
    fn same_value_is_a_no_op() {
        let mut t = tree(&["INBOX", "Drafts"]);
        assert!(t.assign_system_label(SystemRole::Drafts, "Drafts"));
        t.drain_events();
        assert!(!t.assign_system_label(SystemRole::Drafts, "Drafts"));
        assert!(t.drain_events().is_empty());
    }

    #[test]
    fn change_emits_settings_event() {
        let mut t = tree(&["INBOX", "Sent"]);
        t.assign_system_label(SystemRole::Sent, "Sent");
        let events = t.drain_events();
        assert!(matches!(
            events.as_slice(),
            [LabelEvent::SystemLabelsChanged(labels)] if labels.sent == RoleSlot::Label("Sent".into())
        ));
    }

    #[test]
    fn system_label_names_in_role_order() {
        let mut t = tree(&["INBOX", "Sent", "Bin", "Junk"]);
        t.assign_system_label(SystemRole::Trash, "Bin");
        t.assign_system_label(SystemRole::Sent, "Sent");
        t.assign_system_label(SystemRole::Spam, UNUSED_SLOT);
        t.assign_system_label(SystemRole::Archive, "Gone");
        assert_eq!(t.system_label_names(), vec!["INBOX", "Sent", "Bin", "Gone"]);

        let resolved: Vec<_> = t.system_labels().iter().map(|l| l.full_name_raw()).collect();
        assert_eq!(resolved, vec!["INBOX", "Sent", "Bin"]);
    }

    #[test]
    fn empty_tree_lists_only_inbox() {
        let mut t = LabelTree::new(TreeContext::default());
        t.assign_system_label(SystemRole::Sent, "Sent");
        assert_eq!(t.system_label_names(), vec!["INBOX"]);
    }

    #[test]
    fn drafts_disabled_when_unset_or_unused() {
        let mut t = tree(&["INBOX", "Drafts"]);
        assert!(t.drafts_disabled());
        t.assign_system_label(SystemRole::Drafts, "Drafts");
        assert!(!t.drafts_disabled());
        t.assign_system_label(SystemRole::Drafts, UNUSED_SLOT);
        assert!(t.drafts_disabled());
    }

    #[test]
    fn set_system_labels_applies_every_slot() {
        let mut t = tree(&["INBOX", "Sent", "Trash"]);
        t.set_system_labels(SystemLabels {
            sent: "Sent".into(),
            trash: "Trash".into(),
            ..SystemLabels::default()
        });
        assert_eq!(kind(&t, "Sent"), LabelKind::Sent);
        assert_eq!(kind(&t, "Trash"), LabelKind::Trash);
    }

    #[test]
    fn settings_toml_shape() {
        let labels = SystemLabels {
            sent: "Sent".into(),
            spam: RoleSlot::Unused,
            ..SystemLabels::default()
        };
        let text = toml::to_string(&labels).unwrap();
        assert!(text.contains("sent = \"Sent\""));
        assert!(text.contains("spam = \"__UNUSE__\""));
        let back: SystemLabels = toml::from_str(&text).unwrap();
        assert_eq!(back, labels);
    }
}
