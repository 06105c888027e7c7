//! Attributes computed from a label and its subtree.
//!
//! Nothing here is cached: every value is recomputed from current state when
//! read, so a mutation is visible to the very next read.

use std::collections::HashSet;

use crate::label::LabelKind;
use crate::tree::{LabelId, LabelTree};

/// How the expand/collapse toggle of a label should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseMarker {
    /// Nothing to expand.
    None,
    Collapsed,
    Expanded,
}

/// Snapshot of every derived attribute of one label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFlags {
    pub is_system: bool,
    pub visible: bool,
    pub hidden: bool,
    pub collapsed: bool,
    pub collapse_marker: CollapseMarker,
    pub has_subscribed_descendant: bool,
    pub has_unread_subscribed_descendant: bool,
    pub has_unread_messages: bool,
    pub can_be_edited: bool,
    pub can_be_deleted: bool,
    pub can_be_subscribed: bool,
    pub can_be_checked: bool,
    pub selectable_for_label_list: bool,
    pub printable_unread_count: String,
    pub local_name: String,
    pub manage_system_name: String,
}

/// The unread indicator shown next to a label.
///
/// Drafts show their total; Trash, Archive and Sent show nothing; everything
/// else shows its unread count. Empty labels never show anything.
pub fn printable_unread(kind: LabelKind, all: u32, unread: u32) -> String {
    if all == 0 {
        return String::new();
    }
    match kind {
        LabelKind::Drafts => all.to_string(),
        LabelKind::Trash | LabelKind::Archive | LabelKind::Sent => String::new(),
        _ if unread > 0 => unread.to_string(),
        _ => String::new(),
    }
}

impl LabelTree {
    pub fn is_system_label(&self, id: LabelId) -> bool {
        self.get(id).is_some_and(|l| l.kind().is_system())
    }

    /// Any non-system descendant is subscribed. System labels and everything
    /// below them do not count.
    pub fn has_subscribed_descendant(&self, id: LabelId) -> bool {
        self.any_descendant(id, |tree, child| {
            if tree.is_system_label(child) {
                Descend::Skip
            } else if tree.get(child).is_some_and(|l| l.is_subscribed()) {
                Descend::Found
            } else {
                Descend::Into
            }
        })
    }

    /// Any descendant shows an unread indicator.
    pub fn has_unread_subscribed_descendant(&self, id: LabelId) -> bool {
        self.any_descendant(id, |tree, child| {
            if tree.has_unread_messages(child) {
                Descend::Found
            } else {
                Descend::Into
            }
        })
    }

    /// Subscribed labels are shown, and so are placeholder parents (missing or
    /// unselectable on the server) that host a subscribed descendant.
    pub fn visible(&self, id: LabelId) -> bool {
        let Some(label) = self.get(id) else {
            return false;
        };
        label.is_subscribed()
            || (self.has_subscribed_descendant(id) && (!label.exists() || !label.is_selectable()))
    }

    pub fn hidden(&self, id: LabelId) -> bool {
        let Some(label) = self.get(id) else {
            return false;
        };
        let has_sub = self.has_subscribed_descendant(id);
        (label.kind().is_system() && !has_sub) || (!label.is_selectable() && !has_sub)
    }

    /// The stored collapse flag, except that hidden labels are never collapsed.
    pub fn collapsed(&self, id: LabelId) -> bool {
        self.get(id).is_some_and(|l| l.collapsed) && !self.hidden(id)
    }

    pub fn collapse_marker(&self, id: LabelId) -> CollapseMarker {
        if !self.has_subscribed_descendant(id) {
            CollapseMarker::None
        } else if self.collapsed(id) {
            CollapseMarker::Collapsed
        } else {
            CollapseMarker::Expanded
        }
    }

    pub fn can_be_edited(&self, id: LabelId) -> bool {
        self.get(id)
            .is_some_and(|l| l.kind() == LabelKind::User && l.exists() && l.is_selectable())
    }

    pub fn can_be_deleted(&self, id: LabelId) -> bool {
        self.get(id).is_some_and(|l| {
            !l.kind().is_system()
                && self.children(id).is_empty()
                && l.full_name_raw() != self.inbox_name()
        })
    }

    pub fn can_be_subscribed(&self, id: LabelId) -> bool {
        self.get(id).is_some_and(|l| {
            !l.kind().is_system() && l.is_selectable() && l.full_name_raw() != self.inbox_name()
        })
    }

    pub fn can_be_checked(&self, id: LabelId) -> bool {
        self.can_be_subscribed(id)
    }

    pub fn selectable_for_label_list(&self, id: LabelId) -> bool {
        self.get(id)
            .is_some_and(|l| !l.kind().is_system() && l.is_selectable())
    }

    pub fn printable_unread_count(&self, id: LabelId) -> String {
        self.get(id)
            .map(|l| printable_unread(l.kind(), l.message_count_all(), l.message_count_unread()))
            .unwrap_or_default()
    }

    pub fn has_unread_messages(&self, id: LabelId) -> bool {
        self.get(id).is_some_and(|l| l.message_count_unread() > 0)
            && !self.printable_unread_count(id).is_empty()
    }

    /// Display name: the configured role name for system labels, the leaf
    /// name otherwise.
    pub fn local_name(&self, id: LabelId) -> String {
        let Some(label) = self.get(id) else {
            return String::new();
        };
        self.context()
            .names
            .name_for(label.kind())
            .unwrap_or(label.name())
            .to_string()
    }

    /// "(Role)" suffix for system labels in management lists, dropped when it
    /// would just repeat the label's own name or say "(Inbox)".
    pub fn manage_system_name(&self, id: LabelId) -> String {
        let Some(label) = self.get(id) else {
            return String::new();
        };
        let Some(role) = self.context().names.name_for(label.kind()) else {
            return String::new();
        };
        let suffix = format!("({})", role);
        if suffix == format!("({})", label.name()) || suffix.to_lowercase() == "(inbox)" {
            String::new()
        } else {
            suffix
        }
    }

    /// True when no root label is a visible user label, i.e. the list would
    /// show nothing but the Inbox.
    pub fn has_single_inbox_root(&self) -> bool {
        !self
            .roots()
            .iter()
            .any(|&id| !self.is_system_label(id) && self.visible(id))
    }

    pub fn flags(&self, id: LabelId) -> Option<LabelFlags> {
        self.get(id)?;
        Some(LabelFlags {
            is_system: self.is_system_label(id),
            visible: self.visible(id),
            hidden: self.hidden(id),
            collapsed: self.collapsed(id),
            collapse_marker: self.collapse_marker(id),
            has_subscribed_descendant: self.has_subscribed_descendant(id),
            has_unread_subscribed_descendant: self.has_unread_subscribed_descendant(id),
            has_unread_messages: self.has_unread_messages(id),
            can_be_edited: self.can_be_edited(id),
            can_be_deleted: self.can_be_deleted(id),
            can_be_subscribed: self.can_be_subscribed(id),
            can_be_checked: self.can_be_checked(id),
            selectable_for_label_list: self.selectable_for_label_list(id),
            printable_unread_count: self.printable_unread_count(id),
            local_name: self.local_name(id),
            manage_system_name: self.manage_system_name(id),
        })
    }

    fn any_descendant(&self, id: LabelId, mut check: impl FnMut(&Self, LabelId) -> Descend) -> bool {
        let mut seen = HashSet::from([id]);
        let mut stack: Vec<LabelId> = self.children(id).to_vec();
        while let Some(child) = stack.pop() {
            if !seen.insert(child) {
                continue;
            }
            match check(self, child) {
                Descend::Found => return true,
                Descend::Skip => {}
                Descend::Into => stack.extend_from_slice(self.children(child)),
            }
        }
        false
    }
}

enum Descend {
    Found,
    Skip,
    Into,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::descriptor;
    use crate::roles::SystemRole;
    use crate::tree::TreeContext;

    /// INBOX, Work (unsubscribed placeholder) > Work/Urgent (subscribed).
    fn work_tree(work_exists: bool) -> LabelTree {
        let mut work = descriptor("Work", "/");
        work.is_subscribed = false;
        work.is_exists = work_exists;
        work.is_selectable = work_exists;
        work.sub_labels = vec![descriptor("Work/Urgent", "/")];
        LabelTree::from_descriptors(TreeContext::default(), &[descriptor("INBOX", "/"), work])
    }

    fn id(tree: &LabelTree, path: &str) -> LabelId {
        tree.id_of(path).unwrap()
    }

    #[test]
    fn placeholder_parent_is_visible_through_subscribed_child() {
        let tree = work_tree(false);
        let work = id(&tree, "Work");
        assert!(tree.has_subscribed_descendant(work));
        assert!(tree.visible(work));
        assert!(!tree.hidden(work));
        assert!(tree.visible(id(&tree, "Work/Urgent")));
    }

    #[test]
    fn real_unsubscribed_parent_is_not_visible() {
        let tree = work_tree(true);
        let work = id(&tree, "Work");
        assert!(tree.has_subscribed_descendant(work));
        assert!(!tree.visible(work));
    }

    #[test]
    fn descendant_search_is_transitive() {
        let mut a = descriptor("A", "/");
        a.is_subscribed = false;
        let mut b = descriptor("A/B", "/");
        b.is_subscribed = false;
        b.sub_labels = vec![descriptor("A/B/C", "/")];
        a.sub_labels = vec![b];
        let tree = LabelTree::from_descriptors(TreeContext::default(), &[a]);
        assert!(tree.has_subscribed_descendant(id(&tree, "A")));
        assert!(!tree.has_subscribed_descendant(id(&tree, "A/B/C")));
    }

    #[test]
    fn system_descendants_do_not_count_as_subscribed() {
        let mut parent = descriptor("Parent", "/");
        parent.is_subscribed = false;
        parent.sub_labels = vec![descriptor("Parent/Sent", "/")];
        let mut tree =
            LabelTree::from_descriptors(TreeContext::default(), &[descriptor("INBOX", "/"), parent]);
        let p = id(&tree, "Parent");
        assert!(tree.has_subscribed_descendant(p));

        tree.assign_system_label(SystemRole::Sent, "Parent/Sent");
        assert!(!tree.has_subscribed_descendant(p));
    }

    #[test]
    fn system_label_without_subscribed_children_is_hidden() {
        let mut tree = LabelTree::from_descriptors(
            TreeContext::default(),
            &[descriptor("INBOX", "/"), descriptor("Trash", "/")],
        );
        let inbox = id(&tree, "INBOX");
        assert!(tree.hidden(inbox));
        assert!(!tree.collapsed(inbox));

        let trash = id(&tree, "Trash");
        assert!(!tree.hidden(trash));
        tree.assign_system_label(SystemRole::Trash, "Trash");
        assert!(tree.hidden(trash));
    }

    #[test]
    fn hidden_implies_not_collapsed() {
        let tree = work_tree(false);
        for node in tree.walk() {
            if tree.hidden(node) {
                assert!(!tree.collapsed(node));
            }
        }
        let inbox = id(&tree, "INBOX");
        assert!(tree.get(inbox).unwrap().collapsed);
        assert!(!tree.collapsed(inbox));
    }

    #[test]
    fn collapse_marker_follows_state() {
        let mut tree = work_tree(true);
        let work = id(&tree, "Work");
        assert_eq!(tree.collapse_marker(work), CollapseMarker::Collapsed);
        tree.set_collapsed("Work", false).unwrap();
        assert_eq!(tree.collapse_marker(work), CollapseMarker::Expanded);
        assert_eq!(tree.collapse_marker(id(&tree, "Work/Urgent")), CollapseMarker::None);
    }

    #[test]
    fn printable_unread_policy() {
        assert_eq!(printable_unread(LabelKind::Drafts, 3, 0), "3");
        assert_eq!(printable_unread(LabelKind::Trash, 3, 2), "");
        assert_eq!(printable_unread(LabelKind::Archive, 3, 2), "");
        assert_eq!(printable_unread(LabelKind::Sent, 3, 2), "");
        assert_eq!(printable_unread(LabelKind::User, 3, 2), "2");
        assert_eq!(printable_unread(LabelKind::Spam, 3, 2), "2");
        assert_eq!(printable_unread(LabelKind::Inbox, 3, 0), "");
        assert_eq!(printable_unread(LabelKind::User, 0, 2), "");
    }

    #[test]
    fn printable_unread_tracks_kind_changes() {
        let mut tree = LabelTree::from_descriptors(
            TreeContext::default(),
            &[descriptor("INBOX", "/"), descriptor("Box", "/")],
        );
        let b = id(&tree, "Box");
        tree.set_message_count_all("Box", 3u32).unwrap();
        tree.set_message_count_unread("Box", 0u32).unwrap();
        tree.assign_system_label(SystemRole::Drafts, "Box");
        assert_eq!(tree.printable_unread_count(b), "3");

        tree.assign_system_label(SystemRole::Drafts, "");
        tree.assign_system_label(SystemRole::Trash, "Box");
        tree.set_message_count_unread("Box", 2u32).unwrap();
        assert_eq!(tree.printable_unread_count(b), "");
        assert!(!tree.has_unread_messages(b));
    }

    #[test]
    fn unread_descendants_bubble_up() {
        let mut tree = work_tree(false);
        let work = id(&tree, "Work");
        assert!(!tree.has_unread_subscribed_descendant(work));
        tree.set_message_count_all("Work/Urgent", 5u32).unwrap();
        tree.set_message_count_unread("Work/Urgent", 1u32).unwrap();
        assert!(tree.has_unread_messages(id(&tree, "Work/Urgent")));
        assert!(tree.has_unread_subscribed_descendant(work));
    }

    #[test]
    fn delete_eligibility_tracks_children() {
        let mut tree = work_tree(true);
        let work = id(&tree, "Work");
        assert!(!tree.can_be_deleted(work));

        tree.arm_delete(Some("Work/Urgent")).unwrap();
        tree.delete_label("Work/Urgent").unwrap();
        assert!(tree.can_be_deleted(work));
        assert!(!tree.can_be_deleted(id(&tree, "INBOX")));
    }

    #[test]
    fn edit_and_subscribe_eligibility() {
        let mut tree = work_tree(false);
        let work = id(&tree, "Work");
        let urgent = id(&tree, "Work/Urgent");
        let inbox = id(&tree, "INBOX");
        assert!(!tree.can_be_edited(work));
        assert!(tree.can_be_edited(urgent));
        assert!(!tree.can_be_edited(inbox));
        assert!(!tree.can_be_subscribed(work));
        assert!(tree.can_be_subscribed(urgent));
        assert!(!tree.can_be_checked(inbox));
        assert!(tree.selectable_for_label_list(urgent));

        tree.assign_system_label(SystemRole::Spam, "Work/Urgent");
        assert!(!tree.can_be_edited(urgent));
        assert!(!tree.can_be_checked(urgent));
    }

    #[test]
    fn local_and_manage_names() {
        let mut tree = LabelTree::from_descriptors(
            TreeContext::default(),
            &[descriptor("INBOX", "/"), descriptor("Junk", "/"), descriptor("Sent", "/")],
        );
        let inbox = id(&tree, "INBOX");
        let junk = id(&tree, "Junk");
        let sent = id(&tree, "Sent");
        assert_eq!(tree.local_name(junk), "Junk");
        assert_eq!(tree.manage_system_name(junk), "");

        tree.assign_system_label(SystemRole::Spam, "Junk");
        tree.assign_system_label(SystemRole::Sent, "Sent");
        assert_eq!(tree.local_name(junk), "Spam");
        assert_eq!(tree.manage_system_name(junk), "(Spam)");
        assert_eq!(tree.manage_system_name(sent), "");
        assert_eq!(tree.local_name(inbox), "Inbox");
        assert_eq!(tree.manage_system_name(inbox), "");
    }

    #[test]
    fn single_inbox_root_detection() {
        let mut tree = LabelTree::from_descriptors(
            TreeContext::default(),
            &[descriptor("INBOX", "/"), descriptor("Notes", "/")],
        );
        assert!(!tree.has_single_inbox_root());
        tree.set_subscribed("Notes", false).unwrap();
        assert!(tree.has_single_inbox_root());
    }

    #[test]
    fn flags_snapshot_matches_individual_reads() {
        let tree = work_tree(false);
        let work = id(&tree, "Work");
        let flags = tree.flags(work).unwrap();
        assert!(flags.visible);
        assert!(!flags.hidden);
        assert!(!flags.is_system);
        assert_eq!(flags.local_name, "Work");
        assert_eq!(flags.collapse_marker, CollapseMarker::Collapsed);
    }
}
