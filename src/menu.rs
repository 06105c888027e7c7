//! Flat, indented label lists for pickers (move-to, filters, new-label parent).

use crate::tree::{LabelId, LabelTree};

const INDENT: &str = "  ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelOption {
    /// Raw path the option stands for.
    pub value: String,
    pub display: String,
    pub disabled: bool,
    pub system: bool,
}

impl LabelTree {
    /// System labels first, in role order, then the visible user labels
    /// depth-first, indented by nesting level. Options for paths in `exclude`
    /// and for unselectable labels are disabled.
    pub fn label_options(&self, exclude: &[&str]) -> Vec<LabelOption> {
        let mut out: Vec<LabelOption> = self
            .system_labels()
            .into_iter()
            .filter_map(|label| self.id_of(label.full_name_raw()))
            .map(|id| {
                let label = self.get(id);
                let value = label.map(|l| l.full_name_raw().to_string()).unwrap_or_default();
                LabelOption {
                    disabled: exclude.contains(&value.as_str())
                        || !label.is_some_and(|l| l.is_selectable()),
                    display: self.local_name(id),
                    value,
                    system: true,
                }
            })
            .collect();

        for &root in self.roots() {
            self.push_user_options(root, 0, exclude, &mut out);
        }
        out
    }

    /// Every label, system ones included and tagged with their role, for
    /// choosing the parent of a new label. With a namespace configured, labels
    /// outside it are disabled.
    pub fn parent_options(&self) -> Vec<LabelOption> {
        let namespace = self.context().namespace.as_str();
        let mut out = vec![LabelOption {
            value: String::new(),
            display: String::new(),
            disabled: false,
            system: false,
        }];

        let mut stack: Vec<(LabelId, usize)> = self.roots().iter().rev().map(|&id| (id, 0)).collect();
        let mut seen = std::collections::HashSet::new();
        while let Some((id, level)) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(label) = self.get(id) else {
                continue;
            };
            let suffix = self.manage_system_name(id);
            let name = if suffix.is_empty() {
                label.name().to_string()
            } else {
                format!("{} {}", label.name(), suffix)
            };
            out.push(LabelOption {
                value: label.full_name_raw().to_string(),
                display: format!("{}{}", INDENT.repeat(level), name),
                disabled: !label.is_selectable()
                    || (!namespace.is_empty() && !label.full_name_raw().starts_with(namespace)),
                system: label.kind().is_system(),
            });
            stack.extend(self.children(id).iter().rev().map(|&c| (c, level + 1)));
        }
        out
    }

    fn push_user_options(&self, id: LabelId, level: usize, exclude: &[&str], out: &mut Vec<LabelOption>) {
        let Some(label) = self.get(id) else {
            return;
        };
        // Guards against a malformed tree; real nesting is never this deep.
        if level > self.len() {
            return;
        }
        if !self.is_system_label(id) && self.visible(id) {
            let value = label.full_name_raw().to_string();
            out.push(LabelOption {
                disabled: exclude.contains(&value.as_str()) || !label.is_selectable(),
                display: format!("{}{}", INDENT.repeat(level), label.name()),
                value,
                system: false,
            });
        }
        for &child in self.children(id) {
            self.push_user_options(child, level + 1, exclude, out);
        }
    }
}
