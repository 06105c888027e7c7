use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::warn;

use crate::error::LabelError;

/// Tag the server puts on every label descriptor.
pub const LABEL_OBJECT_TAG: &str = "Object/Label";

/// Separator used when presenting a label path to the user.
pub const DISPLAY_SEPARATOR: &str = " / ";

/// Role a label plays in the mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LabelKind {
    #[default]
    User,
    Inbox,
    Sent,
    Drafts,
    Spam,
    Trash,
    Archive,
}

impl LabelKind {
    pub fn is_system(self) -> bool {
        self != LabelKind::User
    }
}

impl fmt::Display for LabelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LabelKind::User => "user",
            LabelKind::Inbox => "inbox",
            LabelKind::Sent => "sent",
            LabelKind::Drafts => "drafts",
            LabelKind::Spam => "spam",
            LabelKind::Trash => "trash",
            LabelKind::Archive => "archive",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Server descriptor
// ---------------------------------------------------------------------------

/// A label as the server describes it. Every field is optional on the wire;
/// [`Label::from_descriptor`] decides whether enough of it is present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LabelDescriptor {
    #[serde(rename = "@Object")]
    pub object: Option<String>,
    pub name: Option<String>,
    pub delimiter: Option<String>,
    pub full_name: Option<String>,
    pub full_name_raw: Option<String>,
    pub full_name_hash: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub is_selectable: bool,
    #[serde(default)]
    pub is_exists: bool,
    #[serde(default)]
    pub is_subscribed: bool,
    #[serde(default)]
    pub checkable: bool,
    #[serde(default, deserialize_with = "lenient_list")]
    pub sub_labels: Vec<LabelDescriptor>,
}

impl LabelDescriptor {
    /// Parse a JSON snapshot holding either one descriptor or a list of them.
    ///
    /// List entries (and nested `SubLabels` entries) that do not decode are
    /// logged and dropped; their siblings are kept.
    pub fn parse_snapshot(json: &str) -> Result<Vec<LabelDescriptor>, LabelError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| LabelError::Malformed(e.to_string()))?;
        match value {
            Value::Array(_) => Ok(descriptors_from_value(value)),
            Value::Object(_) => serde_json::from_value(value)
                .map(|desc| vec![desc])
                .map_err(|e| LabelError::Malformed(e.to_string())),
            other => Err(LabelError::Malformed(format!(
                "expected a descriptor or a list of them, got {}",
                other
            ))),
        }
    }
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<LabelDescriptor>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(descriptors_from_value(value))
}

/// Decode each element on its own, skipping the ones that fail.
fn descriptors_from_value(value: Value) -> Vec<LabelDescriptor> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(desc) => Some(desc),
                Err(e) => {
                    warn!(error = %e, "skipping malformed label descriptor");
                    None
                }
            })
            .collect(),
        Value::Null => Vec::new(),
        other => {
            warn!(value = %other, "expected a list of label descriptors");
            Vec::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Count inputs
// ---------------------------------------------------------------------------

/// Anything a collaborator may hand to a count setter. Only non-negative
/// integers (or strings made only of digits) are accepted.
pub trait CountValue {
    fn to_count(&self) -> Option<u32>;
}

impl CountValue for u32 {
    fn to_count(&self) -> Option<u32> {
        Some(*self)
    }
}

impl CountValue for u64 {
    fn to_count(&self) -> Option<u32> {
        u32::try_from(*self).ok()
    }
}

impl CountValue for i32 {
    fn to_count(&self) -> Option<u32> {
        u32::try_from(*self).ok()
    }
}

impl CountValue for i64 {
    fn to_count(&self) -> Option<u32> {
        u32::try_from(*self).ok()
    }
}

impl CountValue for &str {
    fn to_count(&self) -> Option<u32> {
        let s = self.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse().ok()
    }
}

impl CountValue for &serde_json::Value {
    fn to_count(&self) -> Option<u32> {
        match self {
            serde_json::Value::Number(n) => n.as_u64().and_then(|n| n.to_count()),
            serde_json::Value::String(s) => s.as_str().to_count(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Label
// ---------------------------------------------------------------------------

/// One node of the label tree. Structure (parent/children) lives in
/// [`crate::tree::LabelTree`]; this holds the node's own state.
#[derive(Debug, Clone)]
pub struct Label {
    name: String,
    full_name: String,
    full_name_raw: String,
    full_name_hash: String,
    delimiter: String,
    namespace: String,
    depth: usize,

    pub(crate) kind: LabelKind,
    selectable: bool,
    exists: bool,
    pub(crate) subscribed: bool,
    pub(crate) checkable: bool,

    pub(crate) message_count_all: u32,
    pub(crate) message_count_unread: u32,
    pub(crate) last_polled_at: i64,

    pub(crate) collapsed: bool,
    pub(crate) selected: bool,
    pub(crate) focused: bool,
    pub(crate) edited: bool,
    pub(crate) delete_access: bool,
    name_for_edit: String,
}

impl Label {
    /// Build a label from a server descriptor. Nothing is produced unless the
    /// descriptor is tagged as a label and carries name, delimiter, both full
    /// paths and the path hash. `sub_labels` are not looked at here.
    pub fn from_descriptor(desc: &LabelDescriptor, inbox_name: &str) -> Result<Self, LabelError> {
        if desc.object.as_deref() != Some(LABEL_OBJECT_TAG) {
            return Err(LabelError::NotALabel(desc.object.clone()));
        }
        let name = desc.name.clone().ok_or(LabelError::MissingField("Name"))?;
        let delimiter = desc
            .delimiter
            .clone()
            .ok_or(LabelError::MissingField("Delimiter"))?;
        let full_name = desc
            .full_name
            .clone()
            .ok_or(LabelError::MissingField("FullName"))?;
        let full_name_raw = desc
            .full_name_raw
            .clone()
            .ok_or(LabelError::MissingField("FullNameRaw"))?;
        let full_name_hash = desc
            .full_name_hash
            .clone()
            .ok_or(LabelError::MissingField("FullNameHash"))?;

        let kind = if full_name_raw == inbox_name {
            LabelKind::Inbox
        } else {
            LabelKind::User
        };

        Ok(Self {
            depth: path_depth(&full_name_raw, &delimiter),
            name_for_edit: name.clone(),
            name,
            full_name,
            full_name_raw,
            full_name_hash,
            delimiter,
            namespace: desc.namespace.clone().unwrap_or_default(),
            kind,
            selectable: desc.is_selectable,
            exists: desc.is_exists,
            subscribed: desc.is_subscribed,
            checkable: desc.checkable,
            message_count_all: 0,
            message_count_unread: 0,
            last_polled_at: 0,
            collapsed: true,
            selected: false,
            focused: false,
            edited: false,
            delete_access: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn full_name_raw(&self) -> &str {
        &self.full_name_raw
    }

    pub fn full_name_hash(&self) -> &str {
        &self.full_name_hash
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Number of delimiters in the raw path.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn kind(&self) -> LabelKind {
        self.kind
    }

    pub fn is_selectable(&self) -> bool {
        self.selectable
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn is_checkable(&self) -> bool {
        self.checkable
    }

    pub fn message_count_all(&self) -> u32 {
        self.message_count_all
    }

    pub fn message_count_unread(&self) -> u32 {
        self.message_count_unread
    }

    /// Unix seconds of the last scheduled refresh, 0 if never.
    pub fn last_polled_at(&self) -> i64 {
        self.last_polled_at
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_edited(&self) -> bool {
        self.edited
    }

    pub fn has_delete_access(&self) -> bool {
        self.delete_access
    }

    pub fn name_for_edit(&self) -> &str {
        &self.name_for_edit
    }

    /// Full display path with the delimiter replaced by " / ".
    pub fn printable_full_name(&self) -> String {
        if self.delimiter.is_empty() {
            return self.full_name.clone();
        }
        self.full_name
            .split(self.delimiter.as_str())
            .collect::<Vec<_>>()
            .join(DISPLAY_SEPARATOR)
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name_for_edit = name.clone();
        self.name = name;
    }

    pub(crate) fn set_name_for_edit(&mut self, text: &str) {
        self.name_for_edit = text.to_string();
    }

    pub(crate) fn set_edited(&mut self, edited: bool) {
        if edited {
            self.name_for_edit = self.name.clone();
        }
        self.edited = edited;
    }
}

fn path_depth(full_name_raw: &str, delimiter: &str) -> usize {
    if delimiter.is_empty() {
        0
    } else {
        full_name_raw.split(delimiter).count() - 1
    }
}

/// Descriptor for a selectable, existing, subscribed label at `full_name_raw`.
#[cfg(test)]
pub(crate) fn descriptor(full_name_raw: &str, delimiter: &str) -> LabelDescriptor {
    let name = full_name_raw
        .rsplit(delimiter)
        .next()
        .unwrap_or(full_name_raw)
        .to_string();
    LabelDescriptor {
        object: Some(LABEL_OBJECT_TAG.to_string()),
        name: Some(name),
        delimiter: Some(delimiter.to_string()),
        full_name: Some(full_name_raw.to_string()),
        full_name_raw: Some(full_name_raw.to_string()),
        full_name_hash: Some(format!("hash:{}", full_name_raw)),
        namespace: None,
        is_selectable: true,
        is_exists: true,
        is_subscribed: true,
        checkable: false,
        sub_labels: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
