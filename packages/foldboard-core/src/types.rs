use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Position of a panel inside a SuperPanel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeRole {
    #[default]
    None,
    Left,
    Right,
}

impl MergeRole {
    pub fn as_marker(self) -> Option<&'static str> {
        match self {
            MergeRole::None => None,
            MergeRole::Left => Some("left"),
            MergeRole::Right => Some("right"),
        }
    }

    pub fn from_marker(marker: Option<&str>) -> Self {
        match marker {
            Some("left") => MergeRole::Left,
            Some("right") => MergeRole::Right,
            _ => MergeRole::None,
        }
    }

    pub fn is_merged(self) -> bool {
        self != MergeRole::None
    }
}

/// Work-in-progress status of a panel relative to its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WipStatus {
    #[default]
    Neutral,
    Reached,
    Exceeded,
}

/// `Reached` when the count equals the limit, `Exceeded` above it.
pub fn wip_status(count: usize, limit: Option<u32>) -> WipStatus {
    match limit {
        Some(limit) if count == limit as usize => WipStatus::Reached,
        Some(limit) if count > limit as usize => WipStatus::Exceeded,
        _ => WipStatus::Neutral,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FoldState {
    #[default]
    Expanded,
    Collapsed,
}

/// Derived classification of an item from its title and badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemKind {
    Ordinary,
    SectionHeader,
    Comment,
    Blocked,
}

/// Display title of a panel with its optional count badge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WipTitle {
    pub title: String,
    pub count: usize,
    pub limit: Option<u32>,
    pub always_count: bool,
}

impl WipTitle {
    pub fn status(&self) -> WipStatus {
        wip_status(self.count, self.limit)
    }
}

impl fmt::Display for WipTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.limit {
            Some(limit) => write!(f, "{} {} / {}", self.title, self.count, limit),
            None if self.always_count => write!(f, "{} {}", self.title, self.count),
            None => write!(f, "{}", self.title),
        }
    }
}

/// Read-only view of one item as the engine sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSnapshot {
    pub title: Option<String>,
    pub kind: ItemKind,
    pub labels: Vec<String>,
    pub fields: BTreeMap<String, String>,
    pub hidden: bool,
}

/// Read-only view of one panel and its derived state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelSnapshot {
    pub name: String,
    pub position: usize,
    pub wip_limit: Option<u32>,
    pub work_items: usize,
    pub wip_status: WipStatus,
    pub fold: FoldState,
    pub merge_role: MergeRole,
    pub items: Vec<ItemSnapshot>,
}
