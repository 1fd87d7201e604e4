/// Structural shapes of the host document and the decorations written onto it.
use super::{NodeId, Tree};

// Host document anchors and classes.
pub const CONTENT_ROOT_ID: &str = "content";
pub const PANEL_CONTAINER_ID: &str = "board";

pub const PLACEHOLDER: &str = "placeholder";
pub const PANEL_WRAPPER: &str = "list-wrapper";
pub const ADD_PANEL: &str = "js-add-list";
pub const PANEL: &str = "js-list-content";
pub const PANEL_LIST: &str = "list";
pub const PANEL_HEADER: &str = "list-header";
pub const PANEL_HEADER_EXTRAS: &str = "list-header-extras";
pub const PANEL_TITLE_ASSIST: &str = "list-header-name-assist";
pub const PANEL_CARDS: &str = "list-cards";
pub const CARD_COMPOSER: &str = "card-composer";
pub const ITEM: &str = "list-card";
pub const ITEM_DETAILS: &str = "list-card-details";
pub const ITEM_TITLE: &str = "list-card-title";
pub const ITEM_SHORT_ID: &str = "card-short-id";
pub const ITEM_MEMBERS: &str = "list-card-members";
pub const MEMBER: &str = "member";
pub const BADGES: &str = "badges";
pub const BADGE: &str = "badge";
pub const BADGE_TEXT: &str = "badge-text";
pub const CUSTOM_BADGE_ROW: &str = "custom-field-front-badges";
pub const CARD_LABEL: &str = "card-label";
pub const COVER_IMAGE: &str = "list-card-cover";
pub const DRAG_HELPER: &str = "ui-sortable-helper";

// Decorations written by the engine.
pub const FOLD_BUTTON: &str = "has-fold-button";
pub const LIST_COLLAPSED: &str = "list-collapsed";
pub const ATTR_COLLAPSED_TITLE: &str = "data-collapsed-title";
pub const ATTR_WIP_TITLE: &str = "data-wip-title";
pub const WIP_REACHED: &str = "wip-limit-reached";
pub const WIP_EXCEEDED: &str = "wip-limit-exceeded";
pub const COLLAPSED_REACHED: &str = "collapsed-limit-reached";
pub const COLLAPSED_EXCEEDED: &str = "collapsed-limit-exceeded";
pub const SUB_LIST: &str = "sub-list";
pub const ATTR_SUB_LIST: &str = "data-sub-list";
pub const SUPER_LIST: &str = "super-list";
pub const SUPER_LIST_COLLAPSED: &str = "super-list-collapsed";
pub const ATTR_SUPER_TITLE: &str = "data-super-list-title";
pub const ATTR_SUPER_WIDTH: &str = "data-super-list-width";
pub const SUPER_REACHED: &str = "super-limit-reached";
pub const SUPER_EXCEEDED: &str = "super-limit-exceeded";
pub const SECTION_CARD: &str = "section-card";
pub const ATTR_SECTION_TITLE: &str = "data-section-title";
pub const ATTR_SECTION_STATE: &str = "data-section-state";
pub const SECTION_EXPANDED: &str = "expanded";
pub const SECTION_COLLAPSED: &str = "collapsed";
pub const COMMENT_CARD: &str = "comment-card";
pub const BLOCKED_CARD: &str = "blocked-card";
pub const BLOCKED_TITLE: &str = "blocked-title";
pub const ATTR_COMPACT_MODE: &str = "data-compact-mode";

fn is(tree: &Tree, node: NodeId, tag: &str, class: &str) -> bool {
    tree.tag(node) == tag && tree.has_class(node, class)
}

/// Drop-position marker shown while a panel is dragged.
pub fn is_placeholder(tree: &Tree, node: NodeId) -> bool {
    is(tree, node, "div", PLACEHOLDER)
}

pub fn is_panel_wrapper(tree: &Tree, node: NodeId) -> bool {
    tree.has_class(node, PANEL_WRAPPER)
}

pub fn is_panel(tree: &Tree, node: NodeId) -> bool {
    is(tree, node, "div", PANEL)
}

pub fn is_item(tree: &Tree, node: NodeId) -> bool {
    is(tree, node, "a", ITEM)
}

/// An item being dragged leaves a placeholder item behind.
pub fn is_placeholder_item(tree: &Tree, node: NodeId) -> bool {
    is_item(tree, node) && tree.has_class(node, PLACEHOLDER)
}

pub fn is_item_title(tree: &Tree, node: NodeId) -> bool {
    is(tree, node, "span", ITEM_TITLE)
}

pub fn is_member(tree: &Tree, node: NodeId) -> bool {
    tree.has_class(node, MEMBER)
}

pub fn is_custom_badge_row(tree: &Tree, node: NodeId) -> bool {
    tree.has_class(node, CUSTOM_BADGE_ROW)
}

pub fn is_panel_title_assist(tree: &Tree, node: NodeId) -> bool {
    tree.has_class(node, PANEL_TITLE_ASSIST)
}

pub fn is_cover_image(tree: &Tree, node: NodeId) -> bool {
    tree.has_class(node, COVER_IMAGE)
}

pub fn is_card_composer(tree: &Tree, node: NodeId) -> bool {
    is(tree, node, "div", CARD_COMPOSER)
}

pub fn is_badge_text(tree: &Tree, node: NodeId) -> bool {
    is(tree, node, "span", BADGE_TEXT)
}

pub fn is_card_label(tree: &Tree, node: NodeId) -> bool {
    is(tree, node, "span", CARD_LABEL)
}

pub fn is_drag_helper(tree: &Tree, node: NodeId) -> bool {
    tree.has_class(node, DRAG_HELPER)
}
