/// Board construction and host-side edits.
///
/// These helpers perform the same child-list operations the host page does
/// when a user drags panels, edits titles or a sync lands, so the mutation
/// journal they leave behind has the shapes the watcher classifies.
use super::shape::*;
use super::{NodeId, Tree, TreeError};

#[derive(Debug, Clone)]
pub struct BoardBuilder {
    location: String,
    panels: Vec<(String, Vec<String>)>,
}

impl BoardBuilder {
    pub fn new(location: &str) -> Self {
        Self {
            location: location.to_string(),
            panels: Vec::new(),
        }
    }

    pub fn panel(mut self, name: &str, items: &[&str]) -> Self {
        self.panels.push((
            name.to_string(),
            items.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// A fresh document holding the content root and this board, journal empty.
    pub fn build(&self) -> Result<Tree, TreeError> {
        let mut tree = empty_document(&self.location)?;
        let content = content(&tree)?;
        let board = self.create_board(&mut tree)?;
        tree.append_child(content, board)?;
        tree.take_records();
        Ok(tree)
    }

    /// Detached panel container with every panel and the add-panel slot.
    pub fn create_board(&self, tree: &mut Tree) -> Result<NodeId, TreeError> {
        let board = tree.create_element("div", &[]);
        tree.set_attr(board, "id", PANEL_CONTAINER_ID);
        for (name, items) in &self.panels {
            let items: Vec<&str> = items.iter().map(String::as_str).collect();
            let wrapper = create_panel(tree, name, &items)?;
            tree.append_child(board, wrapper)?;
        }
        let add = tree.create_element("div", &[PANEL_WRAPPER, ADD_PANEL]);
        tree.append_child(board, add)?;
        Ok(board)
    }
}

/// Document with only the content root, as seen before the board renders.
pub fn empty_document(location: &str) -> Result<Tree, TreeError> {
    let mut tree = Tree::new(location);
    let content = tree.create_element("div", &[]);
    tree.set_attr(content, "id", CONTENT_ROOT_ID);
    let doc = tree.document();
    tree.append_child(doc, content)?;
    tree.take_records();
    Ok(tree)
}

/// Render the board into an empty content root.
pub fn mount_board(tree: &mut Tree, builder: &BoardBuilder) -> Result<NodeId, TreeError> {
    let content = content(tree)?;
    let board = builder.create_board(tree)?;
    tree.append_child(content, board)?;
    Ok(board)
}

/// Navigate to another board: the content root's children are swapped at once.
pub fn replace_board(tree: &mut Tree, builder: &BoardBuilder) -> Result<NodeId, TreeError> {
    let content = content(tree)?;
    tree.set_location(builder.location());
    let board = builder.create_board(tree)?;
    tree.replace_children(content, vec![board])?;
    Ok(board)
}

fn content(tree: &Tree) -> Result<NodeId, TreeError> {
    tree.content_root()
        .ok_or_else(|| TreeError::NotFound(CONTENT_ROOT_ID.to_string()))
}

/// Detached panel wrapper.
pub fn create_panel(tree: &mut Tree, name: &str, items: &[&str]) -> Result<NodeId, TreeError> {
    let wrapper = tree.create_element("div", &[PANEL_WRAPPER]);
    let panel = tree.create_element("div", &[PANEL_LIST, PANEL]);
    let header = tree.create_element("div", &[PANEL_HEADER]);
    let title = tree.create_element("h2", &[PANEL_TITLE_ASSIST]);
    let text = tree.create_text(name);
    let extras = tree.create_element("div", &[PANEL_HEADER_EXTRAS]);
    let cards = tree.create_element("div", &[PANEL_CARDS]);
    let composer = tree.create_element("div", &[CARD_COMPOSER]);

    tree.append_child(title, text)?;
    tree.append_child(header, title)?;
    tree.append_child(header, extras)?;
    for item in items {
        let item = create_item(tree, item)?;
        tree.append_child(cards, item)?;
    }
    tree.append_child(cards, composer)?;
    tree.append_child(panel, header)?;
    tree.append_child(panel, cards)?;
    tree.append_child(wrapper, panel)?;
    Ok(wrapper)
}

/// Detached item with its title, short id, badge rows and member row.
pub fn create_item(tree: &mut Tree, title: &str) -> Result<NodeId, TreeError> {
    let item = tree.create_element("a", &[ITEM]);
    let details = tree.create_element("div", &[ITEM_DETAILS]);
    let title_span = tree.create_element("span", &[ITEM_TITLE]);
    let (short_id, text) = title_nodes(tree, item, title)?;
    let badges = tree.create_element("div", &[BADGES]);
    let custom = tree.create_element("div", &[CUSTOM_BADGE_ROW]);
    let members = tree.create_element("div", &[ITEM_MEMBERS]);

    tree.append_child(title_span, short_id)?;
    tree.append_child(title_span, text)?;
    tree.append_child(details, title_span)?;
    tree.append_child(details, badges)?;
    tree.append_child(details, custom)?;
    tree.append_child(details, members)?;
    tree.append_child(item, details)?;
    Ok(item)
}

fn title_nodes(tree: &mut Tree, item: NodeId, title: &str) -> Result<(NodeId, NodeId), TreeError> {
    let short_id = tree.create_element("span", &[ITEM_SHORT_ID]);
    let id_text = tree.create_text(&format!("#{}", item.index()));
    tree.append_child(short_id, id_text)?;
    let text = tree.create_text(title);
    Ok((short_id, text))
}

fn find_class(tree: &Tree, node: NodeId, class: &str) -> Result<NodeId, TreeError> {
    tree.find_first(node, |t, n| t.has_class(n, class))
        .ok_or_else(|| TreeError::NotFound(format!("{} in node {}", class, node.index())))
}

// ── Item edits ─────────────────────────────────────────────────────────

pub fn add_item(tree: &mut Tree, panel: NodeId, title: &str) -> Result<NodeId, TreeError> {
    let count = tree.items_in_panel(panel).len();
    insert_item_at(tree, panel, count, title)
}

/// Insert a new item at `index` among the panel's items.
pub fn insert_item_at(
    tree: &mut Tree,
    panel: NodeId,
    index: usize,
    title: &str,
) -> Result<NodeId, TreeError> {
    let cards = find_class(tree, panel, PANEL_CARDS)?;
    let reference = tree
        .items_in_panel(panel)
        .get(index)
        .copied()
        .or_else(|| tree.find_first(cards, is_card_composer));
    let item = create_item(tree, title)?;
    tree.insert_before(cards, item, reference)?;
    Ok(item)
}

pub fn remove_item(tree: &mut Tree, item: NodeId) -> Result<(), TreeError> {
    let parent = tree
        .parent(item)
        .ok_or_else(|| TreeError::NotFound(format!("parent of item {}", item.index())))?;
    tree.remove_child(parent, item)
}

/// Move an item to position `index` of `panel`.
pub fn move_item(
    tree: &mut Tree,
    item: NodeId,
    panel: NodeId,
    index: usize,
) -> Result<(), TreeError> {
    remove_item(tree, item)?;
    let cards = find_class(tree, panel, PANEL_CARDS)?;
    let reference = tree
        .items_in_panel(panel)
        .get(index)
        .copied()
        .or_else(|| tree.find_first(cards, is_card_composer));
    tree.insert_before(cards, item, reference)?;
    Ok(())
}

/// In-place title edit: the title element's short id and text are re-rendered together.
pub fn edit_item_title(tree: &mut Tree, item: NodeId, title: &str) -> Result<(), TreeError> {
    let span = find_class(tree, item, ITEM_TITLE)?;
    let (short_id, text) = title_nodes(tree, item, title)?;
    tree.replace_children(span, vec![short_id, text])?;
    Ok(())
}

pub fn add_member(tree: &mut Tree, item: NodeId) -> Result<NodeId, TreeError> {
    let row = find_class(tree, item, ITEM_MEMBERS)?;
    let member = tree.create_element("div", &[MEMBER]);
    tree.append_child(row, member)?;
    Ok(member)
}

pub fn remove_member(tree: &mut Tree, member: NodeId) -> Result<(), TreeError> {
    remove_item(tree, member)
}

/// Custom-field badge on an item, e.g. `"Owner: kim"` or `"Blocked"`.
pub fn add_badge(tree: &mut Tree, item: NodeId, text: &str) -> Result<NodeId, TreeError> {
    let row = find_class(tree, item, CUSTOM_BADGE_ROW)?;
    let badge = tree.create_element("span", &[BADGE]);
    let label = tree.create_element("span", &[BADGE_TEXT]);
    let text = tree.create_text(text);
    tree.append_child(label, text)?;
    tree.append_child(badge, label)?;
    tree.append_child(row, badge)?;
    Ok(badge)
}

pub fn add_label(
    tree: &mut Tree,
    item: NodeId,
    name: &str,
    color: &str,
) -> Result<NodeId, TreeError> {
    let details = find_class(tree, item, ITEM_DETAILS)?;
    let label = tree.create_element("span", &[CARD_LABEL]);
    tree.set_attr(label, "title", name);
    tree.set_attr(label, "data-color", color);
    let first = tree.children(details).first().copied();
    tree.insert_before(details, label, first)?;
    Ok(label)
}

/// Cover image loaded above the item details.
pub fn add_cover(tree: &mut Tree, item: NodeId) -> Result<NodeId, TreeError> {
    let cover = tree.create_element("div", &[COVER_IMAGE]);
    let first = tree.children(item).first().copied();
    tree.insert_before(item, cover, first)?;
    Ok(cover)
}

// ── Panel edits ────────────────────────────────────────────────────────

pub fn rename_panel(tree: &mut Tree, panel: NodeId, name: &str) -> Result<(), TreeError> {
    let title = find_class(tree, panel, PANEL_TITLE_ASSIST)?;
    let text = tree.create_text(name);
    tree.replace_children(title, vec![text])?;
    Ok(())
}

/// New panel inserted before `before`, or at the end of the board.
pub fn add_panel(
    tree: &mut Tree,
    name: &str,
    items: &[&str],
    before: Option<NodeId>,
) -> Result<NodeId, TreeError> {
    let container = tree
        .panel_container()
        .ok_or_else(|| TreeError::NotFound(PANEL_CONTAINER_ID.to_string()))?;
    let reference = before.or_else(|| {
        tree.children(container)
            .iter()
            .copied()
            .find(|&n| tree.has_class(n, ADD_PANEL))
    });
    let wrapper = create_panel(tree, name, items)?;
    tree.insert_before(container, wrapper, reference)?;
    Ok(wrapper)
}

pub fn remove_panel(tree: &mut Tree, wrapper: NodeId) -> Result<(), TreeError> {
    remove_item(tree, wrapper)
}

/// Pick up a panel: it becomes the drag helper and a placeholder opens behind it.
pub fn start_panel_drag(tree: &mut Tree, wrapper: NodeId) -> Result<NodeId, TreeError> {
    let container = tree
        .parent(wrapper)
        .ok_or_else(|| TreeError::NotFound(format!("parent of panel {}", wrapper.index())))?;
    tree.add_class(wrapper, DRAG_HELPER);
    let placeholder = tree.create_element("div", &[PLACEHOLDER]);
    let next = tree.next_sibling(wrapper);
    tree.insert_before(container, placeholder, next)?;
    Ok(placeholder)
}

/// Move the placeholder in front of `before` while dragging.
pub fn move_placeholder(
    tree: &mut Tree,
    placeholder: NodeId,
    before: NodeId,
) -> Result<(), TreeError> {
    let container = tree
        .parent(placeholder)
        .ok_or_else(|| TreeError::NotFound("drag placeholder".to_string()))?;
    tree.insert_before(container, placeholder, Some(before))?;
    Ok(())
}

/// Drop the dragged panel where the placeholder is.
pub fn drop_panel(tree: &mut Tree, wrapper: NodeId, placeholder: NodeId) -> Result<(), TreeError> {
    let container = tree
        .parent(placeholder)
        .ok_or_else(|| TreeError::NotFound("drag placeholder".to_string()))?;
    tree.insert_before(container, wrapper, Some(placeholder))?;
    tree.remove_child(container, placeholder)?;
    tree.remove_class(wrapper, DRAG_HELPER);
    Ok(())
}
