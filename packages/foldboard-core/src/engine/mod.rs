/// Panel state engine.
///
/// Reacts to domain events by re-deriving folding, merging, section and WIP
/// state from the live tree and writing it back as decorations (classes,
/// attributes, visibility, widths). Every handler is idempotent: the same
/// event delivered twice, or a full `setup_board` over an already set up
/// board, leaves the tree as a single delivery would.
pub mod cards;
pub mod fold;
pub mod frame;
pub mod merge;
pub mod section;
pub mod wip;

use std::rc::Rc;

use serde_json::Value;

pub use frame::{FrameScheduler, FrameTask, HostFrames, InlineFrames};

use crate::config::{Settings, DEFAULT_LIST_WIDTH};
use crate::events::DomainEvent;
use crate::parser::{self, SectionMarker};
use crate::storage::{KeyValueStore, SettingKey, ViewStateStore};
use crate::tree::shape;
use crate::tree::{IdentityScheme, NodeId, TitleIdentity, Tree, TreeError};
use crate::types::{FoldState, ItemKind, ItemSnapshot, MergeRole, PanelSnapshot, WipStatus};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("No board is active")]
    BoardNotSet,

    #[error("Panel {0} is merged and folds together with its SuperPanel")]
    NotFoldable(String),

    #[error("Panel {0} is not part of a SuperPanel")]
    NotMerged(String),
}

pub struct PanelStateEngine {
    settings: Settings,
    marker: SectionMarker,
    identity: Box<dyn IdentityScheme>,
    view_state: ViewStateStore,
    compact_mode: bool,
    frames: Box<dyn FrameScheduler>,
}

impl PanelStateEngine {
    pub fn new(
        settings: Settings,
        store: Rc<dyn KeyValueStore>,
        frames: Box<dyn FrameScheduler>,
    ) -> Self {
        let settings = settings.validated();
        Self {
            marker: SectionMarker::from_settings(&settings),
            settings,
            identity: Box::new(TitleIdentity),
            view_state: ViewStateStore::new(store),
            compact_mode: false,
            frames,
        }
    }

    /// Key panels and sections by something other than their titles.
    pub fn with_identity(mut self, identity: Box<dyn IdentityScheme>) -> Self {
        self.identity = identity;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        let settings = settings.validated();
        self.marker = SectionMarker::from_settings(&settings);
        self.settings = settings;
    }

    pub fn marker(&self) -> &SectionMarker {
        &self.marker
    }

    pub fn board_id(&self) -> Option<&str> {
        self.view_state.board_id()
    }

    pub fn view_state(&self) -> &ViewStateStore {
        &self.view_state
    }

    pub fn compact_mode(&self) -> bool {
        self.compact_mode
    }

    /// Nominal width of an expanded panel.
    pub fn list_width(&self) -> u32 {
        if self.compact_mode {
            self.settings.compact_list_width
        } else {
            DEFAULT_LIST_WIDTH
        }
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.pending()
    }

    /// React to one event, then run the deferred writes that are ready.
    pub fn handle(&mut self, tree: &mut Tree, event: &DomainEvent) -> Result<(), EngineError> {
        let result = self.dispatch(tree, event);
        self.settle(tree);
        result
    }

    fn dispatch(&mut self, tree: &mut Tree, event: &DomainEvent) -> Result<(), EngineError> {
        match event {
            DomainEvent::BoardChanged { .. } => self.board_changed(tree),
            DomainEvent::CardAdded(card) => {
                self.format_card(tree, *card);
                Ok(())
            }
            DomainEvent::CardModified {
                card,
                title,
                old_title,
            } => self.card_modified(tree, *card, title, old_title),
            DomainEvent::ListAdded(wrapper) => self.list_added(tree, *wrapper),
            DomainEvent::ListRemoved(_) | DomainEvent::ListDropped(_) => self.combine_lists(tree),
            DomainEvent::ListModified(panel) => self.show_wip_limit(tree, *panel),
            DomainEvent::ListTitleModified { list, .. } => self.list_title_modified(tree, *list),
            DomainEvent::ListDragged(helper) => self.list_dragged(tree, *helper),
            DomainEvent::BadgesModified(card) => {
                self.badges_modified(tree, *card);
                Ok(())
            }
            DomainEvent::CardRemoved(_) | DomainEvent::MembersModified(_) => Ok(()),
        }
    }

    /// Load the active board's view state, then set the board up.
    pub fn board_changed(&mut self, tree: &mut Tree) -> Result<(), EngineError> {
        self.init_storage(tree)?;
        self.setup_board(tree)?;
        self.settle(tree);
        Ok(())
    }

    /// Read settings and the board namespace; stored settings replace the current ones.
    pub fn init_storage(&mut self, tree: &Tree) -> Result<(), EngineError> {
        let board_id = tree.board_id()?;
        if let Some(settings) = self.view_state.load(&board_id) {
            log::debug!("[foldboard.engine.storage] Using stored settings {:?}", settings);
            self.set_settings(settings);
        }
        Ok(())
    }

    /// Full pass over the board. Safe to repeat.
    pub fn setup_board(&mut self, tree: &mut Tree) -> Result<(), EngineError> {
        let Some(board_id) = self.view_state.board_id().map(str::to_string) else {
            return Err(EngineError::BoardNotSet);
        };
        log::info!("[foldboard.engine.setup] Setting up board {}", board_id);

        self.cleanup_storage();
        self.format_cards(tree);
        if self.settings.remember_view_states {
            self.restore_sections_view_state(tree);
        } else {
            self.clear_view_state();
        }
        self.format_lists(tree);

        let compact = self
            .view_state
            .retrieve_global(SettingKey::CompactMode)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        self.apply_compact_mode(tree, compact);
        Ok(())
    }

    /// Same as the host's refresh button: set the board up again.
    pub fn refresh(&mut self, tree: &mut Tree) -> Result<(), EngineError> {
        self.setup_board(tree)?;
        self.settle(tree);
        Ok(())
    }

    fn format_lists(&mut self, tree: &mut Tree) {
        if let Err(e) = self.combine_lists(tree) {
            log::warn!("[foldboard.engine.setup] Combining lists failed: {}", e);
        }
        self.make_lists_foldable(tree);
        self.add_wip_limits(tree);
    }

    /// Super-list states are meaningless while combining is off.
    fn cleanup_storage(&mut self) {
        if self.settings.enable_combining_lists {
            return;
        }
        if self.view_state.forget_key(SettingKey::SuperListCollapsed) {
            if let Err(e) = self.view_state.flush() {
                log::error!("[foldboard.engine.storage] Failed to write cleaned view state: {}", e);
            }
        }
    }

    fn clear_view_state(&mut self) {
        if let Err(e) = self.view_state.clear() {
            log::error!("[foldboard.engine.storage] Failed to clear view state: {}", e);
        }
    }

    /// Store a panel setting. Failures are logged; the tree keeps the new state.
    pub(crate) fn persist(&mut self, panel: &str, key: SettingKey, value: Value) {
        if let Err(e) = self.view_state.store(panel, key, value) {
            log::error!(
                "[foldboard.engine.persist] Failed to store {} for {}: {}",
                key.as_str(),
                panel,
                e
            );
        }
    }

    /// Run deferred writes that may run now.
    pub fn settle(&mut self, tree: &mut Tree) {
        loop {
            let tasks = self.frames.ready();
            if tasks.is_empty() {
                break;
            }
            self.run_tasks(tree, tasks);
        }
    }

    /// The host painted a frame.
    pub fn run_frame(&mut self, tree: &mut Tree) {
        let tasks = self.frames.frame();
        self.run_tasks(tree, tasks);
        self.settle(tree);
    }

    pub(crate) fn defer(&mut self, task: FrameTask) {
        self.frames.defer(task);
    }

    fn run_tasks(&mut self, tree: &mut Tree, tasks: Vec<FrameTask>) {
        for task in tasks {
            if !tree.is_attached(task.item()) {
                log::debug!("[foldboard.engine.frame] Skipping {:?}, item is gone", task);
                continue;
            }
            let result = match task {
                FrameTask::FormatSection(item) => self.format_as_section(tree, item),
                FrameTask::MarkComment(item) => {
                    tree.add_class(item, shape::COMMENT_CARD);
                    Ok(())
                }
                FrameTask::MarkBlocked(item) => {
                    self.set_blocked(tree, item, true);
                    Ok(())
                }
                FrameTask::RestoreSection(item) => self.restore_section(tree, item),
            };
            if let Err(e) = result {
                log::warn!("[foldboard.engine.frame] {:?} failed: {}", task, e);
            }
        }
    }

    /// The panel `node` is, wraps, or lies inside.
    pub(crate) fn resolve_panel(&self, tree: &Tree, node: NodeId) -> Result<NodeId, EngineError> {
        if shape::is_panel_wrapper(tree, node) {
            if let Some(panel) = tree.panel_of_wrapper(node) {
                return Ok(panel);
            }
        }
        tree.containing_panel(node).ok_or_else(|| {
            TreeError::NotFound(format!("panel for node {}", node.index())).into()
        })
    }

    pub(crate) fn wrapper(&self, tree: &Tree, panel: NodeId) -> Result<NodeId, EngineError> {
        tree.wrapper_of(panel).ok_or_else(|| {
            TreeError::NotFound(format!("wrapper of panel {}", panel.index())).into()
        })
    }

    pub(crate) fn panel_key(&self, tree: &Tree, panel: NodeId) -> Result<String, EngineError> {
        Ok(self.identity.panel_key(tree, panel)?)
    }

    pub fn role(&self, tree: &Tree, panel: NodeId) -> MergeRole {
        MergeRole::from_marker(tree.attr(panel, shape::ATTR_SUB_LIST))
    }

    /// Collapsed on its own or as part of a collapsed SuperPanel.
    pub fn is_folded(&self, tree: &Tree, panel: NodeId) -> bool {
        let Some(wrapper) = tree.wrapper_of(panel) else {
            return false;
        };
        if tree.has_class(wrapper, shape::LIST_COLLAPSED) {
            return true;
        }
        let left = match self.role(tree, panel) {
            MergeRole::None => return false,
            MergeRole::Left => Some(panel),
            MergeRole::Right => tree.prev_panel(panel),
        };
        left.and_then(|l| tree.wrapper_of(l))
            .is_some_and(|w| tree.has_class(w, shape::SUPER_LIST_COLLAPSED))
    }

    /// WIP status of a panel from its own items and limit.
    pub fn wip_status(&self, tree: &Tree, panel: NodeId) -> Result<WipStatus, EngineError> {
        let name = tree.panel_name(panel)?;
        Ok(crate::types::wip_status(
            self.count_work_items(tree, panel),
            parser::extract_wip_limit(&name),
        ))
    }

    pub fn item_kind(&self, tree: &Tree, item: NodeId) -> ItemKind {
        let title = tree.item_title(item).unwrap_or_default();
        if self.marker.is_section(&title) {
            ItemKind::SectionHeader
        } else if parser::is_comment(&title) {
            ItemKind::Comment
        } else if tree.is_blocked(item) {
            ItemKind::Blocked
        } else {
            ItemKind::Ordinary
        }
    }

    /// Derived state of every panel, in board order.
    pub fn snapshot(&self, tree: &Tree) -> Vec<PanelSnapshot> {
        let mut panels = Vec::new();
        for (position, panel) in tree.panels().into_iter().enumerate() {
            let name = match tree.panel_name(panel) {
                Ok(name) => name,
                Err(e) => {
                    log::warn!("[foldboard.engine.snapshot] Skipping panel: {}", e);
                    continue;
                }
            };
            let wip_limit = parser::extract_wip_limit(&name);
            let work_items = self.count_work_items(tree, panel);
            let items = tree
                .items_in_panel(panel)
                .into_iter()
                .map(|item| ItemSnapshot {
                    title: tree.item_title(item),
                    kind: self.item_kind(tree, item),
                    labels: tree.item_labels(item, &[]),
                    fields: tree.item_fields(item),
                    hidden: tree.is_hidden(item),
                })
                .collect();
            panels.push(PanelSnapshot {
                name,
                position,
                wip_limit,
                work_items,
                wip_status: crate::types::wip_status(work_items, wip_limit),
                fold: if self.is_folded(tree, panel) {
                    FoldState::Collapsed
                } else {
                    FoldState::Expanded
                },
                merge_role: self.role(tree, panel),
                items,
            });
        }
        panels
    }
}

impl std::fmt::Debug for PanelStateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelStateEngine")
            .field("settings", &self.settings)
            .field("view_state", &self.view_state)
            .field("compact_mode", &self.compact_mode)
            .field("pending_frames", &self.frames.pending())
            .finish()
    }
}
