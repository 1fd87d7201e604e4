/// Change observer: locates the board anchors, keeps watches on them and
/// turns delivered mutation batches into domain events.
///
/// Three watches are kept, mirroring the host structure:
///   root       content root, child list only, sees whole-board replacement
///   container  panel container, child list only, sees panels come and go
///   panels     every panel, whole subtree, sees item and title edits
///
/// Locating the root and the container is retried a bounded number of
/// times. The observer never publishes by itself: every step returns the
/// events it produced and the caller dispatches them once the tree is no
/// longer borrowed.

pub mod classify;
pub mod retry;

use std::time::Duration;

use crate::events::DomainEvent;
use crate::tree::{MutationRecord, NodeId, ObserveOptions, Tree, Watch};
use retry::{Retry, RetryPolicy, RetryStep};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchError {
    #[error("{what} not found after {attempts} attempts")]
    NotFound { what: &'static str, attempts: u32 },

    #[error("cannot derive board id: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    LocatingRoot,
    LocatingPanelsRoot,
    Watching,
    Failed,
}

/// Outcome of one observer step.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Progress {
    pub events: Vec<DomainEvent>,
    /// Call `retry` after this delay.
    pub retry: Option<Duration>,
}

#[derive(Debug)]
pub struct ChangeObserver {
    phase: Phase,
    retry: Retry,
    root_watch: Watch,
    container_watch: Watch,
    panel_watch: Watch,
    container: Option<NodeId>,
    board_id: Option<String>,
    /// Board id announced once the panel container is connected.
    pending_board: Option<String>,
    failure: Option<WatchError>,
}

impl ChangeObserver {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            phase: Phase::Uninitialized,
            retry: Retry::new(policy),
            root_watch: Watch::new(),
            container_watch: Watch::new(),
            panel_watch: Watch::new(),
            container: None,
            board_id: None,
            pending_board: None,
            failure: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn board_id(&self) -> Option<&str> {
        self.board_id.as_deref()
    }

    pub fn failure(&self) -> Option<&WatchError> {
        self.failure.as_ref()
    }

    pub fn is_watching_panel(&self, panel: NodeId) -> bool {
        self.panel_watch.is_observing(panel)
    }

    /// Host signalled the document is ready.
    pub fn start(&mut self, tree: &Tree) -> Progress {
        if self.phase != Phase::Uninitialized {
            log::debug!("[foldboard.watcher.start] Already started ({:?})", self.phase);
            return Progress::default();
        }
        self.phase = Phase::LocatingRoot;
        self.retry.reset();
        self.locate(tree)
    }

    /// A scheduled retry came due.
    pub fn retry(&mut self, tree: &Tree) -> Progress {
        match self.phase {
            Phase::LocatingRoot | Phase::LocatingPanelsRoot => self.locate(tree),
            _ => Progress::default(),
        }
    }

    fn locate(&mut self, tree: &Tree) -> Progress {
        let mut progress = Progress::default();

        if self.phase == Phase::LocatingRoot {
            let Some(root) = tree.content_root() else {
                progress.retry = self.failed_attempt("content root");
                return progress;
            };
            self.root_watch.observe(root, ObserveOptions::CHILD_LIST);
            match tree.board_id() {
                Ok(id) => self.pending_board = Some(id),
                Err(e) => {
                    self.fail(WatchError::Malformed(e.to_string()));
                    return progress;
                }
            }
            log::info!("[foldboard.watcher.root] Watching content root {}", root.index());
            self.phase = Phase::LocatingPanelsRoot;
            self.retry.reset();
        }

        if self.phase == Phase::LocatingPanelsRoot {
            let Some(container) = tree.panel_container() else {
                progress.retry = self.failed_attempt("panel container");
                return progress;
            };
            self.connect(tree, container);
            if let Some(new) = self.pending_board.take() {
                let old = self.board_id.replace(new.clone());
                log::info!(
                    "[foldboard.watcher.board] Board {} active (was {:?})",
                    new,
                    old
                );
                progress.events.push(DomainEvent::BoardChanged { old, new });
            }
        }
        progress
    }

    fn connect(&mut self, tree: &Tree, container: NodeId) {
        self.container_watch.disconnect();
        self.panel_watch.disconnect();
        self.container_watch
            .observe(container, ObserveOptions::CHILD_LIST);
        for panel in tree.panels() {
            self.panel_watch.observe(panel, ObserveOptions::SUBTREE);
        }
        self.container = Some(container);
        self.phase = Phase::Watching;
        self.retry.reset();
    }

    fn failed_attempt(&mut self, what: &'static str) -> Option<Duration> {
        match self.retry.record_failure() {
            RetryStep::After(delay) => {
                log::warn!(
                    "[foldboard.watcher.locate] {} not found (attempt {}), retrying in {:?}",
                    what,
                    self.retry.attempts(),
                    delay
                );
                Some(delay)
            }
            RetryStep::Exhausted { attempts } => {
                self.fail(WatchError::NotFound { what, attempts });
                None
            }
        }
    }

    fn fail(&mut self, error: WatchError) {
        log::error!("[foldboard.watcher.fatal] {}", error);
        self.root_watch.disconnect();
        self.container_watch.disconnect();
        self.panel_watch.disconnect();
        self.phase = Phase::Failed;
        self.failure = Some(error);
    }

    /// Deliver records drained from the tree journal to every watch.
    pub fn process(&mut self, tree: &Tree, records: &[MutationRecord]) -> Progress {
        if records.is_empty() || matches!(self.phase, Phase::Uninitialized | Phase::Failed) {
            return Progress::default();
        }
        // Batches are cut before any watch changes, as the records were
        // produced while these watches were in place.
        let root_batch = self.root_watch.collect(records);
        let container_batch = self.container_watch.collect(records);
        let panel_batch = self.panel_watch.collect(records);

        if !root_batch.is_empty() {
            if let Some(progress) = self.root_replaced(tree) {
                return progress;
            }
        }
        if self.phase != Phase::Watching {
            return Progress::default();
        }

        let mut events = classify::classify_container_batch(tree, &container_batch);
        for event in &events {
            match event {
                DomainEvent::ListAdded(wrapper) | DomainEvent::ListDropped(wrapper) => {
                    if let Some(panel) = tree.panel_of_wrapper(*wrapper) {
                        self.panel_watch.observe(panel, ObserveOptions::SUBTREE);
                    }
                }
                DomainEvent::ListRemoved(wrapper) if !tree.is_attached(*wrapper) => {
                    if let Some(panel) = tree.panel_of_wrapper(*wrapper) {
                        self.panel_watch.unobserve(panel);
                    }
                }
                _ => {}
            }
        }

        let board_id = self.board_id.clone().unwrap_or_default();
        events.extend(classify::classify_item_batch(tree, &panel_batch, &board_id));
        if !events.is_empty() {
            log::debug!(
                "[foldboard.watcher.batch] {} record(s) -> {} event(s)",
                records.len(),
                events.len()
            );
        }
        Progress {
            events,
            retry: None,
        }
    }

    /// The content root's children changed. `Some` when the board was
    /// switched or re-rendered, in which case pending batches for the old
    /// container and panels are dropped.
    fn root_replaced(&mut self, tree: &Tree) -> Option<Progress> {
        let id = match tree.board_id() {
            Ok(id) => id,
            Err(e) => {
                log::warn!("[foldboard.watcher.root] {}", e);
                return None;
            }
        };
        let same_board = self.board_id.as_deref() == Some(id.as_str());
        if same_board && self.phase == Phase::Watching && tree.panel_container() == self.container {
            return None;
        }
        if same_board && self.phase == Phase::Watching {
            // Same board rendered again under a new container: reconnect and refresh.
            let container = tree.panel_container()?;
            self.connect(tree, container);
            return Some(Progress {
                events: vec![DomainEvent::BoardChanged {
                    old: Some(id.clone()),
                    new: id,
                }],
                retry: None,
            });
        }

        log::info!(
            "[foldboard.watcher.root] Board replaced: {:?} -> {}",
            self.board_id,
            id
        );
        self.container_watch.disconnect();
        self.panel_watch.disconnect();
        self.container = None;
        self.pending_board = Some(id);
        self.phase = Phase::LocatingPanelsRoot;
        self.retry.reset();
        Some(self.locate(tree))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::fixture::{self, BoardBuilder};

    const LOCATION: &str = "https://trello.com/b/b1/work";

    fn builder() -> BoardBuilder {
        BoardBuilder::new(LOCATION)
            .panel("Todo", &["one"])
            .panel("Doing", &[])
    }

    fn started(tree: &Tree) -> ChangeObserver {
        let mut observer = ChangeObserver::new(RetryPolicy::default());
        let progress = observer.start(tree);
        assert_eq!(
            progress.events,
            vec![DomainEvent::BoardChanged {
                old: None,
                new: "b1".to_string(),
            }]
        );
        observer
    }

    #[test]
    fn test_start_watches_every_panel() {
        let tree = builder().build().unwrap();
        let observer = started(&tree);
        assert_eq!(observer.phase(), Phase::Watching);
        assert_eq!(observer.board_id(), Some("b1"));
        for panel in tree.panels() {
            assert!(observer.is_watching_panel(panel));
        }
    }

    #[test]
    fn test_missing_root_fails_after_three_attempts() {
        let tree = Tree::new(LOCATION);
        let mut observer = ChangeObserver::new(RetryPolicy::default());
        let delay = Duration::from_millis(100);
        assert_eq!(observer.start(&tree).retry, Some(delay));
        assert_eq!(observer.retry(&tree).retry, Some(delay));
        let last = observer.retry(&tree);
        assert_eq!(last, Progress::default());
        assert_eq!(observer.phase(), Phase::Failed);
        assert_eq!(
            observer.failure(),
            Some(&WatchError::NotFound {
                what: "content root",
                attempts: 3,
            })
        );
    }

    #[test]
    fn test_container_rendering_late_is_found_on_retry() {
        let mut tree = fixture::empty_document(LOCATION).unwrap();
        let mut observer = ChangeObserver::new(RetryPolicy::default());
        let progress = observer.start(&tree);
        assert!(progress.events.is_empty());
        assert_eq!(observer.phase(), Phase::LocatingPanelsRoot);

        fixture::mount_board(&mut tree, &builder()).unwrap();
        tree.take_records();
        let progress = observer.retry(&tree);
        assert_eq!(progress.events.len(), 1);
        assert_eq!(observer.phase(), Phase::Watching);
    }

    #[test]
    fn test_board_switch_reconnects_and_drops_stale_batches() {
        let mut tree = builder().build().unwrap();
        let mut observer = started(&tree);
        let old_panel = tree.panels()[0];

        fixture::add_item(&mut tree, old_panel, "stale").unwrap();
        let next = BoardBuilder::new("https://trello.com/b/b2/other").panel("Inbox", &[]);
        fixture::replace_board(&mut tree, &next).unwrap();
        let records = tree.take_records();
        let progress = observer.process(&tree, &records);

        assert_eq!(
            progress.events,
            vec![DomainEvent::BoardChanged {
                old: Some("b1".to_string()),
                new: "b2".to_string(),
            }]
        );
        assert!(!observer.is_watching_panel(old_panel));
        assert!(observer.is_watching_panel(tree.panels()[0]));
    }

    #[test]
    fn test_same_board_rerender_refreshes() {
        let mut tree = builder().build().unwrap();
        let mut observer = started(&tree);
        fixture::replace_board(&mut tree, &builder()).unwrap();
        let records = tree.take_records();
        let progress = observer.process(&tree, &records);
        assert_eq!(
            progress.events,
            vec![DomainEvent::BoardChanged {
                old: Some("b1".to_string()),
                new: "b1".to_string(),
            }]
        );
        assert!(observer.is_watching_panel(tree.panels()[1]));
    }

    #[test]
    fn test_added_panel_gets_a_watch() {
        let mut tree = builder().build().unwrap();
        let mut observer = started(&tree);
        let wrapper = fixture::add_panel(&mut tree, "Done", &[], None).unwrap();
        let records = tree.take_records();
        let progress = observer.process(&tree, &records);
        assert_eq!(progress.events, vec![DomainEvent::ListAdded(wrapper)]);

        let panel = tree.panel_of_wrapper(wrapper).unwrap();
        assert!(observer.is_watching_panel(panel));
        let item = fixture::add_item(&mut tree, panel, "late").unwrap();
        let records = tree.take_records();
        let progress = observer.process(&tree, &records);
        assert_eq!(
            progress.events,
            vec![DomainEvent::CardAdded(item), DomainEvent::ListModified(panel)]
        );
    }

    #[test]
    fn test_removed_panel_loses_its_watch() {
        let mut tree = builder().build().unwrap();
        let mut observer = started(&tree);
        let wrapper = tree.panel_wrappers()[1];
        let panel = tree.panels()[1];
        fixture::remove_panel(&mut tree, wrapper).unwrap();
        let records = tree.take_records();
        observer.process(&tree, &records);
        assert!(!observer.is_watching_panel(panel));
    }

    #[test]
    fn test_malformed_location_is_fatal() {
        let tree = BoardBuilder::new("nowhere").build().unwrap();
        let mut observer = ChangeObserver::new(RetryPolicy::default());
        let progress = observer.start(&tree);
        assert!(progress.events.is_empty());
        assert_eq!(observer.phase(), Phase::Failed);
        assert!(matches!(observer.failure(), Some(WatchError::Malformed(_))));
    }
}
