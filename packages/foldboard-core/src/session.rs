/// Composition root for one live board.
///
/// The host mutates the tree and then calls `flush_mutations`; the observer
/// classifies the journal and the bus hands events to the engine. Observer
/// retries and the debounced board setup are deadlines on the session clock,
/// run by `run_due_timers` or by the async `pump`.
use std::cell::{Ref, RefCell, RefMut};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use crate::clock::{Clock, Debouncer, Timers};
use crate::config::{load_settings, Settings};
use crate::engine::{EngineError, FrameScheduler, HostFrames, InlineFrames, PanelStateEngine};
use crate::events::{DomainEvent, EventBus, EventKind, Handler};
use crate::storage::{JsonFileStore, KeyValueStore};
use crate::tree::{NodeId, Tree};
use crate::types::{FoldState, PanelSnapshot};
use crate::watcher::retry::RetryPolicy;
use crate::watcher::{ChangeObserver, Phase, Progress, WatchError};

/// Burst window collapsed into a single board setup.
pub const BOARD_SETUP_DEBOUNCE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub settings: Settings,
    /// Deferred item formatting waits for `run_frame` instead of running
    /// right after each handler.
    pub host_frames: bool,
    pub retry: RetryPolicy,
    pub board_debounce: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            host_frames: false,
            retry: RetryPolicy::default(),
            board_debounce: BOARD_SETUP_DEBOUNCE,
        }
    }
}

impl SessionOptions {
    /// Defaults with the user options read from a JSON settings file.
    pub fn from_settings_file(path: &Path) -> Self {
        Self {
            settings: load_settings(path),
            ..Self::default()
        }
    }
}

pub struct Session {
    tree: Rc<RefCell<Tree>>,
    engine: Rc<RefCell<PanelStateEngine>>,
    bus: Rc<EventBus>,
    observer: ChangeObserver,
    clock: Rc<dyn Clock>,
    board_setup: Rc<RefCell<Debouncer<DomainEvent>>>,
    retries: Timers<()>,
}

impl Session {
    pub fn new(
        tree: Tree,
        store: Rc<dyn KeyValueStore>,
        clock: Rc<dyn Clock>,
        options: SessionOptions,
    ) -> Self {
        let frames: Box<dyn FrameScheduler> = if options.host_frames {
            Box::new(HostFrames::default())
        } else {
            Box::new(InlineFrames::default())
        };
        let engine = Rc::new(RefCell::new(PanelStateEngine::new(
            options.settings,
            store,
            frames,
        )));
        let tree = Rc::new(RefCell::new(tree));
        let bus = Rc::new(EventBus::new());
        let board_setup = Rc::new(RefCell::new(Debouncer::new(options.board_debounce)));

        let setup_handler: Handler = {
            let board_setup = Rc::clone(&board_setup);
            let clock = Rc::clone(&clock);
            Rc::new(move |event: &DomainEvent| {
                board_setup.borrow_mut().call(clock.now(), event.clone());
            })
        };
        bus.subscribe(EventKind::BoardChanged, setup_handler);

        let engine_handler: Handler = {
            let tree = Rc::clone(&tree);
            let engine = Rc::clone(&engine);
            Rc::new(move |event: &DomainEvent| {
                let mut tree = tree.borrow_mut();
                if let Err(e) = engine.borrow_mut().handle(&mut tree, event) {
                    log::warn!("[foldboard.session.handler] {} failed: {}", event.kind(), e);
                }
            })
        };
        for kind in EventKind::ALL {
            if kind != EventKind::BoardChanged {
                bus.subscribe(kind, Rc::clone(&engine_handler));
            }
        }

        Self {
            tree,
            engine,
            bus,
            observer: ChangeObserver::new(options.retry),
            clock,
            board_setup,
            retries: Timers::new(),
        }
    }

    /// Session backed by files: settings from `settings_path`, view state
    /// kept in one JSON document at `state_path`.
    pub fn open(
        tree: Tree,
        settings_path: &Path,
        state_path: impl Into<PathBuf>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        Self::new(
            tree,
            Rc::new(JsonFileStore::new(state_path)),
            clock,
            SessionOptions::from_settings_file(settings_path),
        )
    }

    /// The host document is ready: start locating the board.
    pub fn host_ready(&mut self) -> usize {
        let progress = self.observer.start(&self.tree.borrow());
        self.apply(progress)
    }

    /// Classify and dispatch everything the host changed since the last call.
    /// Returns the number of events published.
    pub fn flush_mutations(&mut self) -> usize {
        let records = self.tree.borrow_mut().take_records();
        if records.is_empty() {
            return 0;
        }
        let progress = self.observer.process(&self.tree.borrow(), &records);
        self.apply(progress)
    }

    fn apply(&mut self, progress: Progress) -> usize {
        if let Some(delay) = progress.retry {
            self.retries.schedule(self.clock.now() + delay, ());
        }
        for event in &progress.events {
            self.bus.publish(event);
        }
        progress.events.len()
    }

    /// Run observer retries and the board setup whose time has come.
    pub fn run_due_timers(&mut self) {
        let now = self.clock.now();
        for _ in self.retries.take_due(now) {
            let progress = self.observer.retry(&self.tree.borrow());
            self.apply(progress);
        }
        let due = self.board_setup.borrow_mut().take_due(now);
        if let Some(event) = due {
            log::debug!("[foldboard.session.setup] Running debounced {:?}", event);
            let mut tree = self.tree.borrow_mut();
            if let Err(e) = self.engine.borrow_mut().handle(&mut tree, &event) {
                log::warn!("[foldboard.session.setup] Board setup failed: {}", e);
            }
        }
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        let setup = self.board_setup.borrow().deadline();
        match (self.retries.next_deadline(), setup) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// The host painted a frame.
    pub fn run_frame(&self) {
        let mut tree = self.tree.borrow_mut();
        self.engine.borrow_mut().run_frame(&mut tree);
    }

    /// Run a user action against the engine.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut PanelStateEngine, &mut Tree) -> R) -> R {
        let mut tree = self.tree.borrow_mut();
        let mut engine = self.engine.borrow_mut();
        f(&mut engine, &mut tree)
    }

    pub fn refresh(&self) -> Result<(), EngineError> {
        self.with_engine(|engine, tree| engine.refresh(tree))
    }

    pub fn toggle_panel(&self, node: NodeId) -> Result<FoldState, EngineError> {
        self.with_engine(|engine, tree| engine.toggle_panel(tree, node))
    }

    pub fn collapse_super_list(&self, node: NodeId) -> Result<(), EngineError> {
        self.with_engine(|engine, tree| engine.collapse_super_list(tree, node))
    }

    pub fn expand_super_list(&self, node: NodeId) -> Result<(), EngineError> {
        self.with_engine(|engine, tree| engine.expand_super_list(tree, node))
    }

    pub fn toggle_section(&self, node: NodeId) -> Result<bool, EngineError> {
        self.with_engine(|engine, tree| engine.toggle_section(tree, node))
    }

    pub fn toggle_compact_mode(&self) -> bool {
        self.with_engine(|engine, tree| engine.toggle_compact_mode(tree))
    }

    pub fn tree(&self) -> Ref<'_, Tree> {
        self.tree.borrow()
    }

    /// Host-side access for edits; call `flush_mutations` afterwards.
    pub fn tree_mut(&self) -> RefMut<'_, Tree> {
        self.tree.borrow_mut()
    }

    pub fn engine(&self) -> Ref<'_, PanelStateEngine> {
        self.engine.borrow()
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn phase(&self) -> Phase {
        self.observer.phase()
    }

    pub fn failure(&self) -> Option<&WatchError> {
        self.observer.failure()
    }

    pub fn board_id(&self) -> Option<&str> {
        self.observer.board_id()
    }

    pub fn snapshot(&self) -> Vec<PanelSnapshot> {
        self.engine.borrow().snapshot(&self.tree.borrow())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("phase", &self.observer.phase())
            .field("board_id", &self.observer.board_id())
            .field("pending_retries", &self.retries.len())
            .field("setup_pending", &self.board_setup.borrow().is_pending())
            .finish()
    }
}

/// Drive the session with `tokio::time` until no timer is left. Use a
/// `TokioClock` so the session's deadlines and the sleeps agree.
pub async fn pump(session: &mut Session) {
    session.flush_mutations();
    session.run_due_timers();
    while let Some(deadline) = session.next_deadline() {
        let now = session.now();
        if deadline > now {
            tokio::time::sleep(deadline - now).await;
        }
        session.run_due_timers();
        session.flush_mutations();
    }
}
