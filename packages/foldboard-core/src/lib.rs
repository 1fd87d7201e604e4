/// Derived view state for a live, externally owned kanban board.
///
/// The live document is mutated by a foreign process. `watcher` turns raw
/// child-list mutations into domain events, `events` dispatches them and
/// `engine` keeps folding, merging, section and WIP state consistent on the
/// tree while `storage` persists the user's view preferences per board.
pub mod clock;
pub mod config;
pub mod engine;
pub mod events;
pub mod parser;
pub mod session;
pub mod storage;
pub mod tree;
pub mod types;
pub mod watcher;

pub use config::{load_settings, Settings};
pub use engine::{EngineError, PanelStateEngine};
pub use events::{DomainEvent, EventBus, EventKind};
pub use session::{Session, SessionOptions};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
pub use tree::{NodeId, Tree, TreeError};
