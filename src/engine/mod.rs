//! Engine: enumeration, hashing, storage and the batch driver

pub mod arg_parser;
pub mod classifier;
pub mod clock;
pub mod db_ops;
pub mod driver;
pub mod enumerator;
pub mod handlers;
pub mod hashing;
pub mod notifier;
pub mod progress;
pub mod store;
pub mod tools;

// Re-export commonly used items
pub use arg_parser::{Cli, Commands};
pub use classifier::PathClassifier;
pub use clock::{Clock, ManualClock, SystemClock};
pub use db_ops::{SqliteStore, open_db, open_db_in_memory};
pub use driver::{BatchDriver, TaskRun, root_key};
pub use enumerator::TreeEnumerator;
pub use handlers::handle_run;
pub use hashing::{hash_bytes, hash_file};
pub use notifier::{FileNotifier, LogNotifier, Notifier};
pub use store::{CursorStore, ExclusionStore, FlagStore, HashStore, ScanStore, Scheduler};
pub use tools::{path_to_db_string, running_as_root};
