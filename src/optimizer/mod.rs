//! # Optimizer Module
//!
//! Pipeline di transcodifica suddivisa in sottomoduli:
//! - `media_optimizer`: Orchestratore del run (walk, fan-out, join, close)
//! - `task_optimizer`: Pipeline per singolo file (read, decode, resize, encode, write)
//! - `path_resolver`: Mapping dei path relativi e policy delle estensioni

pub mod media_optimizer;
pub mod task_optimizer;
pub mod path_resolver;

pub use media_optimizer::MediaOptimizer;
pub use task_optimizer::{JobSettings, TaskOptimizer, TranscodeJob};
pub use path_resolver::{ExtensionPolicy, PathResolver};
