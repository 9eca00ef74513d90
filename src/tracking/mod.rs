//! Work-session tracking - live elapsed time and allocated vs worked aggregation

pub mod config;
pub mod duration;
pub mod elapsed;
pub mod models;
pub mod periods;
pub mod reader;
pub mod ticker;
pub mod wbs;

pub use config::*;
pub use duration::*;
pub use elapsed::*;
pub use models::*;
pub use periods::*;
pub use reader::*;
pub use ticker::*;
pub use wbs::*;
