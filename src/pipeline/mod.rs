mod fleet;
mod item;
mod repair;
mod scratch;

pub use fleet::FleetScheduler;
pub use item::{ItemPipeline, ItemResult};
pub use repair::RepairPass;
pub use scratch::ScratchArea;
