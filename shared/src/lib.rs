mod audit;
mod catalog;
mod event;
mod failed;
mod inventory;
mod platform;
mod reservation;

pub use audit::*;
pub use catalog::*;
pub use event::*;
pub use failed::*;
pub use inventory::*;
pub use platform::*;
pub use reservation::*;
