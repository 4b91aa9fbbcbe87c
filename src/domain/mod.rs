mod allocation;
mod balance;
mod expense;
mod group;
mod money;
mod notice;

pub use allocation::*;
pub use balance::*;
pub use expense::*;
pub use group::*;
pub use money::*;
pub use notice::*;
