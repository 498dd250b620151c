//! Storage layer of the engine: random 64-bit ids, the slot-addressed `Pool<T>` every entity and component lives
//! in, and the `Serializable` contract that turns them into tree documents or binary blobs.

// Lets `#[derive(Serializable)]` refer to `::corvus_ecs` from inside this crate too
extern crate self as corvus_ecs;

pub use corvus_ecs_proc::Serializable;

pub use error::{Error, Result};
pub use id::UidGenerator;
pub use pool::Pool;

pub mod error;
pub mod id;
pub mod io;
pub mod pool;
#[cfg(test)]
mod test;

/// Identifier of an entity or a component. `0` never names anything.
pub type Uid = u64;

/// The "no reference" id.
pub const NULL_UID: Uid = 0;
