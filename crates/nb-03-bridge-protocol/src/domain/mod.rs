//! Domain layer for the settlement program.

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod value_objects;
pub mod window;

pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use value_objects::*;
pub use window::*;
