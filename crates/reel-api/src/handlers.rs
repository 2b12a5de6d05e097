//! Request handlers.

pub mod director;
pub mod footage;
pub mod health;
pub mod render;
pub mod trends;

pub use director::*;
pub use footage::*;
pub use health::*;
pub use render::*;
pub use trends::*;
