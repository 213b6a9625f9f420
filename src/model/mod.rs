//! Domain model of the line
//!
//! Parts and their routings, the bill-of-materials parser and the runtime
//! occupancy of stations and buffers.

pub mod bom;
pub mod node;
pub mod part;
pub mod routing;

pub use bom::*;
pub use node::*;
pub use part::*;
pub use routing::*;
