//! Client (customer company) entity module

pub mod descriptor;
pub mod handlers;
pub mod model;

pub use descriptor::ClientDescriptor;
pub use handlers::*;
pub use model::{Client, ClientInput};
