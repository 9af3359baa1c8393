//! Notification entity module

pub mod descriptor;
pub mod handlers;
pub mod model;

pub use descriptor::NotificationDescriptor;
pub use handlers::*;
pub use model::{Notification, NotificationInput};
