mod account;
mod agreement;
mod schedule;
mod service;

pub use account::*;
pub use agreement::*;
pub use schedule::*;
pub use service::*;