pub mod frame;
pub mod scheduler;
pub mod session;
