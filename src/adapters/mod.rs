pub mod forge;
pub mod parameters;
pub mod redis;
pub mod session;
