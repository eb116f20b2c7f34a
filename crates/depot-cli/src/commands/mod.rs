pub mod closure;
pub mod handle;
pub mod notifications;
pub mod notify;
pub mod project;
pub mod worker;
