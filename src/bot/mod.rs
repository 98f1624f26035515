pub mod commands;
pub mod dispatcher;
pub mod keyboards;

pub use dispatcher::handle_update;
