pub mod command_handlers;
pub mod dispatcher;
pub mod display;
pub mod main_types;
