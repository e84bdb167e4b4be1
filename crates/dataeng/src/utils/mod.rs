pub mod data_type;
pub mod error_helpers;
pub mod file;
pub mod input;
pub mod logging;
pub mod retry;
pub mod threading;
pub mod validation;

pub use data_type::represent_int;
pub use input::EnvConfigReader;
pub use threading::is_thread_running;
