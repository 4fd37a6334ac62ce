pub mod auth_handlers;
pub mod job_handlers;
pub mod match_handlers;
pub mod resume_handlers;
pub mod system_handlers;

pub use auth_handlers::*;
pub use job_handlers::*;
pub use match_handlers::*;
pub use resume_handlers::*;
pub use system_handlers::*;
