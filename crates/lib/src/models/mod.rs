pub mod event;
pub mod purchase;

// Re-export commonly used types
pub use event::*;
pub use purchase::*;
