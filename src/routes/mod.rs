//! Router construction
//!
//! - `speak` - `/ws` relay endpoint
//! - `static_files` - browser UI served at `/`

pub mod speak;
pub mod static_files;

pub use speak::create_speak_router;
pub use static_files::create_static_router;
