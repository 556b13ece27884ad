pub mod cipher;
pub mod container;
pub mod local;
pub mod path_guard;

pub use cipher::CipherEngine;
pub use local::LocalStorage;
pub use path_guard::{ConfinedPath, PathGuard};
