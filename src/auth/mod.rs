//! Authentication module for the StudyAI server
//!
//! Registration, login, password hashing and the signed session cookie.

pub mod handlers;
mod password;
mod service;
mod session;

pub use password::{hash_password, verify_password};
pub use service::AuthService;
pub use session::{Claims, Session, SessionManager, SessionUser};
