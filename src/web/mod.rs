//! Browser pages, the session cookie and the idle-timeout middleware.

pub mod cookie;
pub mod handlers;
pub mod render;
pub mod session;

pub use cookie::{SESSION_COOKIE, session_cookie, session_id_from_headers};
pub use handlers::{
    add_task, delete_task, history, index, login, login_form, logout, session_timeout, stylesheet,
    update_task,
};
pub use session::{SessionHandle, session_gate};
