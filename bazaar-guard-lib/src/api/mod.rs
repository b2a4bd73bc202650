//! JSON HTTP surface of the guard.
//!
//! | Method   | Path                           | Body / query                       |
//! |----------|--------------------------------|------------------------------------|
//! | `POST`   | `/v1/check`                    | `{ user_id, action_type, limit?, window_minutes?, payload? }` |
//! | `GET`    | `/v1/admin/suspicious`         | `?window_minutes=N`                |
//! | `GET`    | `/v1/admin/blocks`             |                                    |
//! | `POST`   | `/v1/admin/blocks`             | `{ user_id, minutes }`             |
//! | `DELETE` | `/v1/admin/blocks/{user_id}`   |                                    |
//!
//! Malformed input is answered with `400 {"error": "..."}`.

pub mod handlers;
pub mod response;
pub mod server;

pub use handlers::{dispatch, BlockRequest, CheckRequest};
pub use server::{run, serve, ServeOptions};
