//! Web form for feasibility study generation.
//!
//! - `GET /` — client and cargo selection form
//! - `POST /generate` — render, convert and download the study PDF
//! - `POST /reload` — drop the memoised lookup table
//! - `GET /health` — liveness probe
//!
//! Handlers hold no business logic; they delegate to `estudo-core` and
//! `estudo-convert` and turn every failure into an HTML message.

pub mod error;
pub mod page;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use routes::router;
pub use state::AppState;
