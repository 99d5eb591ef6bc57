//! # Kiosk Admin
//!
//! JSON administration API. Edits the configuration file and reports each
//! change to a [`kiosk_core::KioskControl`].

mod error;
mod handlers;
mod routes;
mod server;
mod state;

pub use error::{AdminError, ErrorResponse};
pub use handlers::{
    DisplayDefaults, DisplayUpdate, HealthResponse, NewDisplay, ReloadResponse, TabEdit,
    TabQuery,
};
pub use routes::create_router;
pub use server::{AdminConfig, AdminServer};
pub use state::AdminState;
