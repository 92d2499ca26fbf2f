//! Front-end process: the externally exposed side.
//!
//! # Data Flow
//! ```text
//! Node port → front-end listener
//!     → server.rs (/, /state, /config.json, /static, /admin)
//!     → page.rs (display state → HTML)
//! ```

pub mod admin;
pub mod page;
pub mod server;

pub use page::PageTemplate;
pub use server::{build_frontend_router, FrontendServer, FrontendState, RuntimeConfig};
