//! Runtime integration for modelrelay.
//!
//! - [`model_list`]: reqwest adapter for the core model-list port
//! - [`refresh`]: tracked background registry refresh
//! - [`router`]: router supervisor and the standalone entry point

pub mod model_list;
pub mod refresh;
pub mod router;

pub use model_list::HttpModelListClient;
pub use refresh::{ModelRefresher, RefreshHandle};
pub use router::{
    RouterConfig, RouterStatus, RouterSupervisor, SupervisorError, run_router,
};
