pub mod config;
pub mod dom;
pub mod error;
pub mod headless;
pub mod host;
pub mod location;
pub mod nav;
pub mod net;
pub mod search;
pub mod session;
pub mod viewer;

// Browser bindings (wasm-pack build --target web)
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::{SearchLimit, ViewerConfig};
pub use headless::HeadlessHost;
pub use host::Host;
pub use location::{Location, Routes};
pub use viewer::Viewer;
