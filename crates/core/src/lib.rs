//! Draw and reveal engine. Keep this crate free of IO and platform concerns.

pub mod clock;
pub mod config;
pub mod draw;
pub mod events;
pub mod history;
pub mod icons;
pub mod reveal;
pub mod rng;
pub mod roster;
pub mod session;
pub mod store;

pub use clock::*;
pub use config::*;
pub use draw::*;
pub use events::*;
pub use history::*;
pub use icons::*;
pub use reveal::*;
pub use rng::*;
pub use roster::*;
pub use session::*;
pub use store::*;
