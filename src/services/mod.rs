//! External collaborators behind narrow contracts: persistence, video
//! library, ELAN interchange, exports and the dev remote API.

pub mod elan;
pub mod export;
pub mod library;
pub mod persistence;
pub mod server;

pub use library::{VideoEntry, VideoLibrary, VideoStatus};
pub use persistence::{Autosaver, SessionSnapshot};
pub use server::{ApiCommand, ApiServer};
