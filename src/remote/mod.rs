//! Remote track lookup and download
//!
//! The platform itself is reached through a [`RemoteClient`]; the
//! [`Resolver`] and [`Fetcher`] layer validation, timeouts, stream
//! selection, temporary storage and encoding on top of it.

pub mod client;
pub mod fetcher;
pub mod link;
pub mod models;
pub mod resolver;
pub mod ytdlp;

pub use client::{ClientError, RemoteClient};
pub use fetcher::{FetchError, FetchedTrack, Fetcher};
pub use link::{extract_video_id, validate_url};
pub use models::{AudioStream, RemoteTrack, TrackInfo};
pub use resolver::{ResolveError, Resolver};
pub use ytdlp::YtDlpClient;
