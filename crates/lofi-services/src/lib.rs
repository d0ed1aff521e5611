//! HTTP clients for every remote service the album pipeline talks to:
//! music synthesis, image generation and outpainting, chat text, video
//! synthesis, static-asset hosting, and the upload target.
//!
//! Each client owns its `reqwest::Client`, reads its configuration from
//! the environment through a `*Config::from_env()` constructor, and
//! keeps its wire structs private. Long-running remote work goes
//! through the shared waiter in `lofi_jobs`.

pub mod chat;
pub mod hosting;
pub mod image;
pub mod music;
pub mod video;
pub mod youtube;

pub use chat::ChatClient;
pub use hosting::{AssetHost, HostingConfig};
pub use image::{ImageClient, OpenAiConfig};
pub use music::{ClipAudio, ClipStatus, MusicClient, MusicConfig};
pub use video::{TaskInfo, VideoClient, VideoConfig};
pub use youtube::{YoutubeClient, YoutubeConfig};
