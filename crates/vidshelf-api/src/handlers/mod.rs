pub mod events;
pub mod media_stream;
pub mod upload;
pub mod videos;
