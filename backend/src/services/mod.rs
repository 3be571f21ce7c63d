pub mod channel_resolver;
pub mod elasticsearch_service;
pub mod observer;
pub mod pipeline;
pub mod search_service;
pub mod transcript_cache;
pub mod transcript_fetcher;
pub mod video_lister;
pub mod youtube_api;

#[cfg(test)]
pub mod testing;
