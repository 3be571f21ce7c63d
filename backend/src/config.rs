use crate::services::channel_resolver::ChannelResolver;
use crate::services::elasticsearch_service::ElasticStore;
use crate::services::observer::{LogObserver, PipelineObserver};
use crate::services::pipeline::SearchPipeline;
use crate::services::search_service::{SearchEngine, DEFAULT_CONTEXT_CHARS};
use crate::services::transcript_cache::{ChannelStore, MemoryStore, TranscriptCache};
use crate::services::transcript_fetcher::{
    LanguageOrder, LanguagePolicy, TranscriptFetcher, YtTranscriptSource,
};
use crate::services::video_lister::VideoLister;
use crate::services::youtube_api::{
    ChannelLookup, DataApiClient, VideoPlatform, DEFAULT_API_URL, MAX_PAGE_SIZE,
};
use crate::utils::split_list;
use crate::AppState;
use anyhow::{anyhow, Context, Result};
use elasticsearch::{
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    Elasticsearch,
};
use env_logger::{Builder, Env};
use log::{info, LevelFilter};
use rocket::http::Method;
use rocket_cors::{AllowedHeaders, AllowedOrigins, CorsOptions};
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// `STORAGE_URL` value that keeps everything in process memory.
pub const MEMORY_STORAGE: &str = "memory://";

/// Runtime settings, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub youtube_api_key: String,
    pub youtube_api_url: Url,
    pub storage_url: String,
    pub channel_index: String,
    pub transcript_index: String,
    pub channel_lookup: ChannelLookup,
    /// `None` lists every upload in the window.
    pub max_videos: Option<usize>,
    pub page_size: u32,
    pub language_policy: LanguagePolicy,
    pub snippet_context_chars: usize,
    pub fetch_concurrency: usize,
    pub upstream_timeout: Duration,
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset and blank keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let youtube_api_key = get("YOUTUBE_API_KEY")
            .ok_or_else(|| anyhow!("YOUTUBE_API_KEY environment variable must be set"))?;

        let youtube_api_url = get("YOUTUBE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let youtube_api_url = Url::parse(&youtube_api_url)
            .with_context(|| format!("YOUTUBE_API_URL is not a valid URL: {youtube_api_url}"))?;

        let default_policy = LanguagePolicy::default();
        let languages = get("TRANSCRIPT_LANGUAGES")
            .map(|v| split_list(&v))
            .filter(|l| !l.is_empty())
            .unwrap_or(default_policy.languages);

        let max_videos = parse_or("MAX_VIDEOS_PER_LISTING", get("MAX_VIDEOS_PER_LISTING"), 0usize)?;
        let page_size = parse_or("LISTING_PAGE_SIZE", get("LISTING_PAGE_SIZE"), MAX_PAGE_SIZE)?;
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(anyhow!("LISTING_PAGE_SIZE must be between 1 and {MAX_PAGE_SIZE}"));
        }
        let fetch_concurrency = parse_or(
            "TRANSCRIPT_FETCH_CONCURRENCY",
            get("TRANSCRIPT_FETCH_CONCURRENCY"),
            4usize,
        )?;
        if fetch_concurrency == 0 {
            return Err(anyhow!("TRANSCRIPT_FETCH_CONCURRENCY must be at least 1"));
        }
        let timeout_secs = parse_or("UPSTREAM_TIMEOUT_SECS", get("UPSTREAM_TIMEOUT_SECS"), 15u64)?;
        if timeout_secs == 0 {
            return Err(anyhow!("UPSTREAM_TIMEOUT_SECS must be at least 1"));
        }

        Ok(Config {
            youtube_api_key,
            youtube_api_url,
            storage_url: get("STORAGE_URL").unwrap_or_else(|| "http://localhost:9200".to_string()),
            channel_index: get("CHANNEL_INDEX").unwrap_or_else(|| "channels".to_string()),
            transcript_index: get("TRANSCRIPT_INDEX").unwrap_or_else(|| "transcripts".to_string()),
            channel_lookup: parse_or("CHANNEL_LOOKUP", get("CHANNEL_LOOKUP"), ChannelLookup::Handle)?,
            max_videos: (max_videos > 0).then_some(max_videos),
            page_size,
            language_policy: LanguagePolicy {
                languages,
                order: parse_or(
                    "TRANSCRIPT_LANGUAGE_ORDER",
                    get("TRANSCRIPT_LANGUAGE_ORDER"),
                    LanguageOrder::ManualFirst,
                )?,
                allow_generated: parse_or(
                    "TRANSCRIPT_ALLOW_GENERATED",
                    get("TRANSCRIPT_ALLOW_GENERATED"),
                    default_policy.allow_generated,
                )?,
            },
            snippet_context_chars: parse_or(
                "SNIPPET_CONTEXT_CHARS",
                get("SNIPPET_CONTEXT_CHARS"),
                DEFAULT_CONTEXT_CHARS,
            )?,
            fetch_concurrency,
            upstream_timeout: Duration::from_secs(timeout_secs),
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or_else(|| vec!["http://localhost:5173".to_string()]),
        })
    }

    pub fn uses_memory_storage(&self) -> bool {
        self.storage_url == MEMORY_STORAGE
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{key} has an invalid value '{raw}': {e}")),
    }
}

/// Info level by default; `RUST_LOG` overrides.
pub fn init_logger() {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_env(Env::default())
        .init();
    info!("Starting channel search backend...");
}

pub fn load_environment() {
    dotenv::dotenv().ok();
}

pub fn create_elasticsearch_client(url: &str) -> Result<Elasticsearch> {
    info!("Connecting to Elasticsearch at: {url}");

    let transport = TransportBuilder::new(SingleNodeConnectionPool::new(url.parse()?)).build()?;

    Ok(Elasticsearch::new(transport))
}

/// Storage handles for both tables; one backend serves both.
async fn create_storage(config: &Config) -> Result<(Arc<dyn ChannelStore>, Arc<dyn TranscriptCache>)> {
    if config.uses_memory_storage() {
        info!("Using in-memory storage; cached transcripts are lost on restart");
        let store = MemoryStore::shared();
        return Ok((store.clone(), store));
    }

    let client = create_elasticsearch_client(&config.storage_url)?;
    let store = Arc::new(ElasticStore::new(
        client,
        config.channel_index.clone(),
        config.transcript_index.clone(),
    ));
    store
        .ensure_schema()
        .await
        .context("Failed to prepare Elasticsearch indices")?;
    Ok((store.clone(), store))
}

pub async fn create_app_state(config: &Config) -> Result<AppState> {
    let (channels, transcripts) = create_storage(config).await?;

    let platform: Arc<dyn VideoPlatform> = Arc::new(DataApiClient::new(
        config.youtube_api_url.clone(),
        config.youtube_api_key.clone(),
        config.upstream_timeout,
    )?);
    let observer: Arc<dyn PipelineObserver> = Arc::new(LogObserver);

    let resolver = ChannelResolver::new(
        platform.clone(),
        channels,
        observer.clone(),
        config.channel_lookup,
    );
    let pipeline = SearchPipeline::new(
        VideoLister::new(platform, config.page_size, config.max_videos),
        TranscriptFetcher::new(
            Arc::new(YtTranscriptSource::new()?),
            config.language_policy.clone(),
            config.upstream_timeout,
        ),
        transcripts,
        SearchEngine::new(config.snippet_context_chars),
        observer,
        config.fetch_concurrency,
    );

    Ok(AppState { resolver, pipeline })
}

pub fn create_cors(allowed_origins: &[String]) -> Result<rocket_cors::Cors> {
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::some_exact(allowed_origins))
        .allowed_methods(
            vec![Method::Get, Method::Post, Method::Options]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .allowed_headers(AllowedHeaders::some(&["Accept", "Content-Type"]))
        .to_cors()
        .map_err(|e| anyhow!("Failed to create CORS options: {}", e))?;

    Ok(cors)
}
