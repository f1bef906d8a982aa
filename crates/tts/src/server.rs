use std::sync::Arc;

use futures::StreamExt;
use hanzi_cache::{AudioCache, content_key};

use crate::{
    error::TtsError,
    flight::SingleFlight,
    http_client::http_client,
    provider::{SpeechSynthesizer, TokenProvider, baidu_token::BaiduTokenProvider, baidu_tts::BaiduSynthesizer},
    types::{CacheStatus, SpeechRequest, SpeechResponse, SynthesisParams},
};

/// Credential source and synthesizer for cache misses
#[derive(Clone)]
struct Upstream {
    tokens: Arc<dyn TokenProvider>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
}

/// TTS server: serves audio from the cache and fills it on misses
pub struct Server {
    cache: AudioCache,
    upstream: Option<Upstream>,
    params: SynthesisParams,
    flights: Option<SingleFlight>,
}

impl Server {
    /// Server that can only serve cached audio until an upstream is attached
    pub fn new(cache: AudioCache) -> Self {
        Self {
            cache,
            upstream: None,
            params: SynthesisParams::default(),
            flights: Some(SingleFlight::new()),
        }
    }

    /// Attach the credential provider and synthesizer used on cache misses
    #[must_use]
    pub fn with_upstream(mut self, tokens: Arc<dyn TokenProvider>, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.upstream = Some(Upstream { tokens, synthesizer });
        self
    }

    #[must_use]
    pub const fn with_params(mut self, params: SynthesisParams) -> Self {
        self.params = params;
        self
    }

    /// Toggle coalescing of concurrent misses for identical text
    #[must_use]
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.flights = enabled.then(SingleFlight::new);
        self
    }

    pub const fn cache(&self) -> &AudioCache {
        &self.cache
    }

    /// Produce audio for `request`
    ///
    /// Serves the cached clip unless it is missing or the request skips the
    /// cache; otherwise fetches a token, synthesizes, and stores the clip
    /// before serving it from the cache.
    pub async fn speak(&self, request: &SpeechRequest) -> crate::error::Result<SpeechResponse> {
        let text = request.text.as_str();

        if text.is_empty() {
            return Err(TtsError::InvalidInput("Missing text parameter".to_string()));
        }

        let key = content_key(text);
        tracing::info!(%text, cache_key = %key, skip_cache = request.skip_cache, "audio requested");

        let cache_status = if request.skip_cache {
            CacheStatus::Bypass
        } else if self.cache.has(&key).await {
            CacheStatus::Hit
        } else {
            // A miss observed just after an identical flight landed synthesizes again
            CacheStatus::Miss
        };

        if cache_status == CacheStatus::Hit {
            tracing::info!(%text, cache_key = %key, "serving audio from cache");
        } else {
            self.generate(text, &key).await?;
        }

        let body = self.cache.stream(&key).await.map_err(|e| {
            tracing::error!(%text, cache_key = %key, stage = "read_cache", "failed to open cached audio: {e}");
            TtsError::from(e)
        })?;

        Ok(SpeechResponse::new(key, cache_status, body))
    }

    async fn generate(&self, text: &str, key: &str) -> crate::error::Result<()> {
        let Some(ref upstream) = self.upstream else {
            tracing::warn!(%text, stage = "acquire_token", "no speech provider configured");
            return Err(TtsError::ServiceUnavailable("No speech provider configured".to_string()));
        };

        let work = synthesize_into_cache(
            upstream.clone(),
            self.cache.clone(),
            self.params,
            text.to_string(),
            key.to_string(),
        );

        match self.flights {
            Some(ref flights) => flights.run(key, work).await,
            None => work.await,
        }
    }
}

/// Fetch a token, synthesize `text`, and stream the audio into the cache
async fn synthesize_into_cache(
    upstream: Upstream,
    cache: AudioCache,
    params: SynthesisParams,
    text: String,
    key: String,
) -> crate::error::Result<()> {
    let token = upstream.tokens.fetch().await.inspect_err(|e| {
        tracing::warn!(%text, cache_key = %key, stage = "acquire_token", "speech service unavailable: {e}");
    })?;

    tracing::info!(%text, provider = upstream.synthesizer.name(), "requesting speech synthesis");

    let mut audio = upstream
        .synthesizer
        .synthesize(&text, &token, &params)
        .await
        .inspect_err(|e| {
            tracing::error!(%text, cache_key = %key, stage = "synthesize", "{e}");
        })?;

    let mut writer = cache.writer(&key).await.inspect_err(|e| {
        tracing::error!(%text, cache_key = %key, stage = "write_cache", "{e}");
    })?;

    // Dropping the writer on any early return discards the partial file
    while let Some(chunk) = audio.next().await {
        let chunk = chunk.inspect_err(|e| {
            tracing::error!(%text, cache_key = %key, stage = "synthesize", "{e}");
        })?;

        writer.write_chunk(&chunk).await.inspect_err(|e| {
            tracing::error!(%text, cache_key = %key, stage = "write_cache", "{e}");
        })?;
    }

    if writer.bytes_written() == 0 {
        tracing::error!(%text, cache_key = %key, stage = "synthesize", "provider returned empty audio");
        return Err(TtsError::SynthesisFailed("Provider returned empty audio".to_string()));
    }

    let bytes = writer.commit().await.inspect_err(|e| {
        tracing::error!(%text, cache_key = %key, stage = "write_cache", "{e}");
    })?;

    tracing::info!(%text, cache_key = %key, bytes, "audio generated");
    Ok(())
}

/// Builder for constructing the TTS server from configuration
pub struct TtsServerBuilder<'a> {
    config: &'a hanzi_config::Config,
}

impl<'a> TtsServerBuilder<'a> {
    pub const fn new(config: &'a hanzi_config::Config) -> Self {
        Self { config }
    }

    pub async fn build(self) -> crate::error::Result<Server> {
        let tts = &self.config.tts;

        let cache = AudioCache::open(&tts.cache_dir)
            .await
            .map_err(|e| TtsError::ConfigError(format!("Failed to open audio cache: {e}")))?;

        let mut server = Server::new(cache).with_single_flight(tts.single_flight);

        if let Some(ref baidu) = tts.baidu {
            tracing::debug!("Initializing Baidu speech provider");

            let client = http_client(tts.request_timeout())
                .map_err(|e| TtsError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

            let mut tokens = BaiduTokenProvider::new(
                client.clone(),
                baidu.token_url.clone(),
                baidu.client_id.clone(),
                baidu.client_secret.clone(),
            );
            if baidu.cache_token {
                tokens = tokens.with_token_cache();
            }

            let synthesizer = BaiduSynthesizer::new(
                "baidu".to_string(),
                client,
                baidu.synthesis_url.clone(),
                baidu.cuid.clone(),
            );

            server = server
                .with_upstream(Arc::new(tokens), Arc::new(synthesizer))
                .with_params(baidu.voice.into());
        } else {
            tracing::warn!("No speech provider configured, only cached audio will be served");
        }

        tracing::debug!(cache_dir = %tts.cache_dir.display(), "TTS server initialized");

        Ok(server)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Mutex,
            atomic::{AtomicU32, Ordering},
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::stream;
    use http_body_util::BodyExt;

    use super::*;
    use crate::types::{AccessToken, AudioStream, CACHE_STATUS_HEADER};

    #[derive(Default)]
    struct FakeTokens {
        calls: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl TokenProvider for FakeTokens {
        async fn fetch(&self) -> crate::error::Result<AccessToken> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(TtsError::ServiceUnavailable("credentials rejected".to_string()))
            } else {
                Ok(AccessToken::new("token", None))
            }
        }
    }

    enum Reply {
        Audio(Vec<&'static str>),
        JsonError,
        BrokenStream,
    }

    struct FakeSynth {
        calls: AtomicU32,
        reply: Reply,
        delay: Duration,
        seen: Mutex<Vec<(String, SynthesisParams)>>,
    }

    impl FakeSynth {
        fn new(reply: Reply) -> Self {
            Self {
                calls: AtomicU32::new(0),
                reply,
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for FakeSynth {
        async fn synthesize(
            &self,
            text: &str,
            _token: &AccessToken,
            params: &SynthesisParams,
        ) -> crate::error::Result<AudioStream> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push((text.to_string(), *params));
            tokio::time::sleep(self.delay).await;

            match self.reply {
                Reply::Audio(ref chunks) => {
                    let chunks: Vec<_> = chunks
                        .iter()
                        .copied()
                        .map(|c| Ok::<_, TtsError>(Bytes::from_static(c.as_bytes())))
                        .collect();
                    Ok(stream::iter(chunks).boxed())
                }
                Reply::JsonError => Err(TtsError::SynthesisFailed(
                    r#"{"err_no":500,"err_msg":"notsupport."}"#.to_string(),
                )),
                Reply::BrokenStream => Ok(stream::iter(vec![
                    Ok(Bytes::from_static(b"half")),
                    Err(TtsError::SynthesisFailed("connection reset".to_string())),
                ])
                .boxed()),
            }
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        tokens: Arc<FakeTokens>,
        synth: Arc<FakeSynth>,
        server: Arc<Server>,
    }

    async fn fixture_with(tokens: FakeTokens, synth: FakeSynth, single_flight: bool) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(dir.path()).await.unwrap();
        let tokens = Arc::new(tokens);
        let synth = Arc::new(synth);

        let server = Server::new(cache)
            .with_upstream(tokens.clone(), synth.clone())
            .with_single_flight(single_flight);

        Fixture {
            _dir: dir,
            tokens,
            synth,
            server: Arc::new(server),
        }
    }

    async fn fixture(reply: Reply) -> Fixture {
        fixture_with(FakeTokens::default(), FakeSynth::new(reply), true).await
    }

    async fn body(response: SpeechResponse) -> (http::HeaderMap, Bytes) {
        let response = response.into_response();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (headers, bytes)
    }

    #[tokio::test]
    async fn empty_text_is_rejected_without_outbound_calls() {
        let f = fixture(Reply::Audio(vec!["mp3"])).await;

        let err = f.server.speak(&SpeechRequest::new("")).await.unwrap_err();

        assert!(matches!(err, TtsError::InvalidInput(_)));
        assert_eq!(f.tokens.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.synth.calls(), 0);
    }

    #[tokio::test]
    async fn cache_hit_serves_stored_bytes_without_outbound_calls() {
        let f = fixture(Reply::Audio(vec!["fresh"])).await;
        f.server.cache().write(&content_key("你好"), b"stored-audio").await.unwrap();

        let response = f.server.speak(&SpeechRequest::new("你好")).await.unwrap();
        assert_eq!(response.cache_status, CacheStatus::Hit);

        let (headers, bytes) = body(response).await;
        assert_eq!(&bytes[..], b"stored-audio");
        assert!(hanzi_core::headers::is_no_cache(&headers));
        assert_eq!(headers[http::header::CONTENT_TYPE], "audio/mpeg");
        assert_eq!(headers[CACHE_STATUS_HEADER], "hit");
        assert_eq!(f.tokens.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.synth.calls(), 0);
    }

    #[tokio::test]
    async fn miss_then_hit_returns_identical_audio() {
        let f = fixture(Reply::Audio(vec!["ID3", "-frames"])).await;
        let request = SpeechRequest::new("学");

        let first = f.server.speak(&request).await.unwrap();
        assert_eq!(first.cache_status, CacheStatus::Miss);
        let (headers, first_bytes) = body(first).await;
        assert!(hanzi_core::headers::is_no_cache(&headers));

        let second = f.server.speak(&request).await.unwrap();
        assert_eq!(second.cache_status, CacheStatus::Hit);
        let (_, second_bytes) = body(second).await;

        assert_eq!(&first_bytes[..], b"ID3-frames");
        assert_eq!(first_bytes, second_bytes);
        assert_eq!(f.tokens.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.synth.calls(), 1);
    }

    #[tokio::test]
    async fn skip_cache_resynthesizes_and_overwrites() {
        let f = fixture(Reply::Audio(vec!["new-audio"])).await;
        let key = content_key("书");
        f.server.cache().write(&key, b"old-audio").await.unwrap();

        let response = f.server.speak(&SpeechRequest::new("书").skipping_cache()).await.unwrap();
        assert_eq!(response.cache_status, CacheStatus::Bypass);

        let (_, bytes) = body(response).await;
        assert_eq!(&bytes[..], b"new-audio");
        assert_eq!(f.synth.calls(), 1);
        assert_eq!(&f.server.cache().read(&key).await.unwrap()[..], b"new-audio");
    }

    #[tokio::test]
    async fn token_failure_is_service_unavailable_and_skips_synthesis() {
        let tokens = FakeTokens {
            fail: true,
            ..FakeTokens::default()
        };
        let f = fixture_with(tokens, FakeSynth::new(Reply::Audio(vec!["mp3"])), true).await;

        let err = f.server.speak(&SpeechRequest::new("猫")).await.unwrap_err();

        assert!(matches!(err, TtsError::ServiceUnavailable(_)));
        assert_eq!(f.synth.calls(), 0);
        assert!(!f.server.cache().has(&content_key("猫")).await);
    }

    #[tokio::test]
    async fn provider_error_body_fails_without_cache_write() {
        let f = fixture(Reply::JsonError).await;

        let err = f.server.speak(&SpeechRequest::new("狗")).await.unwrap_err();

        assert!(matches!(err, TtsError::SynthesisFailed(_)));
        assert!(!f.server.cache().has(&content_key("狗")).await);
    }

    #[tokio::test]
    async fn interrupted_stream_leaves_no_entry() {
        let f = fixture(Reply::BrokenStream).await;

        let err = f.server.speak(&SpeechRequest::new("鱼")).await.unwrap_err();

        assert!(matches!(err, TtsError::SynthesisFailed(_)));
        assert!(!f.server.cache().has(&content_key("鱼")).await);
    }

    #[tokio::test]
    async fn empty_audio_is_a_synthesis_failure() {
        let f = fixture(Reply::Audio(Vec::new())).await;

        let err = f.server.speak(&SpeechRequest::new("鸟")).await.unwrap_err();

        assert!(matches!(err, TtsError::SynthesisFailed(_)));
        assert!(!f.server.cache().has(&content_key("鸟")).await);
    }

    #[tokio::test]
    async fn failure_on_bypass_keeps_previous_entry() {
        let f = fixture(Reply::JsonError).await;
        let key = content_key("花");
        f.server.cache().write(&key, b"old-audio").await.unwrap();

        let err = f.server.speak(&SpeechRequest::new("花").skipping_cache()).await;

        assert!(err.is_err());
        assert_eq!(&f.server.cache().read(&key).await.unwrap()[..], b"old-audio");
    }

    #[tokio::test]
    async fn configured_params_reach_the_synthesizer() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(dir.path()).await.unwrap();
        let synth = Arc::new(FakeSynth::new(Reply::Audio(vec!["mp3"])));
        let params = SynthesisParams {
            speed: 2,
            pitch: 8,
            volume: 10,
            person: 0,
        };

        let server = Server::new(cache)
            .with_upstream(Arc::new(FakeTokens::default()), synth.clone())
            .with_params(params);

        server.speak(&SpeechRequest::new("月")).await.unwrap();

        let seen = synth.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[("月".to_string(), params)]);
    }

    #[tokio::test]
    async fn without_upstream_misses_are_unavailable_but_hits_work() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(dir.path()).await.unwrap();
        cache.write(&content_key("一"), b"yi").await.unwrap();
        let server = Server::new(cache);

        let err = server.speak(&SpeechRequest::new("二")).await.unwrap_err();
        assert!(matches!(err, TtsError::ServiceUnavailable(_)));

        let (_, bytes) = body(server.speak(&SpeechRequest::new("一")).await.unwrap()).await;
        assert_eq!(&bytes[..], b"yi");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_misses_share_one_synthesis() {
        let mut synth = FakeSynth::new(Reply::Audio(vec!["shared"]));
        synth.delay = Duration::from_millis(200);
        let f = fixture_with(FakeTokens::default(), synth, true).await;

        let requests = (0..5).map(|_| {
            let server = Arc::clone(&f.server);
            tokio::spawn(async move { server.speak(&SpeechRequest::new("家")).await.map(|r| r.cache_key) })
        });

        for handle in requests.collect::<Vec<_>>() {
            assert_eq!(handle.await.unwrap().unwrap(), content_key("家"));
        }

        assert_eq!(f.synth.calls(), 1);
        assert_eq!(f.tokens.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn without_single_flight_each_miss_calls_upstream() {
        let mut synth = FakeSynth::new(Reply::Audio(vec!["dup"]));
        synth.delay = Duration::from_millis(200);
        let f = fixture_with(FakeTokens::default(), synth, false).await;

        let a = {
            let server = Arc::clone(&f.server);
            tokio::spawn(async move { server.speak(&SpeechRequest::new("门")).await.map(|_| ()) })
        };
        let b = {
            let server = Arc::clone(&f.server);
            tokio::spawn(async move { server.speak(&SpeechRequest::new("门")).await.map(|_| ()) })
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(f.synth.calls(), 2);
        assert_eq!(&f.server.cache().read(&content_key("门")).await.unwrap()[..], b"dup");
    }
}
