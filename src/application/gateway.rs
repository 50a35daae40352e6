use crate::config::GatewayConfig;
use crate::domain::card::CardTokenRequest;
use crate::domain::ports::{GatewayLibraryRef, GatewayLoaderRef};
use crate::error::{CheckoutError, GatewayLoadError, Result};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayState {
    Idle,
    Loading { url_index: usize },
    Loaded,
    Failed,
    TimedOut,
}

/// Snapshot for the view layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayStatus {
    pub state: GatewayState,
    pub retry_count: u32,
}

struct Inner {
    state: GatewayState,
    generation: u64,
    retry_count: u32,
    library: Option<GatewayLibraryRef>,
}

/// Owns the card tokenization library and the lifecycle of loading it.
///
/// Each load run is tagged with a generation. A newer `load` or `retry`
/// supersedes older runs, whose outcomes are then dropped instead of being
/// applied to the state.
pub struct GatewayClient {
    config: GatewayConfig,
    loader: GatewayLoaderRef,
    inner: Mutex<Inner>,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig, loader: GatewayLoaderRef) -> Self {
        Self {
            config,
            loader,
            inner: Mutex::new(Inner {
                state: GatewayState::Idle,
                generation: 0,
                retry_count: 0,
                library: None,
            }),
        }
    }

    /// Creates a client around a library that is already available.
    pub fn with_library(
        config: GatewayConfig,
        loader: GatewayLoaderRef,
        library: GatewayLibraryRef,
    ) -> Self {
        let mut client = Self::new(config, loader);
        client.inner.get_mut().library = Some(library);
        client
    }

    pub async fn state(&self) -> GatewayState {
        self.inner.lock().await.state
    }

    pub async fn status(&self) -> GatewayStatus {
        let inner = self.inner.lock().await;
        GatewayStatus {
            state: inner.state,
            retry_count: inner.retry_count,
        }
    }

    pub async fn is_loaded(&self) -> bool {
        self.state().await == GatewayState::Loaded
    }

    pub async fn load(&self) -> Result<()> {
        let generation = {
            let mut inner = self.inner.lock().await;
            if inner.library.is_some() {
                inner.state = GatewayState::Loaded;
                info!("Payment gateway library already loaded");
                return Ok(());
            }
            inner.generation += 1;
            inner.generation
        };
        self.run(generation).await
    }

    /// Restarts loading from the first URL after a failure or timeout.
    pub async fn retry(&self) -> Result<()> {
        let generation = {
            let mut inner = self.inner.lock().await;
            match inner.state {
                GatewayState::Failed | GatewayState::TimedOut => {}
                other => {
                    return Err(CheckoutError::InvalidTransition {
                        from: format!("gateway state {other:?}"),
                        action: "retry loading the payment gateway",
                    });
                }
            }
            inner.retry_count += 1;
            inner.generation += 1;
            inner.state = GatewayState::Loading { url_index: 0 };
            warn!(retry = inner.retry_count, "Retrying payment gateway load");
            inner.generation
        };
        self.run(generation).await
    }

    /// Exchanges card data for a single-use token.
    pub async fn tokenize(&self, card: &CardTokenRequest) -> Result<String> {
        let library = {
            let inner = self.inner.lock().await;
            match (&inner.state, &inner.library) {
                (GatewayState::Loaded, Some(library)) => library.clone(),
                _ => return Err(GatewayLoadError::NotLoaded.into()),
            }
        };

        debug!("Connecting to payment gateway");
        let token = library
            .create_card_token(&self.config.encryption_key, card)
            .await?;
        info!("Card token generated");
        Ok(token)
    }

    async fn run(&self, generation: u64) -> Result<()> {
        let total = self.config.script_urls.len();

        for (url_index, url) in self.config.script_urls.iter().enumerate() {
            self.apply(generation, |inner| {
                inner.state = GatewayState::Loading { url_index }
            })
            .await?;
            info!(
                attempt = url_index + 1,
                total,
                url = %url,
                "Loading payment gateway library"
            );

            let is_final = url_index + 1 == total;
            let attempt = if is_final {
                match tokio::time::timeout(self.config.load_timeout(), self.loader.load(url)).await
                {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(url = %url, "Timed out loading payment gateway library");
                        return self.finish(generation, GatewayState::TimedOut, None).await;
                    }
                }
            } else {
                self.loader.load(url).await
            };

            match attempt {
                Ok(library) => {
                    info!(url = %url, "Payment gateway library loaded");
                    return self
                        .finish(generation, GatewayState::Loaded, Some(library))
                        .await;
                }
                Err(err) => {
                    error!(url = %url, error = %err, "Failed to load payment gateway library");
                    if !is_final {
                        tokio::time::sleep(self.config.retry_backoff()).await;
                    }
                }
            }
        }

        error!("Every payment gateway URL failed");
        self.finish(generation, GatewayState::Failed, None).await
    }

    async fn apply(&self, generation: u64, update: impl FnOnce(&mut Inner)) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            debug!(generation, current = inner.generation, "Discarding stale gateway load");
            return Err(CheckoutError::StaleResult);
        }
        update(&mut inner);
        Ok(())
    }

    async fn finish(
        &self,
        generation: u64,
        state: GatewayState,
        library: Option<GatewayLibraryRef>,
    ) -> Result<()> {
        self.apply(generation, |inner| {
            inner.state = state;
            if let Some(library) = library {
                inner.library = Some(library);
                inner.retry_count = 0;
            }
        })
        .await?;

        match state {
            GatewayState::Loaded => Ok(()),
            GatewayState::TimedOut => Err(GatewayLoadError::TimedOut.into()),
            _ => Err(GatewayLoadError::Failed.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{GatewayLibrary, GatewayLoader};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::oneshot;

    enum Behavior {
        Load,
        Fail,
        Hang,
        Gated(oneshot::Receiver<()>),
    }

    struct TokenLibrary;

    #[async_trait]
    impl GatewayLibrary for TokenLibrary {
        async fn create_card_token(&self, key: &str, _card: &CardTokenRequest) -> Result<String> {
            Ok(format!("card_{key}"))
        }
    }

    #[derive(Default)]
    struct ScriptedLoader {
        behaviors: std::sync::Mutex<VecDeque<Behavior>>,
        calls: std::sync::Mutex<Vec<String>>,
    }

    impl ScriptedLoader {
        fn new(behaviors: Vec<Behavior>) -> Arc<Self> {
            Arc::new(Self {
                behaviors: std::sync::Mutex::new(behaviors.into()),
                calls: Default::default(),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GatewayLoader for ScriptedLoader {
        async fn load(&self, url: &str) -> Result<GatewayLibraryRef> {
            self.calls.lock().unwrap().push(url.to_string());
            let behavior = self.behaviors.lock().unwrap().pop_front();
            match behavior {
                Some(Behavior::Load) => Ok(Arc::new(TokenLibrary)),
                Some(Behavior::Hang) => std::future::pending().await,
                Some(Behavior::Gated(gate)) => {
                    let _ = gate.await;
                    Err(CheckoutError::Gateway("late failure".into()))
                }
                Some(Behavior::Fail) | None => Err(CheckoutError::Gateway("404".into())),
            }
        }
    }

    fn config(urls: &[&str]) -> GatewayConfig {
        GatewayConfig {
            script_urls: urls.iter().map(|u| u.to_string()).collect(),
            encryption_key: "ek_test".to_string(),
            ..GatewayConfig::default()
        }
    }

    fn card() -> CardTokenRequest {
        CardTokenRequest {
            number: "4111111111111111".into(),
            holder_name: "ANA".into(),
            expiration_date: "1230".into(),
            cvv: "123".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_falls_back_to_next_url() {
        let loader = ScriptedLoader::new(vec![Behavior::Fail, Behavior::Load]);
        let client = GatewayClient::new(config(&["a", "b", "c"]), loader.clone());

        let started = tokio::time::Instant::now();
        client.load().await.unwrap();

        assert_eq!(client.state().await, GatewayState::Loaded);
        assert_eq!(loader.calls(), vec!["a", "b"]);
        assert!(started.elapsed() >= Duration::from_secs(1));
        assert_eq!(client.tokenize(&card()).await.unwrap(), "card_ek_test");
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_urls_failing_ends_failed() {
        let loader = ScriptedLoader::new(vec![Behavior::Fail, Behavior::Fail, Behavior::Fail]);
        let client = GatewayClient::new(config(&["a", "b", "c"]), loader.clone());

        let result = client.load().await;

        assert!(matches!(
            result,
            Err(CheckoutError::GatewayLoad(GatewayLoadError::Failed))
        ));
        assert_eq!(client.state().await, GatewayState::Failed);
        assert_eq!(loader.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_attempt_times_out() {
        let loader = ScriptedLoader::new(vec![Behavior::Fail, Behavior::Hang]);
        let client = GatewayClient::new(config(&["a", "b"]), loader);

        let started = tokio::time::Instant::now();
        let result = client.load().await;

        assert!(matches!(
            result,
            Err(CheckoutError::GatewayLoad(GatewayLoadError::TimedOut))
        ));
        assert_eq!(client.state().await, GatewayState::TimedOut);
        assert!(started.elapsed() >= Duration::from_secs(16));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_counts_and_resets_on_success() {
        let loader = ScriptedLoader::new(vec![Behavior::Fail, Behavior::Fail, Behavior::Load]);
        let client = GatewayClient::new(config(&["a"]), loader);

        assert!(client.load().await.is_err());
        assert!(client.retry().await.is_err());
        assert_eq!(client.status().await.retry_count, 1);
        assert_eq!(client.state().await, GatewayState::Failed);

        client.retry().await.unwrap();
        let status = client.status().await;
        assert_eq!(status.state, GatewayState::Loaded);
        assert_eq!(status.retry_count, 0);
    }

    #[tokio::test]
    async fn test_retry_only_after_failure() {
        let loader = ScriptedLoader::new(vec![Behavior::Load]);
        let client = GatewayClient::new(config(&["a"]), loader);

        assert!(matches!(
            client.retry().await,
            Err(CheckoutError::InvalidTransition { .. })
        ));
        client.load().await.unwrap();
        assert!(matches!(
            client.retry().await,
            Err(CheckoutError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_existing_library_skips_loading() {
        let loader = ScriptedLoader::new(vec![]);
        let client =
            GatewayClient::with_library(config(&["a"]), loader.clone(), Arc::new(TokenLibrary));

        client.load().await.unwrap();
        assert_eq!(client.state().await, GatewayState::Loaded);
        assert!(loader.calls().is_empty());
    }

    #[tokio::test]
    async fn test_tokenize_requires_loaded_library() {
        let client = GatewayClient::new(config(&["a"]), ScriptedLoader::new(vec![]));
        assert!(matches!(
            client.tokenize(&card()).await,
            Err(CheckoutError::GatewayLoad(GatewayLoadError::NotLoaded))
        ));
    }

    #[tokio::test]
    async fn test_superseded_load_is_discarded() {
        let (release, gate) = oneshot::channel();
        let loader = ScriptedLoader::new(vec![Behavior::Gated(gate), Behavior::Load]);
        let client = Arc::new(GatewayClient::new(config(&["a"]), loader));

        let first = tokio::spawn({
            let client = client.clone();
            async move { client.load().await }
        });
        while client.state().await == GatewayState::Idle {
            tokio::task::yield_now().await;
        }

        client.load().await.unwrap();
        release.send(()).unwrap();

        assert!(matches!(
            first.await.unwrap(),
            Err(CheckoutError::StaleResult)
        ));
        assert_eq!(client.state().await, GatewayState::Loaded);
    }
}
