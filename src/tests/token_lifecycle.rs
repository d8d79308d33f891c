#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::errors::KitError;
    use crate::tests::common::{token_config, StubTokenEndpoint};
    use crate::token::{TokenCache, TokenSnapshot};

    #[tokio::test]
    async fn first_get_returns_initial_token() {
        let stub = StubTokenEndpoint::default();
        let (cache, snapshot) = TokenCache::initialize(stub.clone(), token_config("http://stub/token", 300))
            .await
            .unwrap();

        assert_eq!(snapshot.token(), "tok-1");
        assert_eq!(cache.get_token(&snapshot).await, "tok-1");
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn refresh_happens_exactly_at_threshold() {
        let stub = StubTokenEndpoint::default();
        let (cache, snapshot) = TokenCache::initialize(stub.clone(), token_config("http://stub/token", 100))
            .await
            .unwrap();
        let threshold = snapshot.generated_at_ms() + 80_000;
        assert_eq!(snapshot.expires_at_ms(), snapshot.generated_at_ms() + 100_000);

        for now in [snapshot.generated_at_ms(), threshold - 5_000, threshold - 1] {
            assert_eq!(cache.get_token_at(&snapshot, now).await, "tok-1");
        }
        assert_eq!(stub.calls(), 1);

        assert_eq!(cache.get_token_at(&snapshot, threshold).await, "tok-2");
        assert_eq!(stub.calls(), 2);

        // the new token starts a new lifetime
        assert_eq!(cache.get_token_at(&snapshot, threshold + 1).await, "tok-2");
        assert_eq!(stub.calls(), 2);
        let refreshed = cache.snapshot().await.unwrap();
        assert_eq!(refreshed.generated_at_ms(), threshold);
        assert_eq!(refreshed.expires_at_ms(), threshold + 100_000);
    }

    #[tokio::test]
    async fn failed_refresh_returns_stale_token() {
        let stub = StubTokenEndpoint::default();
        let (cache, snapshot) = TokenCache::initialize(stub.clone(), token_config("http://stub/token", 10))
            .await
            .unwrap();
        stub.set_failing(true);

        let late = snapshot.generated_at_ms() + 9_000;
        assert_eq!(cache.get_token_at(&snapshot, late).await, "tok-1");
        assert_eq!(stub.calls(), 2);
        assert!(matches!(cache.force_refresh().await, Err(KitError::Generation(_))));

        stub.set_failing(false);
        assert_eq!(cache.force_refresh().await.unwrap(), "tok-4");
        assert_eq!(cache.get_token(&snapshot).await, "tok-4");
    }

    #[tokio::test]
    async fn worker_adopts_handed_off_snapshot() {
        let issuer = StubTokenEndpoint::default();
        let (_, snapshot) = TokenCache::initialize(issuer, token_config("http://stub/token", 300))
            .await
            .unwrap();
        let wire = snapshot.to_json().unwrap();

        let worker_endpoint = StubTokenEndpoint::default();
        let worker_cache = TokenCache::new(worker_endpoint.clone());
        assert!(worker_cache.snapshot().await.is_none());

        let received = TokenSnapshot::from_json(&wire).unwrap();
        assert_eq!(worker_cache.get_token(&received).await, "tok-1");
        assert_eq!(worker_endpoint.calls(), 0);
        assert!(worker_cache.snapshot().await.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_calls_adopt_once() {
        let issuer = StubTokenEndpoint::default();
        let (_, snapshot) = TokenCache::initialize(issuer, token_config("http://stub/token", 300))
            .await
            .unwrap();

        let worker_endpoint = StubTokenEndpoint::default();
        let cache = Arc::new(TokenCache::new(worker_endpoint.clone()));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let snapshot = snapshot.clone();
            handles.push(tokio::spawn(async move { cache.get_token(&snapshot).await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), "tok-1");
        }
        assert_eq!(worker_endpoint.calls(), 0);
        assert_eq!(cache.snapshot().await.unwrap().token(), "tok-1");
    }

    #[tokio::test]
    async fn force_refresh_without_state_fails() {
        let cache = TokenCache::new(StubTokenEndpoint::default());
        assert!(matches!(cache.force_refresh().await, Err(KitError::Generation(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_refresh() {
        let stub = StubTokenEndpoint::with_delay(20);
        let (cache, snapshot) = TokenCache::initialize(stub.clone(), token_config("http://stub/token", 60))
            .await
            .unwrap();
        let cache = Arc::new(cache);
        let now = snapshot.generated_at_ms() + 59_000;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let snapshot = snapshot.clone();
            handles.push(tokio::spawn(async move { cache.get_token_at(&snapshot, now).await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), "tok-2");
        }
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn initialize_rejects_incomplete_config() {
        let stub = StubTokenEndpoint::default();
        let mut config = token_config("", 60);
        config.credentials = None;

        match TokenCache::initialize(stub.clone(), config).await {
            Err(KitError::Config(msg)) => {
                assert!(msg.contains("token.url"));
                assert!(msg.contains("credentials"));
            }
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(_) => panic!("initialize should fail"),
        }
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn initialize_fails_when_first_generation_fails() {
        let stub = StubTokenEndpoint::default();
        stub.set_failing(true);
        let result = TokenCache::initialize(stub.clone(), token_config("http://stub/token", 60)).await;
        assert!(matches!(result, Err(KitError::Initialization(_))));
        assert_eq!(stub.calls(), 1);
    }
}
