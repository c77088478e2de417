//! Tower Middleware
//!
//! Places a [`CacheEngine`] in front of any tower service that turns
//! requests into responses, such as an HTTP client.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response};
use tower::{BoxError, Layer, Service, ServiceExt};

use crate::config::CacheOptions;
use crate::engine::CacheEngine;
use crate::error::{CacheError, Result};

/// Layer that wraps services with [`SimpleCacheService`].
#[derive(Debug, Clone)]
pub struct SimpleCacheLayer {
    engine: CacheEngine,
    options: Arc<CacheOptions>,
}

impl SimpleCacheLayer {
    /// Creates a layer backed by `engine`, applying `options` to every call.
    pub fn new(engine: CacheEngine, options: CacheOptions) -> Self {
        Self {
            engine,
            options: Arc::new(options),
        }
    }
}

impl<S> Layer<S> for SimpleCacheLayer {
    type Service = SimpleCacheService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SimpleCacheService {
            inner,
            engine: self.engine.clone(),
            options: self.options.clone(),
        }
    }
}

/// Service that answers from the cache when it can and otherwise calls
/// the inner service.
///
/// Hits and stored responses are rebuilt from the shared snapshot, so every
/// caller gets its own readable body.
#[derive(Debug, Clone)]
pub struct SimpleCacheService<S> {
    inner: S,
    engine: CacheEngine,
    options: Arc<CacheOptions>,
}

impl<S> Service<Request<Body>> for SimpleCacheService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + Sync + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
{
    type Response = Response<Body>;
    type Error = CacheError;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        // Hits never touch the inner service; it is driven to readiness per forward.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let engine = self.engine.clone();
        let options = self.options.clone();
        let inner = self.inner.clone();

        Box::pin(async move {
            let next = move |request: Request<Body>| {
                let service = inner.clone();
                async move { service.oneshot(request).await.map_err(Into::<BoxError>::into) }
            };

            engine
                .process(request, Some(&next), &options)
                .await?
                .into_response()
                .ok_or_else(|| {
                    CacheError::Downstream("downstream service returned no response".into())
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_layer_serves_second_call_from_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let transport = tower::service_fn(move |_req: Request<Body>| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, BoxError>(Response::new(Body::from("payload"))) }
        });

        let layer = SimpleCacheLayer::new(
            CacheEngine::with_clock(ManualClock::new(0)),
            CacheOptions::default(),
        );
        let service = layer.layer(transport);

        for _ in 0..3 {
            let request = Request::builder().uri("/r").body(Body::empty()).unwrap();
            let response = service.clone().oneshot(request).await.unwrap();
            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            assert_eq!(&body[..], b"payload");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_layer_propagates_inner_error() {
        let transport = tower::service_fn(|_req: Request<Body>| async {
            Err::<Response<Body>, BoxError>("connection refused".into())
        });
        let engine = CacheEngine::new();
        let service =
            SimpleCacheLayer::new(engine.clone(), CacheOptions::default()).layer(transport);

        let request = Request::builder().uri("/r").body(Body::empty()).unwrap();
        let result = service.oneshot(request).await;

        assert!(matches!(result, Err(CacheError::Downstream(_))));
        assert!(engine.is_empty().await);
    }
}
