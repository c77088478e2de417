//! Cache Engine
//!
//! Decides, per request, whether a stored response can answer it, and
//! otherwise forwards the request and stores the result.
//!
//! # Flow
//! 1. Methods outside the allow-list are forwarded with no caching at all
//! 2. Read the `Cache-Control` and `Authorization` headers (invalid text is
//!    rejected before anything is forwarded)
//! 3. Parse directives and derive the key
//! 4. `no-cache` removes any stored entry
//! 5. A fresh entry is returned without forwarding
//! 6. Otherwise forward; unless `no-store`, materialize and store the result

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CACHE_CONTROL},
        HeaderName, Request, Response,
    },
};
use tokio::sync::RwLock;
use tower::BoxError;
use tracing::{debug, warn};

use crate::cache::{
    derive_key, CacheStats, Clock, DirectiveSet, EntryStore, SharedResponse, SystemClock,
};
use crate::config::CacheOptions;
use crate::error::{CacheError, Result};

// == Downstream Continuation ==
/// Future returned by a downstream stage.
pub type ForwardFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<Response<Body>, BoxError>> + Send + 'a>>;

/// The next stage of the pipeline, usually the transport.
pub trait Next: Send + Sync {
    fn run(&self, request: Request<Body>) -> ForwardFuture<'_>;
}

impl<F, Fut> Next for F
where
    F: Fn(Request<Body>) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<Response<Body>, BoxError>> + Send + 'static,
{
    fn run(&self, request: Request<Body>) -> ForwardFuture<'_> {
        Box::pin((self)(request))
    }
}

// == Outcome ==
/// What the engine produced for one request.
#[derive(Debug)]
pub enum Outcome {
    /// Served from a fresh stored entry; nothing was forwarded
    Hit(SharedResponse),
    /// Forwarded, materialized and stored
    Stored(SharedResponse),
    /// Forwarded and returned untouched (pass-through or `no-store`)
    Forwarded(Response<Body>),
    /// No downstream stage was supplied; the request is handed back as-is
    Unforwarded(Request<Body>),
}

impl Outcome {
    /// Converts the outcome into a response, if there is one.
    pub fn into_response(self) -> Option<Response<Body>> {
        match self {
            Outcome::Hit(shared) | Outcome::Stored(shared) => Some(shared.to_response()),
            Outcome::Forwarded(response) => Some(response),
            Outcome::Unforwarded(_) => None,
        }
    }

    /// The shared handle for hits and stores.
    pub fn shared(&self) -> Option<&SharedResponse> {
        match self {
            Outcome::Hit(shared) | Outcome::Stored(shared) => Some(shared),
            _ => None,
        }
    }

    /// Returns true if the response came from a stored entry.
    pub fn is_hit(&self) -> bool {
        matches!(self, Outcome::Hit(_))
    }
}

// == Request Headers ==
/// The two headers the engine reads, as owned text.
#[derive(Debug, Default)]
struct RequestHeaders {
    cache_control: Option<String>,
    authorization: Option<String>,
}

impl RequestHeaders {
    /// Reads the headers, rejecting values that are not visible ASCII.
    ///
    /// Lossy decoding would map distinct credentials to the same key, so
    /// such values are refused rather than repaired.
    ///
    /// Repeated `Cache-Control` headers are joined with commas.
    fn read(request: &Request<Body>) -> Result<Self> {
        let mut cache_control: Option<String> = None;
        for value in request.headers().get_all(CACHE_CONTROL) {
            let value = header_text(&CACHE_CONTROL, value.to_str())?;
            cache_control = Some(match cache_control {
                Some(joined) => format!("{joined},{value}"),
                None => value.to_string(),
            });
        }

        let authorization = request
            .headers()
            .get(AUTHORIZATION)
            .map(|value| header_text(&AUTHORIZATION, value.to_str()).map(str::to_string))
            .transpose()?;

        Ok(Self {
            cache_control,
            authorization,
        })
    }
}

fn header_text<'a, E>(name: &HeaderName, value: std::result::Result<&'a str, E>) -> Result<&'a str> {
    value.map_err(|_| {
        CacheError::InvalidArgument(format!("the {name} header is not valid visible ASCII text"))
    })
}

// == Cache Engine ==
/// The caching decision engine.
///
/// Clones share the same store, so one engine can be handed to every part
/// of a pipeline. Construct a new engine for an independent, empty cache.
#[derive(Debug, Clone)]
pub struct CacheEngine {
    /// Shared entry store
    store: Arc<RwLock<EntryStore>>,
    /// Time source for entry timestamps and expiry
    clock: Arc<dyn Clock>,
}

impl Default for CacheEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheEngine {
    /// Creates an empty engine that reads the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Creates an empty engine with the given time source.
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            store: Arc::new(RwLock::new(EntryStore::new())),
            clock: Arc::new(clock),
        }
    }

    // == Process ==
    /// Runs one request through the cache.
    ///
    /// # Arguments
    /// * `request` - The outgoing request
    /// * `next` - The downstream stage; `None` makes the engine hand the
    ///   request back on a miss
    /// * `options` - Default lifetime and method allow-list for this call
    ///
    /// # Errors
    /// - [`CacheError::InvalidArgument`] if an allow-listed request's
    ///   `Cache-Control` or `Authorization` is not visible ASCII; nothing
    ///   is forwarded. Other methods pass through without header checks.
    /// - [`CacheError::Downstream`] if the downstream stage fails or its
    ///   body cannot be drained; nothing is stored
    pub async fn process(
        &self,
        request: Request<Body>,
        next: Option<&dyn Next>,
        options: &CacheOptions,
    ) -> Result<Outcome> {
        if !options.allows(request.method()) {
            debug!(
                method = %request.method(),
                uri = %request.uri(),
                "method not cached, passing through"
            );
            return forward(request, next)
                .await
                .map(|forwarded| forwarded.map_or_else(Outcome::Unforwarded, Outcome::Forwarded));
        }

        let headers = RequestHeaders::read(&request)?;
        let directives =
            DirectiveSet::parse(headers.cache_control.as_deref(), options.max_age_seconds());
        let key = derive_key(
            request.method(),
            &request.uri().to_string(),
            headers.authorization.as_deref(),
        );

        {
            let mut store = self.store.write().await;
            if directives.no_cache {
                store.invalidate(&key);
            }
            let now = self.clock.now_ms();
            if let Some(entry) = store.lookup_within(&key, now, directives.max_age_seconds) {
                debug!(key = %key, "cache hit");
                return Ok(Outcome::Hit(entry.payload.clone()));
            }
        }
        debug!(key = %key, no_cache = directives.no_cache, "cache miss");

        let response = match forward(request, next).await? {
            Ok(response) => response,
            Err(request) => return Ok(Outcome::Unforwarded(request)),
        };

        if directives.no_store {
            debug!(key = %key, "no-store requested, response not cached");
            return Ok(Outcome::Forwarded(response));
        }

        let shared = EntryStore::materialize(response).await?;
        let now = self.clock.now_ms();
        self.store
            .write()
            .await
            .put(key, shared.clone(), now, directives.max_age_seconds);

        Ok(Outcome::Stored(shared))
    }

    // == Management ==
    /// Returns current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    /// Number of stored entries, expired ones not yet looked up included.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Returns true if no entries are stored.
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    /// Drops every stored entry.
    pub async fn reset(&self) {
        self.store.write().await.reset();
    }
}

/// Runs the downstream stage. `Ok(Err(request))` means there was none.
async fn forward(
    request: Request<Body>,
    next: Option<&dyn Next>,
) -> Result<std::result::Result<Response<Body>, Request<Body>>> {
    let Some(next) = next else {
        return Ok(Err(request));
    };

    match next.run(request).await {
        Ok(response) => Ok(Ok(response)),
        Err(err) => {
            warn!(error = %err, "downstream request failed");
            Err(CacheError::Downstream(err))
        }
    }
}
