//! Dependency resolution for optional importer extensions.
//!
//! The viewer does not know up front which importer extensions are already
//! active. [`DependencyResolver::ensure`] checks every requested extension on
//! the shared [`ExtensionHost`], issues one load per missing extension (all in
//! flight at once) and calls the continuation exactly once after every load has
//! settled:
//!
//! - nothing missing: the continuation runs synchronously inside `ensure`;
//! - every load succeeded: `Ok(())`;
//! - at least one load failed: [`ResolveError::Failed`] with the failed ids;
//! - a timeout was configured and elapsed first: [`ResolveError::TimedOut`].
//!
//! The loads are driven by the future returned in [`Resolution::Pending`]; the
//! caller hands it to [`crate::platform::spawn`].

use std::{fmt::Debug, pin::pin, sync::Arc, time::Duration};

use futures::{
    StreamExt,
    future::{Either, select},
    stream::FuturesUnordered,
};

use crate::{
    error::{ResolveError, ViewerError},
    platform::{self, BoxedFuture, MaybeSend, MaybeSync},
};

/// The runtime-extensible library the resolver checks extensions against.
pub trait ExtensionHost: MaybeSend + MaybeSync {
    /// Whether the extension `id` is already active.
    fn has(&self, id: &str) -> bool;
    /// Start loading `id`. The request is issued when this is called, the
    /// returned future reports its outcome.
    fn load(&self, id: &str) -> BoxedFuture<'static, anyhow::Result<()>>;
}

/// One extension that was missing when a resolution pass started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTarget {
    pub identifier: String,
    pub present: bool,
    pub request_issued: bool,
}

impl LoadTarget {
    fn new(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            present: false,
            request_issued: false,
        }
    }
}

pub type ResolveResult = Result<(), ResolveError>;

/// What `ensure` left behind.
pub enum Resolution {
    /// Everything was present and the continuation has already run.
    Ready,
    /// Loads were issued for `requested`; `completion` settles them and then
    /// calls the continuation. It must be driven to completion.
    Pending {
        requested: Vec<String>,
        completion: BoxedFuture<'static, ()>,
    },
}

impl Resolution {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Ids of the extensions a load was issued for.
    pub fn requested(&self) -> &[String] {
        match self {
            Self::Ready => &[],
            Self::Pending { requested, .. } => requested,
        }
    }

    pub fn into_future(self) -> Option<BoxedFuture<'static, ()>> {
        match self {
            Self::Ready => None,
            Self::Pending { completion, .. } => Some(completion),
        }
    }
}

impl Debug for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => f.write_str("Ready"),
            Self::Pending { requested, .. } => f
                .debug_struct("Pending")
                .field("requested", requested)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Clone)]
pub struct DependencyResolver {
    host: Arc<dyn ExtensionHost>,
    timeout: Option<Duration>,
}

impl Debug for DependencyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyResolver")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl DependencyResolver {
    pub fn new(host: Arc<dyn ExtensionHost>) -> Self {
        Self {
            host,
            timeout: None,
        }
    }

    /// Give up on loads that have not settled after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Make sure every extension in `extensions` is active, then call `continuation`.
    ///
    /// Presence is re-checked on every call, so extensions loaded by an earlier
    /// pass are not requested again. Duplicate ids are requested once.
    pub fn ensure<F>(&self, extensions: &[&str], continuation: F) -> Resolution
    where
        F: FnOnce(ResolveResult) + MaybeSend + 'static,
    {
        let mut targets: Vec<LoadTarget> = Vec::new();
        for id in extensions {
            let present = self.host.has(id);
            log::info!(
                "[Diagnostic] Extension {id}: {}",
                if present { "present" } else { "missing" }
            );
            if !present && !targets.iter().any(|t| t.identifier == *id) {
                targets.push(LoadTarget::new(id));
            }
        }

        if targets.is_empty() {
            log::info!("[Diagnostic] All extensions present, continuing");
            continuation(Ok(()));
            return Resolution::Ready;
        }

        let requests = FuturesUnordered::new();
        for target in targets.iter_mut() {
            log::info!("[Diagnostic] Loading extension {}", target.identifier);
            let id = target.identifier.clone();
            let load = self.host.load(&id);
            target.request_issued = true;
            requests.push(platform::boxed(async move { (id, load.await) }));
        }
        let requested = targets.iter().map(|t| t.identifier.clone()).collect();

        let mut pass = Pass {
            targets,
            requests,
            settled: 0,
            failed: Vec::new(),
        };
        let timeout = self.timeout;
        let completion = platform::boxed(async move {
            let timed_out = match timeout {
                None => {
                    pass.drain().await;
                    false
                }
                Some(timeout) => {
                    let drained = pin!(pass.drain());
                    let deadline = pin!(platform::sleep(timeout));
                    matches!(select(drained, deadline).await, Either::Right(_))
                }
            };
            continuation(pass.outcome(timed_out));
        });

        Resolution::Pending {
            requested,
            completion,
        }
    }
}

/// Book-keeping of one resolution pass.
struct Pass {
    targets: Vec<LoadTarget>,
    requests: FuturesUnordered<BoxedFuture<'static, (String, anyhow::Result<()>)>>,
    settled: usize,
    failed: Vec<String>,
}

impl Pass {
    async fn drain(&mut self) {
        while let Some((id, result)) = self.requests.next().await {
            self.settle(id, result);
        }
    }

    fn settle(&mut self, id: String, result: anyhow::Result<()>) {
        self.settled += 1;
        match result {
            Ok(()) => {
                log::info!("[Diagnostic] Extension {id} loaded");
                if let Some(target) = self.targets.iter_mut().find(|t| t.identifier == id) {
                    target.present = true;
                }
            }
            Err(e) => {
                log::error!("{}", ViewerError::load_failure(&id, &e));
                self.failed.push(id);
            }
        }
        log::debug!("{}/{} extension loads settled", self.settled, self.targets.len());
    }

    fn outcome(self, timed_out: bool) -> ResolveResult {
        if timed_out && self.settled < self.targets.len() {
            let pending: Vec<String> = self
                .targets
                .iter()
                .filter(|t| !t.present && !self.failed.contains(&t.identifier))
                .map(|t| t.identifier.clone())
                .collect();
            log::error!("[Diagnostic] Gave up waiting for extensions {pending:?}");
            return Err(ResolveError::TimedOut {
                pending,
                failed: self.failed,
            });
        }
        if self.failed.is_empty() {
            log::info!("[Diagnostic] All extensions loaded, continuing");
            Ok(())
        } else {
            Err(ResolveError::Failed {
                failed: self.failed,
            })
        }
    }
}
