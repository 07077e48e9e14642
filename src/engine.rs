// Dispatch engine for idox
// One request per sequence token, bounded by a semaphore, responses persisted to disk

use crate::error::IdoxError;
use crate::injection::{locate, substitute, InjectionSite};
use crate::models::{Protocol, Request};
use crate::parsers::split_request;
use crate::persist::{ArtifactStore, LinkMode};
use crate::sequences::Sequence;
use crate::stats::{RunStatistics, StatsRecorder};
use crate::transport::{PreparedRequest, ReqwestTransport, Transport};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

pub const DEFAULT_INJECTION_POINT: &str = "{INJECT}";
pub const DEFAULT_MAX_CONCURRENCY: usize = 25;

/// Error histogram key for a response that could not be written to disk.
pub const PERSIST_ERROR: &str = "PersistError";
/// Error histogram key for a dispatch task that panicked.
pub const TASK_PANICKED: &str = "TaskPanicked";

/// Run configuration. Exactly one of `request_text`, `request_file` and
/// `request_url` must be set.
#[derive(Debug, Clone)]
pub struct Options {
    /// Literal raw HTTP request.
    pub request_text: Option<String>,
    /// Path to a file holding one raw HTTP request.
    pub request_file: Option<PathBuf>,
    /// Bare target URL, sent with `request_method` and nothing else.
    pub request_url: Option<String>,
    pub request_method: String,
    pub protocol: Protocol,
    pub output_directory: PathBuf,
    pub max_concurrency: usize,
    pub injection_point: String,
    /// Per-request timeout for the default reqwest transport.
    pub request_timeout: Option<Duration>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            request_text: None,
            request_file: None,
            request_url: None,
            request_method: "GET".to_string(),
            protocol: Protocol::Https,
            output_directory: PathBuf::from("./output"),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            injection_point: DEFAULT_INJECTION_POINT.to_string(),
            request_timeout: None,
        }
    }
}

/// State shared by every dispatch task.
struct DispatchContext {
    template: Request,
    site: InjectionSite,
    marker: String,
    protocol: Protocol,
    transport: Arc<dyn Transport>,
    store: ArtifactStore,
    stats: StatsRecorder,
}

impl DispatchContext {
    async fn dispatch(&self, token: &str) {
        let request = substitute(&self.template, self.site, &self.marker, token);
        let prepared = PreparedRequest::new(&request, self.protocol, self.site);

        let response = match self.transport.execute(&prepared).await {
            Ok(response) => response,
            Err(e) => {
                warn!(token, kind = %e.kind, error = %e.message, "request failed");
                self.stats.record_error(e.kind.as_str());
                return;
            }
        };

        match self.store.persist(token, &response).await {
            Ok(artifact) => {
                debug!(
                    token,
                    status = response.status,
                    extension = %artifact.extension,
                    path = %artifact.canonical.display(),
                    "saved artifact"
                );
                self.stats.record_code(response.status);
            }
            Err(e) => {
                warn!(token, status = response.status, error = %e, "failed to save artifact");
                self.stats.record_error(PERSIST_ERROR);
            }
        }
    }
}

/// The enumeration fetcher. Built once per run; `run` consumes it.
pub struct Idox {
    sequence: Box<dyn Sequence>,
    ctx: Arc<DispatchContext>,
    max_concurrency: usize,
}

impl Idox {
    /// Build an engine that talks HTTP through reqwest.
    pub fn new(sequence: impl Sequence + 'static, options: Options) -> Result<Self, IdoxError> {
        let transport = ReqwestTransport::new(options.request_timeout)?;
        Self::with_transport(sequence, options, Arc::new(transport))
    }

    /// Build an engine around a caller-supplied transport.
    ///
    /// Parses the template, finds the injection site and prepares the output
    /// directory. Any failure here is fatal and nothing is dispatched.
    pub fn with_transport(
        sequence: impl Sequence + 'static,
        options: Options,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, IdoxError> {
        if options.max_concurrency == 0 || options.max_concurrency > Semaphore::MAX_PERMITS {
            return Err(IdoxError::InvalidConcurrency);
        }

        let template = load_template(&options)?;
        let site = locate(&template, &options.injection_point)?;
        let store = ArtifactStore::prepare(&options.output_directory).map_err(|source| {
            IdoxError::OutputDirectory {
                path: options.output_directory.clone(),
                source,
            }
        })?;

        let ctx = DispatchContext {
            template,
            site,
            marker: options.injection_point,
            protocol: options.protocol,
            transport,
            store,
            stats: StatsRecorder::new(),
        };

        Ok(Self {
            sequence: Box::new(sequence),
            ctx: Arc::new(ctx),
            max_concurrency: options.max_concurrency,
        })
    }

    pub fn template(&self) -> &Request {
        &self.ctx.template
    }

    pub fn injection_site(&self) -> InjectionSite {
        self.ctx.site
    }

    pub fn output_directory(&self) -> &Path {
        self.ctx.store.root()
    }

    pub fn link_mode(&self) -> LinkMode {
        self.ctx.store.link_mode()
    }

    /// The request that would be sent for `token`, before wire conversion.
    pub fn build_request(&self, token: &str) -> Request {
        substitute(&self.ctx.template, self.ctx.site, &self.ctx.marker, token)
    }

    /// Dispatch one request per token and wait for all of them.
    ///
    /// A permit is taken before each task is spawned, so at most
    /// `max_concurrency` requests are in flight. Finished tasks are reaped
    /// while scheduling, so the task set stays bounded by the limit too. Failed requests are counted,
    /// never retried, and never stop the run.
    pub async fn run(self) -> RunStatistics {
        let Idox {
            mut sequence,
            ctx,
            max_concurrency,
        } = self;

        info!(
            template = %ctx.template.url,
            site = %ctx.site,
            max_concurrency,
            link_mode = ?ctx.store.link_mode(),
            output = %ctx.store.root().display(),
            "starting run"
        );

        let limiter = Arc::new(Semaphore::new(max_concurrency));
        let mut tasks = JoinSet::new();
        let mut scheduled: u64 = 0;

        while let Some(token) = sequence.next_token() {
            let permit = match Arc::clone(&limiter).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            while let Some(joined) = tasks.try_join_next() {
                reap(&ctx, joined);
            }
            let ctx = Arc::clone(&ctx);
            tasks.spawn(async move {
                let _permit = permit;
                ctx.dispatch(&token).await;
            });
            scheduled += 1;
        }

        while let Some(joined) = tasks.join_next().await {
            reap(&ctx, joined);
        }

        let stats = ctx.stats.snapshot();
        info!(
            scheduled,
            responses = stats.total_responses(),
            errors = stats.total_errors(),
            "finished run"
        );
        stats
    }
}

fn reap(ctx: &DispatchContext, joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        warn!(error = %e, "dispatch task panicked");
        ctx.stats.record_error(TASK_PANICKED);
    }
}

fn load_template(options: &Options) -> Result<Request, IdoxError> {
    match (&options.request_text, &options.request_file, &options.request_url) {
        (Some(text), None, None) => split_request(text),
        (None, Some(path), None) => {
            let text = std::fs::read_to_string(path).map_err(|source| IdoxError::RequestFileRead {
                path: path.clone(),
                source,
            })?;
            split_request(&text)
        }
        (None, None, Some(url)) => Ok(Request::from_url(url.clone(), &options.request_method)),
        (None, None, None) => Err(IdoxError::NoRequestSource),
        _ => Err(IdoxError::ConflictingRequestSources),
    }
}
