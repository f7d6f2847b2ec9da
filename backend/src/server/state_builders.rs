//! Builders wiring the configured adapters into the lifecycle service.
//!
//! The record store and intent log share a backend: PostgreSQL when a pool is
//! available, process memory otherwise. The blob store is chosen separately.
//! With reconciliation disabled, intents go to a log that records nothing.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use mockable::{Clock, DefaultClock};
use tracing::{info, warn};

use profile_registry::domain::ports::{
    BlobStore, NoOpUploadIntentLog, RecordStore, UploadIntentLog, UserLifecycleCommand,
    UserLifecycleQuery,
};
use profile_registry::domain::{OrphanReconciler, UserLifecycleService};
use profile_registry::inbound::http::state::HttpState;
use profile_registry::outbound::memory::{
    InMemoryBlobStore, InMemoryRecordStore, InMemoryUploadIntentLog,
};
use profile_registry::outbound::persistence::{DbPool, DieselRecordStore, DieselUploadIntentLog};
use profile_registry::outbound::storage::{FilesystemBlobStore, GcsBlobStore, GcsConfig};
use profile_registry::settings::{AppSettings, BlobBackend};

/// Knobs shared by every adapter combination.
#[derive(Debug, Clone, Copy)]
struct Tuning {
    max_image_bytes: usize,
    reconcile_enabled: bool,
    reconcile_grace: Duration,
    reconcile_interval: Duration,
}

impl Tuning {
    fn from_settings(settings: &AppSettings) -> io::Result<Self> {
        Ok(Self {
            max_image_bytes: settings.max_image_bytes(),
            reconcile_enabled: settings.reconcile_enabled,
            reconcile_grace: settings.reconcile_grace(),
            reconcile_interval: settings.reconcile_interval().map_err(io::Error::other)?,
        })
    }
}

/// Handler state plus the reconciler loop driving the same stores.
pub struct Assembly {
    /// State shared by every HTTP worker.
    pub http_state: HttpState,
    /// Never completes; spawn it on the server runtime. Absent when
    /// reconciliation is disabled.
    pub reconciler: Option<LocalBoxFuture<'static, ()>>,
}

fn assemble<R, B, L>(records: Arc<R>, blobs: Arc<B>, intents: Arc<L>, tuning: Tuning) -> Assembly
where
    R: RecordStore + 'static,
    B: BlobStore + 'static,
    L: UploadIntentLog + 'static,
{
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let service = Arc::new(UserLifecycleService::new(
        Arc::clone(&records),
        Arc::clone(&blobs),
        Arc::clone(&intents),
        Arc::clone(&clock),
    ));
    let http_state = HttpState::new(
        service.clone() as Arc<dyn UserLifecycleCommand>,
        service as Arc<dyn UserLifecycleQuery>,
    )
    .with_max_image_bytes(tuning.max_image_bytes);

    let reconciler = tuning.reconcile_enabled.then(|| {
        OrphanReconciler::new(records, blobs, intents, tuning.reconcile_grace)
            .run(clock, tuning.reconcile_interval)
            .boxed_local()
    });

    Assembly {
        http_state,
        reconciler,
    }
}

fn with_intent_log<R, L>(
    records: Arc<R>,
    intents: Arc<L>,
    backend: BlobBackend,
    tuning: Tuning,
) -> io::Result<Assembly>
where
    R: RecordStore + 'static,
    L: UploadIntentLog + 'static,
{
    if tuning.reconcile_enabled {
        with_blob_store(records, intents, backend, tuning)
    } else {
        warn!("orphan tracking disabled; interrupted creates may leave images behind");
        with_blob_store(records, Arc::new(NoOpUploadIntentLog), backend, tuning)
    }
}

fn with_blob_store<R, L>(
    records: Arc<R>,
    intents: Arc<L>,
    backend: BlobBackend,
    tuning: Tuning,
) -> io::Result<Assembly>
where
    R: RecordStore + 'static,
    L: UploadIntentLog + 'static,
{
    match backend {
        BlobBackend::Memory { public_base_url } => {
            warn!("blob backend is memory; images are lost on restart");
            let blobs = Arc::new(InMemoryBlobStore::new(public_base_url));
            Ok(assemble(records, blobs, intents, tuning))
        }
        BlobBackend::Filesystem {
            dir,
            public_base_url,
        } => {
            info!(dir = %dir.display(), "using filesystem blob store");
            let blobs = FilesystemBlobStore::open(&dir, public_base_url).map_err(io::Error::other)?;
            Ok(assemble(records, Arc::new(blobs), intents, tuning))
        }
        BlobBackend::Gcs {
            bucket,
            endpoint,
            access_token,
            timeout,
        } => {
            info!(bucket = %bucket, endpoint = %endpoint, "using object storage blob store");
            let blobs = GcsBlobStore::new(GcsConfig {
                bucket,
                endpoint,
                access_token,
                timeout,
            })
            .map_err(io::Error::other)?;
            Ok(assemble(records, Arc::new(blobs), intents, tuning))
        }
    }
}

/// Build handler state and reconciler from settings and an optional pool.
///
/// # Errors
///
/// Returns [`io::Error`] when a setting is invalid or a blob store cannot be
/// initialised.
pub fn build_assembly(settings: &AppSettings, pool: Option<DbPool>) -> io::Result<Assembly> {
    let tuning = Tuning::from_settings(settings)?;
    let backend = settings.blob_backend().map_err(io::Error::other)?;
    match pool {
        Some(pool) => with_intent_log(
            Arc::new(DieselRecordStore::new(pool.clone())),
            Arc::new(DieselUploadIntentLog::new(pool)),
            backend,
            tuning,
        ),
        None => {
            warn!("no database configured; user records are kept in memory");
            with_intent_log(
                Arc::new(InMemoryRecordStore::new()),
                Arc::new(InMemoryUploadIntentLog::new()),
                backend,
                tuning,
            )
        }
    }
}
