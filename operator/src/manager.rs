use crate::{
    Config, Metrics,
    collaborators::DryRunner,
    controlplane::{ControlPlane, KubeControlPlane},
    filter, kyma, mapping,
    orchestrator::Orchestrator,
};
use chrono::{DateTime, Utc};
use common::{context::get_reporter, kyma::Kyma, mapping::CompassManagerMapping};
use futures::{FutureExt, StreamExt, TryStreamExt, future::BoxFuture};
use kube::{
    ResourceExt,
    api::{Api, ListParams},
    client::Client,
    runtime::{
        WatchStreamExt,
        controller::Controller,
        events::Reporter,
        reflector::{self, ObjectRef},
        utils::{Predicate, predicates},
        watcher,
        watcher::Config as WatcherConfig,
    },
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

// Context for our reconcilers
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client
    pub client: Client,
    /// Diagnostics read by the web server
    pub diagnostics: Arc<RwLock<Diagnostics>>,
    /// Prometheus metrics
    pub metrics: Metrics,
    /// Store of Kymas, kubeconfigs and Compass Mappings
    pub control_plane: Arc<dyn ControlPlane>,
    pub orchestrator: Orchestrator,
}

/// Diagnostics to be exposed by the web server
#[derive(Clone, Serialize)]
pub struct Diagnostics {
    pub last_event: DateTime<Utc>,
    #[serde(skip)]
    pub reporter: Reporter,
}
impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            last_event: Utc::now(),
            reporter: get_reporter(),
        }
    }
}

/// Data owned by the Manager
#[derive(Clone, Default)]
pub struct Manager {
    /// Diagnostics populated by the reconcilers
    diagnostics: Arc<RwLock<Diagnostics>>,
    metrics: Metrics,
}

/// Manager that owns the Kyma and the Compass Mapping controllers
impl Manager {
    /// Lifecycle initialization interface for app
    ///
    /// This returns a `Manager` that drives both controllers + their futures to be awaited.
    /// It is up to `main` to wait for the controller streams.
    pub async fn new(config: &Config) -> (Self, BoxFuture<'static, ()>, BoxFuture<'static, ()>) {
        let client = Client::try_default().await.expect("create client");
        let manager = Manager::default();
        let runner = Arc::new(DryRunner);
        let context = Arc::new(Context {
            client: client.clone(),
            metrics: manager.metrics.clone(),
            diagnostics: manager.diagnostics.clone(),
            control_plane: Arc::new(KubeControlPlane::new(client.clone())),
            orchestrator: Orchestrator::new(
                runner.clone(),
                runner,
                config.reconcile(),
                manager.metrics.compass.clone(),
            ),
        });

        let kymas = Api::<Kyma>::all(client.clone());
        let mappings = Api::<CompassManagerMapping>::all(client);
        // Ensure CRDs are installed before loop-watching
        let _r = kymas
            .list(&ListParams::default().limit(1))
            .await
            .expect("is the Kyma crd installed?");
        let _r = mappings
            .list(&ListParams::default().limit(1))
            .await
            .expect("is the crd installed? please run: cargo run --bin crdgen | kubectl apply -f -");

        let (reader, writer) = reflector::store();
        let kyma_changes = watcher(kymas.clone(), WatcherConfig::default().any_semantic())
            .default_backoff()
            .reflect(writer)
            .applied_objects()
            .predicate_filter(
                predicates::generation
                    .combine(predicates::labels)
                    .combine(predicates::annotations),
            )
            .try_filter(|kyma| futures::future::ready(filter::should_reconcile(kyma)));
        let controller_kyma = Controller::for_stream(kyma_changes, reader)
            .run(kyma::reconcile, kyma::error_policy, context.clone())
            .filter_map(|x| async move { std::result::Result::ok(x) })
            .for_each(|_| futures::future::ready(()))
            .boxed();

        // Kyma deletions are followed up on the mapping of the same name
        let controller_mapping = Controller::new(mappings, WatcherConfig::default().any_semantic())
            .watches(kymas, WatcherConfig::default().any_semantic(), |kyma| {
                let ns = kyma.namespace()?;
                filter::should_finalize(&kyma)
                    .then(|| ObjectRef::<CompassManagerMapping>::new(&kyma.name_any()).within(&ns))
            })
            .run(mapping::reconcile, mapping::error_policy, context)
            .filter_map(|x| async move { std::result::Result::ok(x) })
            .for_each(|_| futures::future::ready(()))
            .boxed();

        (manager, controller_kyma, controller_mapping)
    }

    /// Metrics getter
    #[must_use]
    pub fn metrics(&self) -> String {
        self.metrics.encode()
    }

    /// State getter
    pub async fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.read().await.clone()
    }
}
