//! Controller of Kyma runtimes: drives registration and configuration.

use crate::{filter, manager::Context, telemetry};
use chrono::Utc;
use common::{ClusterKey, Error, Result, kyma::Kyma};
use kube::runtime::controller::Action;
use opentelemetry::trace::TraceId;
use std::sync::Arc;
use tracing::{Span, debug, field, instrument, warn};

#[instrument(skip(ctx, kyma), fields(trace_id))]
pub async fn reconcile(kyma: Arc<Kyma>, ctx: Arc<Context>) -> Result<Action> {
    let trace_id = telemetry::get_trace_id();
    if trace_id != TraceId::INVALID {
        Span::current().record("trace_id", field::display(&trace_id));
    }
    let _mes = ctx.metrics.kyma.count_and_measure(&trace_id);
    ctx.diagnostics.write().await.last_event = Utc::now();
    let key = ClusterKey::from_resource(kyma.as_ref());
    // requeued passes bypass the watch filter
    if !filter::should_reconcile(&kyma) {
        debug!("Kyma {key} does not use the application connector, skipping");
        return Ok(Action::await_change());
    }
    ctx.orchestrator
        .run_pass(ctx.control_plane.as_ref(), key)
        .await
        .map(Action::from)
}

#[must_use]
pub fn error_policy(kyma: Arc<Kyma>, error: &Error, ctx: Arc<Context>) -> Action {
    let key = ClusterKey::from_resource(kyma.as_ref());
    warn!("reconcile failed for Kyma {key}: {error}");
    ctx.metrics.kyma.reconcile_failure(&key, error);
    Action::requeue(ctx.orchestrator.requeue())
}
