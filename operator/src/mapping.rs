//! Controller of Compass Mappings: deregisters runtimes of deleted Kymas.

use crate::{manager::Context, telemetry};
use chrono::Utc;
use common::{ClusterKey, Error, Result, mapping::CompassManagerMapping};
use kube::runtime::controller::Action;
use opentelemetry::trace::TraceId;
use std::sync::Arc;
use tracing::{Span, field, instrument, warn};

#[instrument(skip(ctx, mapping), fields(trace_id))]
pub async fn reconcile(mapping: Arc<CompassManagerMapping>, ctx: Arc<Context>) -> Result<Action> {
    let trace_id = telemetry::get_trace_id();
    if trace_id != TraceId::INVALID {
        Span::current().record("trace_id", field::display(&trace_id));
    }
    let _mes = ctx.metrics.mapping.count_and_measure(&trace_id);
    ctx.diagnostics.write().await.last_event = Utc::now();
    let key = ClusterKey::from_resource(mapping.as_ref());
    ctx.orchestrator
        .finalize(ctx.control_plane.as_ref(), key)
        .await
        .map(Action::from)
}

#[must_use]
pub fn error_policy(mapping: Arc<CompassManagerMapping>, error: &Error, ctx: Arc<Context>) -> Action {
    let key = ClusterKey::from_resource(mapping.as_ref());
    warn!("deregistration failed for {key}: {error}");
    ctx.metrics.mapping.reconcile_failure(&key, error);
    Action::requeue(ctx.orchestrator.requeue())
}
