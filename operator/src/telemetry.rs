use opentelemetry::trace::TraceId;

/// Fetch the opentelemetry trace id of the current span
///
/// Returns [`TraceId::INVALID`] when no OpenTelemetry layer is installed.
pub fn get_trace_id() -> TraceId {
    use opentelemetry::trace::TraceContextExt as _;
    use tracing_opentelemetry::OpenTelemetrySpanExt as _;

    tracing::Span::current()
        .context()
        .span()
        .span_context()
        .trace_id()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_trace_without_layer() {
        assert_eq!(get_trace_id(), TraceId::INVALID);
    }
}
