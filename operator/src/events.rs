use kube::runtime::events::{Event, EventType};

#[must_use]
pub fn registered(kyma: &str, runtime_id: &str) -> Event {
    Event {
        type_: EventType::Normal,
        reason: "Registered".to_string(),
        note: Some(format!("Runtime `{runtime_id}` registered in compass for `{kyma}` Kyma")),
        action: "Registering".to_string(),
        secondary: None,
    }
}

#[must_use]
pub fn configured(kyma: &str, runtime_id: &str) -> Event {
    Event {
        type_: EventType::Normal,
        reason: "Configured".to_string(),
        note: Some(format!("Compass runtime agent configured for runtime `{runtime_id}` of `{kyma}` Kyma")),
        action: "Configuring".to_string(),
        secondary: None,
    }
}

#[must_use]
pub fn deregistered(kyma: &str, runtime_id: &str) -> Event {
    Event {
        type_: EventType::Normal,
        reason: "Deregistered".to_string(),
        note: Some(format!("Runtime `{runtime_id}` of deleted `{kyma}` Kyma removed from compass")),
        action: "Deregistering".to_string(),
        secondary: None,
    }
}

#[must_use]
pub fn failed(kyma: &str, action: &str, error: &str) -> Event {
    Event {
        type_: EventType::Warning,
        reason: format!("{action}Failed"),
        note: Some(format!("{action} `{kyma}` Kyma failed: {error}")),
        action: action.to_string(),
        secondary: None,
    }
}
