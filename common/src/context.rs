use kube::runtime::events::Reporter;

fn get_prog_name() -> Option<String> {
    std::env::current_exe()
        .ok()?
        .file_name()?
        .to_str()?
        .to_owned()
        .into()
}

/// Field manager used for every write against the control plane
pub fn get_client_name() -> String {
    match get_prog_name() {
        Some(p) if p == "operator" => "controller.compass-manager.kyma-project.io".to_string(),
        _ => "compass-manager.kyma-project.io".to_string(),
    }
}

pub fn get_short_name() -> String {
    let long = get_client_name();
    let lst = long.split('.').collect::<Vec<&str>>();
    if lst.len() > 3 {
        format!("{}-{}", lst[1], lst[0])
    } else {
        "compass-manager".to_string()
    }
}

pub fn get_reporter() -> Reporter {
    Reporter {
        controller: get_short_name(),
        instance: Some(std::env::var("POD_NAME").unwrap_or_else(|_| "unknown".to_string())),
    }
}
