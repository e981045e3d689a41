use ort::execution_providers::ExecutionProviderDispatch;

/// Accelerators to register on landmark sessions, most preferred first.
///
/// ONNX Runtime falls back to the CPU provider for anything the listed
/// providers cannot run, so an empty list means plain CPU inference.
pub fn preferred_execution_providers() -> Vec<ExecutionProviderDispatch> {
    let providers = platform_providers();
    log::debug!(
        "Landmark inference providers: {}",
        if providers.is_empty() { "cpu" } else { platform_name() }
    );
    providers
}

#[cfg(target_os = "macos")]
fn platform_providers() -> Vec<ExecutionProviderDispatch> {
    vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
}

#[cfg(target_os = "windows")]
fn platform_providers() -> Vec<ExecutionProviderDispatch> {
    vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn platform_providers() -> Vec<ExecutionProviderDispatch> {
    Vec::new()
}

fn platform_name() -> &'static str {
    if cfg!(target_os = "macos") {
        "coreml"
    } else if cfg!(target_os = "windows") {
        "directml"
    } else {
        "cpu"
    }
}
