use serde_json::Value;

/// Logging capability handed to each component.
///
/// Components never reach for a process-wide logger directly; they log through
/// whatever implementation the application (or a test) injects.
pub trait Logger: Send + Sync {
    fn info(&self, message: &str, data: Option<&Value>);
    fn warn(&self, message: &str, data: Option<&Value>);
    fn error(&self, message: &str, data: Option<&Value>);
    fn debug(&self, message: &str, data: Option<&Value>);
}

/// Forwards to `tracing`. Debug entries are dropped unless `debug_enabled`.
#[derive(Debug, Clone, Copy)]
pub struct TracingLogger {
    debug_enabled: bool,
}

impl TracingLogger {
    pub fn new(debug_enabled: bool) -> Self {
        Self { debug_enabled }
    }
}

fn render(data: Option<&Value>) -> String {
    match data {
        Some(value) => value.to_string(),
        None => String::new(),
    }
}

impl Logger for TracingLogger {
    fn info(&self, message: &str, data: Option<&Value>) {
        tracing::info!(data = %render(data), "{}", message);
    }

    fn warn(&self, message: &str, data: Option<&Value>) {
        tracing::warn!(data = %render(data), "{}", message);
    }

    fn error(&self, message: &str, data: Option<&Value>) {
        tracing::error!(data = %render(data), "{}", message);
    }

    fn debug(&self, message: &str, data: Option<&Value>) {
        if self.debug_enabled {
            tracing::debug!(data = %render(data), "{}", message);
        }
    }
}

/// Install the global `tracing` subscriber for a binary.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` applies.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    // A second init (tests, CLI re-entry) is harmless
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Shape an error for the `data` slot of a log entry
pub fn error_data(err: &dyn std::error::Error) -> Value {
    let mut chain = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    serde_json::json!({
        "message": err.to_string(),
        "causes": chain,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("outer failure")]
    struct Outer(#[source] Inner);

    #[derive(Debug, thiserror::Error)]
    #[error("inner failure")]
    struct Inner;

    #[test]
    fn error_data_walks_source_chain() {
        let data = error_data(&Outer(Inner));
        assert_eq!(data["message"], "outer failure");
        assert_eq!(data["causes"][0], "inner failure");
    }
}
