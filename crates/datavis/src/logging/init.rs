use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "datavis=debug,wgpu=warn"). When unset, `RUST_LOG` is consulted.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    /// Debug output for this crate, warnings for the GPU stack.
    pub fn verbose() -> Self {
        Self {
            env_filter: Some("datavis=debug,wgpu=warn,winit=warn".to_string()),
            ..Self::default()
        }
    }
}

static INIT: Once = Once::new();

/// Installs the global logger once.
///
/// Subsequent calls are ignored, as are calls made after some other logger
/// was installed. Intended usage is early in `main`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }

        builder.write_style(config.write_style);

        if builder.try_init().is_err() {
            log::warn!("a logger was already installed; keeping it");
            return;
        }

        log::debug!("logging initialized");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Capture(Mutex<Vec<String>>);

    impl log::Log for Capture {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            self.0.lock().unwrap().push(record.args().to_string());
        }

        fn flush(&self) {}
    }

    static CAPTURE: Capture = Capture(Mutex::new(Vec::new()));

    // The only test installing a global logger.
    #[test]
    fn existing_logger_is_kept() {
        log::set_logger(&CAPTURE).unwrap();
        log::set_max_level(log::LevelFilter::Trace);

        init_logging(LoggingConfig::verbose());
        init_logging(LoggingConfig::default());
        log::info!("after init");

        let lines = CAPTURE.0.lock().unwrap();
        assert_eq!(
            lines
                .iter()
                .filter(|l| *l == "a logger was already installed; keeping it")
                .count(),
            1
        );
        assert!(lines.iter().any(|l| l == "after init"));
    }
}
