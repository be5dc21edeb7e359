//! Tracing subscriber setup.

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Installs the global subscriber. Output goes to stderr so it never mixes
/// with a transcript printed on stdout.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), InitError> {
    tracing::subscriber::set_global_default(build_subscriber(config, std::io::stderr))?;
    Ok(())
}

/// Builds the subscriber for the configured format, writing to `writer`.
pub fn build_subscriber<W>(config: &LoggingConfig, writer: W) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(config))
        .with_writer(writer)
        .with_target(true);

    match config.format {
        LogFormat::Json => Box::new(builder.json().finish()),
        LogFormat::Pretty => Box::new(builder.pretty().finish()),
    }
}

/// `RUST_LOG` wins over the configured level; an unparseable level falls
/// back to `info`.
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn capture_one_event(format: LogFormat) -> String {
        let config = LoggingConfig {
            level: "debug".to_string(),
            format,
        };
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = build_subscriber(&config, move || writer.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(chunks = 3, "Turn completed");
        });
        captured.text()
    }

    #[test]
    fn invalid_level_falls_back_to_info() {
        let config = LoggingConfig {
            level: "fixit_client=loud".to_string(),
            ..Default::default()
        };
        if std::env::var("RUST_LOG").is_err() {
            assert_eq!(build_filter(&config).to_string(), "info");
        }
    }

    #[test]
    fn pretty_format_spans_several_lines() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let output = capture_one_event(LogFormat::Pretty);

        assert!(output.contains("Turn completed"));
        assert!(output.trim_end().lines().count() > 1, "got: {:?}", output);
    }

    #[test]
    fn json_format_is_one_object_per_line() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let output = capture_one_event(LogFormat::Json);

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 1);
        let event: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(event["fields"]["message"], "Turn completed");
        assert_eq!(event["fields"]["chunks"], 3);
    }

    #[test]
    fn second_init_reports_error() {
        let config = LoggingConfig::default();
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
