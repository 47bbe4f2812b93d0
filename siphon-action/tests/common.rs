use std::sync::OnceLock;

use siphon_common::observability::{LogConfig, LogFormat};

static INIT: OnceLock<()> = OnceLock::new();

pub fn init_test_tracing() {
    INIT.get_or_init(|| {
        let config = LogConfig {
            app_name: "siphon-tests",
            emit_stderr: true,
            format: if std::env::var("SIPHON_LOG_FORMAT")
                .map(|raw| raw.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false)
            {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            default_filter: "debug",
            ..LogConfig::default()
        };

        let _ = siphon_common::observability::init_logging(config);
    });
}
