use std::sync::Once;

/// Logger configuration for [`init_logging`].
///
/// With no explicit filter, `RUST_LOG` applies when set; otherwise the
/// engine defaults to info level with wgpu's internals quieted to warn
/// (they are chatty at info). `env_filter` uses `env_logger` filter syntax,
/// e.g. `"kishar_engine=debug,wgpu_core=warn"`.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: WriteStyle,
}

/// ANSI coloring behavior, mirroring `env_logger`'s write styles.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum WriteStyle {
    #[default]
    Auto,
    Always,
    Never,
}

static INIT: Once = Once::new();

/// Initializes the global logger. Idempotent; call early in `main`.
///
/// Library consumers that install their own `log` backend simply skip this.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        match config.env_filter.or_else(|| std::env::var("RUST_LOG").ok()) {
            Some(filter) => {
                builder.parse_filters(&filter);
            }
            None => {
                builder
                    .filter_level(log::LevelFilter::Info)
                    .filter_module("wgpu_core", log::LevelFilter::Warn)
                    .filter_module("wgpu_hal", log::LevelFilter::Warn);
            }
        }

        let style = match config.write_style {
            WriteStyle::Auto => env_logger::WriteStyle::Auto,
            WriteStyle::Always => env_logger::WriteStyle::Always,
            WriteStyle::Never => env_logger::WriteStyle::Never,
        };

        builder.write_style(style).init();
        log::debug!("logging initialized");
    });
}
