use std::env;

use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;
use tracing_subscriber::{fmt, EnvFilter, FmtSubscriber, Registry};

// 设置日志
pub async fn setup_logging() -> anyhow::Result<()> {
    let app_env = env::var("APP_ENV").unwrap_or_else(|_| "LOCAL".to_string());

    if app_env == "LOCAL" {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_ansi(true)
            .with_target(false)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_level(true)
            .with_writer(std::io::stdout)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let info_file = RollingFileAppender::new(Rotation::DAILY, "log_files", "info.log");
        let error_file = RollingFileAppender::new(Rotation::DAILY, "log_files", "error.log");

        let (info_non_blocking, _info_guard) = tracing_appender::non_blocking(info_file);
        let (error_non_blocking, _error_guard) = tracing_appender::non_blocking(error_file);

        let subscriber = Registry::default()
            .with(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_level(true)
                    .with_writer(info_non_blocking)
                    .with_filter(EnvFilter::new("info")),
            )
            .with(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_level(true)
                    .with_writer(error_non_blocking)
                    .with_filter(EnvFilter::new("error")),
            );

        tracing::subscriber::set_global_default(subscriber)?;
    }

    // enable log crate to show sql logs
    if "true" == env::var("DB_DEBUG").unwrap_or_default() {
        fast_log::init(
            fast_log::Config::new()
                .console()
                .level(log::LevelFilter::Debug),
        )
        .expect("fast_log init error");
    }
    Ok(())
}
