//! Logging Infrastructure
//!
//! Structured logging setup for development and production:
//! - console output, pretty or JSON
//! - daily rotating application logs (deleted after [`LOG_RETENTION_DAYS`])
//! - daily payment audit logs (target `payment_audit`, never deleted)
//! - daily security logs (target `security`, never deleted)

use std::fs;
use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, prelude::*};

/// Application log retention
pub const LOG_RETENTION_DAYS: i64 = 14;

/// Target used for payment state changes
pub const PAYMENT_AUDIT_TARGET: &str = "payment_audit";

/// Target used by [`crate::security_log!`]
pub const SECURITY_TARGET: &str = "security";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// 日志配置
///
/// | 环境变量 | 默认值 |
/// |----------|--------|
/// | LOG_LEVEL | info |
/// | LOG_JSON | false |
/// | LOG_DIR | (仅控制台) |
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: String,
    pub json: bool,
    pub dir: Option<String>,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            dir: std::env::var("LOG_DIR").ok().filter(|s| !s.is_empty()),
        }
    }
}

/// Remove `app.YYYY-MM-DD` files older than the retention window
pub fn cleanup_old_logs(log_dir: &Path) -> anyhow::Result<usize> {
    let app_log_dir = log_dir.join("app");
    if !app_log_dir.exists() {
        return Ok(0);
    }

    let cutoff = (chrono::Utc::now() - chrono::Duration::days(LOG_RETENTION_DAYS)).date_naive();
    let mut removed = 0;

    for entry in fs::read_dir(app_log_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        // tracing-appender daily files: app.YYYY-MM-DD
        let Some(date_part) = name.strip_prefix("app.") else {
            continue;
        };
        if let Ok(date) = chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            && date < cutoff
        {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }

    Ok(removed)
}

fn daily_appender(dir: &Path, prefix: &str) -> anyhow::Result<RollingFileAppender> {
    let sub_dir = dir.join(prefix);
    fs::create_dir_all(&sub_dir)?;
    Ok(RollingFileAppender::new(Rotation::DAILY, sub_dir, prefix))
}

fn not_audit_or_security(meta: &tracing::Metadata<'_>) -> bool {
    meta.target() != PAYMENT_AUDIT_TARGET && meta.target() != SECURITY_TARGET
}

/// Initialize the logging system
///
/// `RUST_LOG` overrides `level` when set.
///
/// # Examples
/// ```no_run
/// // Development (console only)
/// market_server::init_logger("debug", false, None)?;
///
/// // Production (console + files)
/// market_server::init_logger("info", true, Some("./work_dir/logs"))?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn init_logger(level: &str, json_format: bool, log_dir: Option<&str>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console: BoxedLayer = if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };
    layers.push(console);

    if let Some(dir) = log_dir {
        let log_dir = Path::new(dir);
        fs::create_dir_all(log_dir)?;

        // Application logs: everything except audit/security targets
        let app_log = daily_appender(log_dir, "app")?;
        let app: BoxedLayer = if json_format {
            fmt::layer()
                .json()
                .with_target(true)
                .with_writer(app_log)
                .with_filter(tracing_subscriber::filter::filter_fn(not_audit_or_security))
                .boxed()
        } else {
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(app_log)
                .with_filter(tracing_subscriber::filter::filter_fn(not_audit_or_security))
                .boxed()
        };
        layers.push(app);

        // Payment audit logs are always JSON
        let audit: BoxedLayer = fmt::layer()
            .json()
            .with_writer(daily_appender(log_dir, "payment")?)
            .with_target(true)
            .with_filter(tracing_subscriber::filter::filter_fn(|meta| {
                meta.target() == PAYMENT_AUDIT_TARGET
            }))
            .boxed();
        layers.push(audit);

        let security: BoxedLayer = fmt::layer()
            .json()
            .with_writer(daily_appender(log_dir, "security")?)
            .with_target(true)
            .with_filter(tracing_subscriber::filter::filter_fn(|meta| {
                meta.target() == SECURITY_TARGET
            }))
            .boxed();
        layers.push(security);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()?;

    if let Some(dir) = log_dir {
        match cleanup_old_logs(Path::new(dir)) {
            Ok(0) => {}
            Ok(removed) => tracing::info!(removed, "Deleted expired log files"),
            Err(e) => tracing::warn!(error = %e, "Log cleanup failed"),
        }
    }

    Ok(())
}
