use thiserror::Error;

use crate::auth::JwtConfig;
use crate::orders::{ReservationPoint, ShippingRates, WorkflowPolicy};
use crate::payment::GatewayConfig;

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Embedded SurrealDB under `WORK_DIR/database`
    Surreal,
    /// Process-local maps, lost on restart
    Memory,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in {1} environment")]
    MissingSecret(String, String),

    #[error("{name} has an invalid value: {value}")]
    InvalidValue { name: String, value: String },
}

/// 服务器配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./work_dir | 工作目录 (数据库、日志) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | STORAGE_BACKEND | surreal | surreal \| memory |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
/// | JWT_SECRET | (dev 默认) | 令牌校验密钥, 非开发环境必填 |
/// | WIPAY_ENVIRONMENT | sandbox | sandbox \| production |
/// | WIPAY_API_URL | 按环境 | 覆盖网关地址 |
/// | WIPAY_MERCHANT_ID / WIPAY_MERCHANT_KEY / WIPAY_SECRET_KEY | (dev 默认) | 商户凭据 |
/// | WIPAY_WEBHOOK_SECRET | (dev 默认) | Webhook HMAC 密钥 |
/// | GATEWAY_TIMEOUT_MS | 30000 | 网关请求超时 |
/// | FRONTEND_URL | http://localhost:8081 | 支付回跳地址前缀 |
/// | CURRENCY | JMD | 结算币种 |
/// | SHIPPING_FLAT_FEE | 500 | 配送基础运费 |
/// | SHIPPING_REMOTE_SURCHARGE | 300 | 偏远教区附加费 |
/// | CARD_RESERVATION | order_created | 卡支付订单的库存预留时机 |
/// | OFFLINE_RESERVATION | order_created | 线下支付订单的库存预留时机 |
/// | CLEAR_CART_ON_OFFLINE_ORDER | true | 线下支付下单后立即清空购物车 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/market HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub storage: StorageBackend,
    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 支付网关配置
    pub gateway: GatewayConfig,
    /// 下单/对账策略
    pub workflow: WorkflowPolicy,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn reservation_point(name: &str) -> Result<ReservationPoint, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(ReservationPoint::OrderCreated),
        Ok(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value: v,
        }),
    }
}

impl Config {
    /// Require a secret env var: must be set and non-empty outside development.
    fn require_secret(name: &str, environment: &str) -> Result<String, ConfigError> {
        match std::env::var(name) {
            Ok(v) if !v.is_empty() => Ok(v),
            _ if environment == "development" => {
                tracing::warn!("{name} not set, using development placeholder");
                Ok(format!("dev-{name}-not-for-production-use-only"))
            }
            _ => Err(ConfigError::MissingSecret(
                name.to_string(),
                environment.to_string(),
            )),
        }
    }

    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let storage = match std::env::var("STORAGE_BACKEND").as_deref() {
            Err(_) | Ok("surreal") => StorageBackend::Surreal,
            Ok("memory") => StorageBackend::Memory,
            Ok(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "STORAGE_BACKEND".into(),
                    value: other.into(),
                });
            }
        };

        let jwt = JwtConfig {
            secret: Self::require_secret("JWT_SECRET", &environment)?,
            expiration_minutes: env_or("JWT_EXPIRATION_MINUTES", 1440),
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "marketplace".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "marketplace-clients".into()),
        };

        let sandbox = std::env::var("WIPAY_ENVIRONMENT")
            .map(|v| v != "production")
            .unwrap_or(true);
        let gateway = GatewayConfig {
            api_url: std::env::var("WIPAY_API_URL").unwrap_or_else(|_| {
                GatewayConfig::default_api_url(sandbox).to_string()
            }),
            merchant_id: Self::require_secret("WIPAY_MERCHANT_ID", &environment)?,
            merchant_key: Self::require_secret("WIPAY_MERCHANT_KEY", &environment)?,
            secret_key: Self::require_secret("WIPAY_SECRET_KEY", &environment)?,
            webhook_secret: Self::require_secret("WIPAY_WEBHOOK_SECRET", &environment)?,
            timeout_ms: env_or("GATEWAY_TIMEOUT_MS", 30_000),
        };

        let workflow = WorkflowPolicy {
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "JMD".into()),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:8081".into()),
            shipping: ShippingRates {
                flat_fee: env_or("SHIPPING_FLAT_FEE", 500.0),
                remote_surcharge: env_or("SHIPPING_REMOTE_SURCHARGE", 300.0),
            },
            card_reservation: reservation_point("CARD_RESERVATION")?,
            offline_reservation: reservation_point("OFFLINE_RESERVATION")?,
            clear_cart_on_offline_order: env_or("CLEAR_CART_ON_OFFLINE_ORDER", true),
        };

        Ok(Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./work_dir".into()),
            http_port: env_or("HTTP_PORT", 3000),
            environment,
            storage,
            request_timeout_ms: env_or("REQUEST_TIMEOUT_MS", 30_000),
            jwt,
            gateway,
            workflow,
        })
    }

    /// In-memory configuration for tests
    pub fn for_tests() -> Self {
        Self {
            work_dir: std::env::temp_dir().to_string_lossy().into_owned(),
            http_port: 0,
            environment: "development".into(),
            storage: StorageBackend::Memory,
            request_timeout_ms: 30_000,
            jwt: JwtConfig {
                secret: "test-secret-key-with-at-least-32-characters".into(),
                expiration_minutes: 60,
                issuer: "marketplace".into(),
                audience: "marketplace-clients".into(),
            },
            gateway: GatewayConfig {
                api_url: GatewayConfig::default_api_url(true).to_string(),
                merchant_id: "test-merchant".into(),
                merchant_key: "test-merchant-key".into(),
                secret_key: "test-secret".into(),
                webhook_secret: "test-webhook-secret".into(),
                timeout_ms: 1_000,
            },
            workflow: WorkflowPolicy::default(),
        }
    }

    /// Embedded database directory
    pub fn database_dir(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("database")
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
