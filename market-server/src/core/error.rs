use thiserror::Error;

use crate::core::config::ConfigError;
use crate::db::StoreError;
use crate::payment::GatewayError;

/// 启动与运行期错误 (请求级错误见 `AppError`)
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    #[error("存储初始化失败: {0}")]
    Storage(#[from] StoreError),

    #[error("支付网关初始化失败: {0}")]
    Gateway(#[from] GatewayError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
