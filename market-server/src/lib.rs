//! Market Server - 农产品市场订单服务
//!
//! # 架构概述
//!
//! 买家购物车 → 订单 → WiPay 支付 → 对账 → 履约。
//!
//! - **订单** (`orders`): 下单、支付对账、取消、状态流转
//! - **购物车** (`cart`): 每个买家一个购物车
//! - **支付** (`payment`): WiPay REST 客户端与 Webhook 签名
//! - **数据库** (`db`): 嵌入式 SurrealDB 或内存存储
//! - **认证** (`auth`): JWT 校验
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! market-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── auth/          # JWT 认证
//! ├── api/           # HTTP 路由和处理器
//! ├── cart/          # 购物车服务
//! ├── orders/        # 订单工作流
//! ├── payment/       # 支付网关
//! ├── db/            # 存储层
//! └── utils/         # 日志、校验
//! ```

pub mod api;
pub mod auth;
pub mod cart;
pub mod core;
pub mod db;
pub mod orders;
pub mod payment;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use cart::CartService;
pub use core::{Config, Server, ServerState};
pub use orders::{OrderError, OrderService};
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{LogSettings, cleanup_old_logs, init_logger};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

// Payment audit macro - 支付状态变更, 写入独立的 payment 日志
#[macro_export]
macro_rules! payment_audit {
    ($event:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            target: "payment_audit",
            event = $event,
            $($key = $value),*
        );
    };
}

pub fn print_banner() {
    println!(
        r#"
    __  ___           __        __
   /  |/  /___ ______/ /_____  / /_
  / /|_/ / __ `/ ___/ //_/ _ \/ __/
 / /  / / /_/ / /  / ,< /  __/ /_
/_/  /_/\__,_/_/  /_/|_|\___/\__/
    "#
    );
}
