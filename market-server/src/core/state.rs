use std::sync::Arc;

use crate::auth::JwtService;
use crate::cart::CartService;
use crate::core::config::StorageBackend;
use crate::core::{Config, Result};
use crate::db::{self, Stores};
use crate::orders::OrderService;
use crate::payment::{GatewayClient, WipayClient};

/// 服务器状态 - 持有所有服务的单例引用
///
/// 使用 Arc 实现浅拷贝，每个请求克隆一份。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
/// | orders | OrderService | 订单工作流 |
/// | carts | CartService | 购物车 |
#[derive(Clone, Debug)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// JWT 认证服务 (Arc 共享所有权)
    pub jwt_service: Arc<JwtService>,
    pub orders: OrderService,
    pub carts: CartService,
}

impl ServerState {
    /// 用给定的存储和网关组装状态 (测试直接调用)
    pub fn new(config: Config, stores: Stores, gateway: Arc<dyn GatewayClient>) -> Self {
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        let orders = OrderService::new(stores.clone(), gateway, config.workflow.clone());
        let carts = CartService::new(&stores);
        Self {
            config,
            jwt_service,
            orders,
            carts,
        }
    }

    /// 初始化服务器状态
    ///
    /// 打开存储后端并创建 WiPay 客户端
    pub async fn initialize(config: &Config) -> Result<Self> {
        let stores = match config.storage {
            StorageBackend::Surreal => {
                let db = db::open_surreal(&config.database_dir()).await?;
                Stores::surreal(db)
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Stores::memory()
            }
        };

        let gateway = Arc::new(WipayClient::new(&config.gateway)?);
        tracing::info!(api_url = %config.gateway.api_url, "Payment gateway configured");

        Ok(Self::new(config.clone(), stores, gateway))
    }

    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }
}
