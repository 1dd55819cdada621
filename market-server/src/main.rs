use anyhow::Context;
use market_server::{Config, LogSettings, Server, ServerState, init_logger, print_banner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境变量 (.env 可选)
    dotenv::dotenv().ok();

    // 2. 日志
    let logging = LogSettings::from_env();
    init_logger(&logging.level, logging.json, logging.dir.as_deref())?;

    print_banner();
    tracing::info!("Market server starting...");

    // 3. 加载配置
    let config = Config::from_env().context("Invalid configuration")?;

    // 4. 初始化服务器状态
    let state = ServerState::initialize(&config)
        .await
        .context("Failed to initialize server state")?;

    // 5. 启动 HTTP 服务器
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "Server error");
        return Err(e.into());
    }

    Ok(())
}
