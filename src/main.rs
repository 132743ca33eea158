use anyhow::Context;
use wallet_tx_tracker::config::Config;
use wallet_tx_tracker::log_info;
use wallet_tx_tracker::startup::Application;
use wallet_tx_tracker::utils::logger::init_logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志（全局只需调用一次）
    init_logger();

    log_info!("Starting wallet demo...");

    // 1. 加载配置
    let config = Config::load().context("Failed to load application configuration")?;

    // 2. 构建应用实例 (provider / connector / services)
    let application = Application::build(config).context("Application building failed")?;

    // 3. 运行演示流程
    application
        .run()
        .await
        .context("Wallet demo failed during runtime")?;

    Ok(())
}
