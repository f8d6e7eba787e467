use anyhow::Result;
use mlx_auto_grade::orchestrator::App;
use mlx_auto_grade::utils::logging;
use mlx_auto_grade::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::from_env();

    // 初始化并运行批改活动
    App::initialize(config)?.run().await?;

    Ok(())
}
