use anyhow::Result;
use smart_form_filler::config::Config;
use smart_form_filler::logger;
use smart_form_filler::App;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logger::init_with_verbose(config.verbose_logging);

    // 初始化并运行应用
    App::new(config).run().await?;

    Ok(())
}
