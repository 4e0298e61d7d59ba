use std::path::Path;

use chromiumoxide::{Browser, BrowserConfig, Page};
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

use crate::error::{AppError, AppResult, BrowserError};

/// 启动无头浏览器并导航到表单页面
///
/// # 参数
/// - `executable`: 浏览器可执行文件路径
/// - `url`: 表单地址
pub async fn launch_headless_browser(executable: &str, url: &str) -> AppResult<(Browser, Page)> {
    info!("🚀 启动无头浏览器...");
    debug!("可执行文件: {}, 目标 URL: {}", executable, url);

    let config = BrowserConfig::builder()
        .new_headless_mode()
        .chrome_executable(Path::new(executable))
        .args(vec![
            "--disable-gpu",
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--remote-debugging-port=0",
        ])
        .build()
        .map_err(|e| {
            error!("配置无头浏览器失败: {}", e);
            AppError::Other(format!("配置无头浏览器失败: {}", e))
        })?;

    let (browser, handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动无头浏览器失败: {}", e);
        AppError::Other(format!("启动无头浏览器失败: {}", e))
    })?;
    debug!("无头浏览器启动成功");
    super::spawn_handler(handler);

    sleep(Duration::from_millis(300)).await;

    let page = browser.new_page(url).await.map_err(|e| {
        error!("创建页面失败: {}", e);
        BrowserError::PageCreationFailed {
            source: Box::new(e),
        }
    })?;

    info!("✅ 无头浏览器已导航到: {}", url);
    Ok((browser, page))
}
