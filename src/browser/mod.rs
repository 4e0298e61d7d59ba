//! 浏览器连接
//!
//! - `connection`: 连接已打开的浏览器（远程调试端口）
//! - `headless`: 自行启动无头浏览器

pub mod connection;
pub mod headless;

pub use connection::connect_to_browser_and_page;
pub use headless::launch_headless_browser;

use chromiumoxide::handler::Handler;
use futures::StreamExt;
use tracing::debug;

/// 在后台处理浏览器事件，连接断开后退出
pub(crate) fn spawn_handler(mut handler: Handler) {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                debug!("浏览器事件通道已断开");
                break;
            }
        }
    });
}
