use std::sync::Arc;

use smart_form_filler::browser::connect_to_browser_and_page;
use smart_form_filler::config::Config;
use smart_form_filler::infrastructure::{DocumentSource, JsExecutor, LivePage};
use smart_form_filler::logger;
use smart_form_filler::models::{Request, Response};
use smart_form_filler::FormSession;

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_browser_connection() {
    // 初始化日志
    logger::init();

    // 加载配置
    let config = Config::from_env().expect("读取配置失败");

    // 测试浏览器连接
    let result = connect_to_browser_and_page(config.browser_debug_port, &config.target_url).await;

    assert!(result.is_ok(), "应该能够成功连接浏览器");
}

#[tokio::test]
#[ignore]
async fn test_live_page_schema() {
    logger::init();
    let config = Config::from_env().expect("读取配置失败");

    let (_browser, page) = connect_to_browser_and_page(config.browser_debug_port, &config.target_url)
        .await
        .expect("连接浏览器失败");
    let live = Arc::new(LivePage::new(JsExecutor::new(page)));

    let snapshot = live.snapshot().await.expect("页面快照失败");
    assert!(snapshot.html.contains("<html"), "快照应该包含完整页面");

    let (session, _events) = FormSession::new(live);
    let response = session.handle(Request::GetSchema).await;
    let Response::Schema { schema } = response else {
        panic!("提取表单结构失败: {:?}", response);
    };
    println!("找到 {} 个字段", schema.len());
}

#[tokio::test]
#[ignore]
async fn test_live_mutation_observer() {
    logger::init();
    let config = Config::from_env().expect("读取配置失败");

    let (_browser, page) = connect_to_browser_and_page(config.browser_debug_port, &config.target_url)
        .await
        .expect("连接浏览器失败");
    let live = LivePage::new(JsExecutor::new(page));

    live.install_observer().await.expect("安装监听失败");
    assert!(!live.install_observer().await.expect("重复安装失败"), "不应该重复安装");

    live.executor()
        .eval(r#"document.body.appendChild(Object.assign(document.createElement('div'), { role: 'x' })); true"#)
        .await
        .expect("修改页面失败");
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let batch = live.drain_mutations().await.expect("读取变化失败");
    assert!(!batch.is_empty());
}
