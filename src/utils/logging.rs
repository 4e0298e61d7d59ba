use anyhow::Result;
/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::info;

use crate::config::Config;
use crate::models::{FieldStatus, FillReport, FormSchema};

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n表单填写日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 向日志文件追加一行（带时间戳）
pub fn append_log_line(log_file_path: &str, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;
    writeln!(
        file,
        "[{}] {}",
        chrono::Local::now().format("%H:%M:%S"),
        line
    )?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    if let Some(html) = &config.html_file {
        info!("🚀 程序启动 - 离线模式");
        info!("📄 HTML 文件: {}", html);
    } else {
        info!("🚀 程序启动 - 浏览器模式");
        info!("🌐 目标页面: {}", config.target_url);
    }
    info!(
        "⏱️ 定时提取: {:?} ms，阈值: {} 个字段",
        config.retry_delays_ms, config.sufficiency_threshold
    );
    info!("{}", "=".repeat(60));
}

/// 以表格形式输出表单结构
pub fn log_schema(schema: &FormSchema) {
    info!("\n{}", "─".repeat(60));
    info!("📋 表单结构 ({:?}): {} 个字段", schema.provider(), schema.len());
    for (i, field) in schema.fields().iter().enumerate() {
        info!(
            "  {:>2}. [{:<8}] {}{} ({}){}",
            i + 1,
            field.kind.name(),
            truncate_text(&field.label, 40),
            if field.required { " *" } else { "" },
            field.entry,
            if field.options.is_empty() {
                String::new()
            } else {
                format!(" - {} 个选项", field.options.len())
            }
        );
    }
    info!("{}", "─".repeat(60));
}

/// 打印填写统计
pub fn print_fill_summary(report: &FillReport) {
    info!("\n{}", "=".repeat(60));
    info!("📊 填写完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", report.result.filled, report.result.attempted);
    info!("❌ 失败: {}", report.result.failed);
    for outcome in &report.outcomes {
        if let FieldStatus::Failed(reason) = &outcome.status {
            info!(
                "   - {} ({}): {:?}",
                truncate_text(&outcome.label, 40),
                outcome.entry,
                reason
            );
        }
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
