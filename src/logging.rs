// ==========================================
// 日志系统初始化
// ==========================================
// tracing + tracing-subscriber
// 每次导入带 import_id span 字段，行级失败为 warn，阶段切换为 debug
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// RUST_LOG 未设置时的过滤器
///
/// 本库 info，其余依赖 warn（逐行 debug 日志量大，需显式打开）
pub const DEFAULT_FILTER: &str = "warn,csv_record_importer=info";

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// 初始化日志系统（人读格式）
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（默认: [`DEFAULT_FILTER`]）
///   例如: RUST_LOG=csv_record_importer::importer=debug
///
/// # 示例
/// ```no_run
/// use csv_record_importer::logging;
/// logging::init();
/// ```
pub fn init() {
    fmt()
        .with_env_filter(env_filter(DEFAULT_FILTER))
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// 初始化日志系统（JSON 行格式）
///
/// 批量导入作为后台任务运行时使用，span 字段（import_id、partial_save）
/// 随每条事件输出，便于按批次检索
pub fn init_json() {
    fmt()
        .json()
        .with_env_filter(env_filter(DEFAULT_FILTER))
        .with_current_span(true)
        .with_span_list(false)
        .init();
}

/// 初始化测试环境的日志系统
///
/// 重复调用安全；RUST_LOG 未设置时本库为 debug
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(env_filter("csv_record_importer=debug"))
        .with_test_writer()
        .try_init();
}
