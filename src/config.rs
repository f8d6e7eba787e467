/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 处理后的学生答案根目录（每个学生一个子目录）
    pub processed_dir: String,
    /// 题目目录（每题一个数字子目录：task_content / solution / score）
    pub tasks_dir: String,
    /// 同时批改的题目数量上限
    pub max_concurrent: usize,
    /// 滚动窗口内允许的远程调用次数
    pub rate_limit_calls: usize,
    /// 滚动窗口长度（秒）
    pub rate_limit_window_secs: u64,
    /// 每道题失败后的额外重试次数
    pub max_retries: u32,
    /// 是否无视已有分数强制重新批改
    pub force_regrade: bool,
    /// 汇总表输出路径
    pub summary_path: String,
    /// 未批改警告日志路径
    pub warn_log_file: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            processed_dir: "./data/processed".to_string(),
            tasks_dir: "./data/tasks".to_string(),
            max_concurrent: 20,
            rate_limit_calls: 500,
            rate_limit_window_secs: 60,
            max_retries: 1,
            force_regrade: false,
            summary_path: "./data/processed/summary.csv".to_string(),
            warn_log_file: "./data/processed/grade_warning.log".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string(),
            llm_model_name: "qwen3-coder-flash".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            processed_dir: std::env::var("PROCESSED_DIR").unwrap_or(default.processed_dir),
            tasks_dir: std::env::var("TASKS_DIR").unwrap_or(default.tasks_dir),
            max_concurrent: std::env::var("MAX_CONCURRENT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent),
            rate_limit_calls: std::env::var("RATE_LIMIT_CALLS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.rate_limit_calls),
            rate_limit_window_secs: std::env::var("RATE_LIMIT_WINDOW_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.rate_limit_window_secs),
            max_retries: std::env::var("MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_retries),
            force_regrade: std::env::var("FORCE_REGRADE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.force_regrade),
            summary_path: std::env::var("SUMMARY_PATH").unwrap_or(default.summary_path),
            warn_log_file: std::env::var("WARN_LOG_FILE").unwrap_or(default.warn_log_file),
            llm_api_key: std::env::var("DASHSCOPE_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
        }
    }
}
