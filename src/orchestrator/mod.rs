//! 编排层
//!
//! `App` 负责装配资源（题目仓库、限流器、LLM 裁判）并把
//! 批改活动委托给 [`BatchScheduler`]

pub mod batch_scheduler;

pub use batch_scheduler::{BatchScheduler, CampaignStats};

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult, QuestionError};
use crate::services::grader::{GradeClient, LlmJudge};
use crate::services::question_repo::QuestionRepo;
use crate::services::rate_limiter::RateLimiter;
use crate::services::warn_writer::WarnWriter;

/// 应用主结构
pub struct App {
    config: Config,
    scheduler: BatchScheduler<LlmJudge>,
}

impl App {
    /// 初始化应用：校验题目目录并装配调度器
    pub fn initialize(config: Config) -> AppResult<Self> {
        let questions = QuestionRepo::new(&config.tasks_dir);
        let question_count = questions.count_questions();
        if question_count == 0 {
            return Err(AppError::Question(QuestionError::NoQuestions {
                dir: config.tasks_dir.clone(),
            }));
        }

        log_startup(&config, question_count);

        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit_calls,
            Duration::from_secs(config.rate_limit_window_secs),
        ));
        let judge = LlmJudge::new(&config);
        let client = GradeClient::new(judge, questions, rate_limiter, config.max_retries);
        let scheduler = BatchScheduler::new(
            client,
            &config.processed_dir,
            question_count,
            config.max_concurrent,
            config.force_regrade,
            &config.summary_path,
            WarnWriter::new(&config.warn_log_file),
        );

        Ok(Self { config, scheduler })
    }

    /// 运行一轮批改活动
    pub async fn run(&self) -> AppResult<()> {
        let stats = self.scheduler.run().await?;
        print_final_stats(&stats, &self.config);
        Ok(())
    }
}

// ========== 日志辅助函数 ==========

fn log_startup(config: &Config, question_count: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量作业批改模式");
    info!("📚 题目数量: {}", question_count);
    info!("📊 最大并发数: {}", config.max_concurrent);
    info!(
        "⏱️ 限流: {} 次 / {} 秒",
        config.rate_limit_calls, config.rate_limit_window_secs
    );
    if config.force_regrade {
        info!("♻️ 强制重批模式已开启");
    }
    info!("{}", "=".repeat(60));
}

fn print_final_stats(stats: &CampaignStats, config: &Config) {
    info!("\n{}", "=".repeat(60));
    info!("📊 批改完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", stats.graded, stats.total_items);
    info!("❌ 留待下次: {}", stats.failed);
    info!("🪙 累计 token: {}", stats.total_tokens);
    if stats.unresolved_students == 0 {
        info!("✅ 所有学生的题目均已批改完成");
    } else {
        info!(
            "⚠️ {} 位学生存在未批改的题目，请查看 {}",
            stats.unresolved_students, config.warn_log_file
        );
    }
    info!("{}", "=".repeat(60));
}
