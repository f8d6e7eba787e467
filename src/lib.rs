//! # MLX Auto Grade
//!
//! 基于 LLM 的 MATLAB live script 作业批量批改工具
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 数据层（Models）
//! - `models/` - 纯数据类型
//! - `GradeVerdict` - 单题批改结论与严格三元组解析
//! - `QuestionSpec` / `WorkItem` / `StudentResult`
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个学生 / 单道题
//! - `QuestionRepo` - 题目参考资料读取能力
//! - `GradeLedger` - 可恢复的成绩台账（原子落盘）
//! - `RateLimiter` - 滑动窗口限流能力
//! - `GradeClient` / `LlmJudge` - LLM 批改能力（限流 + 有界重试）
//! - `WarnWriter` - 写未批改警告日志能力
//! - `reporter` - grade.txt / summary.csv 汇总能力
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/batch_scheduler` - 批量批改调度器：发现工作项、
//!   并发执行、逐项落盘、汇总报表
//! - `orchestrator::App` - 装配资源并运行批改活动
//!
//! ### ④ 预处理（Processing）
//! - `processing` - 转写稿按题切分、依赖源码追加、提交结构校验
//!
//! ## 可恢复性
//!
//! 每道题的批改结果到达后立即写入该学生的台账并原子替换落盘。
//! 进程中断后重跑只会批改分数仍为 null 的题目，已有结果不会丢失，
//! 也不会重复消耗 token。

pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod processing;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{GradeVerdict, QuestionSpec, StudentResult, WorkItem};
pub use orchestrator::{App, BatchScheduler, CampaignStats};
pub use services::{GradeClient, GradeLedger, Judge, LlmJudge, QuestionRepo, RateLimiter, WarnWriter};
