//! 业务能力层
//!
//! 每个服务只描述"我能做什么"，只处理单个学生 / 单道题，
//! 不关心流程顺序（流程由 orchestrator 编排）

pub mod grader;
pub mod ledger;
pub mod question_repo;
pub mod rate_limiter;
pub mod reporter;
pub mod warn_writer;

pub use grader::{GradeClient, Judge, JudgeReply, LlmJudge};
pub use ledger::{GradeLedger, LedgerEntry, LEDGER_FILE};
pub use question_repo::QuestionRepo;
pub use rate_limiter::RateLimiter;
pub use warn_writer::WarnWriter;
