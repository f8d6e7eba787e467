//! 数据模型
//!
//! 只包含纯数据类型，不含 IO 和流程逻辑

pub mod question;
pub mod verdict;

pub use question::{Deduction, QuestionSpec, StudentResult, WorkItem};
pub use verdict::{parse_triple, GradeVerdict};
