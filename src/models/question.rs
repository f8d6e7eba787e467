//! 题目与学生相关的数据类型

use std::fmt::Display;
use std::path::PathBuf;

/// 单道题目的参考资料
///
/// 从题目目录加载，批改期间视为不可变的参考数据
#[derive(Debug, Clone)]
pub struct QuestionSpec {
    /// 题号（从 1 开始）
    pub id: u32,
    /// 题面
    pub task: String,
    /// 标准答案
    pub solution: String,
    /// 总分 / 评分标准原文
    pub score_text: String,
    /// 从评分标准中解析出的扣分项（"7#3" 形式，可为空）
    pub deductions: Vec<Deduction>,
}

/// 扣分项：错误代码与对应扣分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deduction {
    pub code: u32,
    pub points: i64,
}

/// 一条批改工作项：某个学生的某道题
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// 学生目录名
    pub student: String,
    /// 题号
    pub question_id: u32,
    /// 该题 answer.md 的路径
    pub answer_path: PathBuf,
}

impl Display for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[学生 {} 第 {} 题]", self.student, self.question_id)
    }
}

/// 单个学生的汇总结果
#[derive(Debug, Clone)]
pub struct StudentResult {
    /// 学生目录名
    pub student: String,
    /// 总分（未批改的题按 0 计）
    pub total: i64,
    /// 按题号升序排列的评语，形如 `Q{id}:{comment}`
    pub comments: Vec<String>,
    /// 仍未批改的题号（升序）
    pub unresolved: Vec<u32>,
}

impl StudentResult {
    /// 将评语拼接为一句话（汇总表用）
    pub fn joined_comments(&self) -> String {
        self.comments
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
