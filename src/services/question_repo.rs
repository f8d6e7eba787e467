//! 题目仓库 - 业务能力层
//!
//! 只负责"读题目参考资料"能力：
//! - 统计题目目录下的有效题号数量
//! - 加载单道题的题面 / 标准答案 / 评分标准
//! - utf-8 读取失败时回退到 gbk（部分学生文件来自旧版 Windows）

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{AppError, AppResult, FileError, QuestionError};
use crate::models::{Deduction, QuestionSpec};

/// 题目仓库
///
/// 职责：
/// - 每次调用都重新读盘（参考资料可能被人工修订）
/// - 不缓存、不出现学生概念
#[derive(Debug, Clone)]
pub struct QuestionRepo {
    tasks_dir: PathBuf,
}

impl QuestionRepo {
    pub fn new(tasks_dir: impl Into<PathBuf>) -> Self {
        Self {
            tasks_dir: tasks_dir.into(),
        }
    }

    /// 统计规范题目数量
    ///
    /// 题号要求是从 1 开始的连续整数；若目录中出现空洞，
    /// 取 `min(子目录数, 最大题号)` 作为有效数量
    pub fn count_questions(&self) -> usize {
        count_question_dirs(&self.tasks_dir)
    }

    /// 加载一道题的参考资料
    pub fn load(&self, question_id: u32) -> AppResult<QuestionSpec> {
        let dir = self.tasks_dir.join(question_id.to_string());
        if !dir.is_dir() {
            return Err(AppError::Question(QuestionError::QuestionDirMissing {
                id: question_id,
                dir: self.tasks_dir.display().to_string(),
            }));
        }

        let task = read_text_with_fallback(&dir.join("task_content"))?;
        let solution = read_text_with_fallback(&dir.join("solution"))?;
        let score_text = read_text_with_fallback(&dir.join("score"))?;
        let deductions = parse_deduction_codes(&score_text);

        debug!(
            "已加载第 {} 题: 题面 {} 字符, 扣分项 {} 条",
            question_id,
            task.chars().count(),
            deductions.len()
        );

        Ok(QuestionSpec {
            id: question_id,
            task,
            solution,
            score_text,
            deductions,
        })
    }
}

/// 统计某目录下的有效题号子目录数量
///
/// 学生的 processed 目录与题目目录共用同一套题号约定
pub fn count_question_dirs(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };

    let ids: Vec<u32> = entries
        .flatten()
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().to_str().and_then(|n| n.parse().ok()))
        .collect();

    match ids.iter().max() {
        Some(&max) => (ids.len()).min(max as usize),
        None => 0,
    }
}

/// 读取文本文件，utf-8 失败后回退 gbk
pub fn read_text_with_fallback(path: &Path) -> AppResult<String> {
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::File(FileError::NotFound {
                path: path.display().to_string(),
            })
        } else {
            AppError::file_read_failed(path.display().to_string(), e)
        }
    })?;

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            let (decoded, _, had_errors) = encoding_rs::GBK.decode(e.as_bytes());
            if had_errors {
                Err(AppError::File(FileError::DecodeFailed {
                    path: path.display().to_string(),
                }))
            } else {
                Ok(decoded.into_owned())
            }
        }
    }
}

/// 从评分标准原文中解析扣分项
///
/// 识别 `代码#扣分` 形式的行（例如 `7#3` 表示 7 号错误扣 3 分），
/// 其余文字原样保留在 score_text 中供提示词使用
pub fn parse_deduction_codes(score_text: &str) -> Vec<Deduction> {
    score_text
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let (code, points) = line.split_once('#')?;
            let code = code.trim().parse().ok()?;
            let points = points.trim().parse().ok()?;
            Some(Deduction { code, points })
        })
        .collect()
}
