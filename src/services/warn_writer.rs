//! 警告写入服务 - 业务能力层
//!
//! 只负责"写未批改警告日志"能力，不关心流程

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{AppError, AppResult};

/// 警告写入服务
///
/// 职责：
/// - 将批改后仍未解决的 (学生, 题号) 追加到累积警告日志
/// - 每次运行写一个带时间戳的段落
/// - 没有未解决条目时什么都不写
pub struct WarnWriter {
    warn_file_path: PathBuf,
}

impl WarnWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            warn_file_path: path.into(),
        }
    }

    /// 追加本次运行的未批改记录
    ///
    /// # 参数
    /// - `unresolved`: (学生, 未批改题号列表)，题号升序
    pub fn write_unresolved(&self, unresolved: &[(String, Vec<u32>)]) -> AppResult<()> {
        if unresolved.is_empty() {
            return Ok(());
        }

        debug!(
            "写入警告日志: {} 位学生存在未批改题目",
            unresolved.len()
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.warn_file_path)
            .map_err(|e| {
                AppError::file_write_failed(self.warn_file_path.display().to_string(), e)
            })?;

        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let mut block = format!("\n[{}] 以下学生存在未批改的题目或损坏的日志：\n", now);
        for (student, questions) in unresolved {
            if questions.is_empty() {
                block.push_str(&format!("- {}\n", student));
            } else {
                let ids: Vec<String> = questions.iter().map(|q| q.to_string()).collect();
                block.push_str(&format!("- {}: 题目 {}\n", student, ids.join(", ")));
            }
        }

        file.write_all(block.as_bytes()).map_err(|e| {
            AppError::file_write_failed(self.warn_file_path.display().to_string(), e)
        })?;

        Ok(())
    }
}
