//! 汇总与报表服务 - 业务能力层
//!
//! 把台账折叠成学生结果，并产出三类工件：
//! - 每个学生目录下的 grade.txt（总分 + 按题号排序的评语）
//! - 全体学生的 summary.csv（带 BOM，Excel 可直接打开）
//! - 丢失台账的学生以 0 分加占位评语列出，绝不被遗漏

use std::path::Path;

use crate::error::{AppError, AppResult};
use crate::models::StudentResult;
use crate::services::ledger::GradeLedger;

/// 汇总表表头
const SUMMARY_HEADER: &str = "序号,学生姓名,总分,扣分点";

/// 丢失台账时的占位评语
pub const MISSING_LEDGER_COMMENT: &str = "未发现 grade.log";

/// 将台账折叠为学生结果
///
/// 总分把 null 按 0 计；评语条目形如 `Q{id}:{comment}`，
/// 台账按题号升序迭代，因此评语天然是数值序而非字典序
pub fn student_result(student: &str, ledger: &GradeLedger) -> StudentResult {
    let mut total = 0i64;
    let mut comments = Vec::new();
    let mut unresolved = Vec::new();

    for (&id, (score, comment)) in ledger.entries() {
        match score {
            Some(s) => total += s,
            None => unresolved.push(id),
        }
        if let Some(c) = comment {
            if !c.is_empty() {
                comments.push(format!("Q{}:{}", id, c));
            }
        }
    }

    StudentResult {
        student: student.to_string(),
        total,
        comments,
        unresolved,
    }
}

/// 丢失台账的学生的占位结果
pub fn missing_ledger_result(student: &str) -> StudentResult {
    StudentResult {
        student: student.to_string(),
        total: 0,
        comments: vec![MISSING_LEDGER_COMMENT.to_string()],
        unresolved: Vec::new(),
    }
}

/// 写入学生目录下的 grade.txt
///
/// 第一行总分，第二行空格拼接的评语
pub fn write_grade_file(student_dir: &Path, result: &StudentResult) -> AppResult<()> {
    let path = student_dir.join("grade.txt");
    let content = format!("{}\n{}", result.total, result.comments.join(" "));
    std::fs::write(&path, content)
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))
}

/// 导出汇总表
///
/// 以 UTF-8 BOM 开头，保证 Excel 正确识别中文
pub fn export_summary(path: &Path, results: &[StudentResult]) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
    }

    let mut out = String::from("\u{feff}");
    out.push_str(SUMMARY_HEADER);
    out.push('\n');

    for (idx, result) in results.iter().enumerate() {
        let mut comments = result.joined_comments();
        if !result.unresolved.is_empty() {
            let ids: Vec<String> = result.unresolved.iter().map(|q| q.to_string()).collect();
            let note = format!("[未批改题目: {}]", ids.join(", "));
            if comments.is_empty() {
                comments = note;
            } else {
                comments = format!("{}, {}", comments, note);
            }
        }
        out.push_str(&format!(
            "{},{},{},{}\n",
            idx + 1,
            csv_field(&result.student),
            result.total,
            csv_field(&comments)
        ));
    }

    std::fs::write(path, out)
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))
}

/// CSV 字段转义：含逗号 / 引号 / 换行时加引号
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn ledger_with(entries: &[(u32, Option<i64>, Option<&str>)]) -> (tempfile::TempDir, GradeLedger) {
        let tmp = tempfile::tempdir().unwrap();
        let count = entries.iter().map(|(id, _, _)| *id).max().unwrap_or(0) as usize;
        let mut ledger = GradeLedger::load(tmp.path(), count).unwrap();
        for (id, score, comment) in entries {
            ledger
                .update(*id, *score, comment.map(|c| c.to_string()))
                .unwrap();
        }
        (tmp, ledger)
    }

    #[test]
    fn test_aggregation_example() {
        let (_tmp, ledger) = ledger_with(&[
            (1, Some(90), Some("")),
            (2, Some(70), Some("逻辑错误")),
            (3, None, None),
        ]);
        let result = student_result("张三", &ledger);

        assert_eq!(result.total, 160);
        assert_eq!(result.comments, vec!["Q2:逻辑错误"]);
        assert_eq!(result.unresolved, vec![3]);
    }

    #[test]
    fn test_comments_numeric_order() {
        let (_tmp, ledger) = ledger_with(&[
            (100, Some(1), Some("丙")),
            (2, Some(1), Some("甲")),
            (12, Some(1), Some("乙")),
        ]);
        let result = student_result("张三", &ledger);
        assert_eq!(result.comments, vec!["Q2:甲", "Q12:乙", "Q100:丙"]);
    }

    #[test]
    fn test_grade_file_format() {
        let tmp = tempfile::tempdir().unwrap();
        let result = StudentResult {
            student: "张三".to_string(),
            total: 160,
            comments: vec!["Q2:逻辑错误".to_string(), "Q5:变量未定义".to_string()],
            unresolved: vec![],
        };
        write_grade_file(tmp.path(), &result).unwrap();

        let text = fs::read_to_string(tmp.path().join("grade.txt")).unwrap();
        assert_eq!(text, "160\nQ2:逻辑错误 Q5:变量未定义");
    }

    #[test]
    fn test_summary_has_bom_and_header() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("summary.csv");
        export_summary(
            &path,
            &[StudentResult {
                student: "张三".to_string(),
                total: 90,
                comments: vec!["Q1:少一个分号".to_string()],
                unresolved: vec![],
            }],
        )
        .unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..3], [0xef, 0xbb, 0xbf]);

        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("序号,学生姓名,总分,扣分点"));
        assert!(text.contains("1,张三,90,Q1:少一个分号"));
    }

    #[test]
    fn test_summary_notes_unresolved_and_escapes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("summary.csv");
        export_summary(
            &path,
            &[StudentResult {
                student: "李四".to_string(),
                total: 70,
                comments: vec!["Q2:逻辑错误".to_string()],
                unresolved: vec![3, 4],
            }],
        )
        .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        // 评语与未批改备注拼接后含逗号，整个字段需要加引号
        assert!(text.contains("\"Q2:逻辑错误, [未批改题目: 3, 4]\""));
    }

    #[test]
    fn test_missing_ledger_result() {
        let result = missing_ledger_result("王五");
        assert_eq!(result.total, 0);
        assert_eq!(result.comments, vec![MISSING_LEDGER_COMMENT.to_string()]);
    }
}
