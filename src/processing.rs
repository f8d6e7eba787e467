//! 答卷切分与校验
//!
//! 上游的文档引擎已把学生的 live script 转成 markdown 转写稿，
//! 本模块把转写稿按题号标记切成每题一个 `answer.md`，
//! 并提供提交结构的完整性检查。
//!
//! mlx → markdown 的转换本身属于外部协作方，这里不涉及。

use std::path::Path;

use regex::Regex;
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::services::question_repo::count_question_dirs;

/// 按题号标记切分转写稿，每题写入 `{out_dir}/{题号}/answer.md`
///
/// # 返回
/// 成功写出的题号列表（升序）
pub fn split_by_question(content: &str, out_dir: &Path) -> AppResult<Vec<u32>> {
    let mut ids = Vec::new();

    for (id, body) in extract_questions(content) {
        let question_dir = out_dir.join(id.to_string());
        std::fs::create_dir_all(&question_dir)
            .map_err(|e| AppError::file_write_failed(question_dir.display().to_string(), e))?;

        let answer_path = question_dir.join("answer.md");
        std::fs::write(&answer_path, body.trim())
            .map_err(|e| AppError::file_write_failed(answer_path.display().to_string(), e))?;
        ids.push(id);
    }

    ids.sort_unstable();
    Ok(ids)
}

/// 从转写稿中提取 `# 以下开始第N题 … # 以上结束第N题` 包裹的题目内容
fn extract_questions(content: &str) -> Vec<(u32, String)> {
    // regex crate 不支持反向引用，起止题号分别捕获后比对
    let pattern = Regex::new(r"(?s)# 以下开始第(\d+)题\s*\n(.*?)# 以上结束第(\d+)题")
        .expect("题目标记正则是固定字面量");

    let mut questions = Vec::new();
    for caps in pattern.captures_iter(content) {
        let begin: u32 = caps[1].parse().unwrap_or(0);
        let end: u32 = caps[3].parse().unwrap_or(0);
        if begin == 0 || begin != end {
            warn!("题目起止标记不匹配: 开始第{}题 / 结束第{}题", &caps[1], &caps[3]);
            continue;
        }
        questions.push((begin, caps[2].to_string()));
    }
    questions
}

/// 在答案末尾追加依赖源码段
///
/// 每个依赖以固定标记 `=== Dependency: <名字> ===` 分隔，
/// 随后是一个 matlab 代码围栏
pub fn append_dependency_sources(answer: &str, deps: &[(String, String)]) -> String {
    let mut out = answer.trim_end().to_string();
    for (name, source) in deps {
        out.push_str(&format!(
            "\n\n=== Dependency: {} ===\n```matlab\n{}\n```",
            name,
            source.trim_end()
        ));
    }
    out
}

/// 检查一位学生的提交结构是否完整
///
/// - 切分出的题目数量与题目目录一致
/// - 每个题号子目录都包含 answer.md
pub fn check_submission(processed_student_dir: &Path, tasks_dir: &Path) -> bool {
    let expected = count_question_dirs(tasks_dir);
    let actual = count_question_dirs(processed_student_dir);
    if expected != actual {
        return false;
    }

    let Ok(entries) = std::fs::read_dir(processed_student_dir) else {
        return false;
    };

    entries
        .flatten()
        .filter(|e| e.path().is_dir())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|n| n.chars().all(|c| c.is_ascii_digit()))
                .unwrap_or(false)
        })
        .all(|e| e.path().join("answer.md").is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const TRANSCRIPT: &str = "\
# 以下开始第1题
x = 1:10;
plot(x)
# 以上结束第1题
中间的说明文字不属于任何题目
# 以下开始第2题
y = sin(x);
# 以上结束第2题
";

    #[test]
    fn test_split_by_question() {
        let tmp = tempfile::tempdir().unwrap();
        let ids = split_by_question(TRANSCRIPT, tmp.path()).unwrap();
        assert_eq!(ids, vec![1, 2]);

        let a1 = fs::read_to_string(tmp.path().join("1").join("answer.md")).unwrap();
        assert_eq!(a1, "x = 1:10;\nplot(x)");
        let a2 = fs::read_to_string(tmp.path().join("2").join("answer.md")).unwrap();
        assert_eq!(a2, "y = sin(x);");
    }

    #[test]
    fn test_mismatched_markers_skipped() {
        let content = "# 以下开始第1题\nx = 1;\n# 以上结束第2题\n";
        let tmp = tempfile::tempdir().unwrap();
        let ids = split_by_question(content, tmp.path()).unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn test_append_dependency_sources() {
        let out = append_dependency_sources(
            "y = helper(3);",
            &[("helper.m".to_string(), "function y = helper(x)\ny = x * 2;\nend".to_string())],
        );
        assert!(out.starts_with("y = helper(3);"));
        assert!(out.contains("=== Dependency: helper.m ==="));
        assert!(out.contains("```matlab\nfunction y = helper(x)"));
        assert!(out.ends_with("```"));
    }

    #[test]
    fn test_check_submission() {
        let tmp = tempfile::tempdir().unwrap();
        let tasks = tmp.path().join("tasks");
        let student = tmp.path().join("student");
        for id in 1..=2 {
            fs::create_dir_all(tasks.join(id.to_string())).unwrap();
            let q = student.join(id.to_string());
            fs::create_dir_all(&q).unwrap();
            fs::write(q.join("answer.md"), "x = 1;").unwrap();
        }
        assert!(check_submission(&student, &tasks));

        // 缺一个 answer.md 即不完整
        fs::remove_file(student.join("2").join("answer.md")).unwrap();
        assert!(!check_submission(&student, &tasks));
    }

    #[test]
    fn test_check_submission_count_mismatch() {
        let tmp = tempfile::tempdir().unwrap();
        let tasks = tmp.path().join("tasks");
        let student = tmp.path().join("student");
        fs::create_dir_all(tasks.join("1")).unwrap();
        fs::create_dir_all(tasks.join("2")).unwrap();
        let q = student.join("1");
        fs::create_dir_all(&q).unwrap();
        fs::write(q.join("answer.md"), "x = 1;").unwrap();
        assert!(!check_submission(&student, &tasks));
    }
}
