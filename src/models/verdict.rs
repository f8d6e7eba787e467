//! 批改结论
//!
//! 一次批改的结构化结果，以及对模型输出的严格解析。
//! 模型被要求输出严格 JSON 的三元组 `[是否正确, 分数, 错误原因]`，
//! 任何形状不符的输出一律判定为解析失败，不做任何宽容转换。

use serde_json::Value;

/// 单题批改结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeVerdict {
    /// 是否正确
    pub is_correct: bool,
    /// 分数；`None` 表示本次未能得出分数（下次运行会重试）
    pub score: Option<i64>,
    /// 错误原因；完全正确时为空字符串
    pub reason: String,
    /// 本题消耗的 token 数
    pub tokens_used: u32,
}

impl GradeVerdict {
    /// 由解析成功的三元组构造结论
    pub fn graded(is_correct: bool, score: i64, reason: String, tokens_used: u32) -> Self {
        Self {
            is_correct,
            score: Some(score),
            reason,
            tokens_used,
        }
    }

    /// 重试耗尽后的失败结论
    ///
    /// 分数保持 `None`，使该题在下次运行时仍处于待批改状态
    pub fn failed(reason: String, tokens_used: u32) -> Self {
        Self {
            is_correct: false,
            score: None,
            reason,
            tokens_used,
        }
    }
}

/// 严格解析模型输出的 `[bool, int, string]` 三元组
///
/// # 返回
/// 解析成功返回 `(是否正确, 分数, 原因)`；
/// 失败返回描述形状错误的消息（由调用方连同原始输出一起封装）
pub fn parse_triple(raw: &str) -> Result<(bool, i64, String), String> {
    let value: Value =
        serde_json::from_str(raw.trim()).map_err(|e| format!("不是有效的 JSON: {}", e))?;

    let arr = value
        .as_array()
        .ok_or_else(|| "不是 JSON 数组".to_string())?;

    if arr.len() != 3 {
        return Err(format!("期望 3 个元素，实际为 {}", arr.len()));
    }

    let is_correct = arr[0]
        .as_bool()
        .ok_or_else(|| "第 1 个元素不是布尔值".to_string())?;
    let score = arr[1]
        .as_i64()
        .ok_or_else(|| "第 2 个元素不是整数".to_string())?;
    let reason = arr[2]
        .as_str()
        .ok_or_else(|| "第 3 个元素不是字符串".to_string())?;

    Ok((is_correct, score, reason.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_triple_correct() {
        let (ok, score, reason) = parse_triple(r#"[true, 95, ""]"#).unwrap();
        assert!(ok);
        assert_eq!(score, 95);
        assert_eq!(reason, "");
    }

    #[test]
    fn test_parse_triple_incorrect_with_reason() {
        let (ok, score, reason) =
            parse_triple(r#"[false, 60, "循环语句未正确结束，导致运行错误"]"#).unwrap();
        assert!(!ok);
        assert_eq!(score, 60);
        assert_eq!(reason, "循环语句未正确结束，导致运行错误");
    }

    #[test]
    fn test_parse_triple_tolerates_whitespace() {
        assert!(parse_triple("  [true, 100, \"\"]\n").is_ok());
    }

    #[test]
    fn test_parse_triple_rejects_non_json() {
        assert!(parse_triple("这道题做得不错，给 95 分").is_err());
    }

    #[test]
    fn test_parse_triple_rejects_markdown_fence() {
        // 不剥离代码围栏：形状不符即失败
        assert!(parse_triple("```json\n[true, 95, \"\"]\n```").is_err());
    }

    #[test]
    fn test_parse_triple_rejects_wrong_length() {
        assert!(parse_triple(r#"[true, 95]"#).is_err());
        assert!(parse_triple(r#"[true, 95, "", "extra"]"#).is_err());
    }

    #[test]
    fn test_parse_triple_rejects_object() {
        assert!(parse_triple(r#"{"is_correct": true, "score": 95, "reason": ""}"#).is_err());
    }

    #[test]
    fn test_parse_triple_rejects_wrong_element_types() {
        assert!(parse_triple(r#"["true", 95, ""]"#).is_err());
        assert!(parse_triple(r#"[true, "95", ""]"#).is_err());
        assert!(parse_triple(r#"[true, 95.5, ""]"#).is_err());
        assert!(parse_triple(r#"[true, 95, null]"#).is_err());
    }

    #[test]
    fn test_failed_verdict_keeps_score_null() {
        let v = GradeVerdict::failed("批改失败".to_string(), 120);
        assert!(!v.is_correct);
        assert_eq!(v.score, None);
        assert_eq!(v.tokens_used, 120);
    }
}
