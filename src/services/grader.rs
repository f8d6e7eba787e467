//! 批改服务 - 业务能力层
//!
//! 只负责"批改一道题"能力，不关心流程：
//! - `Judge`：远程裁判的最小接口（一次对话，返回内容与 token 消耗）
//! - `LlmJudge`：基于 `async-openai` 的生产实现，兼容 OpenAI API 的服务
//! - `GradeClient`：组装提示词、限流、严格解析、有界重试
//!
//! 重试是对 `Result` 的显式有界循环，不用异常式控制流；
//! 重试耗尽后返回失败结论（分数为 null），绝不向上抛出

use std::path::Path;
use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};
use crate::models::{parse_triple, GradeVerdict, QuestionSpec};
use crate::services::question_repo::{read_text_with_fallback, QuestionRepo};
use crate::services::rate_limiter::RateLimiter;
use crate::utils::logging::truncate_text;

/// 批改用系统提示词
const SYSTEM_PROMPT: &str = r#"你是一位精通 MATLAB 的教授，负责批改学生的作业。你的任务是：
1. 公正地判断学生提交的代码是否正确。
2. 按照给你的总分，根据其正确程度给出分数。
3. 如果有错误，需要指出清晰的错误原因；如果完全正确，错误原因留空。

输出格式必须是 JSON，且为一个三元素 tuple：[是否正确 (true/false), 分数 (整数), 错误原因 (字符串)]。
示例：
    正确情况输出：[true, 95, ""]
    错误情况输出：[false, 60, "循环语句未正确结束，导致运行错误"]"#;

/// 裁判的一次应答
#[derive(Debug, Clone)]
pub struct JudgeReply {
    /// 模型输出原文（已 trim）
    pub content: String,
    /// 本次调用消耗的 token 数
    pub total_tokens: u32,
}

/// 远程裁判接口
///
/// 生产实现是 [`LlmJudge`]；测试以假裁判替换，
/// 批改客户端对两者一视同仁
pub trait Judge: Send + Sync {
    fn complete(
        &self,
        system_message: &str,
        user_message: &str,
    ) -> impl std::future::Future<Output = AppResult<JudgeReply>> + Send;
}

/// 基于 async-openai 的裁判实现
pub struct LlmJudge {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl LlmJudge {
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
        }
    }
}

impl Judge for LlmJudge {
    async fn complete(&self, system_message: &str, user_message: &str) -> AppResult<JudgeReply> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.chars().count());

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_message)
            .build()
            .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;

        let messages = vec![
            ChatCompletionRequestMessage::System(system_msg),
            ChatCompletionRequestMessage::User(user_msg),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.2)
            .build()
            .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            AppError::llm_api_failed(&self.model_name, e)
        })?;

        let total_tokens = response
            .usage
            .as_ref()
            .map(|u| u.total_tokens)
            .unwrap_or(0);

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                AppError::Llm(LlmError::EmptyResponse {
                    model: self.model_name.clone(),
                })
            })?;

        Ok(JudgeReply {
            content: content.trim().to_string(),
            total_tokens,
        })
    }
}

/// 批改客户端
///
/// 职责：
/// - 每次批改都重新读答案与题目（内容可能被重新生成）
/// - 发出远程请求前先占用限流额度
/// - 输出必须是严格 JSON 三元组，形状不符即为解析失败
/// - 失败（网络 / 远程 / 解析）按固定上限重试
pub struct GradeClient<J> {
    judge: J,
    questions: QuestionRepo,
    rate_limiter: Arc<RateLimiter>,
    max_retries: u32,
}

impl<J: Judge> GradeClient<J> {
    pub fn new(
        judge: J,
        questions: QuestionRepo,
        rate_limiter: Arc<RateLimiter>,
        max_retries: u32,
    ) -> Self {
        Self {
            judge,
            questions,
            rate_limiter,
            max_retries,
        }
    }

    /// 批改一道题
    ///
    /// 此边界上不再失败：重试耗尽后返回分数为 null 的失败结论，
    /// 由调度器照常落盘，下次运行会重新批改
    pub async fn grade(&self, answer_path: &Path, question_id: u32) -> GradeVerdict {
        let mut last_error: Option<AppError> = None;
        let mut last_tokens = 0u32;

        for attempt in 0..=self.max_retries {
            match self.attempt(answer_path, question_id).await {
                Ok(verdict) => return verdict,
                Err(e) => {
                    if let AppError::Llm(LlmError::ResponseParseFailed { tokens, .. }) = &e {
                        last_tokens = *tokens;
                    }
                    warn!(
                        "第 {} 题批改失败 (第 {}/{} 次尝试): {}",
                        question_id,
                        attempt + 1,
                        self.max_retries + 1,
                        truncate_text(&e.to_string(), 200)
                    );
                    last_error = Some(e);
                }
            }
        }

        let reason = match last_error {
            Some(e) => format!("批改失败: {}", e),
            None => "批改失败".to_string(),
        };
        GradeVerdict::failed(reason, last_tokens)
    }

    /// 单次批改尝试
    async fn attempt(&self, answer_path: &Path, question_id: u32) -> AppResult<GradeVerdict> {
        let answer = read_text_with_fallback(answer_path)?;
        let spec = self.questions.load(question_id)?;
        let user_message = build_user_message(&spec, &answer);

        self.rate_limiter.acquire().await;
        let reply = self.judge.complete(SYSTEM_PROMPT, &user_message).await?;

        match parse_triple(&reply.content) {
            Ok((is_correct, score, reason)) => Ok(GradeVerdict::graded(
                is_correct,
                score,
                reason,
                reply.total_tokens,
            )),
            Err(message) => Err(AppError::Llm(LlmError::ResponseParseFailed {
                message,
                raw_output: reply.content,
                tokens: reply.total_tokens,
            })),
        }
    }
}

/// 组装用户提示词：题面 / 标准答案 / 总分 / 扣分项 / 学生答案
fn build_user_message(spec: &QuestionSpec, answer: &str) -> String {
    let mut message = format!(
        "题目是：\n{}\n\n供你参考的标准答案是：\n{}\n\n这道题的总分是：{}\n",
        spec.task,
        spec.solution,
        spec.score_text.trim()
    );

    if !spec.deductions.is_empty() {
        message.push_str("\n评分时请按以下扣分项执行（错误代码#扣分）：\n");
        for d in &spec.deductions {
            message.push_str(&format!("{}#{}\n", d.code, d.points));
        }
    }

    message.push_str(&format!("\n有一位同学的mlx文件答案是：\n{}\n", answer));
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Deduction;

    fn make_spec(deductions: Vec<Deduction>) -> QuestionSpec {
        QuestionSpec {
            id: 1,
            task: "画出正弦曲线".to_string(),
            solution: "plot(sin(0:0.1:2*pi))".to_string(),
            score_text: "10\n".to_string(),
            deductions,
        }
    }

    #[test]
    fn test_user_message_contains_all_parts() {
        let msg = build_user_message(&make_spec(vec![]), "plot(cos(0:0.1:2*pi))");
        assert!(msg.contains("画出正弦曲线"));
        assert!(msg.contains("plot(sin(0:0.1:2*pi))"));
        assert!(msg.contains("总分是：10"));
        assert!(msg.contains("plot(cos(0:0.1:2*pi))"));
        assert!(!msg.contains("扣分项"));
    }

    #[test]
    fn test_user_message_includes_deduction_table() {
        let spec = make_spec(vec![Deduction { code: 7, points: 3 }]);
        let msg = build_user_message(&spec, "x = 1;");
        assert!(msg.contains("扣分项"));
        assert!(msg.contains("7#3"));
    }
}
