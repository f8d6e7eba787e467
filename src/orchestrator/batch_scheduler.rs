//! 批量批改调度器 - 编排层
//!
//! ## 职责
//!
//! 1. **发现工作项**：遍历所有学生台账，找出"待批改且有答案"的 (学生, 题号)
//! 2. **并发执行**：所有工作项作为独立异步任务提交，Semaphore 限制在途数量，
//!    结果按完成顺序处理，不等待提交顺序
//! 3. **逐项落盘**：每个结果到达立即写入该学生的台账（成败都写），
//!    中断后重跑不会重复批改已有分数的题
//! 4. **汇总报表**：全部完成后从台账（而非内存结果）重算每个学生的
//!    grade.txt，扫描所有学生的残留 null 写警告日志，导出汇总表
//!
//! ## 设计特点
//!
//! - 单个工作项的失败绝不中断批次
//! - 台账按学生各自加锁：同一学生的并发更新串行化，学生之间完全并行

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{Mutex, Semaphore};
use tracing::{error, info, warn};

use crate::error::AppResult;
use crate::models::WorkItem;
use crate::services::grader::{GradeClient, Judge};
use crate::services::ledger::{GradeLedger, LEDGER_FILE};
use crate::services::reporter;
use crate::services::warn_writer::WarnWriter;

/// 一次批改活动的统计
#[derive(Debug, Default)]
pub struct CampaignStats {
    /// 本次运行的工作项总数
    pub total_items: usize,
    /// 得到非 null 分数的工作项
    pub graded: usize,
    /// 重试耗尽、留待下次的工作项
    pub failed: usize,
    /// 累计 token 消耗
    pub total_tokens: u64,
    /// 运行结束后仍有未批改题目的学生数
    pub unresolved_students: usize,
}

/// 批量批改调度器
pub struct BatchScheduler<J> {
    client: GradeClient<J>,
    processed_dir: PathBuf,
    question_count: usize,
    max_concurrent: usize,
    force_regrade: bool,
    summary_path: PathBuf,
    warn_writer: WarnWriter,
}

impl<J: Judge> BatchScheduler<J> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: GradeClient<J>,
        processed_dir: impl Into<PathBuf>,
        question_count: usize,
        max_concurrent: usize,
        force_regrade: bool,
        summary_path: impl Into<PathBuf>,
        warn_writer: WarnWriter,
    ) -> Self {
        Self {
            client,
            processed_dir: processed_dir.into(),
            question_count,
            max_concurrent: max_concurrent.max(1),
            force_regrade,
            summary_path: summary_path.into(),
            warn_writer,
        }
    }

    /// 运行一轮完整的批改活动
    pub async fn run(&self) -> AppResult<CampaignStats> {
        let (ledgers, items) = self.discover()?;

        let mut stats = CampaignStats {
            total_items: items.len(),
            ..Default::default()
        };

        if items.is_empty() {
            info!("✅ 没有待批改的题目");
        } else {
            info!(
                "✓ 发现 {} 个待批改项（{} 位学生）",
                items.len(),
                ledgers.len()
            );
            self.grade_all(&ledgers, items, &mut stats).await;
        }

        // 报表从落盘后的台账重算，不信任内存中的批改结果
        for (student, ledger) in &ledgers {
            let ledger = ledger.lock().await;
            let result = reporter::student_result(student, &ledger);
            if let Err(e) = reporter::write_grade_file(&self.processed_dir.join(student), &result) {
                error!("学生 {} 的 grade.txt 写入失败: {}", student, e);
            }
        }

        self.post_run_scan(&mut stats)?;
        Ok(stats)
    }

    /// 发现全部工作项
    ///
    /// 待批改但没有 answer.md 的题不是错误，静默跳过（学生没交）
    fn discover(&self) -> AppResult<(HashMap<String, Arc<Mutex<GradeLedger>>>, Vec<WorkItem>)> {
        let mut ledgers = HashMap::new();
        let mut items = Vec::new();

        for student in self.list_students()? {
            let student_dir = self.processed_dir.join(&student);
            let ledger = match GradeLedger::load(&student_dir, self.question_count) {
                Ok(l) => l,
                Err(e) => {
                    error!("学生 {} 的台账无法初始化，跳过: {}", student, e);
                    continue;
                }
            };

            for question_id in ledger.pending(self.force_regrade) {
                let answer_path = student_dir.join(question_id.to_string()).join("answer.md");
                if answer_path.is_file() {
                    items.push(WorkItem {
                        student: student.clone(),
                        question_id,
                        answer_path,
                    });
                }
            }

            ledgers.insert(student, Arc::new(Mutex::new(ledger)));
        }

        Ok((ledgers, items))
    }

    /// 并发批改全部工作项，结果按完成顺序落盘
    async fn grade_all(
        &self,
        ledgers: &HashMap<String, Arc<Mutex<GradeLedger>>>,
        items: Vec<WorkItem>,
        stats: &mut CampaignStats,
    ) {
        let semaphore = Semaphore::new(self.max_concurrent);
        let total = items.len();

        let mut in_flight = FuturesUnordered::new();
        for item in items {
            let ledger = ledgers
                .get(&item.student)
                .expect("工作项只来自已加载台账的学生")
                .clone();
            let semaphore = &semaphore;
            let client = &self.client;

            in_flight.push(async move {
                let _permit = semaphore.acquire().await.expect("semaphore 不会被关闭");
                let verdict = client.grade(&item.answer_path, item.question_id).await;

                let graded = verdict.score.is_some();
                let tokens = verdict.tokens_used;
                {
                    let mut ledger = ledger.lock().await;
                    if let Err(e) =
                        ledger.update(item.question_id, verdict.score, Some(verdict.reason))
                    {
                        error!("{} 台账落盘失败: {}", item, e);
                    }
                }
                (item, graded, tokens)
            });
        }

        let mut done = 0usize;
        while let Some((item, graded, tokens)) = in_flight.next().await {
            done += 1;
            stats.total_tokens += u64::from(tokens);
            if graded {
                stats.graded += 1;
                info!("✓ {} 已批改", item);
            } else {
                stats.failed += 1;
                warn!("❌ {} 批改失败，留待下次运行", item);
            }
            info!(
                "📊 进度 {}/{} | 累计 token {}",
                done, total, stats.total_tokens
            );
        }
    }

    /// 运行后全量扫描：汇总表 + 未批改警告
    ///
    /// 重新列目录、重新读台账，连本轮没有工作项的学生也一并覆盖
    fn post_run_scan(&self, stats: &mut CampaignStats) -> AppResult<()> {
        let mut students = self.list_students()?;
        students.sort();

        info!("\n📋 正在检查 {} 位学生的批改结果...", students.len());

        let mut results = Vec::new();
        let mut flagged = Vec::new();

        for student in &students {
            let student_dir = self.processed_dir.join(student);
            if !student_dir.join(LEDGER_FILE).is_file() {
                flagged.push((student.clone(), Vec::new()));
                results.push(reporter::missing_ledger_result(student));
                continue;
            }

            let result = match GradeLedger::load(&student_dir, self.question_count) {
                Ok(ledger) => reporter::student_result(student, &ledger),
                Err(e) => {
                    error!("学生 {} 的台账无法读取: {}", student, e);
                    flagged.push((student.clone(), Vec::new()));
                    results.push(reporter::missing_ledger_result(student));
                    continue;
                }
            };

            if !result.unresolved.is_empty() {
                flagged.push((student.clone(), result.unresolved.clone()));
            }
            results.push(result);
        }

        stats.unresolved_students = flagged.len();

        reporter::export_summary(&self.summary_path, &results)?;
        self.warn_writer.write_unresolved(&flagged)?;

        if flagged.is_empty() {
            info!("✅ 所有学生的题目均已批改完成");
        } else {
            warn!(
                "⚠️ {} 位学生存在未批改的题目，详见警告日志",
                flagged.len()
            );
        }

        Ok(())
    }

    /// 列出学生目录（跳过隐藏目录与示例目录）
    fn list_students(&self) -> AppResult<Vec<String>> {
        let entries = std::fs::read_dir(&self.processed_dir).map_err(|e| {
            crate::error::AppError::file_read_failed(self.processed_dir.display().to_string(), e)
        })?;

        Ok(entries
            .flatten()
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|name| !name.starts_with('.') && name != "example")
            .collect())
    }
}
