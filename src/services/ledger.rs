//! 成绩台账 - 业务能力层
//!
//! 每个学生一份 `grade.log`，记录每道题的 `[分数, 评语]`。
//! 分数为 `null` 表示该题尚未批改，而不是 0 分；
//! 0 分以 `0` + 非空评语表示。
//!
//! ## 持久化纪律
//!
//! 每次更新都整体序列化后先写临时文件再原子替换，
//! 进程在写入与替换之间被杀死也不会留下残缺文件。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

/// 台账文件名
pub const LEDGER_FILE: &str = "grade.log";

/// 单题台账条目：`(分数, 评语)`，均可为空
pub type LedgerEntry = (Option<i64>, Option<String>);

/// 单个学生的成绩台账
#[derive(Debug)]
pub struct GradeLedger {
    path: PathBuf,
    entries: BTreeMap<u32, LedgerEntry>,
}

impl GradeLedger {
    /// 加载某学生的台账
    ///
    /// 文件缺失或损坏时重建全空台账并立即落盘；损坏只记日志，不报错
    pub fn load(student_dir: &Path, question_count: usize) -> AppResult<Self> {
        let path = student_dir.join(LEDGER_FILE);

        let mut entries = match std::fs::read_to_string(&path) {
            Ok(text) => match parse_entries(&text) {
                Some(entries) => entries,
                None => {
                    warn!("⚠️ grade.log 格式损坏，已重建: {}", path.display());
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("⚠️ grade.log 读取失败，已重建: {} ({})", path.display(), e);
                BTreeMap::new()
            }
        };

        // 规范题号集中缺失的条目补为 null；多余条目保留
        for id in 1..=question_count as u32 {
            entries.entry(id).or_insert((None, None));
        }

        let ledger = Self { path, entries };
        ledger.persist()?;
        Ok(ledger)
    }

    /// 覆写一道题的条目并整体落盘
    pub fn update(
        &mut self,
        question_id: u32,
        score: Option<i64>,
        comment: Option<String>,
    ) -> AppResult<()> {
        self.entries.insert(question_id, (score, comment));
        self.persist()?;
        debug!(
            "台账已更新: {} 第 {} 题",
            self.path.display(),
            question_id
        );
        Ok(())
    }

    /// 待批改的题号
    ///
    /// 强制重批模式下返回全部题号（是否有答案由调度器过滤）
    pub fn pending(&self, force_regrade: bool) -> Vec<u32> {
        self.entries
            .iter()
            .filter(|(_, (score, _))| force_regrade || score.is_none())
            .map(|(&id, _)| id)
            .collect()
    }

    /// 仍为 null 的题号（升序）
    pub fn unresolved(&self) -> Vec<u32> {
        self.entries
            .iter()
            .filter(|(_, (score, _))| score.is_none())
            .map(|(&id, _)| id)
            .collect()
    }

    /// 全部条目（按题号升序）
    pub fn entries(&self) -> &BTreeMap<u32, LedgerEntry> {
        &self.entries
    }

    /// 整体序列化后原子替换落盘
    fn persist(&self) -> AppResult<()> {
        let map: BTreeMap<String, &LedgerEntry> = self
            .entries
            .iter()
            .map(|(id, entry)| (id.to_string(), entry))
            .collect();
        let json = serde_json::to_string_pretty(&map)
            .map_err(|e| AppError::Other(format!("序列化台账失败: {}", e)))?;

        let tmp = self.path.with_extension("log.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| AppError::file_write_failed(tmp.display().to_string(), e))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| AppError::file_write_failed(self.path.display().to_string(), e))?;
        Ok(())
    }
}

/// 解析台账 JSON；任何形状不符都视为损坏
fn parse_entries(text: &str) -> Option<BTreeMap<u32, LedgerEntry>> {
    let raw: BTreeMap<String, LedgerEntry> = serde_json::from_str(text).ok()?;
    let mut entries = BTreeMap::new();
    for (key, entry) in raw {
        entries.insert(key.parse().ok()?, entry);
    }
    Some(entries)
}
