//! Clarification Commands - 澄清回答命令

use std::collections::HashMap;

use crate::domain::analysis::{ClarificationAnswer, RecordId};
use crate::domain::task::TaskId;

/// 提交当前澄清请求的回答，按记录分组
#[derive(Debug, Clone)]
pub struct ResolveClarification {
    pub answers: HashMap<RecordId, Vec<ClarificationAnswer>>,
}

/// 关闭当前澄清请求
#[derive(Debug, Clone)]
pub struct DismissClarification;

/// 重新排队某个任务的澄清
#[derive(Debug, Clone)]
pub struct ReopenClarification {
    pub task_id: TaskId,
}
