//! Analysis Commands - 提交与取消命令

use crate::domain::task::TaskId;

/// 分析单个任务
#[derive(Debug, Clone)]
pub struct SubmitAnalysis {
    pub task_id: TaskId,
}

/// 批量分析
///
/// `task_ids` 为空时取注册表中所有有输入文本的任务
#[derive(Debug, Clone, Default)]
pub struct SubmitBatch {
    pub task_ids: Option<Vec<TaskId>>,
}

/// 取消单个任务
#[derive(Debug, Clone)]
pub struct CancelAnalysis {
    pub task_id: TaskId,
}

/// 全局取消
#[derive(Debug, Clone)]
pub struct CancelAll;

/// 清除全局横幅
#[derive(Debug, Clone)]
pub struct ClearBanner;
