//! Task Commands - 任务增删改命令

use crate::domain::task::{SelectionDecision, TaskId};

/// 新增任务命令
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub input_text: String,
}

/// 移除任务命令
#[derive(Debug, Clone)]
pub struct RemoveTask {
    pub task_id: TaskId,
}

/// 修改输入文本命令（仅 Idle）
#[derive(Debug, Clone)]
pub struct EditTask {
    pub task_id: TaskId,
    pub input_text: String,
}

/// 接受/拒绝/清除编码命令
#[derive(Debug, Clone)]
pub struct SelectCode {
    pub task_id: TaskId,
    pub code: String,
    pub decision: SelectionDecision,
}
