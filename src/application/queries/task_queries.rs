//! Task Queries

use crate::domain::task::TaskId;

/// 获取任务详情查询
#[derive(Debug, Clone)]
pub struct GetTask {
    pub task_id: TaskId,
}

/// 按创建顺序列出所有任务
#[derive(Debug, Clone)]
pub struct ListTasks;
