//! Analysis Queries

/// 查询活动请求数与全局横幅
#[derive(Debug, Clone)]
pub struct GetAnalysisStatus;

/// 查询当前可见的澄清请求
#[derive(Debug, Clone)]
pub struct GetCurrentClarification;
