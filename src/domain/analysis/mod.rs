//! Analysis Context - 分析结果限界上下文
//!
//! 职责:
//! - 远程响应归一化后的固定结果形状
//! - 澄清问题与回答
//! - 澄清回答合并规则

mod result;
mod value_objects;

pub use result::{AnalysisResult, ClarificationAnswer, ClarificationQuestion, ProposedCode};
pub use value_objects::RecordId;
