//! Analysis Context - Value Objects

use serde::{Deserialize, Serialize};

/// 远程服务分配的分析记录标识
///
/// 用于把澄清回答关联回正在进行的分析实例
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Result<Self, &'static str> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("记录 ID 不能为空");
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_rejects_blank() {
        assert!(RecordId::new("  ").is_err());
        assert_eq!(RecordId::new("rec-1").unwrap().as_str(), "rec-1");
    }
}
