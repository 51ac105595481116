/// 规格解析器 - 把同一成员的所有片段合并成一条有效记录
mod merge;
mod resolve;

use serde::Deserialize;

pub use resolve::{MemberRef, SpecResolver};

/// 两个片段对同一字段给出不同值时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// 按注册顺序，后注册的生效
    #[default]
    LastWins,
    /// 解析失败，报告冲突字段
    FailFast,
}
