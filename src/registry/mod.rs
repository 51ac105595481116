/// 元数据注册表 - 按身份标识保存规格片段
mod record;
mod store;
mod token;

pub use record::{
    ExecutionModifiers, HookPhase, InstanceMode, MetadataRecord, RecordKind,
    SpecificationOptions,
};
pub use store::{MetadataRegistry, global};
pub use token::{IdentityToken, SuiteType};
