use std::any::TypeId;
use std::fmt;

/// 声明类型的身份：`TypeId` 加类型名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SuiteType {
    id: TypeId,
    name: &'static str,
}

impl SuiteType {
    pub fn of<S: 'static>() -> Self {
        Self {
            id: TypeId::of::<S>(),
            name: std::any::type_name::<S>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// 完整类型路径
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 去掉模块路径后的类型名
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl fmt::Display for SuiteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

/// 注册表的键
///
/// 同一个逻辑成员在不同注解应用时可能以不同的标识出现，
/// 解析器负责把它们收拢成一个视图。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityToken {
    /// 声明类型上的成员槽（稳定）
    Slot { owner: SuiteType, member: String },
    /// 具体的函数引用：名字稳定，`id` 每次包装都可能不同
    Function { name: String, id: u64 },
    /// 裸属性名
    Key(String),
    /// 套件本身的记录
    Suite(SuiteType),
    /// 之前合并过的部分结果
    Merged { owner: SuiteType, member: String },
}

impl IdentityToken {
    pub fn slot<S: 'static>(member: impl Into<String>) -> Self {
        IdentityToken::Slot {
            owner: SuiteType::of::<S>(),
            member: member.into(),
        }
    }

    pub fn function(name: impl Into<String>, id: u64) -> Self {
        IdentityToken::Function {
            name: name.into(),
            id,
        }
    }

    pub fn key(name: impl Into<String>) -> Self {
        IdentityToken::Key(name.into())
    }

    pub fn suite<S: 'static>() -> Self {
        IdentityToken::Suite(SuiteType::of::<S>())
    }

    /// 标识所属的声明类型（函数引用和裸属性名没有）
    pub fn owner(&self) -> Option<SuiteType> {
        match self {
            IdentityToken::Slot { owner, .. }
            | IdentityToken::Merged { owner, .. }
            | IdentityToken::Suite(owner) => Some(*owner),
            IdentityToken::Function { .. } | IdentityToken::Key(_) => None,
        }
    }

    /// 标识指向的成员名
    pub fn member_name(&self) -> Option<&str> {
        match self {
            IdentityToken::Slot { member, .. } | IdentityToken::Merged { member, .. } => {
                Some(member)
            }
            IdentityToken::Function { name, .. } => Some(name),
            IdentityToken::Key(name) => Some(name),
            IdentityToken::Suite(_) => None,
        }
    }
}

impl fmt::Display for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityToken::Slot { owner, member } => write!(f, "{}::{}", owner, member),
            IdentityToken::Function { name, id } => write!(f, "fn {}#{}", name, id),
            IdentityToken::Key(name) => write!(f, "key {}", name),
            IdentityToken::Suite(owner) => write!(f, "suite {}", owner),
            IdentityToken::Merged { owner, member } => write!(f, "merged {}::{}", owner, member),
        }
    }
}
