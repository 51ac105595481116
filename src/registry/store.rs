use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use once_cell::sync::Lazy;

use super::record::MetadataRecord;
use super::token::{IdentityToken, SuiteType};

/// 进程级注册表
static GLOBAL_REGISTRY: Lazy<MetadataRegistry> = Lazy::new(MetadataRegistry::new);

/// 获取进程级注册表
///
/// 收集阶段只写入，执行阶段只读取；没有显式的清理。
pub fn global() -> &'static MetadataRegistry {
    &GLOBAL_REGISTRY
}

#[derive(Default)]
struct RegistryInner {
    /// 按首次插入顺序排列的条目
    entries: Vec<(IdentityToken, MetadataRecord)>,
    /// token -> entries 下标
    index: HashMap<IdentityToken, usize>,
    /// 已经解析过的套件
    sealed: HashSet<SuiteType>,
}

/// 元数据注册表
///
/// 扁平的按键覆盖映射：同一 token 再次 `store` 会整体替换旧记录，
/// 但保留它在插入顺序中的位置。深度合并由解析器负责。
#[derive(Default)]
pub struct MetadataRegistry {
    inner: RwLock<RegistryInner>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// 保存记录，替换同一 token 下的旧记录；从不拒绝
    pub fn store(&self, token: IdentityToken, record: MetadataRecord) {
        let mut inner = self.write();

        if let Some(owner) = token.owner()
            && inner.sealed.contains(&owner)
        {
            tracing::warn!(
                token = %token,
                "registry write after suite {} was resolved; the running plan will not see it",
                owner
            );
        }

        match inner.index.get(&token).copied() {
            Some(position) => inner.entries[position].1 = record,
            None => {
                let position = inner.entries.len();
                inner.index.insert(token.clone(), position);
                inner.entries.push((token, record));
            }
        }
    }

    pub fn get(&self, token: &IdentityToken) -> Option<MetadataRecord> {
        let inner = self.read();
        inner
            .index
            .get(token)
            .map(|&position| inner.entries[position].1.clone())
    }

    /// 全部条目，按插入顺序
    pub fn get_all(&self) -> Vec<(IdentityToken, MetadataRecord)> {
        self.read().entries.clone()
    }

    pub fn has(&self, token: &IdentityToken) -> bool {
        self.read().index.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    /// 标记套件已进入解析阶段
    pub fn seal(&self, owner: SuiteType) {
        if self.write().sealed.insert(owner) {
            tracing::debug!("suite {} sealed for resolution", owner);
        }
    }

    pub fn is_sealed(&self, owner: SuiteType) -> bool {
        self.read().sealed.contains(&owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::record::RecordKind;

    struct UsersApi;

    #[test]
    fn test_store_and_get() {
        let registry = MetadataRegistry::new();
        let token = IdentityToken::key("get_user");
        assert!(!registry.has(&token));

        registry.store(token.clone(), MetadataRecord::new(RecordKind::Test, "get_user"));
        assert!(registry.has(&token));
        assert_eq!(registry.get(&token).unwrap().name, "get_user");
        assert!(registry.get(&IdentityToken::key("missing")).is_none());
    }

    #[test]
    fn test_store_replaces_whole_record() {
        let registry = MetadataRegistry::new();
        let token = IdentityToken::key("get_user");

        let mut first = MetadataRecord::new(RecordKind::Test, "get_user");
        first.options.modifiers.only = true;
        registry.store(token.clone(), first);
        registry.store(token.clone(), MetadataRecord::new(RecordKind::Test, "get_user"));

        assert_eq!(registry.len(), 1);
        assert!(!registry.get(&token).unwrap().options.modifiers.only);
    }

    #[test]
    fn test_get_all_keeps_insertion_order() {
        let registry = MetadataRegistry::new();
        registry.store(IdentityToken::key("b"), MetadataRecord::new(RecordKind::Test, "b"));
        registry.store(IdentityToken::key("a"), MetadataRecord::new(RecordKind::Test, "a"));
        registry.store(IdentityToken::key("c"), MetadataRecord::new(RecordKind::Test, "c"));
        // 覆盖不改变位置
        registry.store(IdentityToken::key("b"), MetadataRecord::new(RecordKind::Test, "b2"));

        let names: Vec<String> = registry.get_all().into_iter().map(|(_, r)| r.name).collect();
        assert_eq!(names, vec!["b2", "a", "c"]);
    }

    #[test]
    fn test_store_after_seal_is_accepted() {
        let registry = MetadataRegistry::new();
        let owner = SuiteType::of::<UsersApi>();
        registry.seal(owner);
        assert!(registry.is_sealed(owner));

        let token = IdentityToken::slot::<UsersApi>("late");
        registry.store(token.clone(), MetadataRecord::new(RecordKind::Test, "late"));
        assert!(registry.has(&token));
    }
}
