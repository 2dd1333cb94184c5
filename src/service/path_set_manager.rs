//! 派生路径集合管理
//!
//! 合并基础路径与用户自定义路径（按路径身份去重，先出现者保留），
//! 并把扫描窗口展开为具体的地址位置

use std::collections::HashSet;

use serde::Serialize;

use crate::domain::derivation_path::{
    DerivationPathTemplate, ExtendedDerivationPath, PathItem, MAX_NON_HARDENED_INDEX,
};
use crate::error::DiscoveryError;

/// 路径来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PathOrigin {
    Base,
    Custom,
}

/// 合并后的路径条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedPath {
    pub path: ExtendedDerivationPath,
    pub origin: PathOrigin,
}

/// 用户自定义路径集合（有序，先加入者保留）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CustomPathSet {
    paths: Vec<ExtendedDerivationPath>,
}

impl CustomPathSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtendedDerivationPath> {
        self.paths.iter()
    }

    pub fn as_slice(&self) -> &[ExtendedDerivationPath] {
        &self.paths
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.paths.iter().any(|p| p.identity() == identity)
    }

    /// 追加路径，返回真正新增的部分
    pub fn extend_with(
        &mut self,
        new_paths: impl IntoIterator<Item = ExtendedDerivationPath>,
    ) -> Vec<ExtendedDerivationPath> {
        let mut added = Vec::new();
        for path in new_paths {
            if !self.contains(path.identity()) {
                added.push(path.clone());
                self.paths.push(path);
            }
        }
        added
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }
}

impl FromIterator<ExtendedDerivationPath> for CustomPathSet {
    fn from_iter<I: IntoIterator<Item = ExtendedDerivationPath>>(iter: I) -> Self {
        let mut set = CustomPathSet::new();
        set.extend_with(iter);
        set
    }
}

/// 路径集合管理器（纯函数）
pub struct PathSetManager;

impl PathSetManager {
    /// 合并基础路径与自定义路径
    ///
    /// 先基础后自定义，按身份去重，保留首次出现的条目和相对顺序。
    pub fn merge_paths(
        base: &[ExtendedDerivationPath],
        custom: &[ExtendedDerivationPath],
    ) -> Vec<MergedPath> {
        let mut seen = HashSet::new();
        let tagged = base
            .iter()
            .map(|p| (p, PathOrigin::Base))
            .chain(custom.iter().map(|p| (p, PathOrigin::Custom)));

        tagged
            .filter(|(path, _)| seen.insert(path.identity().to_string()))
            .map(|(path, origin)| MergedPath {
                path: path.clone(),
                origin,
            })
            .collect()
    }

    /// 向已有集合追加自定义路径（幂等）
    pub fn add_custom_paths(
        existing: &CustomPathSet,
        new_paths: &[ExtendedDerivationPath],
    ) -> CustomPathSet {
        let mut set = existing.clone();
        set.extend_with(new_paths.iter().cloned());
        set
    }

    /// 按身份去重（先出现者保留）
    pub fn dedup_by_identity(paths: Vec<ExtendedDerivationPath>) -> Vec<ExtendedDerivationPath> {
        let mut seen = HashSet::new();
        paths
            .into_iter()
            .filter(|p| seen.insert(p.identity().to_string()))
            .collect()
    }

    /// 把扫描窗口展开为具体地址位置
    pub fn expand(path: &ExtendedDerivationPath) -> Result<Vec<PathItem>, DiscoveryError> {
        path.indices()
            .map(|index| PathItem::resolve(&path.template, index))
            .collect()
    }

    /// 最后扫描索引之后的下一个缺口窗口
    ///
    /// 固定路径或已到达 BIP32 索引上限时返回 None。
    pub fn next_window(
        template: &DerivationPathTemplate,
        last_scanned: u32,
        gap: u32,
    ) -> Option<ExtendedDerivationPath> {
        if template.is_fixed() || last_scanned >= MAX_NON_HARDENED_INDEX {
            return None;
        }
        Some(ExtendedDerivationPath::new(
            template.clone(),
            last_scanned + 1,
            gap,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(path: &str, offset: u32, num: u32) -> ExtendedDerivationPath {
        ExtendedDerivationPath::new(DerivationPathTemplate::new("test", path).unwrap(), offset, num)
    }

    #[test]
    fn test_merge_dedups_and_keeps_order() {
        let base = vec![
            window("m/44'/60'/0'/0/<addr>", 0, 20),
            window("m/44'/60'/<account>'/0/0", 0, 20),
        ];
        let custom = vec![
            window("m/44'/1'/0'/0/<addr>", 0, 5),
            // 与基础路径同身份：基础路径保留
            window("m/44'/60'/0'/0/<addr>", 0, 5),
            window("m/44'/61'/0'/0/<addr>", 0, 5),
        ];

        let merged = PathSetManager::merge_paths(&base, &custom);
        let identities: Vec<&str> = merged.iter().map(|m| m.path.identity()).collect();
        assert_eq!(
            identities,
            vec![
                "m/44'/60'/0'/0/<addr>",
                "m/44'/60'/<account>'/0/0",
                "m/44'/1'/0'/0/<addr>",
                "m/44'/61'/0'/0/<addr>",
            ]
        );

        assert_eq!(merged[0].origin, PathOrigin::Base);
        assert_eq!(merged[0].path.num_addresses, 20);
        assert_eq!(merged[2].origin, PathOrigin::Custom);
    }

    #[test]
    fn test_merge_duplicates_within_custom() {
        let custom = vec![
            window("m/44'/1'/0'/0/<addr>", 0, 5),
            window("m/44'/1'/0'/0/<addr>", 10, 5),
        ];

        let merged = PathSetManager::merge_paths(&[], &custom);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].path.offset, 0);
    }

    #[test]
    fn test_add_custom_paths_is_idempotent() {
        let paths = vec![
            window("m/44'/1'/0'/0/<addr>", 0, 5),
            window("m/44'/61'/0'/0/<addr>", 0, 5),
        ];

        let once = PathSetManager::add_custom_paths(&CustomPathSet::new(), &paths);
        let twice = PathSetManager::add_custom_paths(&once, &paths);
        assert_eq!(once, twice);
        assert_eq!(twice.len(), 2);
    }

    #[test]
    fn test_extend_with_reports_new_paths() {
        let mut set = CustomPathSet::new();
        let first = set.extend_with(vec![window("m/44'/1'/0'/0/<addr>", 0, 5)]);
        assert_eq!(first.len(), 1);

        let second = set.extend_with(vec![
            window("m/44'/1'/0'/0/<addr>", 0, 5),
            window("m/44'/61'/0'/0/<addr>", 0, 5),
        ]);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].identity(), "m/44'/61'/0'/0/<addr>");
    }

    #[test]
    fn test_expand_window() {
        let items = PathSetManager::expand(&window("m/44'/60'/0'/0/<addr>", 20, 3)).unwrap();
        let paths: Vec<&str> = items.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["m/44'/60'/0'/0/20", "m/44'/60'/0'/0/21", "m/44'/60'/0'/0/22"]
        );
        assert_eq!(items[2].index, 22);
    }

    #[test]
    fn test_next_window() {
        let template = DerivationPathTemplate::new("test", "m/44'/60'/0'/0/<addr>").unwrap();
        let next = PathSetManager::next_window(&template, 19, 20).unwrap();
        assert_eq!(next.offset, 20);
        assert_eq!(next.last_index(), 39);

        assert!(PathSetManager::next_window(&template, MAX_NON_HARDENED_INDEX, 20).is_none());

        let fixed = DerivationPathTemplate::new("fixed", "m/44'/60'/0'/0/7").unwrap();
        assert!(PathSetManager::next_window(&fixed, 0, 20).is_none());
    }
}
