//! Resource naming conventions.

use serde::{Deserialize, Serialize};

/// A naming convention shared by every resource of one category.
///
/// For example all compiled tables share `suffix = ".table.bin"`, and
/// all schemas share `suffix = ".schema.yaml"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceKind {
    /// Human-readable category name (e.g. `"schema"`).
    pub name: String,
    /// Text prepended to a resource id to form the file name.
    #[serde(default)]
    pub prefix: String,
    /// Text appended to a resource id to form the file name.
    #[serde(default)]
    pub suffix: String,
}

impl ResourceKind {
    /// Creates a naming convention.
    pub fn new(
        name: impl Into<String>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Returns the relative file name `prefix + resource_id + suffix`.
    pub fn file_name(&self, resource_id: &str) -> String {
        format!("{}{}{}", self.prefix, resource_id, self.suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_concatenates() {
        let kind = ResourceKind::new("dict", "", ".dict.yaml");
        assert_eq!(kind.file_name("luna_pinyin"), "luna_pinyin.dict.yaml");

        let kind = ResourceKind::new("compiled", "build/", ".table.bin");
        assert_eq!(kind.file_name("cangjie5"), "build/cangjie5.table.bin");
    }

    #[test]
    fn deserialize_with_defaults() {
        let kind: ResourceKind = toml::from_str(r#"name = "config""#).unwrap();
        assert_eq!(kind.name, "config");
        assert!(kind.prefix.is_empty());
        assert!(kind.suffix.is_empty());
    }
}
