//! Domain identifiers (strongly-typed IDs).
//!
//! Tasks, distros, hosts and versions are all named by opaque strings owned by
//! the ingestion pipeline, so the inner value is a `String` rather than a
//! generated ULID. The phantom marker keeps a `TaskId` from being passed where a
//! `DistroId` is expected.
//!
//! ## Phantom Type パターン
//! `Id<T>` で共通実装を提供しつつ、`T` は実行時には使わない（PhantomData）
//! マーカー型としてコンパイル時の型安全性だけを提供します。

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

/// IdMarker は各 ID 型のマーカー trait
pub trait IdMarker: Send + Sync + 'static {
    /// Human-readable kind used in error messages ("distro", "task", ...).
    fn kind() -> &'static str;
}

/// Generic string identifier.
///
/// # 例
/// ```ignore
/// let distro: DistroId = Id::new("ubuntu2204-large");
/// let task: TaskId = Id::new("compile_linux_patch_1");
/// // distro と task は異なる型なので、混同できない
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T: IdMarker> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl<T: IdMarker> From<&str> for Id<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> From<String> for Id<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T: IdMarker> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", T::kind(), self.value)
    }
}

// Serialized as the bare string so persisted queues stay readable.
impl<T: IdMarker> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl<'de, T: IdMarker> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

// ========================================
// マーカー型の定義
// ========================================

pub mod markers {
    use super::IdMarker;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub enum Distro {}

    impl IdMarker for Distro {
        fn kind() -> &'static str {
            "distro"
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub enum Task {}

    impl IdMarker for Task {
        fn kind() -> &'static str {
            "task"
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub enum Host {}

    impl IdMarker for Host {
        fn kind() -> &'static str {
            "host"
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub enum Version {}

    impl IdMarker for Version {
        fn kind() -> &'static str {
            "version"
        }
    }
}

/// Identifier of a distro (execution environment).
pub type DistroId = Id<markers::Distro>;

/// Identifier of a task.
pub type TaskId = Id<markers::Task>;

/// Identifier of a host (one machine of a distro).
pub type HostId = Id<markers::Host>;

/// Identifier of the version a task belongs to.
pub type VersionId = Id<markers::Version>;
