//! The closed set of recorded build-logic inputs.
//!
//! Each variant carries everything needed to re-derive its expected value
//! without re-running build logic. Inputs are created during a cache-miss
//! build, appended to the fingerprint stream, and only ever read afterwards.

use std::collections::BTreeMap;
use std::path::PathBuf;

use confcache_common::{ContentHash, ScopePath};
use serde::{Deserialize, Serialize};

/// A single file read by build logic, with its content hash at record time.
///
/// `hash` is `None` when the file did not exist when it was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFile {
    /// The file that was read.
    pub file: PathBuf,
    /// Content hash, or `None` if the file was absent.
    pub hash: Option<ContentHash>,
}

impl InputFile {
    /// Creates an input file record.
    pub fn new(file: impl Into<PathBuf>, hash: Option<ContentHash>) -> Self {
        Self {
            file: file.into(),
            hash,
        }
    }
}

/// A declared set of files and directories, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSet {
    /// Files or directory roots. Directories include everything below them.
    pub roots: Vec<PathBuf>,
}

impl FileSet {
    /// Creates a file set from the given roots.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }
}

/// A snapshot of a value produced by a value source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueSnapshot {
    /// The source produced no value.
    Absent,
    /// A text value.
    Text(String),
    /// An integer value.
    Integer(i64),
    /// A boolean value.
    Boolean(bool),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// An ordered list of values.
    List(Vec<ValueSnapshot>),
}

/// A value computed by build logic, together with how to compute it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObtainedValue {
    /// Type name of the value source that produced the value.
    pub source_type: String,
    /// Parameters the value source was instantiated with.
    pub parameters: BTreeMap<String, String>,
    /// The value obtained at record time.
    pub value: ValueSnapshot,
}

/// An input captured during a cache-miss build, re-checked on later builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordedInput {
    /// Fingerprint of a task's declared file inputs.
    TaskInputs {
        /// Path of the task, e.g. `:app:compileJava`.
        task_path: String,
        /// The declared inputs.
        file_system_inputs: FileSet,
        /// Aggregate fingerprint of the inputs at record time.
        file_system_inputs_fingerprint: ContentHash,
    },
    /// A single file read as a build-logic input.
    InputFile(InputFile),
    /// A build-logic-supplied dynamic input.
    ValueSource(ObtainedValue),
    /// The ordered list of initialization scripts used.
    InitScripts(Vec<InputFile>),
    /// A Gradle property read without explicit declaration.
    UndeclaredGradleProperty {
        /// Property name.
        key: String,
        /// Value read, `None` if unset.
        value: Option<String>,
    },
    /// A system property read without explicit declaration.
    UndeclaredSystemProperty {
        /// Property name.
        key: String,
        /// Value read, `None` if unset.
        value: Option<String>,
    },
    /// An environment variable read without explicit declaration.
    UndeclaredEnvironmentVariable {
        /// Variable name.
        key: String,
        /// Value read, `None` if unset.
        value: Option<String>,
    },
    /// A dependency resolution result valid only until `expire_at`.
    ChangingDependencyResolutionValue {
        /// Build start time (epoch millis) at or after which the value is stale.
        expire_at: u64,
        /// Reason reported verbatim once the value has expired.
        reason: String,
    },
    /// Identity of the executing toolchain.
    GradleEnvironment {
        /// The user home directory in use.
        gradle_user_home_dir: PathBuf,
        /// Fingerprint of the runtime executing the build.
        jvm: String,
    },
}

impl RecordedInput {
    /// Returns a short human-readable name of this input's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TaskInputs { .. } => "task inputs",
            Self::InputFile(_) => "input file",
            Self::ValueSource(_) => "value source",
            Self::InitScripts(_) => "init scripts",
            Self::UndeclaredGradleProperty { .. } => "Gradle property",
            Self::UndeclaredSystemProperty { .. } => "system property",
            Self::UndeclaredEnvironmentVariable { .. } => "environment variable",
            Self::ChangingDependencyResolutionValue { .. } => "changing dependency resolution value",
            Self::GradleEnvironment { .. } => "Gradle environment",
        }
    }

    /// Returns `true` if this input may be recorded against a single scope.
    ///
    /// Init scripts and the toolchain environment apply to the whole build tree.
    pub fn is_scopeable(&self) -> bool {
        !matches!(self, Self::InitScripts(_) | Self::GradleEnvironment { .. })
    }
}

/// One element of the fingerprint stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FingerprintEntry {
    /// An input whose staleness discards the whole cache entry.
    Global(RecordedInput),
    /// An input whose staleness invalidates only `scope`.
    ScopeSpecific {
        /// The scope the input belongs to.
        scope: ScopePath,
        /// The recorded input.
        input: RecordedInput,
    },
}

impl FingerprintEntry {
    /// Returns the scope of a scope-specific entry.
    pub fn scope(&self) -> Option<&ScopePath> {
        match self {
            Self::Global(_) => None,
            Self::ScopeSpecific { scope, .. } => Some(scope),
        }
    }

    /// Returns the recorded input.
    pub fn input(&self) -> &RecordedInput {
        match self {
            Self::Global(input) | Self::ScopeSpecific { input, .. } => input,
        }
    }
}
