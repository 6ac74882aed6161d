//! The default [`Host`] backed by the real filesystem and process environment.

use std::collections::{BTreeMap, HashMap};
use std::env::VarError;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use confcache_common::ContentHash;

use crate::error::FingerprintError;
use crate::hasher::FileHasher;
use crate::host::{Host, ValueSource};
use crate::input::{FileSet, ObtainedValue, ValueSnapshot};

/// Builds a value source from its recorded parameters.
pub type ValueSourceFactory =
    Box<dyn Fn(&BTreeMap<String, String>) -> Result<Box<dyn ValueSource>, FingerprintError> + Send + Sync>;

/// Type name of the built-in environment variable value source.
pub const ENVIRONMENT_VARIABLE_SOURCE: &str = "EnvironmentVariableValueSource";

/// Type name of the built-in file contents value source.
pub const FILE_TEXT_SOURCE: &str = "FileTextValueSource";

/// Registry of value source types that can be re-instantiated from a fingerprint.
pub struct ValueSourceRegistry {
    factories: HashMap<String, ValueSourceFactory>,
}

impl ValueSourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Creates a registry holding the built-in environment variable and file
    /// text sources. File paths are resolved against `build_root`.
    pub fn with_builtins(build_root: &Path) -> Self {
        let mut registry = Self::new();
        registry.register(ENVIRONMENT_VARIABLE_SOURCE, |params| {
            let name = required_parameter(params, ENVIRONMENT_VARIABLE_SOURCE, "variableName")?;
            Ok(Box::new(EnvironmentVariableSource { name }) as Box<dyn ValueSource>)
        });
        let root = build_root.to_path_buf();
        registry.register(FILE_TEXT_SOURCE, move |params| {
            let file = required_parameter(params, FILE_TEXT_SOURCE, "file")?;
            Ok(Box::new(FileTextSource {
                path: root.join(&file),
                display: file,
            }) as Box<dyn ValueSource>)
        });
        registry
    }

    /// Registers `factory` under `type_name`, replacing any previous factory.
    pub fn register<F>(&mut self, type_name: &str, factory: F)
    where
        F: Fn(&BTreeMap<String, String>) -> Result<Box<dyn ValueSource>, FingerprintError>
            + Send
            + Sync
            + 'static,
    {
        self.factories
            .insert(type_name.to_string(), Box::new(factory));
    }

    /// Rebuilds the value source recorded in `obtained_value`.
    pub fn instantiate(
        &self,
        obtained_value: &ObtainedValue,
    ) -> Result<Box<dyn ValueSource>, FingerprintError> {
        let factory = self
            .factories
            .get(&obtained_value.source_type)
            .ok_or_else(|| FingerprintError::UnknownValueSource {
                type_name: obtained_value.source_type.clone(),
            })?;
        factory(&obtained_value.parameters)
    }
}

impl Default for ValueSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn required_parameter(
    params: &BTreeMap<String, String>,
    source_type: &str,
    name: &'static str,
) -> Result<String, FingerprintError> {
    params
        .get(name)
        .cloned()
        .ok_or_else(|| FingerprintError::Probe {
            operation: "instantiate_value_source",
            reason: format!("{source_type} is missing parameter '{name}'"),
        })
}

fn read_environment_variable(name: &str) -> Result<Option<String>, FingerprintError> {
    match std::env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(FingerprintError::Probe {
            operation: "environment_variable",
            reason: format!("environment variable '{name}' is not valid unicode"),
        }),
    }
}

struct EnvironmentVariableSource {
    name: String,
}

impl ValueSource for EnvironmentVariableSource {
    fn obtain(&self) -> Result<ValueSnapshot, FingerprintError> {
        Ok(read_environment_variable(&self.name)?
            .map(ValueSnapshot::Text)
            .unwrap_or(ValueSnapshot::Absent))
    }

    fn type_name(&self) -> &str {
        ENVIRONMENT_VARIABLE_SOURCE
    }

    fn display_name(&self) -> Option<String> {
        Some(format!("environment variable '{}'", self.name))
    }
}

struct FileTextSource {
    path: PathBuf,
    display: String,
}

impl ValueSource for FileTextSource {
    fn obtain(&self) -> Result<ValueSnapshot, FingerprintError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(ValueSnapshot::Text(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ValueSnapshot::Absent),
            Err(e) => Err(FingerprintError::io(&self.path, e)),
        }
    }

    fn type_name(&self) -> &str {
        FILE_TEXT_SOURCE
    }

    fn display_name(&self) -> Option<String> {
        Some(format!("file '{}'", self.display))
    }
}

/// Returns a fingerprint of the toolchain running this process.
pub fn default_runtime_fingerprint() -> String {
    format!(
        "{}-{}-{}",
        std::env::consts::OS,
        std::env::consts::ARCH,
        env!("CARGO_PKG_VERSION")
    )
}

/// A [`Host`] reading the real filesystem and process environment.
///
/// Gradle and system properties come from the maps supplied at construction
/// (they are resolved by the launcher, not by this crate). Environment
/// variables are read from the current process on every probe.
pub struct FileSystemHost {
    build_root: PathBuf,
    gradle_user_home_dir: PathBuf,
    init_scripts: Vec<PathBuf>,
    build_start_time: u64,
    jvm: String,
    gradle_properties: BTreeMap<String, String>,
    system_properties: BTreeMap<String, String>,
    value_sources: ValueSourceRegistry,
}

impl FileSystemHost {
    /// Creates a host for the build rooted at `build_root`, with the build
    /// start time set to now and the built-in value sources registered.
    pub fn new(build_root: &Path, gradle_user_home_dir: &Path) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            build_root: build_root.to_path_buf(),
            gradle_user_home_dir: gradle_user_home_dir.to_path_buf(),
            init_scripts: Vec::new(),
            build_start_time: now,
            jvm: default_runtime_fingerprint(),
            gradle_properties: BTreeMap::new(),
            system_properties: BTreeMap::new(),
            value_sources: ValueSourceRegistry::with_builtins(build_root),
        }
    }

    /// Sets the init scripts, in application order.
    pub fn with_init_scripts(mut self, scripts: Vec<PathBuf>) -> Self {
        self.init_scripts = scripts;
        self
    }

    /// Overrides the build start time (epoch millis).
    pub fn with_build_start_time(mut self, millis: u64) -> Self {
        self.build_start_time = millis;
        self
    }

    /// Overrides the runtime fingerprint.
    pub fn with_jvm_fingerprint(mut self, jvm: impl Into<String>) -> Self {
        self.jvm = jvm.into();
        self
    }

    /// Sets the Gradle properties visible to build logic.
    pub fn with_gradle_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.gradle_properties = properties;
        self
    }

    /// Sets the system properties visible to build logic.
    pub fn with_system_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.system_properties = properties;
        self
    }

    /// Returns the value source registry for registering custom sources.
    pub fn value_sources_mut(&mut self) -> &mut ValueSourceRegistry {
        &mut self.value_sources
    }

    /// Returns the build root.
    pub fn build_root(&self) -> &Path {
        &self.build_root
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        self.build_root.join(file)
    }
}

impl Host for FileSystemHost {
    fn gradle_user_home_dir(&self) -> PathBuf {
        self.gradle_user_home_dir.clone()
    }

    fn all_init_scripts(&self) -> Vec<PathBuf> {
        self.init_scripts.clone()
    }

    fn build_start_time(&self) -> u64 {
        self.build_start_time
    }

    fn jvm_fingerprint(&self) -> String {
        self.jvm.clone()
    }

    fn gradle_property(&self, name: &str) -> Option<String> {
        self.gradle_properties.get(name).cloned()
    }

    fn system_property(&self, name: &str) -> Option<String> {
        self.system_properties.get(name).cloned()
    }

    fn environment_variable(&self, name: &str) -> Result<Option<String>, FingerprintError> {
        read_environment_variable(name)
    }

    fn fingerprint_of(&self, file_set: &FileSet) -> Result<ContentHash, FingerprintError> {
        FileHasher::fingerprint_file_set(&self.build_root, file_set)
    }

    fn hash_code_of(&self, file: &Path) -> Result<Option<ContentHash>, FingerprintError> {
        FileHasher::hash_file(&self.resolve(file))
    }

    fn display_name_of(&self, file_or_directory: &Path) -> String {
        let resolved = self.resolve(file_or_directory);
        resolved
            .strip_prefix(&self.build_root)
            .unwrap_or(&resolved)
            .display()
            .to_string()
    }

    fn instantiate_value_source(
        &self,
        obtained_value: &ObtainedValue,
    ) -> Result<Box<dyn ValueSource>, FingerprintError> {
        self.value_sources.instantiate(obtained_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(dir: &Path) -> FileSystemHost {
        FileSystemHost::new(dir, &dir.join(".gradle-home"))
    }

    #[test]
    fn display_name_is_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        let host = host(dir.path());
        let absolute = dir.path().join("app").join("build.gradle");
        assert_eq!(
            host.display_name_of(&absolute),
            Path::new("app").join("build.gradle").display().to_string()
        );
        assert_eq!(host.display_name_of(Path::new("settings.gradle")), "settings.gradle");
    }

    #[test]
    fn display_name_outside_root_is_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let host = host(dir.path());
        let outside = other.path().join("init.gradle");
        assert_eq!(host.display_name_of(&outside), outside.display().to_string());
    }

    #[test]
    fn hash_code_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("settings.gradle"), "include ':app'").unwrap();
        let host = host(dir.path());
        assert_eq!(
            host.hash_code_of(Path::new("settings.gradle")).unwrap(),
            Some(ContentHash::from_bytes(b"include ':app'"))
        );
        assert_eq!(host.hash_code_of(Path::new("missing.gradle")).unwrap(), None);
    }

    #[test]
    fn properties_come_from_supplied_maps() {
        let dir = tempfile::tempdir().unwrap();
        let host = host(dir.path())
            .with_gradle_properties(BTreeMap::from([("org.gradle.jvmargs".to_string(), "-Xmx2g".to_string())]))
            .with_system_properties(BTreeMap::from([("file.encoding".to_string(), "UTF-8".to_string())]));
        assert_eq!(host.gradle_property("org.gradle.jvmargs").as_deref(), Some("-Xmx2g"));
        assert_eq!(host.system_property("file.encoding").as_deref(), Some("UTF-8"));
        assert_eq!(host.gradle_property("missing"), None);
    }

    #[test]
    fn file_text_source_reads_current_content() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("version.txt"), "1.0").unwrap();
        let host = host(dir.path());
        let obtained = ObtainedValue {
            source_type: FILE_TEXT_SOURCE.to_string(),
            parameters: BTreeMap::from([("file".to_string(), "version.txt".to_string())]),
            value: ValueSnapshot::Text("1.0".to_string()),
        };
        let source = host.instantiate_value_source(&obtained).unwrap();
        assert_eq!(source.obtain().unwrap(), ValueSnapshot::Text("1.0".to_string()));
        assert_eq!(source.display_name().as_deref(), Some("file 'version.txt'"));

        std::fs::remove_file(dir.path().join("version.txt")).unwrap();
        assert_eq!(source.obtain().unwrap(), ValueSnapshot::Absent);
    }

    #[test]
    fn environment_source_describes_itself() {
        let registry = ValueSourceRegistry::with_builtins(Path::new("."));
        let obtained = ObtainedValue {
            source_type: ENVIRONMENT_VARIABLE_SOURCE.to_string(),
            parameters: BTreeMap::from([(
                "variableName".to_string(),
                "CONFCACHE_TEST_SURELY_UNSET".to_string(),
            )]),
            value: ValueSnapshot::Absent,
        };
        let source = registry.instantiate(&obtained).unwrap();
        assert_eq!(source.obtain().unwrap(), ValueSnapshot::Absent);
        assert_eq!(
            source.display_name().as_deref(),
            Some("environment variable 'CONFCACHE_TEST_SURELY_UNSET'")
        );
    }

    #[test]
    fn missing_parameter_is_probe_error() {
        let registry = ValueSourceRegistry::with_builtins(Path::new("."));
        let obtained = ObtainedValue {
            source_type: FILE_TEXT_SOURCE.to_string(),
            parameters: BTreeMap::new(),
            value: ValueSnapshot::Absent,
        };
        assert!(matches!(
            registry.instantiate(&obtained),
            Err(FingerprintError::Probe { .. })
        ));
    }

    #[test]
    fn unknown_source_type_is_error() {
        let registry = ValueSourceRegistry::new();
        let obtained = ObtainedValue {
            source_type: "Custom".to_string(),
            parameters: BTreeMap::new(),
            value: ValueSnapshot::Absent,
        };
        assert!(matches!(
            registry.instantiate(&obtained),
            Err(FingerprintError::UnknownValueSource { .. })
        ));
    }

    #[test]
    fn custom_source_registration() {
        struct Constant;
        impl ValueSource for Constant {
            fn obtain(&self) -> Result<ValueSnapshot, FingerprintError> {
                Ok(ValueSnapshot::Integer(7))
            }
            fn type_name(&self) -> &str {
                "Constant"
            }
        }
        let dir = tempfile::tempdir().unwrap();
        let mut host = host(dir.path());
        host.value_sources_mut()
            .register("Constant", |_| Ok(Box::new(Constant) as Box<dyn ValueSource>));
        let obtained = ObtainedValue {
            source_type: "Constant".to_string(),
            parameters: BTreeMap::new(),
            value: ValueSnapshot::Integer(7),
        };
        let source = host.instantiate_value_source(&obtained).unwrap();
        assert_eq!(source.obtain().unwrap(), ValueSnapshot::Integer(7));
        assert_eq!(source.display_name(), None);
    }

    #[cfg(unix)]
    #[test]
    fn non_unicode_environment_variable_is_probe_error() {
        use crate::checker::FingerprintChecker;
        use crate::input::{FingerprintEntry, RecordedInput};
        use std::os::unix::ffi::OsStrExt;

        const NAME: &str = "CONFCACHE_TEST_NON_UNICODE";
        std::env::set_var(NAME, std::ffi::OsStr::from_bytes(b"old\xff"));

        let dir = tempfile::tempdir().unwrap();
        let host = host(dir.path());
        assert!(matches!(
            host.environment_variable(NAME),
            Err(FingerprintError::Probe { .. })
        ));

        let obtained = ObtainedValue {
            source_type: ENVIRONMENT_VARIABLE_SOURCE.to_string(),
            parameters: BTreeMap::from([("variableName".to_string(), NAME.to_string())]),
            value: ValueSnapshot::Absent,
        };
        let source = host.instantiate_value_source(&obtained).unwrap();
        assert!(matches!(source.obtain(), Err(FingerprintError::Probe { .. })));

        let recorded = vec![Ok(FingerprintEntry::Global(
            RecordedInput::UndeclaredEnvironmentVariable {
                key: NAME.to_string(),
                value: None,
            },
        ))];
        let verdict = FingerprintChecker::new(&host).check_fingerprint(recorded);
        std::env::remove_var(NAME);
        assert!(matches!(verdict, Err(FingerprintError::Probe { .. })));
    }
}
