//! Re-evaluation of a recorded fingerprint stream against the current build.
//!
//! The stream is consumed strictly in order. A stale global input ends the
//! check at once; a stale scope-specific input condemns its scope, after which
//! the remaining inputs of that scope are skipped without probing the host.

use std::collections::BTreeSet;
use std::path::Path;

use confcache_common::{ContentHash, ScopePath};
use tracing::debug;

use crate::error::FingerprintError;
use crate::host::{Host, ValueSource};
use crate::input::{FingerprintEntry, InputFile, ObtainedValue, RecordedInput};

/// Human-readable explanation of why stored state cannot be reused.
pub type InvalidationReason = String;

/// Outcome of checking a fingerprint stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckedFingerprint {
    /// No recorded input is stale; the stored model may be reused in full.
    Valid,
    /// Some scope-specific inputs are stale; only these scopes must be rebuilt.
    ProjectsInvalid {
        /// Reason of the first stale input encountered in the stream.
        reason: InvalidationReason,
        /// Every scope with at least one stale input.
        invalid_projects: BTreeSet<ScopePath>,
    },
    /// A global input is stale; the whole stored entry must be discarded.
    EntryInvalid {
        /// Reason of the stale global input.
        reason: InvalidationReason,
    },
}

/// Checks recorded inputs against a [`Host`].
pub struct FingerprintChecker<'h, H: Host + ?Sized> {
    host: &'h H,
}

impl<'h, H: Host + ?Sized> FingerprintChecker<'h, H> {
    /// Creates a checker probing `host`.
    pub fn new(host: &'h H) -> Self {
        Self { host }
    }

    /// Consumes `inputs` in order and computes the verdict.
    ///
    /// Items are pulled lazily: after a stale global input no further item is
    /// requested from the iterator. Any `Err` item, or a failing probe, aborts
    /// the check and is returned unchanged.
    pub fn check_fingerprint<I>(&self, inputs: I) -> Result<CheckedFingerprint, FingerprintError>
    where
        I: IntoIterator<Item = Result<FingerprintEntry, FingerprintError>>,
    {
        let mut first_reason: Option<InvalidationReason> = None;
        let mut invalid_projects = BTreeSet::new();

        for entry in inputs {
            match entry? {
                FingerprintEntry::ScopeSpecific { scope, input } => {
                    if invalid_projects.contains(&scope) {
                        continue;
                    }
                    if let Some(reason) = self.check(&input)? {
                        debug!("{scope} is invalid: {reason}");
                        if first_reason.is_none() {
                            first_reason = Some(reason);
                        }
                        invalid_projects.insert(scope);
                    }
                }
                FingerprintEntry::Global(input) => {
                    if let Some(reason) = self.check(&input)? {
                        debug!("cache entry is invalid: {reason}");
                        return Ok(CheckedFingerprint::EntryInvalid { reason });
                    }
                }
            }
        }

        Ok(match first_reason {
            None => CheckedFingerprint::Valid,
            Some(reason) => CheckedFingerprint::ProjectsInvalid {
                reason,
                invalid_projects,
            },
        })
    }

    fn check(&self, input: &RecordedInput) -> Result<Option<InvalidationReason>, FingerprintError> {
        let host = self.host;
        let reason = match input {
            RecordedInput::TaskInputs {
                task_path,
                file_system_inputs,
                file_system_inputs_fingerprint,
            } => {
                let current = host.fingerprint_of(file_system_inputs)?;
                (current != *file_system_inputs_fingerprint)
                    .then(|| format!("an input to task '{task_path}' has changed"))
            }
            RecordedInput::InputFile(InputFile { file, hash }) => {
                (!self.is_up_to_date(file, hash.as_ref())?)
                    .then(|| format!("file '{}' has changed", host.display_name_of(file)))
            }
            RecordedInput::ValueSource(obtained_value) => {
                self.check_value_is_up_to_date(obtained_value)?
            }
            RecordedInput::InitScripts(fingerprints) => {
                self.check_init_scripts_are_up_to_date(fingerprints, &host.all_init_scripts())?
            }
            RecordedInput::UndeclaredGradleProperty { key, value } => {
                (host.gradle_property(key) != *value)
                    .then(|| format!("Gradle property '{key}' has changed"))
            }
            RecordedInput::UndeclaredSystemProperty { key, value } => {
                (host.system_property(key) != *value)
                    .then(|| format!("system property '{key}' has changed"))
            }
            RecordedInput::UndeclaredEnvironmentVariable { key, value } => {
                (host.environment_variable(key)? != *value)
                    .then(|| format!("environment variable '{key}' has changed"))
            }
            RecordedInput::ChangingDependencyResolutionValue { expire_at, reason } => {
                (host.build_start_time() >= *expire_at).then(|| reason.clone())
            }
            RecordedInput::GradleEnvironment {
                gradle_user_home_dir,
                jvm,
            } => {
                if host.gradle_user_home_dir() != *gradle_user_home_dir {
                    Some("Gradle user home directory has changed".to_string())
                } else if host.jvm_fingerprint() != *jvm {
                    Some("JVM has changed".to_string())
                } else {
                    None
                }
            }
        };
        Ok(reason)
    }

    fn check_init_scripts_are_up_to_date(
        &self,
        previous: &[InputFile],
        current: &[std::path::PathBuf],
    ) -> Result<Option<InvalidationReason>, FingerprintError> {
        let up_to_date = self.count_up_to_date_prefix(previous, current)?;
        let host = self.host;

        let reason = if up_to_date == previous.len() {
            let added = current.len() - up_to_date;
            match added {
                0 => None,
                1 => Some(format!(
                    "init script '{}' has been added",
                    host.display_name_of(&current[up_to_date])
                )),
                _ => Some(format!(
                    "init script '{}' and {} more have been added",
                    host.display_name_of(&current[up_to_date]),
                    added - 1
                )),
            }
        } else if up_to_date == current.len() {
            let removed = previous.len() - up_to_date;
            let first = host.display_name_of(&previous[up_to_date].file);
            if removed == 1 {
                Some(format!("init script '{first}' has been removed"))
            } else {
                Some(format!(
                    "init script '{first}' and {} more have been removed",
                    removed - 1
                ))
            }
        } else {
            let modified = &current[up_to_date];
            let name = host.display_name_of(modified);
            if *modified == previous[up_to_date].file {
                Some(format!("init script '{name}' has changed"))
            } else {
                Some(format!(
                    "content of {} init script, '{name}', has changed",
                    ordinal(up_to_date + 1)
                ))
            }
        };
        Ok(reason)
    }

    fn count_up_to_date_prefix(
        &self,
        previous: &[InputFile],
        current: &[std::path::PathBuf],
    ) -> Result<usize, FingerprintError> {
        let mut count = 0;
        for (script, fingerprint) in current.iter().zip(previous) {
            if !self.is_up_to_date(script, fingerprint.hash.as_ref())? {
                break;
            }
            count += 1;
        }
        Ok(count)
    }

    fn check_value_is_up_to_date(
        &self,
        obtained_value: &ObtainedValue,
    ) -> Result<Option<InvalidationReason>, FingerprintError> {
        let value_source = self.host.instantiate_value_source(obtained_value)?;
        if value_source.obtain()? != obtained_value.value {
            return Ok(Some(build_logic_input_has_changed(value_source.as_ref())));
        }
        Ok(None)
    }

    fn is_up_to_date(
        &self,
        file: &Path,
        original_hash: Option<&ContentHash>,
    ) -> Result<bool, FingerprintError> {
        Ok(self.host.hash_code_of(file)?.as_ref() == original_hash)
    }
}

fn build_logic_input_has_changed(value_source: &dyn ValueSource) -> InvalidationReason {
    match value_source.display_name() {
        Some(name) => format!("{name} has changed"),
        None => format!(
            "a build logic input of type '{}' has changed",
            value_source.type_name()
        ),
    }
}

/// Renders `n` as an English ordinal: `1st`, `2nd`, `3rd`, `11th`, `22nd`.
fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{FileSet, ValueSnapshot};
    use std::cell::{Cell, RefCell};
    use std::collections::{BTreeMap, HashMap, HashSet};
    use std::path::PathBuf;

    struct FixedValueSource {
        type_name: String,
        value: ValueSnapshot,
        display_name: Option<String>,
    }

    impl ValueSource for FixedValueSource {
        fn obtain(&self) -> Result<ValueSnapshot, FingerprintError> {
            Ok(self.value.clone())
        }

        fn type_name(&self) -> &str {
            &self.type_name
        }

        fn display_name(&self) -> Option<String> {
            self.display_name.clone()
        }
    }

    /// Host answering from in-memory state and counting file probes.
    #[derive(Default)]
    struct TestHost {
        files: HashMap<PathBuf, ContentHash>,
        failing_files: HashSet<PathBuf>,
        file_sets: HashMap<Vec<PathBuf>, ContentHash>,
        init_scripts: Vec<PathBuf>,
        start_time: u64,
        home: PathBuf,
        jvm: String,
        gradle_properties: HashMap<String, String>,
        system_properties: HashMap<String, String>,
        env: HashMap<String, String>,
        values: HashMap<String, (ValueSnapshot, Option<String>)>,
        hash_calls: RefCell<HashMap<PathBuf, usize>>,
    }

    impl TestHost {
        fn with_file(mut self, path: &str, content: &str) -> Self {
            self.files
                .insert(PathBuf::from(path), ContentHash::from_bytes(content.as_bytes()));
            self
        }

        fn hash_calls_for(&self, path: &str) -> usize {
            self.hash_calls
                .borrow()
                .get(Path::new(path))
                .copied()
                .unwrap_or(0)
        }
    }

    impl Host for TestHost {
        fn gradle_user_home_dir(&self) -> PathBuf {
            self.home.clone()
        }

        fn all_init_scripts(&self) -> Vec<PathBuf> {
            self.init_scripts.clone()
        }

        fn build_start_time(&self) -> u64 {
            self.start_time
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
            Ok(self.env.get(name).cloned())
        }

        fn fingerprint_of(&self, file_set: &FileSet) -> Result<ContentHash, FingerprintError> {
            self.file_sets
                .get(&file_set.roots)
                .copied()
                .ok_or_else(|| FingerprintError::Probe {
                    operation: "fingerprint_of",
                    reason: "unknown file set".to_string(),
                })
        }

        fn hash_code_of(&self, file: &Path) -> Result<Option<ContentHash>, FingerprintError> {
            *self
                .hash_calls
                .borrow_mut()
                .entry(file.to_path_buf())
                .or_default() += 1;
            if self.failing_files.contains(file) {
                return Err(FingerprintError::io(
                    file,
                    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                ));
            }
            Ok(self.files.get(file).copied())
        }

        fn display_name_of(&self, file_or_directory: &Path) -> String {
            file_or_directory.display().to_string()
        }

        fn instantiate_value_source(
            &self,
            obtained_value: &ObtainedValue,
        ) -> Result<Box<dyn ValueSource>, FingerprintError> {
            let (value, display_name) = self
                .values
                .get(&obtained_value.source_type)
                .cloned()
                .ok_or_else(|| FingerprintError::UnknownValueSource {
                    type_name: obtained_value.source_type.clone(),
                })?;
            Ok(Box::new(FixedValueSource {
                type_name: obtained_value.source_type.clone(),
                value,
                display_name,
            }))
        }
    }

    fn hash(content: &str) -> ContentHash {
        ContentHash::from_bytes(content.as_bytes())
    }

    fn file(path: &str, content: &str) -> RecordedInput {
        RecordedInput::InputFile(InputFile::new(path, Some(hash(content))))
    }

    fn scoped(scope: &str, input: RecordedInput) -> FingerprintEntry {
        FingerprintEntry::ScopeSpecific {
            scope: scope.parse().unwrap(),
            input,
        }
    }

    fn global(input: RecordedInput) -> FingerprintEntry {
        FingerprintEntry::Global(input)
    }

    fn check(host: &TestHost, entries: Vec<FingerprintEntry>) -> CheckedFingerprint {
        FingerprintChecker::new(host)
            .check_fingerprint(entries.into_iter().map(Ok))
            .unwrap()
    }

    fn reason_of(verdict: CheckedFingerprint) -> String {
        match verdict {
            CheckedFingerprint::EntryInvalid { reason } => reason,
            CheckedFingerprint::ProjectsInvalid { reason, .. } => reason,
            CheckedFingerprint::Valid => panic!("expected an invalid verdict"),
        }
    }

    fn scopes(paths: &[&str]) -> BTreeSet<ScopePath> {
        paths.iter().map(|p| p.parse().unwrap()).collect()
    }

    #[test]
    fn empty_stream_is_valid() {
        let host = TestHost::default();
        assert_eq!(check(&host, vec![]), CheckedFingerprint::Valid);
    }

    #[test]
    fn matching_scope_specific_inputs_are_valid() {
        let host = TestHost::default()
            .with_file("a/build.gradle", "a")
            .with_file("b/build.gradle", "b");
        let verdict = check(
            &host,
            vec![
                scoped(":a", file("a/build.gradle", "a")),
                scoped(":b", file("b/build.gradle", "b")),
            ],
        );
        assert_eq!(verdict, CheckedFingerprint::Valid);
    }

    #[test]
    fn condemned_scope_is_not_probed_again() {
        let host = TestHost::default()
            .with_file("a/build.gradle", "changed")
            .with_file("a/other.gradle", "changed");
        let verdict = check(
            &host,
            vec![
                scoped(":a", file("a/build.gradle", "original")),
                scoped(":a", file("a/other.gradle", "original")),
            ],
        );
        assert_eq!(
            verdict,
            CheckedFingerprint::ProjectsInvalid {
                reason: "file 'a/build.gradle' has changed".to_string(),
                invalid_projects: scopes(&[":a"]),
            }
        );
        assert_eq!(host.hash_calls_for("a/build.gradle"), 1);
        assert_eq!(host.hash_calls_for("a/other.gradle"), 0);
    }

    #[test]
    fn global_mismatch_stops_reading_the_stream() {
        let host = TestHost::default()
            .with_file("a/build.gradle", "a")
            .with_file("settings.gradle", "changed");
        let consumed = Cell::new(0);
        let entries = vec![
            scoped(":a", file("a/build.gradle", "a")),
            global(file("settings.gradle", "original")),
            global(file("later.gradle", "x")),
            scoped(":b", file("b/build.gradle", "b")),
        ];
        let verdict = FingerprintChecker::new(&host)
            .check_fingerprint(
                entries
                    .into_iter()
                    .inspect(|_| consumed.set(consumed.get() + 1))
                    .map(Ok),
            )
            .unwrap();
        assert_eq!(
            verdict,
            CheckedFingerprint::EntryInvalid {
                reason: "file 'settings.gradle' has changed".to_string()
            }
        );
        assert_eq!(consumed.get(), 2);
        assert_eq!(host.hash_calls_for("later.gradle"), 0);
        assert_eq!(host.hash_calls_for("b/build.gradle"), 0);
    }

    #[test]
    fn global_mismatch_wins_over_earlier_scope_invalidation() {
        let host = TestHost::default().with_file("a/build.gradle", "changed");
        let verdict = check(
            &host,
            vec![
                scoped(":a", file("a/build.gradle", "original")),
                global(RecordedInput::UndeclaredEnvironmentVariable {
                    key: "CI".to_string(),
                    value: Some("true".to_string()),
                }),
            ],
        );
        assert_eq!(
            verdict,
            CheckedFingerprint::EntryInvalid {
                reason: "environment variable 'CI' has changed".to_string()
            }
        );
    }

    #[test]
    fn first_scope_reason_is_kept() {
        let host = TestHost::default()
            .with_file("a/build.gradle", "changed")
            .with_file("b/build.gradle", "changed");
        let verdict = check(
            &host,
            vec![
                scoped(":a", file("a/build.gradle", "original")),
                scoped(":b", file("b/build.gradle", "original")),
            ],
        );
        assert_eq!(
            verdict,
            CheckedFingerprint::ProjectsInvalid {
                reason: "file 'a/build.gradle' has changed".to_string(),
                invalid_projects: scopes(&[":a", ":b"]),
            }
        );
    }

    #[test]
    fn invalid_scope_does_not_skip_other_scopes() {
        let host = TestHost::default()
            .with_file("a/build.gradle", "changed")
            .with_file("b/build.gradle", "b");
        let verdict = check(
            &host,
            vec![
                scoped(":a", file("a/build.gradle", "original")),
                scoped(":b", file("b/build.gradle", "b")),
            ],
        );
        assert_eq!(host.hash_calls_for("b/build.gradle"), 1);
        assert_eq!(
            verdict,
            CheckedFingerprint::ProjectsInvalid {
                reason: "file 'a/build.gradle' has changed".to_string(),
                invalid_projects: scopes(&[":a"]),
            }
        );
    }

    #[test]
    fn task_inputs_mismatch() {
        let mut host = TestHost::default();
        host.file_sets
            .insert(vec![PathBuf::from("src")], hash("new sources"));
        let verdict = check(
            &host,
            vec![global(RecordedInput::TaskInputs {
                task_path: ":app:generate".to_string(),
                file_system_inputs: FileSet::new(["src"]),
                file_system_inputs_fingerprint: hash("old sources"),
            })],
        );
        assert_eq!(
            reason_of(verdict),
            "an input to task ':app:generate' has changed"
        );
    }

    #[test]
    fn input_file_removed_and_created() {
        let host = TestHost::default().with_file("new.gradle", "n");
        let removed = check(&host, vec![global(file("gone.gradle", "g"))]);
        assert_eq!(reason_of(removed), "file 'gone.gradle' has changed");

        let created = check(
            &host,
            vec![global(RecordedInput::InputFile(InputFile::new(
                "new.gradle",
                None,
            )))],
        );
        assert_eq!(reason_of(created), "file 'new.gradle' has changed");

        let still_absent = check(
            &host,
            vec![global(RecordedInput::InputFile(InputFile::new(
                "missing.gradle",
                None,
            )))],
        );
        assert_eq!(still_absent, CheckedFingerprint::Valid);
    }

    #[test]
    fn value_source_described_and_generic() {
        let mut host = TestHost::default();
        host.values.insert(
            "Described".to_string(),
            (
                ValueSnapshot::Text("new".to_string()),
                Some("environment variable 'HOME'".to_string()),
            ),
        );
        host.values.insert(
            "Anonymous".to_string(),
            (ValueSnapshot::Integer(2), None),
        );
        let described = RecordedInput::ValueSource(ObtainedValue {
            source_type: "Described".to_string(),
            parameters: BTreeMap::new(),
            value: ValueSnapshot::Text("old".to_string()),
        });
        let anonymous = RecordedInput::ValueSource(ObtainedValue {
            source_type: "Anonymous".to_string(),
            parameters: BTreeMap::new(),
            value: ValueSnapshot::Integer(1),
        });
        assert_eq!(
            reason_of(check(&host, vec![global(described)])),
            "environment variable 'HOME' has changed"
        );
        assert_eq!(
            reason_of(check(&host, vec![global(anonymous)])),
            "a build logic input of type 'Anonymous' has changed"
        );
    }

    #[test]
    fn value_source_unchanged() {
        let mut host = TestHost::default();
        host.values
            .insert("Fixed".to_string(), (ValueSnapshot::Boolean(true), None));
        let input = RecordedInput::ValueSource(ObtainedValue {
            source_type: "Fixed".to_string(),
            parameters: BTreeMap::new(),
            value: ValueSnapshot::Boolean(true),
        });
        assert_eq!(check(&host, vec![global(input)]), CheckedFingerprint::Valid);
    }

    #[test]
    fn undeclared_properties_compare_presence() {
        let mut host = TestHost::default();
        host.gradle_properties
            .insert("org.gradle.caching".to_string(), "true".to_string());
        host.system_properties
            .insert("user.language".to_string(), "en".to_string());

        let gradle = RecordedInput::UndeclaredGradleProperty {
            key: "org.gradle.caching".to_string(),
            value: None,
        };
        assert_eq!(
            reason_of(check(&host, vec![global(gradle)])),
            "Gradle property 'org.gradle.caching' has changed"
        );

        let system = RecordedInput::UndeclaredSystemProperty {
            key: "user.language".to_string(),
            value: Some("fr".to_string()),
        };
        assert_eq!(
            reason_of(check(&host, vec![global(system)])),
            "system property 'user.language' has changed"
        );

        let env = RecordedInput::UndeclaredEnvironmentVariable {
            key: "UNSET".to_string(),
            value: None,
        };
        assert_eq!(check(&host, vec![global(env)]), CheckedFingerprint::Valid);
    }

    #[test]
    fn changing_dependency_value_expires_by_time() {
        let mut host = TestHost::default();
        host.start_time = 1_000;
        let input = |expire_at| RecordedInput::ChangingDependencyResolutionValue {
            expire_at,
            reason: "cached version information for org:lib:1.+ has expired".to_string(),
        };

        assert_eq!(
            reason_of(check(&host, vec![global(input(999))])),
            "cached version information for org:lib:1.+ has expired"
        );
        assert_eq!(
            reason_of(check(&host, vec![global(input(1_000))])),
            "cached version information for org:lib:1.+ has expired"
        );
        assert_eq!(
            check(&host, vec![global(input(1_001))]),
            CheckedFingerprint::Valid
        );
    }

    #[test]
    fn gradle_environment_checks_home_first() {
        let mut host = TestHost::default();
        host.home = PathBuf::from("/home/other/.gradle");
        host.jvm = "21".to_string();
        let input = |home: &str, jvm: &str| {
            global(RecordedInput::GradleEnvironment {
                gradle_user_home_dir: PathBuf::from(home),
                jvm: jvm.to_string(),
            })
        };

        assert_eq!(
            reason_of(check(&host, vec![input("/home/me/.gradle", "17")])),
            "Gradle user home directory has changed"
        );
        assert_eq!(
            reason_of(check(&host, vec![input("/home/other/.gradle", "17")])),
            "JVM has changed"
        );
        assert_eq!(
            check(&host, vec![input("/home/other/.gradle", "21")]),
            CheckedFingerprint::Valid
        );
    }

    fn init_scripts_host(scripts: &[(&str, &str)]) -> TestHost {
        let mut host = TestHost::default();
        for (path, content) in scripts {
            host = host.with_file(path, content);
            host.init_scripts.push(PathBuf::from(path));
        }
        host
    }

    fn recorded_init_scripts(scripts: &[(&str, &str)]) -> FingerprintEntry {
        global(RecordedInput::InitScripts(
            scripts
                .iter()
                .map(|(path, content)| InputFile::new(*path, Some(hash(content))))
                .collect(),
        ))
    }

    #[test]
    fn init_scripts_unchanged() {
        let scripts = [("s1", "h1"), ("s2", "h2")];
        let host = init_scripts_host(&scripts);
        assert_eq!(
            check(&host, vec![recorded_init_scripts(&scripts)]),
            CheckedFingerprint::Valid
        );
    }

    #[test]
    fn init_script_added() {
        let host = init_scripts_host(&[("s1", "h1"), ("s2", "h2"), ("s3", "h3")]);
        let verdict = check(&host, vec![recorded_init_scripts(&[("s1", "h1"), ("s2", "h2")])]);
        assert_eq!(reason_of(verdict), "init script 's3' has been added");
    }

    #[test]
    fn several_init_scripts_added() {
        let host = init_scripts_host(&[("s1", "h1"), ("s2", "h2"), ("s3", "h3")]);
        let verdict = check(&host, vec![recorded_init_scripts(&[("s1", "h1")])]);
        assert_eq!(
            reason_of(verdict),
            "init script 's2' and 1 more have been added"
        );
    }

    #[test]
    fn init_script_removed() {
        let host = init_scripts_host(&[("s1", "h1")]);
        let verdict = check(&host, vec![recorded_init_scripts(&[("s1", "h1"), ("s2", "h2")])]);
        assert_eq!(reason_of(verdict), "init script 's2' has been removed");
    }

    #[test]
    fn several_init_scripts_removed() {
        let host = init_scripts_host(&[]);
        let verdict = check(
            &host,
            vec![recorded_init_scripts(&[("s1", "h1"), ("s2", "h2"), ("s3", "h3")])],
        );
        assert_eq!(
            reason_of(verdict),
            "init script 's1' and 2 more have been removed"
        );
    }

    #[test]
    fn init_script_content_changed() {
        let host = init_scripts_host(&[("s1", "h1"), ("s2", "h2-changed")]);
        let verdict = check(&host, vec![recorded_init_scripts(&[("s1", "h1"), ("s2", "h2")])]);
        assert_eq!(reason_of(verdict), "init script 's2' has changed");
    }

    #[test]
    fn init_script_replaced_at_position() {
        let host = init_scripts_host(&[("s1", "h1"), ("s4", "h2")]);
        let verdict = check(&host, vec![recorded_init_scripts(&[("s1", "h1"), ("s2", "h2")])]);
        assert_eq!(
            reason_of(verdict),
            "content of 2nd init script, 's4', has changed"
        );
    }

    #[test]
    fn probe_failure_aborts_check() {
        let mut host = TestHost::default();
        host.failing_files.insert(PathBuf::from("locked.gradle"));
        let result = FingerprintChecker::new(&host)
            .check_fingerprint(vec![Ok(scoped(":a", file("locked.gradle", "x")))]);
        assert!(matches!(result, Err(FingerprintError::Io { .. })));
    }

    #[test]
    fn stream_error_aborts_check() {
        let host = TestHost::default().with_file("a", "a");
        let result = FingerprintChecker::new(&host).check_fingerprint(vec![
            Ok(global(file("a", "a"))),
            Err(FingerprintError::UnexpectedFingerprint {
                reason: "unknown variant".to_string(),
            }),
        ]);
        assert!(matches!(
            result,
            Err(FingerprintError::UnexpectedFingerprint { .. })
        ));
    }

    #[test]
    fn unknown_value_source_is_fatal() {
        let host = TestHost::default();
        let input = RecordedInput::ValueSource(ObtainedValue {
            source_type: "Gone".to_string(),
            parameters: BTreeMap::new(),
            value: ValueSnapshot::Absent,
        });
        let result = FingerprintChecker::new(&host).check_fingerprint(vec![Ok(global(input))]);
        assert!(matches!(
            result,
            Err(FingerprintError::UnknownValueSource { .. })
        ));
    }

    #[test]
    fn check_is_idempotent() {
        let host = TestHost::default()
            .with_file("a/build.gradle", "changed")
            .with_file("b/build.gradle", "b");
        let entries = vec![
            scoped(":a", file("a/build.gradle", "original")),
            scoped(":b", file("b/build.gradle", "b")),
        ];
        let first = check(&host, entries.clone());
        let second = check(&host, entries);
        assert_eq!(first, second);
    }

    #[test]
    fn ordinals() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(13), "13th");
        assert_eq!(ordinal(21), "21st");
        assert_eq!(ordinal(102), "102nd");
        assert_eq!(ordinal(111), "111th");
    }
}
