//! Append-only capture of build-logic inputs during a cache-miss build.

use std::collections::HashSet;
use std::path::Path;

use confcache_common::ScopePath;

use crate::error::FingerprintError;
use crate::host::Host;
use crate::input::{FingerprintEntry, InputFile, RecordedInput};
use crate::stream::encode_entries;

/// Collects [`FingerprintEntry`] values in the order build logic reads them.
///
/// Undeclared property and environment reads are recorded once per scope and
/// key; repeated reads of the same key add nothing.
#[derive(Debug, Default)]
pub struct FingerprintRecorder {
    entries: Vec<FingerprintEntry>,
    undeclared: HashSet<(Option<ScopePath>, &'static str, String)>,
}

impl FingerprintRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an input whose staleness invalidates the whole entry.
    pub fn record(&mut self, input: RecordedInput) {
        if self.is_duplicate_undeclared(None, &input) {
            return;
        }
        self.entries.push(FingerprintEntry::Global(input));
    }

    /// Records an input whose staleness invalidates only `scope`.
    pub fn record_for(&mut self, scope: &ScopePath, input: RecordedInput) -> Result<(), FingerprintError> {
        if !input.is_scopeable() {
            return Err(FingerprintError::UnscopableInput {
                kind: input.kind(),
                scope: scope.clone(),
            });
        }
        if self.is_duplicate_undeclared(Some(scope), &input) {
            return Ok(());
        }
        self.entries.push(FingerprintEntry::ScopeSpecific {
            scope: scope.clone(),
            input,
        });
        Ok(())
    }

    /// Appends a previously recorded entry unchanged.
    pub fn push_entry(&mut self, entry: FingerprintEntry) {
        if self.is_duplicate_undeclared(entry.scope(), entry.input()) {
            return;
        }
        self.entries.push(entry);
    }

    /// Hashes `file` through `host` and records it, globally or for `scope`.
    pub fn record_input_file<H: Host + ?Sized>(
        &mut self,
        host: &H,
        scope: Option<&ScopePath>,
        file: &Path,
    ) -> Result<(), FingerprintError> {
        let input = RecordedInput::InputFile(InputFile::new(file, host.hash_code_of(file)?));
        match scope {
            Some(scope) => self.record_for(scope, input),
            None => {
                self.record(input);
                Ok(())
            }
        }
    }

    /// Records the current init scripts as reported by `host`.
    pub fn record_init_scripts<H: Host + ?Sized>(&mut self, host: &H) -> Result<(), FingerprintError> {
        let mut fingerprints = Vec::new();
        for script in host.all_init_scripts() {
            let hash = host.hash_code_of(&script)?;
            fingerprints.push(InputFile::new(script, hash));
        }
        self.record(RecordedInput::InitScripts(fingerprints));
        Ok(())
    }

    /// Records the toolchain identity reported by `host`.
    pub fn record_environment<H: Host + ?Sized>(&mut self, host: &H) {
        self.record(RecordedInput::GradleEnvironment {
            gradle_user_home_dir: host.gradle_user_home_dir(),
            jvm: host.jvm_fingerprint(),
        });
    }

    /// Returns the recorded entries in order.
    pub fn entries(&self) -> &[FingerprintEntry] {
        &self.entries
    }

    /// Returns the number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encodes the recorded entries as a fingerprint stream.
    pub fn encode(&self) -> Result<Vec<u8>, FingerprintError> {
        encode_entries(&self.entries)
    }

    /// Consumes the recorder, returning the entries.
    pub fn into_entries(self) -> Vec<FingerprintEntry> {
        self.entries
    }

    fn is_duplicate_undeclared(&mut self, scope: Option<&ScopePath>, input: &RecordedInput) -> bool {
        let key = match input {
            RecordedInput::UndeclaredGradleProperty { key, .. }
            | RecordedInput::UndeclaredSystemProperty { key, .. }
            | RecordedInput::UndeclaredEnvironmentVariable { key, .. } => key,
            _ => return false,
        };
        !self
            .undeclared
            .insert((scope.cloned(), input.kind(), key.clone()))
    }
}
