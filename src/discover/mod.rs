//! Test-case generation.
//!
//! Turns every (descriptor, sample, resolved input) triple under a root into a
//! [`TestCase`]. Samples whose input cannot be found produce no test case at
//! all. Each call to [`CaseGenerator::discover`] starts a fresh, lazy pass, so
//! a runner may enumerate once and execute on a second pass.

use crate::error::Result;
use crate::model::{ExpectationSetDescriptor, GroupKey, SampleDescriptor};
use crate::resource::{ResourceLocation, ResourceSpace};
use crate::store::{ExpectationStore, InputResolver, ResolvedInput};
use crate::util::input_display_name;
use std::sync::Arc;
use std::vec;
use tracing::debug;

/// One parameterized invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    /// `"{pipeline} | {input name}"`, stable across runs.
    pub display_name: String,
    pub group: GroupKey,
    pub descriptor_location: ResourceLocation,
    pub descriptor: Arc<ExpectationSetDescriptor>,
    pub sample_index: usize,
    pub sample: SampleDescriptor,
    pub input: ResolvedInput,
}

/// Display name for a sample of a descriptor.
#[must_use]
pub fn display_name(descriptor: &ExpectationSetDescriptor, sample: &SampleDescriptor) -> String {
    format!(
        "{} | {}",
        descriptor.pipeline_id,
        input_display_name(&sample.input_path)
    )
}

/// Discovers test cases beneath a root prefix.
#[derive(Debug, Clone)]
pub struct CaseGenerator {
    store: ExpectationStore,
    inputs: InputResolver,
    root: String,
}

impl CaseGenerator {
    /// Generator using the store's resource space for inputs as well.
    #[must_use]
    pub fn new(store: ExpectationStore, root: impl Into<String>) -> Self {
        let inputs = InputResolver::new(Arc::clone(store.space()));
        Self {
            store,
            inputs,
            root: root.into(),
        }
    }

    /// Generator over `space` with an optional descriptor file-name filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter is not a valid regex.
    pub fn from_space(
        space: Arc<ResourceSpace>,
        root: impl Into<String>,
        pattern: Option<&str>,
    ) -> Result<Self> {
        Ok(Self::new(ExpectationStore::with_pattern(space, pattern)?, root))
    }

    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Start a new discovery pass.
    #[must_use]
    pub fn discover(&self) -> Cases<'_> {
        Cases {
            generator: self,
            locations: None,
            pending: Vec::new().into_iter(),
        }
    }

    /// Run a full discovery pass, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first discovery error.
    pub fn collect_cases(&self) -> Result<Vec<TestCase>> {
        self.discover().collect()
    }

    fn cases_for(&self, location: &ResourceLocation) -> Vec<Result<TestCase>> {
        let descriptor = match self.store.load_descriptor(location) {
            Ok(descriptor) => Arc::new(descriptor),
            Err(e) => return vec![Err(e)],
        };
        let group = descriptor.group_key();

        let mut cases = Vec::with_capacity(descriptor.samples.len());
        for (sample_index, sample) in descriptor.samples.iter().enumerate() {
            match self.inputs.resolve(sample) {
                Ok(Some(input)) => cases.push(Ok(TestCase {
                    display_name: display_name(&descriptor, sample),
                    group: group.clone(),
                    descriptor_location: location.clone(),
                    descriptor: Arc::clone(&descriptor),
                    sample_index,
                    sample: sample.clone(),
                    input,
                })),
                Ok(None) => {}
                Err(e) => cases.push(Err(e)),
            }
        }
        debug!(
            location = %location,
            samples = descriptor.samples.len(),
            cases = cases.len(),
            "Generated test cases"
        );
        cases
    }
}

/// Lazy iterator over the test cases of one discovery pass.
#[derive(Debug)]
pub struct Cases<'a> {
    generator: &'a CaseGenerator,
    locations: Option<vec::IntoIter<ResourceLocation>>,
    pending: vec::IntoIter<Result<TestCase>>,
}

impl Iterator for Cases<'_> {
    type Item = Result<TestCase>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(case) = self.pending.next() {
                return Some(case);
            }
            if self.locations.is_none() {
                let listed = self
                    .generator
                    .store
                    .descriptor_locations(&self.generator.root);
                match listed {
                    Ok(locations) => self.locations = Some(locations.into_iter()),
                    Err(e) => {
                        self.locations = Some(Vec::new().into_iter());
                        return Some(Err(e));
                    }
                }
            }
            let location = self.locations.as_mut()?.next()?;
            self.pending = self.generator.cases_for(&location).into_iter();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarnessError;
    use crate::resource::EmbeddedSource;

    const PACK: &str = r#"{
        "id": "P1", "pipelineId": "PL1", "name": "D1",
        "samples": [
            { "inputPath": "inputs/trade-one.json", "outputPath": "out/trade-one.json" },
            { "inputPath": "missing.json", "outputPath": "out/missing.json" },
            { "inputPath": "inputs/fx_swap-2.json" }
        ]
    }"#;

    fn generator() -> CaseGenerator {
        let space = ResourceSpace::new().with_source(
            EmbeddedSource::new("mem")
                .with_file("packs/test-pack-p1.json", PACK)
                .with_file("inputs/trade-one.json", "{}")
                .with_file("inputs/fx_swap-2.json", "{}"),
        );
        CaseGenerator::from_space(Arc::new(space), "packs", None).unwrap()
    }

    #[test]
    fn test_missing_inputs_generate_no_case() {
        let cases = generator().collect_cases().unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].sample_index, 0);
        assert_eq!(cases[1].sample_index, 2);
        assert!(cases.iter().all(|c| c.group == GroupKey::new("P1", "PL1", "D1")));
    }

    #[test]
    fn test_display_names_are_stable_and_legible() {
        let names: Vec<_> = generator()
            .collect_cases()
            .unwrap()
            .into_iter()
            .map(|c| c.display_name)
            .collect();
        insta::assert_snapshot!(names.join("\n"), @r"
        PL1 | trade one
        PL1 | fx swap 2
        ");
    }

    #[test]
    fn test_discovery_is_restartable() {
        let generator = generator();
        let first: Vec<_> = generator.discover().map(|c| c.unwrap().display_name).collect();
        let second: Vec<_> = generator.discover().map(|c| c.unwrap().display_name).collect();
        assert_eq!(first, second);
        assert_eq!(generator.discover().count(), 2);
    }

    #[test]
    fn test_malformed_descriptor_surfaces_error() {
        let space = ResourceSpace::new().with_source(
            EmbeddedSource::new("mem").with_file("packs/test-pack-bad.json", "[1,"),
        );
        let generator = CaseGenerator::from_space(Arc::new(space), "packs", None).unwrap();
        let err = generator.collect_cases().unwrap_err();
        assert!(matches!(err, HarnessError::DescriptorParse { .. }));
    }
}
