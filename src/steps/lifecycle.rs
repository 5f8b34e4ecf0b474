use std::collections::HashMap;
use std::path::PathBuf;

/// External steps of the `up` pipeline, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Validate,
    Test,
    Build,
    Upload,
}

impl StepKind {
    /// Get the step name as a string
    pub fn name(&self) -> &'static str {
        match self {
            StepKind::Validate => "validate",
            StepKind::Test => "test",
            StepKind::Build => "build",
            StepKind::Upload => "upload",
        }
    }
}

/// Context information passed to a step
#[derive(Debug, Clone)]
pub struct StepContext {
    /// Step being executed
    pub kind: StepKind,
    /// Version value read from the version file
    pub version: String,
    /// Package name if configured
    pub package: Option<String>,
    /// Expected artifact path if one can be derived
    pub artifact: Option<PathBuf>,
}

impl StepContext {
    pub fn new(kind: StepKind, version: impl Into<String>) -> Self {
        StepContext {
            kind,
            version: version.into(),
            package: None,
            artifact: None,
        }
    }

    /// Same context for another step
    pub fn for_step(&self, kind: StepKind) -> Self {
        StepContext {
            kind,
            ..self.clone()
        }
    }

    /// Convert context to environment variables for the step process
    ///
    /// Maps context fields to RELEASE_* environment variables
    pub fn to_env_vars(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();

        env.insert("RELEASE_STEP".to_string(), self.kind.name().to_string());
        env.insert("RELEASE_VERSION".to_string(), self.version.clone());

        if let Some(ref package) = self.package {
            env.insert("RELEASE_PACKAGE".to_string(), package.clone());
        }

        if let Some(ref artifact) = self.artifact {
            env.insert(
                "RELEASE_ARTIFACT".to_string(),
                artifact.to_string_lossy().into_owned(),
            );
        }

        env
    }

    /// Replace `{version}`, `{name}` and `{artifact}` in one argument
    pub fn substitute(&self, arg: &str) -> String {
        let mut out = arg.replace("{version}", &self.version);
        if let Some(ref package) = self.package {
            out = out.replace("{name}", package);
        }
        if let Some(ref artifact) = self.artifact {
            out = out.replace("{artifact}", &artifact.to_string_lossy());
        }
        out
    }
}
