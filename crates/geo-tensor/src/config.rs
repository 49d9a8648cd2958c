use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::Backend;
use crate::eager::EagerBackend;
use crate::error::{Result, TensorError};

/// Environment variable naming the backend to use.
pub const BACKEND_ENV_VAR: &str = "GEO_BACKEND";

/// Environment variable holding an optional sampler seed.
pub const SEED_ENV_VAR: &str = "GEO_SEED";

/// Supported numeric engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendKind {
    /// Eager array engine: computes on every call.
    #[default]
    Eager,
    /// Deferred graph engine: computes on `eval`.
    Graph,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Eager, BackendKind::Graph];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Eager => "eager",
            BackendKind::Graph => "graph",
        }
    }

    /// Whether this engine was compiled into the crate.
    pub fn is_available(&self) -> bool {
        match self {
            BackendKind::Eager => true,
            BackendKind::Graph => cfg!(feature = "graph"),
        }
    }

    /// Fails with `BackendUnavailable` unless the engine was compiled in.
    pub fn ensure_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(TensorError::BackendUnavailable(format!(
                "{} backend requires the `{}` feature",
                self, self
            )))
        }
    }

    /// Instantiate the engine.
    ///
    /// # Errors
    /// `BackendUnavailable` if the engine's cargo feature is disabled.
    pub fn create(&self) -> Result<Arc<dyn Backend>> {
        match self {
            BackendKind::Eager => Ok(Arc::new(EagerBackend::new())),
            #[cfg(feature = "graph")]
            BackendKind::Graph => Ok(Arc::new(crate::graph::GraphBackend::new())),
            #[cfg(not(feature = "graph"))]
            BackendKind::Graph => Err(TensorError::BackendUnavailable(
                "graph backend requires the `graph` feature".to_string(),
            )),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eager" | "numpy" | "ndarray" => Ok(BackendKind::Eager),
            "graph" | "tensorflow" | "lazy" => Ok(BackendKind::Graph),
            other => Err(TensorError::BackendUnavailable(format!(
                "unknown backend '{}' (expected one of: eager, graph)",
                other
            ))),
        }
    }
}

/// Backend selection, resolved from defaults and environment overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Seed applied to the backend's sampler when set.
    pub seed: Option<u64>,
}

impl BackendConfig {
    /// Defaults with `GEO_BACKEND` / `GEO_SEED` applied.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply process environment overrides.
    ///
    /// | Variable | Field | Type |
    /// |----------|-------|------|
    /// | `GEO_BACKEND` | `kind` | `eager` / `graph` (aliases `numpy`, `tensorflow`) |
    /// | `GEO_SEED` | `seed` | u64 |
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// An unknown backend name is an error; an unparsable seed is ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup(BACKEND_ENV_VAR) {
            self.kind = val.parse()?;
        }
        if let Some(val) = lookup(SEED_ENV_VAR) {
            match val.trim().parse::<u64>() {
                Ok(seed) => self.seed = Some(seed),
                Err(_) => warn!(value = %val, "ignoring unparsable {}", SEED_ENV_VAR),
            }
        }
        self.kind.ensure_available()?;
        debug!(backend = %self.kind, seed = ?self.seed, "resolved backend configuration");
        Ok(self)
    }

    /// Create the configured backend, seeding it if requested.
    pub fn build(&self) -> Result<Arc<dyn Backend>> {
        let backend = self.kind.create()?;
        if let Some(seed) = self.seed {
            backend.seed(seed);
        }
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_names_and_aliases() {
        assert_eq!("eager".parse::<BackendKind>().unwrap(), BackendKind::Eager);
        assert_eq!("NumPy".parse::<BackendKind>().unwrap(), BackendKind::Eager);
        assert_eq!(" graph ".parse::<BackendKind>().unwrap(), BackendKind::Graph);
        assert_eq!(
            "tensorflow".parse::<BackendKind>().unwrap(),
            BackendKind::Graph
        );
    }

    #[test]
    fn test_parse_unknown_is_unavailable() {
        assert!(matches!(
            "pytorch".parse::<BackendKind>(),
            Err(TensorError::BackendUnavailable(_))
        ));
    }

    #[test]
    fn test_defaults_when_unset() {
        let cfg = BackendConfig::default().with_overrides_from(lookup(&[])).unwrap();
        assert_eq!(cfg.kind, BackendKind::Eager);
        assert_eq!(cfg.seed, None);
    }

    #[cfg(feature = "graph")]
    #[test]
    fn test_overrides() {
        let cfg = BackendConfig::default()
            .with_overrides_from(lookup(&[(BACKEND_ENV_VAR, "graph"), (SEED_ENV_VAR, "1234")]))
            .unwrap();
        assert_eq!(cfg.kind, BackendKind::Graph);
        assert_eq!(cfg.seed, Some(1234));
    }

    #[test]
    fn test_bad_seed_is_ignored() {
        let cfg = BackendConfig::default()
            .with_overrides_from(lookup(&[(SEED_ENV_VAR, "not-a-number")]))
            .unwrap();
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn test_unknown_backend_errors() {
        let err = BackendConfig::default()
            .with_overrides_from(lookup(&[(BACKEND_ENV_VAR, "theano")]))
            .unwrap_err();
        assert!(matches!(err, TensorError::BackendUnavailable(_)));
    }

    #[test]
    fn test_build_applies_seed() {
        let cfg = BackendConfig {
            kind: BackendKind::Eager,
            seed: Some(99),
        };
        let a = cfg.build().unwrap();
        let b = cfg.build().unwrap();
        let shape = crate::Shape::new(vec![2, 2]);
        let x = a.random_uniform(shape.clone(), -1.0, 1.0).unwrap();
        let y = b.random_uniform(shape, -1.0, 1.0).unwrap();
        assert_eq!(a.eval(&x).unwrap(), b.eval(&y).unwrap());
        assert_eq!(a.name(), "eager");
    }

    #[test]
    fn test_every_compiled_kind_creates() {
        for kind in BackendKind::ALL {
            if kind.is_available() {
                assert_eq!(kind.create().unwrap().kind(), kind);
            } else {
                assert!(kind.create().is_err());
            }
        }
    }
}
