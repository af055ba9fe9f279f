//! # Agent Registry
//!
//! Maps the closed set of agent identifiers to factory functions and resolves
//! workflow step names against it.
//!
//! Resolution never fails: an unknown name or a factory fault produces a typed
//! fallback `Resolution` paired with the mock skill, so one misconfigured step
//! only degrades its own contribution.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::agent::Agent;
use super::{EditorSkill, MockSkill, ResearcherSkill, RightsSkill, WriterSkill};

/// Every agent the pipeline knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentId {
    TrendResearch,
    CreativeWriter,
    RightsChecker,
    Editor,
}

impl AgentId {
    pub const ALL: [AgentId; 4] = [
        AgentId::TrendResearch,
        AgentId::CreativeWriter,
        AgentId::RightsChecker,
        AgentId::Editor,
    ];

    /// Canonical workflow name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TrendResearch => "trend-research",
            Self::CreativeWriter => "creative-writer",
            Self::RightsChecker => "rights-checker",
            Self::Editor => "editor",
        }
    }

    /// Parse a workflow agent name, accepting the short aliases
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "trend-research" | "research" | "researcher" | "trends" => Some(Self::TrendResearch),
            "creative-writer" | "writer" | "draft-writer" => Some(Self::CreativeWriter),
            "rights-checker" | "rights" | "legal" => Some(Self::RightsChecker),
            "editor" | "edit" => Some(Self::Editor),
            _ => None,
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds an agent instance
pub type AgentFactory = Arc<dyn Fn() -> anyhow::Result<Arc<dyn Agent>> + Send + Sync>;

/// Factory table keyed by `AgentId`
#[derive(Clone, Default)]
pub struct AgentRegistry {
    factories: HashMap<AgentId, AgentFactory>,
}

impl AgentRegistry {
    /// Registry with nothing registered
    pub fn empty() -> Self {
        Self::default()
    }

    /// The four content skills
    pub fn with_defaults() -> Self {
        Self::empty()
            .with(AgentId::TrendResearch, || Ok(Arc::new(ResearcherSkill::new())))
            .with(AgentId::CreativeWriter, || Ok(Arc::new(WriterSkill::new())))
            .with(AgentId::RightsChecker, || Ok(Arc::new(RightsSkill::new())))
            .with(AgentId::Editor, || Ok(Arc::new(EditorSkill::new())))
    }

    /// Register (or replace) the factory for an id
    pub fn with<F>(mut self, id: AgentId, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<Arc<dyn Agent>> + Send + Sync + 'static,
    {
        self.factories.insert(id, Arc::new(factory));
        self
    }

    fn build(&self, id: AgentId) -> Option<anyhow::Result<Arc<dyn Agent>>> {
        self.factories.get(&id).map(|factory| factory())
    }
}

impl fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("registered", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// How a step's agent name was resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    Registered { id: AgentId },
    /// Not a known agent, or known but not registered
    Unregistered { name: String },
    /// The factory returned an error
    Faulted { id: AgentId, reason: String },
}

impl Resolution {
    /// Whether the mock skill stands in for this step
    pub fn is_fallback(&self) -> bool {
        !matches!(self, Self::Registered { .. })
    }
}

/// An agent paired with how it was obtained
#[derive(Clone)]
pub struct ResolvedAgent {
    pub agent: Arc<dyn Agent>,
    pub resolution: Resolution,
}

/// Resolves step agent names, caching per instance by name
#[derive(Debug)]
pub struct AgentResolver {
    registry: AgentRegistry,
    cache: HashMap<String, ResolvedAgent>,
}

impl fmt::Debug for ResolvedAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedAgent")
            .field("agent", &self.agent.name())
            .field("resolution", &self.resolution)
            .finish()
    }
}

impl AgentResolver {
    pub fn new(registry: AgentRegistry) -> Self {
        Self {
            registry,
            cache: HashMap::new(),
        }
    }

    /// Resolve a workflow agent name. Never fails.
    pub fn resolve(&mut self, name: &str) -> ResolvedAgent {
        if let Some(hit) = self.cache.get(name) {
            return hit.clone();
        }

        let resolved = match AgentId::parse(name) {
            Some(id) => match self.registry.build(id) {
                Some(Ok(agent)) => ResolvedAgent {
                    agent,
                    resolution: Resolution::Registered { id },
                },
                Some(Err(e)) => {
                    tracing::warn!(agent = %name, error = %e, "Agent failed to load, using mock");
                    ResolvedAgent {
                        agent: Arc::new(MockSkill::new(name)),
                        resolution: Resolution::Faulted {
                            id,
                            reason: e.to_string(),
                        },
                    }
                }
                None => Self::unregistered(name),
            },
            None => Self::unregistered(name),
        };

        self.cache.insert(name.to_string(), resolved.clone());
        resolved
    }

    fn unregistered(name: &str) -> ResolvedAgent {
        tracing::warn!(agent = %name, "Unregistered agent, using mock");
        ResolvedAgent {
            agent: Arc::new(MockSkill::new(name)),
            resolution: Resolution::Unregistered {
                name: name.to_string(),
            },
        }
    }

    /// Number of distinct names resolved so far
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_parse_aliases() {
        assert_eq!(AgentId::parse("research"), Some(AgentId::TrendResearch));
        assert_eq!(AgentId::parse("Creative_Writer"), Some(AgentId::CreativeWriter));
        assert_eq!(AgentId::parse("rights"), Some(AgentId::RightsChecker));
        assert_eq!(AgentId::parse("summarizer"), None);
        for id in AgentId::ALL {
            assert_eq!(AgentId::parse(id.as_str()), Some(id));
        }
    }

    #[test]
    fn test_defaults_resolve() {
        let mut resolver = AgentResolver::new(AgentRegistry::with_defaults());
        let resolved = resolver.resolve("editor");
        assert_eq!(
            resolved.resolution,
            Resolution::Registered { id: AgentId::Editor }
        );
        assert_eq!(resolved.agent.name(), "editor");
    }

    #[test]
    fn test_unknown_name_falls_back() {
        let mut resolver = AgentResolver::new(AgentRegistry::with_defaults());
        let resolved = resolver.resolve("summarizer");
        assert!(resolved.resolution.is_fallback());
        assert_eq!(resolved.agent.name(), "summarizer");
    }

    #[test]
    fn test_known_but_unregistered_falls_back() {
        let mut resolver = AgentResolver::new(AgentRegistry::empty());
        let resolved = resolver.resolve("editor");
        assert_eq!(
            resolved.resolution,
            Resolution::Unregistered {
                name: "editor".to_string()
            }
        );
    }

    #[test]
    fn test_factory_fault_falls_back() {
        let registry = AgentRegistry::empty().with(AgentId::Editor, || {
            Err(anyhow::anyhow!("style guide missing"))
        });
        let mut resolver = AgentResolver::new(registry);
        let resolved = resolver.resolve("editor");
        match resolved.resolution {
            Resolution::Faulted { id, reason } => {
                assert_eq!(id, AgentId::Editor);
                assert!(reason.contains("style guide"));
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn test_factory_runs_once_per_name() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = builds.clone();
        let registry = AgentRegistry::empty().with(AgentId::Editor, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(EditorSkill::new()))
        });
        let mut resolver = AgentResolver::new(registry);

        resolver.resolve("editor");
        resolver.resolve("editor");
        resolver.resolve("unknown");
        resolver.resolve("unknown");

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.cached(), 2);
    }
}
