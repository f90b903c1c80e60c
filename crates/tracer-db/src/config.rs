use std::sync::Arc;

use tracer_core::{Anonymous, CurrentActor, FixedActor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracerConfig {
    pub database_url: String,
    /// Run the trace migrations on `init`.
    pub migrate: bool,
    /// Default actor recorded when the application supplies none.
    pub actor: Option<String>,
}

impl TracerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = non_empty(lookup("DATABASE_URL"))
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required"))?;

        Ok(Self {
            database_url,
            migrate: lookup("TRACER_MIGRATE").is_some_and(|v| {
                matches!(
                    v.trim().to_ascii_lowercase().as_str(),
                    "1" | "true" | "yes" | "on"
                )
            }),
            actor: non_empty(lookup("TRACER_ACTOR")),
        })
    }

    pub fn current_actor(&self) -> Arc<dyn CurrentActor> {
        match &self.actor {
            Some(name) => Arc::new(FixedActor(name.clone())),
            None => Arc::new(Anonymous),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
