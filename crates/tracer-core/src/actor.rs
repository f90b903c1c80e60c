use std::sync::Arc;

/// Supplies the identifier recorded as `action_by` on every trace.
pub trait CurrentActor: Send + Sync {
    fn name(&self) -> Option<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl CurrentActor for Anonymous {
    fn name(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct FixedActor(pub String);

impl CurrentActor for FixedActor {
    fn name(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Resolves the actor lazily, e.g. from request-scoped state.
pub struct ActorFn<F>(pub F);

impl<F> CurrentActor for ActorFn<F>
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn name(&self) -> Option<String> {
        (self.0)()
    }
}

impl<T: CurrentActor + ?Sized> CurrentActor for Arc<T> {
    fn name(&self) -> Option<String> {
        (**self).name()
    }
}
