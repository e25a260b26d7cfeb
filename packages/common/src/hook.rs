use anyhow::Result;
use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};

use crate::event::{Event, GenericEvent};

/// Typed hook, used for specific event type
#[async_trait]
pub trait Hook<E: Event>: Send + Sync {
    /// Hook identifier
    fn id(&self) -> &str;
    /// Get the topics this hook is interested in
    fn topics(&self) -> &[&str];

    async fn on_register(&self) -> Result<()> {
        Ok(())
    }
    async fn on_unregister(&self) -> Result<()> {
        Ok(())
    }
    async fn on_event(&self, e: &E) -> Result<HookAction>;
}

/// Hooks observe lifecycle events; they cannot alter a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    /// Continue with the next hook.
    Pass,
    /// Skip the remaining hooks for this event.
    Stop,
}

/// Generic hook trait object for dynamic dispatch
#[async_trait]
pub trait GenericHook: Send + Sync {
    fn id(&self) -> &str;
    fn topics(&self) -> &[&str];

    async fn on_register(&self) -> Result<()> {
        Ok(())
    }
    async fn on_unregister(&self) -> Result<()> {
        Ok(())
    }
    async fn on_event(&self, e: &GenericEvent) -> Result<HookAction>;
}

/// Adapter to convert typed Hook<E> into GenericHook
pub struct HookAdapter<E: Event, H: Hook<E>> {
    hook: Arc<H>,
    _phantom: std::marker::PhantomData<fn(E)>,
}

impl<E: Event, H: Hook<E>> HookAdapter<E, H> {
    pub fn new(hook: H) -> Self {
        Self {
            hook: Arc::new(hook),
            _phantom: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<E: Event, H: Hook<E>> GenericHook for HookAdapter<E, H> {
    fn id(&self) -> &str {
        self.hook.id()
    }
    fn topics(&self) -> &[&str] {
        self.hook.topics()
    }
    async fn on_event(&self, generic_event: &GenericEvent) -> Result<HookAction> {
        let typed_event: E = E::from_generic_event(generic_event)?;
        self.hook.on_event(&typed_event).await
    }

    async fn on_register(&self) -> Result<()> {
        self.hook.on_register().await
    }

    async fn on_unregister(&self) -> Result<()> {
        self.hook.on_unregister().await
    }
}

/// Registry of hooks keyed by topic.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<String, Vec<Arc<dyn GenericHook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a typed hook to the registry
    pub async fn add_hook<E: Event + 'static, H: Hook<E> + 'static>(&mut self, hook: H) -> Result<()> {
        self.add_generic_hook(Arc::new(HookAdapter::<E, H>::new(hook)))
            .await
    }

    /// Add a generic hook to the registry
    pub async fn add_generic_hook(&mut self, hook: Arc<dyn GenericHook>) -> Result<()> {
        hook.on_register().await?;
        for &topic in hook.topics() {
            self.hooks
                .entry(topic.to_string())
                .or_default()
                .push(hook.clone());
        }
        Ok(())
    }

    /// Remove a hook by its ID from every topic it subscribed to.
    pub async fn remove_hook(&mut self, hook_id: &str) -> Result<()> {
        let mut removed = None;
        for hooks_list in self.hooks.values_mut() {
            if let Some(pos) = hooks_list.iter().position(|h| h.id() == hook_id) {
                removed = Some(hooks_list.remove(pos));
            }
        }
        self.hooks.retain(|_, list| !list.is_empty());

        match removed {
            Some(hook) => hook.on_unregister().await,
            None => Err(anyhow::anyhow!("Hook not found: {}", hook_id)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Trigger all hooks for an event, in registration order.
    pub async fn trigger<E: Event>(&self, event: &E) -> Result<HookAction> {
        let hooks = match self.hooks.get(event.topic()) {
            Some(h) if !h.is_empty() => h,
            _ => return Ok(HookAction::Pass),
        };

        let generic_event = event.to_generic_event();
        for hook in hooks {
            if hook.on_event(&generic_event).await? == HookAction::Stop {
                return Ok(HookAction::Stop);
            }
        }
        Ok(HookAction::Pass)
    }
}
