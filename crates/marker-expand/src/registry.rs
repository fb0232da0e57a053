//! Component registry: maps component names to their async transforms
//! and optional runtime scripts.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use doc_tree::{AttrMap, Node, Span};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use thiserror::Error;

/// Error raised by a component transform. Always fatal for the build.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransformError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), source: None }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self { message: message.into(), source: Some(Box::new(source)) }
    }
}

impl From<std::io::Error> for TransformError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source("io error in component transform", err)
    }
}

/// What a transform hands back:
/// - `Some(nodes)` replaces the marker span with `nodes`,
/// - `None` removes the marker span entirely,
/// - `Err` aborts the build.
pub type TransformResult = Result<Option<Vec<Node>>, TransformError>;

pub type TransformFuture = Pin<Box<dyn Future<Output = TransformResult> + Send + 'static>>;

/// Everything a transform gets to see about one marker occurrence.
#[derive(Debug, Clone)]
pub struct ComponentInvocation {
    pub name: SmolStr,
    pub attributes: AttrMap,
    /// Nodes between a `::start:`/`::end:` pair. Empty for single markers.
    pub children: Vec<Node>,
    /// Span of the opening marker comment in the source document.
    pub position: Span,
}

impl ComponentInvocation {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// An async rewrite for one component name.
pub trait ComponentTransform: Send + Sync {
    fn expand(&self, invocation: ComponentInvocation) -> TransformFuture;
}

struct FnTransform<F>(F);

impl<F, Fut> ComponentTransform for FnTransform<F>
where
    F: Fn(ComponentInvocation) -> Fut + Send + Sync,
    Fut: Future<Output = TransformResult> + Send + 'static,
{
    fn expand(&self, invocation: ComponentInvocation) -> TransformFuture {
        Box::pin((self.0)(invocation))
    }
}

/// A client-side script a component needs at runtime. Emitted at most once
/// per build, on the component's first successful resolution.
#[derive(Debug, Clone)]
pub struct RuntimeScript {
    pub source: String,
}

impl RuntimeScript {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }
}

pub struct RegistryEntry {
    pub transform: Arc<dyn ComponentTransform>,
    pub runtime_script: Option<RuntimeScript>,
}

/// All components known to a build. Immutable once expansion starts.
#[derive(Default)]
pub struct ComponentRegistry {
    entries: FxHashMap<SmolStr, RegistryEntry>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T>(&mut self, name: impl Into<SmolStr>, transform: T)
    where
        T: ComponentTransform + 'static,
    {
        self.entries.insert(
            name.into(),
            RegistryEntry { transform: Arc::new(transform), runtime_script: None },
        );
    }

    pub fn register_with_script<T>(
        &mut self,
        name: impl Into<SmolStr>,
        transform: T,
        script: RuntimeScript,
    ) where
        T: ComponentTransform + 'static,
    {
        self.entries.insert(
            name.into(),
            RegistryEntry { transform: Arc::new(transform), runtime_script: Some(script) },
        );
    }

    pub fn register_fn<F, Fut>(&mut self, name: impl Into<SmolStr>, f: F)
    where
        F: Fn(ComponentInvocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TransformResult> + Send + 'static,
    {
        self.register(name, FnTransform(f));
    }

    pub fn register_fn_with_script<F, Fut>(
        &mut self,
        name: impl Into<SmolStr>,
        f: F,
        script: RuntimeScript,
    ) where
        F: Fn(ComponentInvocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TransformResult> + Send + 'static,
    {
        self.register_with_script(name, FnTransform(f), script);
    }

    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &SmolStr> {
        self.entries.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn registered_fn_is_invoked() {
        let mut registry = ComponentRegistry::new();
        registry.register_fn("shout", |invocation: ComponentInvocation| async move {
            let text = invocation.attr("text").unwrap_or("").to_uppercase();
            Ok(Some(vec![Node::text(text)]))
        });

        let entry = registry.get("shout").unwrap();
        let mut attributes = AttrMap::default();
        attributes.insert("text".into(), "hi".to_string());
        let result = entry
            .transform
            .expand(ComponentInvocation {
                name: "shout".into(),
                attributes,
                children: Vec::new(),
                position: Span::empty(0u32),
            })
            .await
            .unwrap();
        assert_eq!(result, Some(vec![Node::text("HI")]));
    }

    #[test]
    fn lookup_misses_unknown_names() {
        let registry = ComponentRegistry::new();
        assert!(!registry.contains("quiz"));
        assert!(registry.is_empty());
    }
}
