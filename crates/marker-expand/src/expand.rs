//! The expansion pass.
//!
//! Expansion walks a parsed document, recognizes marker comments among each
//! parent's children, runs the matching component transforms concurrently,
//! and rebuilds the child list with the transforms' output spliced in at the
//! marker positions. Transforms are spawned together but their results are
//! awaited in recognition order, so sibling order in the output never
//! depends on which transform finished first. A transform's output is
//! scanned again before it is spliced, so markers it emits (at the top
//! level of its replacement or deeper) expand too.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use doc_tree::{Node, NodeId, Root, Span};
use markup_parser::marker::{classify_marker, is_range_end_for, parse_marker_tag, Marker};
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use crate::error::{ExpandError, ExpandWarning, ExpandWarningKind};
use crate::registry::{ComponentInvocation, ComponentRegistry, ComponentTransform, RuntimeScript};
use crate::scripts::ScriptEmitter;
use crate::tracker::ConsumedRegions;
use crate::validate::{check_placement, PlacementPolicy};

/// Drives marker expansion over whole documents.
pub struct Expander {
    registry: Arc<ComponentRegistry>,
    scripts: Option<Arc<ScriptEmitter>>,
    policy: PlacementPolicy,
}

impl Expander {
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self { registry, scripts: None, policy: PlacementPolicy::default() }
    }

    pub fn with_scripts(mut self, scripts: Arc<ScriptEmitter>) -> Self {
        self.scripts = Some(scripts);
        self
    }

    pub fn with_policy(mut self, policy: PlacementPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Expands every marker in `root` and validates placement of the result.
    ///
    /// On error nothing of the partially-expanded tree survives; the caller
    /// keeps its original document untouched only if it cloned beforehand,
    /// which the build pipeline does not need to do because a failed
    /// document is simply not rendered.
    pub async fn expand_document(&self, mut root: Root) -> Result<ExpandOutcome, ExpandError> {
        let mut pass = DocumentPass {
            registry: &self.registry,
            scripts: self.scripts.as_deref(),
            tracker: ConsumedRegions::new(),
            warnings: Vec::new(),
            used: Vec::new(),
            used_set: FxHashSet::default(),
        };

        let children = std::mem::take(&mut root.children);
        root.children = pass.expand_children(root.id, children).await?;

        if let Some(violation) = check_placement(&root, &self.policy).into_iter().next() {
            return Err(ExpandError::Placement(violation));
        }

        Ok(ExpandOutcome {
            root,
            warnings: pass.warnings,
            used_components: pass.used,
        })
    }
}

/// A fully expanded document plus everything observed along the way.
#[derive(Debug)]
pub struct ExpandOutcome {
    pub root: Root,
    pub warnings: Vec<ExpandWarning>,
    /// Component names in order of first successful resolution.
    pub used_components: Vec<SmolStr>,
}

/// One marker occurrence the scan decided to expand.
struct Scheduled {
    /// Index of the opening marker comment in the original child list.
    start: usize,
    /// Exclusive end of the consumed index span.
    end: usize,
    name: SmolStr,
    transform: Arc<dyn ComponentTransform>,
    runtime_script: Option<RuntimeScript>,
    invocation: Option<ComponentInvocation>,
}

/// Per-document mutable state for one expansion.
struct DocumentPass<'a> {
    registry: &'a ComponentRegistry,
    scripts: Option<&'a ScriptEmitter>,
    tracker: ConsumedRegions,
    warnings: Vec<ExpandWarning>,
    used: Vec<SmolStr>,
    used_set: FxHashSet<SmolStr>,
}

impl DocumentPass<'_> {
    fn warn(&mut self, kind: ExpandWarningKind, span: Span) {
        self.warnings.push(ExpandWarning { kind, span });
    }

    /// Expands the markers among `children` (whose parent is `parent`) and
    /// recurses into every element the original list contributed. Spliced
    /// replacement nodes arrive already expanded and are skipped here.
    fn expand_children<'b>(
        &'b mut self,
        parent: NodeId,
        children: Vec<Node>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Node>, ExpandError>> + Send + 'b>> {
        Box::pin(async move {
            let scheduled = self.scan(parent, &children);
            let (mut output, fresh) = self.execute_and_splice(children, scheduled).await?;

            for (idx, node) in output.iter_mut().enumerate() {
                if fresh.contains(&idx) {
                    continue;
                }
                if let Node::Element(element) = node {
                    let kids = std::mem::take(&mut element.children);
                    element.children = self.expand_children(element.id, kids).await?;
                }
            }
            Ok(output)
        })
    }

    /// Recognition pass: claims marker index spans in the tracker and plans
    /// the transforms to run. Does not mutate the child list.
    fn scan(&mut self, parent: NodeId, children: &[Node]) -> Vec<Scheduled> {
        let mut scheduled = Vec::new();
        let mut i = 0;
        while i < children.len() {
            if self.tracker.is_consumed(parent, i) {
                i += 1;
                continue;
            }
            let Some(comment) = children[i].as_comment() else {
                i += 1;
                continue;
            };
            let Some(marker) = classify_marker(&comment.data) else {
                i += 1;
                continue;
            };
            let span = comment.span;

            match marker {
                Marker::Single { raw } => {
                    self.tracker.consume(parent, i);
                    match parse_marker_tag(&raw, span) {
                        Err(err) => {
                            self.warn(
                                ExpandWarningKind::MalformedMarker { message: err.to_string() },
                                span,
                            );
                        }
                        Ok(tag) => match self.registry.get(&tag.name) {
                            None => self.warn(
                                ExpandWarningKind::UnknownComponent { name: tag.name },
                                span,
                            ),
                            Some(entry) => scheduled.push(Scheduled {
                                start: i,
                                end: i + 1,
                                name: tag.name.clone(),
                                transform: Arc::clone(&entry.transform),
                                runtime_script: entry.runtime_script.clone(),
                                invocation: Some(ComponentInvocation {
                                    name: tag.name,
                                    attributes: tag.attributes,
                                    children: Vec::new(),
                                    position: span,
                                }),
                            }),
                        },
                    }
                    i += 1;
                }
                Marker::RangeStart { raw } => match parse_marker_tag(&raw, span) {
                    Err(err) => {
                        self.tracker.consume(parent, i);
                        self.warn(
                            ExpandWarningKind::MalformedMarker { message: err.to_string() },
                            span,
                        );
                        i += 1;
                    }
                    Ok(tag) => {
                        let end_idx = (i + 1..children.len()).find(|&j| {
                            children[j]
                                .as_comment()
                                .is_some_and(|c| is_range_end_for(&c.data, &tag.name))
                        });
                        let entry = self.registry.get(&tag.name);
                        match (end_idx, entry) {
                            (_, None) => {
                                // Unknown component: leave the whole region,
                                // end marker included, exactly as written.
                                match end_idx {
                                    Some(j) => self.tracker.consume_range(parent, i..=j),
                                    None => self.tracker.consume(parent, i),
                                }
                                self.warn(
                                    ExpandWarningKind::UnknownComponent { name: tag.name },
                                    span,
                                );
                                i += 1;
                            }
                            (None, Some(entry)) => {
                                // No end marker: expand with empty children
                                // so the document still builds.
                                self.tracker.consume(parent, i);
                                self.warn(
                                    ExpandWarningKind::MissingEndMarker {
                                        name: tag.name.clone(),
                                    },
                                    span,
                                );
                                scheduled.push(Scheduled {
                                    start: i,
                                    end: i + 1,
                                    name: tag.name.clone(),
                                    transform: Arc::clone(&entry.transform),
                                    runtime_script: entry.runtime_script.clone(),
                                    invocation: Some(ComponentInvocation {
                                        name: tag.name,
                                        attributes: tag.attributes,
                                        children: Vec::new(),
                                        position: span,
                                    }),
                                });
                                i += 1;
                            }
                            (Some(j), Some(entry)) => {
                                self.tracker.consume_range(parent, i..=j);
                                scheduled.push(Scheduled {
                                    start: i,
                                    end: j + 1,
                                    name: tag.name.clone(),
                                    transform: Arc::clone(&entry.transform),
                                    runtime_script: entry.runtime_script.clone(),
                                    // Children are moved out of the list in
                                    // the splice phase.
                                    invocation: Some(ComponentInvocation {
                                        name: tag.name,
                                        attributes: tag.attributes,
                                        children: Vec::new(),
                                        position: span,
                                    }),
                                });
                                i = j + 1;
                            }
                        }
                    }
                },
                Marker::RangeEnd { name } => {
                    // An end whose start was never seen at this level.
                    self.tracker.consume(parent, i);
                    self.warn(ExpandWarningKind::StrayEndMarker { name }, span);
                    i += 1;
                }
            }
        }
        scheduled
    }

    /// Runs the planned transforms concurrently and rebuilds the child list,
    /// splicing results in at the recognized positions. Returns the rebuilt
    /// list plus the output indices that came from replacements.
    async fn execute_and_splice(
        &mut self,
        children: Vec<Node>,
        mut scheduled: Vec<Scheduled>,
    ) -> Result<(Vec<Node>, FxHashSet<usize>), ExpandError> {
        if scheduled.is_empty() {
            return Ok((children, FxHashSet::default()));
        }

        let mut slots: Vec<Option<Node>> = children.into_iter().map(Some).collect();

        // Move each range's inner nodes into its invocation.
        for item in &mut scheduled {
            let inner: Vec<Node> = (item.start + 1..item.end.saturating_sub(1))
                .filter_map(|k| slots[k].take())
                .collect();
            if let Some(invocation) = item.invocation.as_mut() {
                invocation.children = inner;
            }
        }

        // Spawn everything, then await in recognition order.
        let mut handles = Vec::with_capacity(scheduled.len());
        for item in &mut scheduled {
            let transform = Arc::clone(&item.transform);
            let invocation = item.invocation.take();
            handles.push(tokio::spawn(async move {
                match invocation {
                    Some(invocation) => transform.expand(invocation).await,
                    None => Ok(None),
                }
            }));
        }

        let mut results = Vec::with_capacity(scheduled.len());
        for (handle, item) in handles.into_iter().zip(&scheduled) {
            let joined = handle
                .await
                .map_err(|_| ExpandError::TransformPanicked { name: item.name.clone() })?;
            let replacement = joined
                .map_err(|source| ExpandError::Transform { name: item.name.clone(), source })?;
            results.push(replacement);
        }

        // Every transform succeeded; record usage and emit runtime scripts.
        for item in &scheduled {
            if self.used_set.insert(item.name.clone()) {
                self.used.push(item.name.clone());
                if let (Some(scripts), Some(script)) = (self.scripts, &item.runtime_script) {
                    scripts.emit(&item.name, script).await?;
                }
            }
        }

        // Replacement slices can carry markers of their own. Each one is
        // expanded in a fresh tracker scope before splicing so its indices
        // never collide with `parent`'s original child indices.
        let mut expanded = Vec::with_capacity(results.len());
        for replacement in results {
            expanded.push(match replacement {
                Some(nodes) => Some(self.expand_children(NodeId::fresh(), nodes).await?),
                None => None,
            });
        }

        let mut by_start: FxHashMap<usize, (usize, Option<Vec<Node>>)> = FxHashMap::default();
        for (item, replacement) in scheduled.into_iter().zip(expanded) {
            by_start.insert(item.start, (item.end, replacement));
        }

        let mut output = Vec::with_capacity(slots.len());
        let mut fresh = FxHashSet::default();
        let mut idx = 0;
        while idx < slots.len() {
            if let Some((end, replacement)) = by_start.remove(&idx) {
                if let Some(nodes) = replacement {
                    for node in nodes {
                        fresh.insert(output.len());
                        output.push(node);
                    }
                }
                idx = end;
            } else {
                if let Some(node) = slots[idx].take() {
                    output.push(node);
                }
                idx += 1;
            }
        }
        Ok((output, fresh))
    }
}
