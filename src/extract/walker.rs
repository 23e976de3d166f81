/*!
 * Shape tree traversal.
 *
 * Flattens a slide's shape tree, nested groups included, into the ordered
 * list of leaf shapes that carry text: text frames and tables.
 */

use log::{debug, warn};
use regex::Regex;

use crate::errors::HostError;
use crate::host::{PresentationHost, ShapeKind, ShapeNode};
use crate::model::ShapeLocator;

/// Separator used between ancestor names in diagnostic labels
const LABEL_SEPARATOR: &str = " > ";

/// A leaf shape reached by the walker
#[derive(Debug, Clone, PartialEq)]
pub struct VisitedShape {
    pub locator: ShapeLocator,
    pub name: String,
    pub kind: ShapeKind,
    /// Ancestor names and own name, for diagnostics
    pub label: String,
}

/// One level of the traversal: the remaining siblings under a group
struct Frame {
    group_path: Vec<String>,
    ancestor_names: Vec<String>,
    nodes: std::vec::IntoIter<ShapeNode>,
}

/// Walks shape trees, honoring a name-based exclusion filter
#[derive(Debug, Clone, Default)]
pub struct ShapeWalker {
    exclusion: Option<Regex>,
}

impl ShapeWalker {
    pub fn new(exclusion: Option<Regex>) -> Self {
        Self { exclusion }
    }

    /// Whether a shape (and its subtree) is filtered out by name
    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclusion.as_ref().is_some_and(|re| re.is_match(name))
    }

    /// Enumerate every text-bearing leaf of a slide in document order.
    ///
    /// Failing to list the slide itself is an error; failing to list the
    /// children of a group only skips that group.
    pub async fn walk(
        &self,
        host: &dyn PresentationHost,
        slide_index: usize,
    ) -> Result<Vec<VisitedShape>, HostError> {
        let top_level = host.slide_shapes(slide_index).await?;
        let mut visited = Vec::new();
        let mut stack = vec![Frame {
            group_path: Vec::new(),
            ancestor_names: Vec::new(),
            nodes: top_level.into_iter(),
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(node) = frame.nodes.next() else {
                stack.pop();
                continue;
            };
            let group_path = frame.group_path.clone();
            let mut ancestor_names = frame.ancestor_names.clone();

            if self.is_excluded(&node.name) {
                debug!("Skipping excluded shape '{}' on slide {}", node.name, slide_index + 1);
                continue;
            }

            match node.kind {
                ShapeKind::Group => {
                    let mut child_path = group_path;
                    child_path.push(node.id.clone());
                    match host.group_children(slide_index, &child_path).await {
                        Ok(children) => {
                            ancestor_names.push(node.name);
                            stack.push(Frame {
                                group_path: child_path,
                                ancestor_names,
                                nodes: children.into_iter(),
                            });
                        }
                        Err(e) => {
                            warn!("Skipping group '{}' on slide {}: {}", node.name, slide_index + 1, e);
                        }
                    }
                }
                ShapeKind::Other => {}
                kind => {
                    ancestor_names.push(node.name.clone());
                    visited.push(VisitedShape {
                        locator: ShapeLocator::new(slide_index, group_path, node.id),
                        name: node.name,
                        kind,
                        label: ancestor_names.join(LABEL_SEPARATOR),
                    });
                }
            }
        }

        Ok(visited)
    }
}
