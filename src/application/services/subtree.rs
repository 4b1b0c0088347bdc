//! Rendering of a marked partial tree
//!
//! Walks only the portion of the hierarchy a [`PartialTreeBuilder`] decided to
//! expand and turns it into a view model, an HTML fragment, a JSON-friendly
//! nested structure, or a terminal tree. Rendering never changes marks.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use serde::Serialize;
use termtree::Tree;
use tracing::instrument;

use crate::application::services::marked_set::PartialTreeBuilder;
use crate::domain::{FieldValue, Node, TreeState, TreeViewNode};

/// Default serialization: `{id, title}`.
pub fn default_serializer(node: &Node) -> BTreeMap<String, FieldValue> {
    BTreeMap::from([
        ("id".to_string(), FieldValue::Int(node.id as i64)),
        ("title".to_string(), FieldValue::Text(node.title.clone())),
    ])
}

/// JSON-friendly node of [`SubtreeRenderer::children_as_array`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeArrayNode {
    pub node: BTreeMap<String, FieldValue>,
    pub marked: bool,
    pub expanded: bool,
    pub opened: bool,
    pub depth: usize,
    pub count: usize,
    pub limited: bool,
    pub children: Vec<TreeArrayNode>,
}

impl Drop for TreeArrayNode {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut item) = stack.pop() {
            stack.append(&mut item.children);
        }
    }
}

/// Terminal rendering of the marked tree.
///
/// Wraps [`termtree::Tree`] and tears it down without recursion.
#[derive(Debug)]
pub struct TextTree(Tree<String>);

impl TextTree {
    pub fn tree(&self) -> &Tree<String> {
        &self.0
    }
}

impl fmt::Display for TextTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Drop for TextTree {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.0.leaves);
        while let Some(mut leaf) = stack.pop() {
            stack.append(&mut leaf.leaves);
        }
    }
}

/// Extra template fields, fixed or computed per node.
#[derive(Default)]
pub enum RenderContext {
    #[default]
    None,
    Fields(BTreeMap<String, String>),
    PerNode(Box<dyn Fn(&Node) -> BTreeMap<String, String>>),
}

impl RenderContext {
    fn resolve(&self, node: &Node) -> BTreeMap<String, String> {
        match self {
            RenderContext::None => BTreeMap::new(),
            RenderContext::Fields(fields) => fields.clone(),
            RenderContext::PerNode(func) => func(node),
        }
    }
}

/// A view node on its way through a template.
///
/// Children are rendered before their parent, so every entry of `children`
/// already carries its `sub_tree` when the parent is rendered. Once a node's
/// own fragment is rendered its `children` are released.
#[derive(Debug)]
pub struct RenderedNode<'v> {
    pub view: &'v TreeViewNode,
    pub marking_classes: String,
    pub context: BTreeMap<String, String>,
    pub children: Vec<RenderedNode<'v>>,
    /// Rendered fragment of this node's children
    pub sub_tree: String,
}

/// Turns one level of the tree into markup.
pub trait SubtreeTemplate {
    /// Render the children of `item`.
    fn render(&self, item: &RenderedNode<'_>) -> String;
}

/// Nested `<ul>/<li>` lists for a jstree-style widget.
///
/// Reads `name` (list id prefix, default `tree`) and `extraClass` from the
/// render context.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlListTemplate;

impl SubtreeTemplate for HtmlListTemplate {
    fn render(&self, item: &RenderedNode<'_>) -> String {
        if item.children.is_empty() {
            return String::new();
        }
        let name = item.context.get("name").map(String::as_str).unwrap_or("tree");

        let mut out = String::from("<ul>");
        for child in &item.children {
            let node = &child.view.node;
            let extra = child
                .context
                .get("extraClass")
                .map(|c| format!(" {}", escape_xml(c)))
                .unwrap_or_default();
            let _ = write!(
                out,
                r#"<li id="selector-{name}-{id}" data-id="{id}" class="class-{kind} {classes}{extra}"><a rel="{id}">{title}</a>{sub}</li>"#,
                name = escape_xml(name),
                id = node.id,
                kind = escape_xml(&node.kind),
                classes = child.marking_classes,
                extra = extra,
                title = escape_xml(&node.title),
                sub = child.sub_tree,
            );
        }
        out.push_str("</ul>");
        out
    }
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Read-only walker over a builder's marks.
#[derive(Debug, Clone, Copy)]
pub struct SubtreeRenderer<'a> {
    builder: &'a PartialTreeBuilder,
}

impl<'a> SubtreeRenderer<'a> {
    pub fn new(builder: &'a PartialTreeBuilder) -> Self {
        Self { builder }
    }

    /// View model of the whole marked tree.
    pub fn subtree(&self) -> TreeViewNode {
        self.get_subtree(self.builder.root(), 0)
    }

    /// View model of the marked tree below `node`.
    ///
    /// Descent stops at limited or unexpanded nodes, and only marked
    /// children are included. Built with an explicit stack, so the depth of
    /// the marked tree is bounded by memory only.
    #[instrument(level = "trace", skip(self, node), fields(id = node.id))]
    pub fn get_subtree(&self, node: &Node, depth: usize) -> TreeViewNode {
        let mut root = self.view_frame(node, depth);
        let mut stack: Vec<ViewFrame> = Vec::new();
        loop {
            let top = stack.last_mut().unwrap_or(&mut root);
            if let Some(child) = top.pending.next() {
                let child_depth = top.view.depth + 1;
                let frame = self.view_frame(&child, child_depth);
                stack.push(frame);
                continue;
            }
            match stack.pop() {
                Some(done) => stack
                    .last_mut()
                    .unwrap_or(&mut root)
                    .view
                    .children
                    .push(done.view),
                None => return root.view,
            }
        }
    }

    /// View of a single node plus the marked children still to visit.
    fn view_frame(&self, node: &Node, depth: usize) -> ViewFrame {
        let num_children = self.builder.num_children(node);
        let limited = self.builder.is_node_limited(node, Some(num_children));
        let expanded = self.builder.is_expanded(node);
        let count = if limited && num_children > self.builder.options().max_child_nodes {
            0
        } else {
            num_children
        };

        let pending: Vec<Node> = if limited || !expanded {
            Vec::new()
        } else {
            self.builder
                .children_of(node)
                .into_iter()
                .filter(|child| self.builder.is_marked(child))
                .collect()
        };

        ViewFrame {
            view: TreeViewNode {
                node: node.clone(),
                marked: self.builder.is_marked(node),
                expanded,
                opened: self.builder.is_tree_opened(node),
                depth,
                count,
                limited,
                children: Vec::with_capacity(pending.len()),
            },
            pending: pending.into_iter(),
        }
    }

    /// Marking classes of `node` from the builder's current marks.
    pub fn marking_classes(&self, node: &Node) -> String {
        let has_children = self.builder.num_children(node) > 0;
        crate::domain::marking_classes(
            self.builder.is_expanded(node),
            self.builder.is_tree_opened(node),
            has_children,
        )
    }

    /// Render the marked tree through `template`, returning the root's fragment.
    pub fn render_children(
        &self,
        template: &dyn SubtreeTemplate,
        context: &RenderContext,
    ) -> String {
        let tree = self.subtree();
        render_subtree(&tree, template, context).sub_tree
    }

    /// Nested structure of the marked tree, each node passed through `serializer`
    /// (default `{id, title}`).
    pub fn children_as_array(
        &self,
        serializer: Option<&dyn Fn(&Node) -> BTreeMap<String, FieldValue>>,
    ) -> TreeArrayNode {
        let tree = self.subtree();
        let serializer = serializer.unwrap_or(&default_serializer);
        to_array_node(&tree, serializer)
    }

    /// Terminal tree of the marked tree.
    pub fn children_as_text(&self) -> TextTree {
        to_text_tree(&self.subtree())
    }
}

/// Node of the tree under construction plus the children still to visit.
struct ViewFrame {
    view: TreeViewNode,
    pending: std::vec::IntoIter<Node>,
}

struct FoldFrame<'v, T> {
    view: &'v TreeViewNode,
    next: usize,
    done: Vec<T>,
}

/// Post-order fold over a view: `build` receives each node with the already
/// built results of its children. Uses an explicit stack.
fn fold_view<'v, T>(
    root: &'v TreeViewNode,
    mut build: impl FnMut(&'v TreeViewNode, Vec<T>) -> T,
) -> T {
    let mut root_frame = FoldFrame {
        view: root,
        next: 0,
        done: Vec::with_capacity(root.children.len()),
    };
    let mut stack: Vec<FoldFrame<'v, T>> = Vec::new();
    loop {
        let top = stack.last_mut().unwrap_or(&mut root_frame);
        let view = top.view;
        if let Some(child) = view.children.get(top.next) {
            top.next += 1;
            stack.push(FoldFrame {
                view: child,
                next: 0,
                done: Vec::with_capacity(child.children.len()),
            });
            continue;
        }
        match stack.pop() {
            Some(frame) => {
                let built = build(frame.view, frame.done);
                stack.last_mut().unwrap_or(&mut root_frame).done.push(built);
            }
            None => return build(root_frame.view, root_frame.done),
        }
    }
}

fn render_subtree<'v>(
    view: &'v TreeViewNode,
    template: &dyn SubtreeTemplate,
    context: &RenderContext,
) -> RenderedNode<'v> {
    fold_view(view, |view, children| {
        let mut rendered = RenderedNode {
            view,
            marking_classes: view.marking_classes(),
            context: context.resolve(&view.node),
            children,
            sub_tree: String::new(),
        };
        rendered.sub_tree = template.render(&rendered);
        // only the fragment travels upwards
        rendered.children.clear();
        rendered
    })
}

fn to_array_node(
    view: &TreeViewNode,
    serializer: &dyn Fn(&Node) -> BTreeMap<String, FieldValue>,
) -> TreeArrayNode {
    fold_view(view, |view, children| TreeArrayNode {
        node: serializer(&view.node),
        marked: view.marked,
        expanded: view.expanded,
        opened: view.opened,
        depth: view.depth,
        count: view.count,
        limited: view.limited,
        children,
    })
}

fn text_label(view: &TreeViewNode) -> String {
    let mut label = match view.state() {
        TreeState::Leaf => format!("{}", view.node),
        state => format!("{} [{}]", view.node, state),
    };
    if view.limited {
        label.push_str(" (limited)");
    } else if view.state() == TreeState::Unexpanded {
        let _ = write!(label, " (+{})", view.count);
    }
    label
}

fn to_text_tree(view: &TreeViewNode) -> TextTree {
    TextTree(fold_view(view, |view, children| {
        Tree::new(text_label(view)).with_leaves(children)
    }))
}
