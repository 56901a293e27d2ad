use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::graph::error::GraphError;
use crate::screen::{
    actions::ActionList,
    screen_model::{ScreenDescriptor, ScreenId},
};

// ============================================================================
// Graph data model
// ============================================================================

/// A screen together with its start/end flags.
#[derive(Debug, Clone)]
pub struct ScreenNode {
    pub descriptor: ScreenDescriptor,
    pub is_start: bool,
    pub is_end: bool,
}

/// Directed edge between two screens.
///
/// Each action list is individually sufficient to realize the transition;
/// they are alternatives, not steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: ScreenId,
    pub to: ScreenId,
    pub action_lists: Vec<ActionList>,
}

impl Transition {
    pub fn action_list(&self, name: &str) -> Option<&ActionList> {
        self.action_lists.iter().find(|l| l.name == name)
    }
}

/// Directed graph of screens and verified transitions for one app version.
///
/// Nodes are kept in id order and outgoing edges in insertion order, so
/// iteration is deterministic. The graph is read-only once a run starts
/// and can be shared between runs on different devices.
#[derive(Debug, Clone, Default)]
pub struct ScriptGraph {
    nodes: BTreeMap<ScreenId, ScreenNode>,
    edges: BTreeMap<ScreenId, Vec<Transition>>,
}

impl ScriptGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a screen. Ids and names must be unique; fingerprints must
    /// constrain at least one attribute.
    pub fn add_screen(&mut self, descriptor: ScreenDescriptor) -> Result<(), GraphError> {
        if self.nodes.contains_key(&descriptor.id) {
            return Err(GraphError::DuplicateScreenId(descriptor.id));
        }
        if self.nodes.values().any(|n| n.descriptor.name == descriptor.name) {
            return Err(GraphError::DuplicateScreenName(descriptor.name));
        }
        if descriptor
            .required_elements
            .iter()
            .chain(descriptor.optional_elements.iter())
            .any(|fp| fp.is_empty())
        {
            return Err(GraphError::EmptyFingerprint {
                screen: descriptor.id,
            });
        }

        self.nodes.insert(
            descriptor.id,
            ScreenNode {
                descriptor,
                is_start: false,
                is_end: false,
            },
        );
        Ok(())
    }

    /// Add a transition. Both endpoints must already exist; self-loops are allowed.
    pub fn add_transition(
        &mut self,
        from: ScreenId,
        to: ScreenId,
        action_lists: Vec<ActionList>,
    ) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&from) {
            return Err(GraphError::UnknownScreen(from));
        }
        if !self.nodes.contains_key(&to) {
            return Err(GraphError::DanglingTransition { from, to });
        }
        if action_lists.is_empty() {
            return Err(GraphError::EmptyActionLists { from, to });
        }

        self.edges.entry(from).or_default().push(Transition {
            from,
            to,
            action_lists,
        });
        Ok(())
    }

    pub fn mark_start(&mut self, id: ScreenId) -> Result<(), GraphError> {
        self.nodes
            .get_mut(&id)
            .map(|n| n.is_start = true)
            .ok_or(GraphError::UnknownScreen(id))
    }

    pub fn mark_end(&mut self, id: ScreenId) -> Result<(), GraphError> {
        self.nodes
            .get_mut(&id)
            .map(|n| n.is_end = true)
            .ok_or(GraphError::UnknownScreen(id))
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    pub fn screen(&self, id: ScreenId) -> Option<&ScreenDescriptor> {
        self.nodes.get(&id).map(|n| &n.descriptor)
    }

    pub fn node(&self, id: ScreenId) -> Option<&ScreenNode> {
        self.nodes.get(&id)
    }

    pub fn screen_by_name(&self, name: &str) -> Option<&ScreenDescriptor> {
        self.nodes
            .values()
            .map(|n| &n.descriptor)
            .find(|d| d.name == name)
    }

    pub fn contains(&self, id: ScreenId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn screens(&self) -> impl Iterator<Item = &ScreenNode> {
        self.nodes.values()
    }

    pub fn screen_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn start_nodes(&self) -> Vec<ScreenId> {
        self.nodes
            .values()
            .filter(|n| n.is_start)
            .map(|n| n.descriptor.id)
            .collect()
    }

    pub fn end_nodes(&self) -> Vec<ScreenId> {
        self.nodes
            .values()
            .filter(|n| n.is_end)
            .map(|n| n.descriptor.id)
            .collect()
    }

    pub fn transitions_from(&self, id: ScreenId) -> &[Transition] {
        self.edges.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Names of the action lists offered by `id`'s outgoing transitions, in
    /// insertion order without duplicates.
    pub fn offered_action_lists(&self, id: ScreenId) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for list in self.transitions_from(id).iter().flat_map(|t| t.action_lists.iter()) {
            if !names.contains(&list.name) {
                names.push(list.name.clone());
            }
        }
        names
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.edges.values().flatten()
    }

    pub fn transition_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    // ------------------------------------------------------------------------
    // Reachability
    // ------------------------------------------------------------------------

    /// Every screen from which at least one of `targets` can be reached
    /// (targets included).
    pub fn reaching_set(&self, targets: &[ScreenId]) -> HashSet<ScreenId> {
        let mut reverse: BTreeMap<ScreenId, Vec<ScreenId>> = BTreeMap::new();
        for t in self.transitions() {
            reverse.entry(t.to).or_default().push(t.from);
        }

        let mut seen: HashSet<ScreenId> = HashSet::new();
        let mut queue: VecDeque<ScreenId> = VecDeque::new();
        for &target in targets {
            if self.contains(target) && seen.insert(target) {
                queue.push_back(target);
            }
        }

        while let Some(id) = queue.pop_front() {
            for &pred in reverse.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
                if seen.insert(pred) {
                    queue.push_back(pred);
                }
            }
        }

        seen
    }

    pub fn can_reach(&self, from: ScreenId, targets: &[ScreenId]) -> bool {
        self.reaching_set(targets).contains(&from)
    }

    // ------------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------------

    /// Check the graph is runnable: start and end screens exist, edges are
    /// well formed, every decision-table name is offered by an outgoing
    /// transition, and each start screen can reach an end screen.
    pub fn validate(&self) -> Result<(), GraphError> {
        let starts = self.start_nodes();
        let ends = self.end_nodes();
        if starts.is_empty() {
            return Err(GraphError::NoStartNode);
        }
        if ends.is_empty() {
            return Err(GraphError::NoEndNode);
        }

        for t in self.transitions() {
            if !self.contains(t.to) {
                return Err(GraphError::DanglingTransition {
                    from: t.from,
                    to: t.to,
                });
            }
            if t.action_lists.is_empty() {
                return Err(GraphError::EmptyActionLists {
                    from: t.from,
                    to: t.to,
                });
            }
        }

        for node in self.nodes.values() {
            let id = node.descriptor.id;
            for name in node.descriptor.action_table.referenced_names() {
                let offered = self
                    .transitions_from(id)
                    .iter()
                    .any(|t| t.action_list(name).is_some());
                if !offered {
                    return Err(GraphError::UnknownActionList {
                        screen: id,
                        name: name.to_string(),
                    });
                }
            }
        }

        let reaching = self.reaching_set(&ends);
        if let Some(start) = starts.into_iter().find(|s| !reaching.contains(s)) {
            return Err(GraphError::EndUnreachable { start });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::actions::ActionTable;
    use crate::screen::fingerprint::ElementFingerprint;

    fn screen(id: u32, text: &str) -> ScreenDescriptor {
        ScreenDescriptor::new(id, &format!("s{}", id)).require(ElementFingerprint::text(text))
    }

    fn chain() -> ScriptGraph {
        let mut graph = ScriptGraph::new();
        graph.add_screen(screen(0, "a")).unwrap();
        graph.add_screen(screen(1, "b")).unwrap();
        graph.add_screen(screen(2, "c")).unwrap();
        graph
            .add_transition(ScreenId(0), ScreenId(1), vec![ActionList::empty("next")])
            .unwrap();
        graph
            .add_transition(ScreenId(1), ScreenId(2), vec![ActionList::empty("next")])
            .unwrap();
        graph.mark_start(ScreenId(0)).unwrap();
        graph.mark_end(ScreenId(2)).unwrap();
        graph
    }

    #[test]
    fn reaching_set_walks_edges_backwards() {
        let graph = chain();
        let reaching = graph.reaching_set(&[ScreenId(1)]);
        assert!(reaching.contains(&ScreenId(0)));
        assert!(reaching.contains(&ScreenId(1)));
        assert!(!reaching.contains(&ScreenId(2)));
    }

    #[test]
    fn rejects_dangling_and_duplicate() {
        let mut graph = chain();
        assert!(matches!(
            graph.add_transition(ScreenId(0), ScreenId(9), vec![ActionList::empty("x")]),
            Err(GraphError::DanglingTransition { .. })
        ));
        assert!(matches!(
            graph.add_screen(screen(1, "dup")),
            Err(GraphError::DuplicateScreenId(ScreenId(1)))
        ));
        assert!(matches!(
            graph.add_screen(ScreenDescriptor::new(7, "s0")),
            Err(GraphError::DuplicateScreenName(_))
        ));
    }

    #[test]
    fn validate_detects_unreachable_end() {
        let mut graph = ScriptGraph::new();
        graph.add_screen(screen(0, "a")).unwrap();
        graph.add_screen(screen(1, "b")).unwrap();
        graph.mark_start(ScreenId(0)).unwrap();
        graph.mark_end(ScreenId(1)).unwrap();
        assert!(matches!(
            graph.validate(),
            Err(GraphError::EndUnreachable { start: ScreenId(0) })
        ));
    }

    #[test]
    fn validate_detects_unknown_action_list() {
        let mut graph = ScriptGraph::new();
        graph
            .add_screen(screen(0, "a").with_actions(ActionTable::new(&["missing"])))
            .unwrap();
        graph.add_screen(screen(1, "b")).unwrap();
        graph
            .add_transition(ScreenId(0), ScreenId(1), vec![ActionList::empty("next")])
            .unwrap();
        graph.mark_start(ScreenId(0)).unwrap();
        graph.mark_end(ScreenId(1)).unwrap();
        assert!(matches!(
            graph.validate(),
            Err(GraphError::UnknownActionList { ref name, .. }) if name == "missing"
        ));
    }

    #[test]
    fn validate_accepts_chain() {
        chain().validate().expect("chain graph is valid");
    }
}
