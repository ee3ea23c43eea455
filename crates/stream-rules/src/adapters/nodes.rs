//! Node registry backed by ordered sets.

use std::collections::BTreeSet;

use shared_types::Address;

use crate::ports::outbound::NodeRegistry;

/// The node and operator addresses of a registry snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidNodes {
    nodes: BTreeSet<Address>,
    operators: BTreeSet<Address>,
}

impl ValidNodes {
    #[must_use]
    pub fn new(nodes: impl IntoIterator<Item = Address>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
            operators: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_operators(mut self, operators: impl IntoIterator<Item = Address>) -> Self {
        self.operators.extend(operators);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl NodeRegistry for ValidNodes {
    fn is_valid_node(&self, address: &Address) -> bool {
        self.nodes.contains(address)
    }

    fn is_operator(&self, address: &Address) -> bool {
        self.operators.contains(address)
    }
}
