//! Node type and category enumerations.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// Backend modules implementing the `internet` node type.
pub const INTERNET_PROVIDERS: [&str; 4] = ["brave", "perplexity", "tavily", "google"];

/// Pipeline stage a node belongs to.
///
/// Determines which root collection holds the node and which backend
/// CRUD surface persists it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(AsRefStr, Display, EnumString, EnumIter, IntoStaticStr)]
#[derive(Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NodeCategory {
    /// Question preprocessing (history, rephrasing, guardrails).
    Preprocess,
    /// Context retrieval.
    Context,
    /// Answer generation.
    Generation,
    /// Answer postprocessing and validation.
    Postprocess,
}

impl NodeCategory {
    /// All categories in pipeline order.
    pub const ALL: [NodeCategory; 4] = [
        Self::Preprocess,
        Self::Context,
        Self::Generation,
        Self::Postprocess,
    ];

    /// Returns the category's index in pipeline order.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::Preprocess => 0,
            Self::Context => 1,
            Self::Generation => 2,
            Self::Postprocess => 3,
        }
    }
}

/// Kind of pipeline stage a node configures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(AsRefStr, Display, EnumString, EnumIter, IntoStaticStr)]
#[derive(Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Historical,
    Rephrase,
    PreConditional,
    PreprocessAlinia,
    ContextConditional,
    BasicAsk,
    Ask,
    AdvancedAsk,
    Internet,
    Sql,
    Cypher,
    Mcp,
    Restricted,
    Summarize,
    Generate,
    PostConditional,
    Remi,
    External,
    Restart,
    PostprocessAlinia,
}

impl NodeType {
    /// Returns the category nodes of this type live in.
    pub const fn category(self) -> NodeCategory {
        match self {
            Self::Historical | Self::Rephrase | Self::PreConditional | Self::PreprocessAlinia => {
                NodeCategory::Preprocess
            }
            Self::ContextConditional
            | Self::BasicAsk
            | Self::Ask
            | Self::AdvancedAsk
            | Self::Internet
            | Self::Sql
            | Self::Cypher
            | Self::Mcp
            | Self::Restricted => NodeCategory::Context,
            Self::Summarize | Self::Generate => NodeCategory::Generation,
            Self::PostConditional
            | Self::Remi
            | Self::External
            | Self::Restart
            | Self::PostprocessAlinia => NodeCategory::Postprocess,
        }
    }

    /// Returns `true` for the `then`/`else` branching node types.
    #[must_use]
    pub const fn is_conditional(self) -> bool {
        matches!(
            self,
            Self::PreConditional | Self::ContextConditional | Self::PostConditional
        )
    }

    /// Returns `true` for guardrail node types.
    #[must_use]
    pub const fn is_guardrails(self) -> bool {
        matches!(self, Self::PreprocessAlinia | Self::PostprocessAlinia)
    }

    /// Returns the conditional node type for a category, if the category has one.
    pub const fn conditional_for(category: NodeCategory) -> Option<Self> {
        match category {
            NodeCategory::Preprocess => Some(Self::PreConditional),
            NodeCategory::Context => Some(Self::ContextConditional),
            NodeCategory::Postprocess => Some(Self::PostConditional),
            NodeCategory::Generation => None,
        }
    }

    /// Returns the guardrail node type for a category, if the category has one.
    pub const fn guardrails_for(category: NodeCategory) -> Option<Self> {
        match category {
            NodeCategory::Preprocess => Some(Self::PreprocessAlinia),
            NodeCategory::Postprocess => Some(Self::PostprocessAlinia),
            NodeCategory::Context | NodeCategory::Generation => None,
        }
    }

    /// Maps a backend `module` tag to the node type that edits it.
    ///
    /// Internet search providers share the single `internet` node type.
    pub fn from_module(module: &str) -> Option<Self> {
        if INTERNET_PROVIDERS.contains(&module) {
            return Some(Self::Internet);
        }
        module.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn every_type_parses_its_own_name() {
        for node_type in NodeType::iter() {
            assert_eq!(NodeType::from_module(node_type.as_ref()), Some(node_type));
        }
    }

    #[test]
    fn internet_providers_map_to_internet() {
        for provider in INTERNET_PROVIDERS {
            assert_eq!(NodeType::from_module(provider), Some(NodeType::Internet));
        }
        assert_eq!(NodeType::from_module("unknown_module"), None);
    }

    #[test]
    fn conditional_types_match_their_category() {
        for category in NodeCategory::ALL {
            if let Some(node_type) = NodeType::conditional_for(category) {
                assert!(node_type.is_conditional());
                assert_eq!(node_type.category(), category);
            }
        }
        assert_eq!(NodeType::conditional_for(NodeCategory::Generation), None);
    }

    #[test]
    fn category_names_are_lowercase() {
        assert_eq!(NodeCategory::Postprocess.as_ref(), "postprocess");
        assert_eq!("context".parse::<NodeCategory>().unwrap(), NodeCategory::Context);
        assert_eq!(NodeType::PreprocessAlinia.as_ref(), "preprocess_alinia");
    }
}
