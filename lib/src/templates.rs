//! Contract templates bundled with the toolkit.

use crate::error::{BlueprintError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub source: &'static str,
    pub source_url: Option<&'static str>,
}

static TEMPLATES: &[Template] = &[
    Template {
        id: "counter",
        name: "Counter",
        description: "Minimal Stylus contract storing a single uint256",
        source: include_str!("../templates/counter.rs.tmpl"),
        source_url: Some("https://github.com/OffchainLabs/stylus-hello-world"),
    },
    Template {
        id: "erc20",
        name: "ERC-20 Token",
        description: "Mintable and burnable token built on an Erc20 base",
        source: include_str!("../templates/erc20.rs.tmpl"),
        source_url: None,
    },
    Template {
        id: "erc721",
        name: "ERC-721 NFT",
        description: "Mintable and burnable NFT collection built on an Erc721 base",
        source: include_str!("../templates/erc721.rs.tmpl"),
        source_url: None,
    },
    Template {
        id: "erc20-full",
        name: "ERC-20 Token (standalone)",
        description: "Self-contained ERC-20 with ownable, mintable, burnable and pausable logic",
        source: include_str!("../templates/erc20_full.rs.tmpl"),
        source_url: None,
    },
    Template {
        id: "erc721-full",
        name: "ERC-721 NFT (standalone)",
        description: "Self-contained ERC-721 with enumerable metadata, ownable and pausable logic",
        source: include_str!("../templates/erc721_full.rs.tmpl"),
        source_url: None,
    },
];

pub fn all() -> &'static [Template] {
    TEMPLATES
}

pub fn get(id: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|template| template.id == id)
}

pub fn require(id: &str) -> Result<&'static Template> {
    get(id).ok_or_else(|| BlueprintError::UnknownTemplate(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patcher::entrypoint_struct;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<_> = all().iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), all().len());
    }

    #[test]
    fn test_lookup() {
        assert_eq!(get("erc20").map(|t| t.name), Some("ERC-20 Token"));
        assert_eq!(get("erc721-full").map(|t| t.id), Some("erc721-full"));
        assert!(get("erc1155").is_none());
        assert!(matches!(
            require("erc1155"),
            Err(BlueprintError::UnknownTemplate(id)) if id == "erc1155"
        ));
    }

    #[test]
    fn test_every_template_has_an_entrypoint() {
        for template in all() {
            assert!(
                entrypoint_struct(template.source).is_some(),
                "{} has no #[entrypoint] struct",
                template.id
            );
        }
    }
}
