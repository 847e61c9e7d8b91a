//! Splices the Stylus cache SDK into contract source.
//!
//! The patch adds one import and the cache opt-in functions to the contract's
//! public ABI. Applying it twice is a no-op: the marker and the import line
//! are checked before anything is touched.

mod scan;

pub use scan::{ImplBlock, entrypoint_struct, impl_blocks, last_use_end, matching_brace};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

pub const DEFAULT_IMPORT: &str = "use stylus_cache_sdk::{is_contract_cacheable};";
pub const DEFAULT_MARKER: &str = "stylus_cache_sdk";
pub const DEFAULT_FUNCTIONS: &str = "    \
    /// Whether this contract has opted in to the cache manager\n    \
    pub fn is_cacheable(&self) -> bool {\n        \
        is_contract_cacheable()\n    \
    }";
/// Interfaces whose implementation block takes the snippet first.
pub const DEFAULT_PREFERRED_INTERFACES: &[&str] = &[
    "IErc20",
    "IErc721",
    "IErc1155",
    "IErc20Metadata",
    "IErc721Metadata",
    "IErc721Enumerable",
    "IOwnable",
];

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// First preferred-interface block, else the last public block.
    #[default]
    PreferInterface,
    /// Last public block.
    LastImpl,
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionPolicy::PreferInterface => write!(f, "prefer-interface"),
            SelectionPolicy::LastImpl => write!(f, "last-impl"),
        }
    }
}

impl FromStr for SelectionPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prefer-interface" => Ok(SelectionPolicy::PreferInterface),
            "last-impl" => Ok(SelectionPolicy::LastImpl),
            other => Err(format!(
                "unknown policy `{other}` (expected prefer-interface or last-impl)"
            )),
        }
    }
}

/// Where the function snippet ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// The marker was already present; the source is returned untouched.
    AlreadyPatched,
    Interface { trait_name: String, type_name: String },
    /// A public block that is not a preferred interface. `trait_name` is
    /// set when the block implements some other trait.
    Impl {
        trait_name: Option<String>,
        type_name: String,
    },
    /// No usable impl block, a new one was appended for the entrypoint.
    Synthesized { struct_name: String },
    /// Nowhere to put the functions; only the import was added.
    ImportOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patched {
    pub source: String,
    pub placement: Placement,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Patcher {
    pub import: String,
    pub functions: String,
    pub marker: String,
    pub policy: SelectionPolicy,
    pub preferred_interfaces: Vec<String>,
}

impl Default for Patcher {
    fn default() -> Self {
        Patcher {
            import: DEFAULT_IMPORT.to_string(),
            functions: DEFAULT_FUNCTIONS.to_string(),
            marker: DEFAULT_MARKER.to_string(),
            policy: SelectionPolicy::default(),
            preferred_interfaces: DEFAULT_PREFERRED_INTERFACES
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

impl Patcher {
    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// True when the source holds the marker or the import line. The import
    /// check keeps repeated patches stable when the marker is not part of
    /// the inserted text.
    pub fn is_patched(&self, source: &str) -> bool {
        let import = self.import.trim();
        (!self.marker.is_empty() && source.contains(&self.marker))
            || (!import.is_empty() && source.contains(import))
    }

    pub fn patch(&self, source: &str) -> Patched {
        if self.is_patched(source) {
            debug!(marker = %self.marker, "source already carries the cache marker or import");
            return Patched {
                source: source.to_string(),
                placement: Placement::AlreadyPatched,
            };
        }

        // (offset, text) edits against the input
        let mut edits: Vec<(usize, String)> = Vec::with_capacity(2);
        match last_use_end(source) {
            Some(end) => edits.push((end, format!("\n{}", self.import))),
            None => edits.push((0, format!("{}\n\n", self.import))),
        }

        let functions = self.functions.trim_end_matches('\n');
        let placement = match self.select(source) {
            Some(block) => {
                edits.push((block.close, format!("\n{functions}\n")));
                let preferred = self.policy == SelectionPolicy::PreferInterface
                    && block.trait_ident().is_some_and(|name| self.is_preferred(name));
                match (preferred, block.trait_name) {
                    (true, Some(trait_name)) => Placement::Interface {
                        trait_name,
                        type_name: block.type_name,
                    },
                    (_, trait_name) => Placement::Impl {
                        trait_name,
                        type_name: block.type_name,
                    },
                }
            }
            None => match entrypoint_struct(source) {
                Some(struct_name) => {
                    edits.push((
                        source.len(),
                        format!("\n\n#[public]\nimpl {struct_name} {{\n{functions}\n}}\n"),
                    ));
                    Placement::Synthesized { struct_name }
                }
                None => {
                    warn!("no public impl block or entrypoint struct found, only the import was added");
                    Placement::ImportOnly
                }
            },
        };
        debug!(?placement, "cache snippet placed");

        Patched {
            source: apply_edits(source, edits),
            placement,
        }
    }

    fn is_preferred(&self, ident: &str) -> bool {
        self.preferred_interfaces.iter().any(|name| name == ident)
    }

    fn select(&self, source: &str) -> Option<ImplBlock> {
        let mut candidates: Vec<ImplBlock> = impl_blocks(source)
            .into_iter()
            .filter(|block| block.has_fn)
            .collect();
        if self.policy == SelectionPolicy::PreferInterface {
            if let Some(index) = candidates
                .iter()
                .position(|block| block.trait_ident().is_some_and(|name| self.is_preferred(name)))
            {
                return Some(candidates.swap_remove(index));
            }
        }
        candidates.pop()
    }
}

/// Patches `source` with the default cache snippet.
pub fn patch(source: &str) -> String {
    Patcher::default().patch(source).source
}

// Edits are applied back to front so earlier offsets stay valid. On equal
// offsets the edit listed first ends up first in the output.
fn apply_edits(source: &str, mut edits: Vec<(usize, String)>) -> String {
    edits.sort_by_key(|(offset, _)| *offset);
    let extra: usize = edits.iter().map(|(_, text)| text.len()).sum();
    let mut out = String::with_capacity(source.len() + extra);
    out.push_str(source);
    for (offset, text) in edits.iter().rev() {
        out.insert_str(*offset, text);
    }
    out
}
