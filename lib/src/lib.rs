use serde::{Deserialize, Serialize};
use uint::construct_uint;
construct_uint! {
// 256-bit word, 4 x 64-bit limbs, matches the EVM uint256
#[derive(Serialize, Deserialize)]
pub struct U256(4);
}
pub mod error;
pub mod patcher;
pub mod rpc;
pub mod store;
pub mod templates;
pub mod tx;
pub mod util;

pub use error::BlueprintError;

// Arbitrum Sepolia, the default target for generated contracts
pub const DEFAULT_NETWORK: &str = "arbitrum-sepolia";
// config key selecting the template a node renders
pub const TEMPLATE_KEY: &str = "template";
// config key enabling the cache patch on a node's rendered source
pub const SMART_CACHE_KEY: &str = "smart_cache";
