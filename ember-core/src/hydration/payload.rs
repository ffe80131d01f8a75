//! Hydration payload
//!
//! The server embeds one payload per page, naming the function to revive,
//! its arguments and the globals to install. The JSON form is read from
//! the anchor element's text; the MessagePack form is for hosts that ship
//! the payload as binary.
//!
//! ```json
//! {"function": "App", "module": "main", "argOrder": ["x", "y"],
//!  "args": {"y": 2, "x": 1}, "globals": {"user": "ada"}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::registry::Args;
use crate::error::HydrationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydrationPayload {
    pub function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default)]
    pub arg_order: Vec<String>,
    #[serde(default)]
    pub args: Map<String, Value>,
    #[serde(default)]
    pub globals: Map<String, Value>,
}

impl HydrationPayload {
    pub fn from_json(text: &str) -> Result<Self, HydrationError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, HydrationError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Project `args` through `arg_order`.
    pub fn positional_args(&self) -> Args {
        self.arg_order.iter().map(|name| self.args.get(name).cloned()).collect()
    }
}
