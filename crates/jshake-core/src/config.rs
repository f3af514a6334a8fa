use serde::{Deserialize, Serialize};

/// Options that control which eliminations the shaker is allowed to perform.
/// Disabling a knob degrades the corresponding decisions to keeping the node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShakeOptions {
    /// Drop bindings that are never read (default: true)
    #[serde(default = "default_true")]
    pub shake_bindings: bool,

    /// Drop object-literal members whose key is never read (default: true)
    #[serde(default = "default_true")]
    pub shake_object_members: bool,

    /// Drop accessor members whose key is never touched and whose object
    /// does not escape (default: true)
    #[serde(default = "default_true")]
    pub shake_accessors: bool,

    /// Upper bound on analyze/rewrite rounds. Elimination can expose further
    /// dead code (a dropped function takes its reads with it), so the shaker
    /// iterates to a fixpoint; this caps the iteration count (default: 8)
    #[serde(default = "default_max_passes")]
    pub max_passes: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_passes() -> usize {
    8
}

impl Default for ShakeOptions {
    fn default() -> Self {
        Self {
            shake_bindings: true,
            shake_object_members: true,
            shake_accessors: true,
            max_passes: default_max_passes(),
        }
    }
}
