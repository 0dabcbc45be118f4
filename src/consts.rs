// Max-cut
pub const BINARIZE_THRESHOLD: f32 = 0.5;

// MIMO relay
pub const MIMO_FINAL_CHECKPOINT: &str = "policy_net_mimo_1";

// Max-cut persistence
pub const MAXCUT_ENV_NAME: &str = "graph_maxcut";
pub const MAXCUT_FINAL_CHECKPOINT: &str = "opt_net_final";

// Contraction baseline
pub const RECORD_COSTS_FILE: &str = "record_r_baseline_random.json";
pub const RECORD_PERMUTATIONS_FILE: &str = "record_permute_baseline_random.json";

// Numerics
pub const EPS: f32 = 1e-12;
