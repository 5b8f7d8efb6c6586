use cfg_aliases::cfg_aliases;

fn main() {
    cfg_aliases! {
        // Only the tiny 31-byte pool is the default path.
        legacy_only: { not(feature = "ext_adv") },
        periodic: { feature = "periodic_adv" },
        // GAP indirection is present in full-stack builds only.
        gap_layer: { not(feature = "controller_only") },
    }
}
