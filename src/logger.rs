//! Wires the `log` facade used throughout the crate to `env_logger`. This
//! crate never calls `log::set_logger` itself outside of this helper —
//! embedders with their own logger just never call `init`.

use std::sync::Once;

static INIT: Once = Once::new();

/// Installs `env_logger` as the global logger, controlled by `RUST_LOG`.
/// Safe to call more than once; only the first call takes effect.
pub fn init() {
    INIT.call_once(|| {
        let _ = env_logger::try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();
    }
}
