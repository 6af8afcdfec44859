//! Explicit analysis configuration, replacing the original's
//! `Config::getInstance()` singleton (`Config.hpp`) per the Design Notes'
//! "global singletons for configuration/debug" re-architecture. Threaded
//! through the DFA constructor and the builder, the same way
//! `calyx_opt::pass_manager::PassManager` threads an explicit context
//! rather than reaching for global state.

#[derive(Clone, Copy, Debug, Default)]
pub struct Config {
    /// Suppresses `log::debug!`/`log::trace!` breadcrumbs below `warn`.
    pub quiet: bool,
    /// Emits a trace line for every `DriverTracker::add`/`merge` call,
    /// translating the original's `DEBUG_PRINT` call sites in
    /// `DriverTracker.cpp`.
    pub trace_drivers: bool,
}

impl Config {
    pub fn new(quiet: bool, trace_drivers: bool) -> Self {
        Config { quiet, trace_drivers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_verbose_and_untraced() {
        let c = Config::default();
        assert!(!c.quiet);
        assert!(!c.trace_drivers);
    }
}
