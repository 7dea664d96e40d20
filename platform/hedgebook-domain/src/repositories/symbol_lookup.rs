use crate::value_objects::session::Session;

/// Resolves a venue symbol name to the record store's identifier for it.
///
/// Implementations swallow their own failures: an unknown symbol and a
/// broken lookup both answer `None`.
pub trait SymbolLookup {
    fn resolve(&self, symbol: &str) -> Option<String>;

    /// Called once per run with a live store session before any lookups.
    fn prepare(&self, _session: &Session) {}
}
