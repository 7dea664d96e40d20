pub mod deal_source;
pub mod record_store;
pub mod symbol_lookup;
