pub mod deal;
pub mod hedge_record;
pub mod session;
pub mod side;
pub mod upsert_outcome;
