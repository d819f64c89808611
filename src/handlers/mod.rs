// handlers/mod.rs - Handler tiers
//
// Public (no tenant needed) → Protected (tenant host required) → Elevated
// (tenant administration, public host only)
pub mod elevated;
pub mod protected;
pub mod public;
