pub mod case;
pub mod faction;
pub mod record;
