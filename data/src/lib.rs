//! Card metadata: display names from the public card database and set names.

mod cards;
pub use cards::{CardNames, rarity_label};
pub mod schema;
mod sets;
pub use sets::{SETS, normalize_set_code, set_name};
