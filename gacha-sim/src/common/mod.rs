pub mod storage;
pub mod util;

pub use storage::FileStorage;
pub use util::{csv_field, hex_rgb, split_csv};
