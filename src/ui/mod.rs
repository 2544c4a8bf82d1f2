//! Terminal presentation: colours, icons, tables and a spinner

pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{block, error, header, human_bytes, section, status, success, summary_row, timing, warn};
pub use progress::Spinner;
pub use table::{TableBuilder, check_summary, row_set, table_list};
pub use theme::{Theme, theme};
