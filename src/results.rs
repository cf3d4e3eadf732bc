mod result_set;
mod row;

pub use result_set::{KeyedRows, ResultSet};
pub use row::ResultRow;
