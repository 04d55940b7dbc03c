pub mod column;
pub mod op;
pub mod record;

pub use column::{ColumnDef, ColumnType};
pub use op::SchemaOp;
pub use record::MigrationRecord;
