pub mod balance_service;
pub mod interchange_service;
pub mod reversal_service;

pub use balance_service::{BalanceOverflow, BalanceService, BalanceTotals};
pub use interchange_service::{
    ExportDocument, ExportPayload, InterchangeService, StagedImport, ENTRY_ARRAY_FIELDS,
};
pub use reversal_service::{ReversalService, REVERSAL_PREFIX};
