//! # Repository Module
//!
//! SQL for every table lives here and nowhere else.
//!
//! ## Two Kinds of Access
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Reads (public)                      Writes (crate-private)             │
//! │  ──────────────                      ──────────────────────             │
//! │  db.batches().get(id)                batch::apply_delta(&mut *tx, ..)   │
//! │  db.ledger_entries().history(id)     ledger::append(&mut *tx, ..)       │
//! │  db.sales().lines(sale_id)           sequence::next(&mut *tx, fy)       │
//! │  db.audit().history(type, id)        audit::record(&mut *tx, ..)        │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  SqlitePool                          the coordinator's transaction      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Write functions take `&mut SqliteConnection` so they can only run on a
//! connection the coordinator hands them, which is always inside its
//! transaction.

pub mod adjustment;
pub mod audit;
pub mod batch;
pub mod ledger;
pub mod purchase;
pub mod returns;
pub mod sale;
pub mod sequence;

pub use adjustment::AdjustmentRepository;
pub use audit::AuditRepository;
pub use batch::BatchRepository;
pub use ledger::LedgerRepository;
pub use purchase::PurchaseRepository;
pub use returns::ReturnRepository;
pub use sale::SaleRepository;
pub use sequence::SequenceRepository;
