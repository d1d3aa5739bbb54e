//!  Storage of the ledger is abstracted by [line_store::LineStore].
//!  The basic idea is:
//!   - The ledger is a plain text file that is only ever appended to.
//!   - Stores know nothing about the ledger format, they read and append whole lines.
//!   - [line_store::MemoryLineStore] can be injected wherever a file isn't wanted.

pub mod line_store;
